#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;
pub mod services;
pub mod sweep;

use config::{ConfigFairing, DatabaseFairing};
use logging::LoggerFairing;
use services::ServicesFairing;
use sweep::StatusSweeperFairing;

/// Build the rocket instance with all fairings and routes attached.
/// Fairing order matters: the database and services depend on the config,
/// and the status sweeper depends on the database.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(ServicesFairing)
        .attach(StatusSweeperFairing)
        .attach(LoggerFairing)
}
