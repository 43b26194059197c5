//! Pass-through endpoints for the external collaborators. These are simple
//! I/O wrappers; a failure here is an Upstream error and never touches
//! decision or card state.

use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::upstream::{
        BallotDocument, BiasCheckRequest, BiasReport, SimplifyRequest, Summary, ZipLocation,
    },
    common::UsState,
};
use crate::services::Services;

pub fn routes() -> Vec<Route> {
    routes![get_ballot, simplify, check_bias, lookup_location]
}

/// The ballot document (measures and candidate races) for a state/county.
#[get("/ballot?<state>&<county>")]
async fn get_ballot(
    state: UsState,
    county: Option<String>,
    services: &State<Services>,
) -> Result<Json<BallotDocument>> {
    let ballot = services.get_ballot(&state, county.as_deref()).await?;
    Ok(Json(ballot))
}

#[post("/simplify", data = "<request>", format = "json")]
async fn simplify(
    request: Json<SimplifyRequest>,
    services: &State<Services>,
) -> Result<Json<Summary>> {
    if request.text.trim().is_empty() {
        return Err(Error::Validation("Nothing to simplify".to_string()));
    }
    let summary = services.simplify(&request.0).await?;
    Ok(Json(summary))
}

#[post("/bias-check", data = "<request>", format = "json")]
async fn check_bias(
    request: Json<BiasCheckRequest>,
    services: &State<Services>,
) -> Result<Json<BiasReport>> {
    if request.content.trim().is_empty() {
        return Err(Error::Validation("Nothing to check".to_string()));
    }
    let report = services.check_bias(&request.0).await?;
    Ok(Json(report))
}

/// Resolve a ZIP code to a state and county.
#[get("/location/<zip>")]
async fn lookup_location(zip: String, services: &State<Services>) -> Result<Json<ZipLocation>> {
    if zip.len() != 5 || !zip.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(format!("Malformed ZIP code '{}'", zip)));
    }
    let location = services.lookup_zip(&zip).await?;
    Ok(Json(location))
}
