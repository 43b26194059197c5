//! The status sweep.
//!
//! Because an event's status is derived on every read, nothing here is
//! required for correctness: an event "passes" the moment the clock says so,
//! whether or not any sweep runs. The sweep exists purely for side effects,
//! announcing the transition once so subscribers can be notified.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use mongodb::{bson::doc, error::Error as DbError, Database};
use rocket::{
    fairing::{Fairing, Info, Kind},
    futures::TryStreamExt,
    tokio::sync::Mutex,
    Build, Rocket,
};

use crate::{
    model::{
        common::CURRENT_WINDOW_DAYS,
        db::{event::ElectionEvent, subscription::Subscription},
        mongodb::{Coll, Id},
    },
    scheduled_task::ScheduledTask,
};

/// Map from event IDs to sweep tasks.
type TaskMap = HashMap<Id, ScheduledTask<()>>;

/// One observational task per event, firing when the event leaves its
/// "current" window and becomes passed.
pub struct StatusSweeper {
    tasks: Arc<Mutex<TaskMap>>,
}

impl StatusSweeper {
    pub fn new() -> Self {
        Self {
            tasks: Default::default(),
        }
    }

    /// Does the given event have a sweep scheduled?
    pub async fn has_sweep(&self, event_id: Id) -> bool {
        self.tasks.lock().await.contains_key(&event_id)
    }

    /// Schedule a sweep for every event that has not yet passed.
    pub async fn schedule_all(&self, db: &Database) -> Result<(), DbError> {
        let events: Vec<ElectionEvent> = Coll::<ElectionEvent>::from_db(db)
            .find(doc! { "archived": false }, None)
            .await?
            .try_collect()
            .await?;
        for event in &events {
            if passes_at(event) > Utc::now() {
                self.schedule(Coll::from_db(db), event).await;
            }
        }
        Ok(())
    }

    /// Schedule (or reschedule, after a date change) the sweep for one event.
    pub async fn schedule(&self, subscriptions: Coll<Subscription>, event: &ElectionEvent) {
        let event_id = event.id;
        let title = event.title.clone();
        let tasks = self.tasks.clone();
        let sweep = async move {
            announce_passed(event_id, &title, subscriptions).await;
            tasks.lock().await.remove(&event_id);
        };

        let mut tasks_locked = self.tasks.lock().await;
        if let Some(task) = tasks_locked.remove(&event_id) {
            task.cancel().await;
        }
        tasks_locked.insert(event_id, ScheduledTask::new(sweep, passes_at(event)));
    }

    /// Drop the sweep for a deleted event, if any.
    pub async fn forget(&self, event_id: Id) {
        if let Some(task) = self.tasks.lock().await.remove(&event_id) {
            task.cancel().await;
        }
    }
}

impl Default for StatusSweeper {
    fn default() -> Self {
        Self::new()
    }
}

/// The instant an event's status becomes passed: midnight UTC after the last
/// day of the current window.
fn passes_at(event: &ElectionEvent) -> DateTime<Utc> {
    let last_current_day = event.election_date + Duration::days(CURRENT_WINDOW_DAYS);
    let midnight = NaiveTime::from_hms_opt(0, 0, 0).expect("valid constant time");
    Utc.from_utc_datetime(&(last_current_day + Duration::days(1)).and_time(midnight))
}

/// Side effects of a passed transition. Failure here corrupts nothing; the
/// next restart reschedules any event still inside its window.
async fn announce_passed(event_id: Id, title: &str, subscriptions: Coll<Subscription>) {
    let filter = doc! {
        "event_id": event_id,
        "notify_on_update": true,
    };
    match subscriptions.count_documents(filter, None).await {
        Ok(count) => {
            info!("Event {event_id} ('{title}') has passed; {count} subscribers to notify");
        }
        Err(e) => {
            warn!("Event {event_id} ('{title}') has passed, but counting subscribers failed: {e}");
        }
    }
}

/// A fairing that schedules sweeps for all live events during Rocket
/// ignition, and places a `StatusSweeper` into managed state. Depends on the
/// database fairing having run first.
pub struct StatusSweeperFairing;

#[rocket::async_trait]
impl Fairing for StatusSweeperFairing {
    fn info(&self) -> Info {
        Info {
            name: "Status Sweeper",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        info!("Scheduling status sweeps...");
        let sweeper = StatusSweeper::new();
        let db = match rocket.state::<Database>() {
            Some(db) => db,
            None => {
                error!("Database was not available when scheduling status sweeps");
                return Err(rocket);
            }
        };
        if let Err(e) = sweeper.schedule_all(db).await {
            error!("Failed to schedule status sweeps: {e}");
            return Err(rocket);
        }
        info!("...status sweeps scheduled!");

        rocket = rocket.manage(sweeper);
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_at_is_midnight_after_the_window() {
        let mut event = ElectionEvent::example();
        event.event.election_date = "2026-11-03".parse().unwrap();
        // Window covers the 3rd through the 10th; passed from the 11th.
        let expected: DateTime<Utc> = "2026-11-11T00:00:00Z".parse().unwrap();
        assert_eq!(passes_at(&event), expected);
    }
}
