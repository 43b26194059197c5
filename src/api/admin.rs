use chrono::Utc;
use mongodb::{
    bson::{doc, to_document},
    Client,
};
use rocket::{serde::json::Json, Route, State};

use crate::error::{Error, Result};
use crate::model::{
    api::event::{EventSpec, EventView},
    auth::AdminToken,
    db::{
        event::{ElectionEvent, NewElectionEvent},
        subscription::Subscription,
    },
    mongodb::{Coll, Id},
};
use crate::sweep::StatusSweeper;

pub fn routes() -> Vec<Route> {
    routes![
        create_event,
        update_event,
        archive_event,
        restore_event,
        delete_event,
    ]
}

#[post("/events", data = "<spec>", format = "json")]
async fn create_event(
    _token: AdminToken,
    spec: Json<EventSpec>,
    new_events: Coll<NewElectionEvent>,
    events: Coll<ElectionEvent>,
    subscriptions: Coll<Subscription>,
    sweeper: &State<StatusSweeper>,
) -> Result<Json<EventView>> {
    let new_event: NewElectionEvent = spec.0.into();
    let new_id: Id = new_events
        .insert_one(&new_event, None)
        .await?
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::Conflict("Insert did not return an ObjectId".to_string()))?
        .into();

    // Read back the full record including its ID.
    let event = events
        .find_one(new_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Event {}", new_id)))?;

    sweeper.schedule(subscriptions.clone(), &event).await;
    info!("Created event {} ('{}')", event.id, event.title);

    Ok(Json(EventView::new(event, Utc::now().date_naive(), false)))
}

#[put("/events/<event_id>", data = "<spec>", format = "json")]
async fn update_event(
    _token: AdminToken,
    event_id: Id,
    spec: Json<EventSpec>,
    events: Coll<ElectionEvent>,
    subscriptions: Coll<Subscription>,
    sweeper: &State<StatusSweeper>,
) -> Result<Json<EventView>> {
    // Replace the spec-covered fields; `archived` is controlled separately
    // and must survive an edit.
    let set = to_document(&spec.0)?;
    let result = events
        .update_one(event_id.as_doc(), doc! { "$set": set }, None)
        .await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Event {}", event_id)));
    }

    let event = events
        .find_one(event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Event {}", event_id)))?;

    // The election date may have moved; reschedule the sweep.
    sweeper.schedule(subscriptions.clone(), &event).await;

    Ok(Json(EventView::new(event, Utc::now().date_naive(), false)))
}

#[post("/events/<event_id>/archive")]
async fn archive_event(
    _token: AdminToken,
    event_id: Id,
    events: Coll<ElectionEvent>,
) -> Result<()> {
    set_archived(event_id, true, &events).await
}

#[post("/events/<event_id>/restore")]
async fn restore_event(
    _token: AdminToken,
    event_id: Id,
    events: Coll<ElectionEvent>,
) -> Result<()> {
    set_archived(event_id, false, &events).await
}

/// Soft-delete / restore. Never touches status: that is derived from the
/// election date alone.
async fn set_archived(event_id: Id, archived: bool, events: &Coll<ElectionEvent>) -> Result<()> {
    let update = doc! {
        "$set": { "archived": archived }
    };
    let result = events.update_one(event_id.as_doc(), update, None).await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Event {}", event_id)));
    }
    Ok(())
}

#[delete("/events/<event_id>")]
async fn delete_event(
    _token: AdminToken,
    event_id: Id,
    events: Coll<ElectionEvent>,
    subscriptions: Coll<Subscription>,
    sweeper: &State<StatusSweeper>,
    db_client: &State<Client>,
) -> Result<()> {
    let event = events
        .find_one(event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Event {}", event_id)))?;

    // Atomically delete the event together with its subscriptions. Cards
    // referencing the event are deliberately left in place.
    {
        let mut session = db_client.start_session(None).await?;
        session.start_transaction(None).await?;

        let result = events
            .delete_one_with_session(event_id.as_doc(), None, &mut session)
            .await?;
        debug_assert_eq!(result.deleted_count, 1);

        let filter = doc! {
            "event_id": event_id,
        };
        subscriptions
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
    }

    sweeper.forget(event_id).await;
    info!("Deleted event {} ('{}')", event_id, event.title);

    Ok(())
}
