use chrono::Utc;
use mongodb::options::UpdateOptions;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::event::EventView,
    common::Identity,
    db::{event::ElectionEvent, subscription::Subscription},
    mongodb::{is_duplicate_key_error, Coll, Id},
};

pub fn routes() -> Vec<Route> {
    routes![subscribe, unsubscribe, list_subscribed]
}

/// Follow an event. Idempotent set membership: subscribing twice leaves one
/// row, and a duplicate-key race between two first subscribes collapses to
/// the existing row.
#[put("/events/<event_id>/subscription?<notify>")]
async fn subscribe(
    identity: Identity,
    event_id: Id,
    notify: Option<bool>,
    events: Coll<ElectionEvent>,
    subscriptions: Coll<Subscription>,
) -> Result<()> {
    // The event must exist; dangling subscriptions are only ever created by
    // later event deletion, which removes them in the same transaction.
    events
        .find_one(event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Event {}", event_id)))?;

    let mut filter = identity.as_owner_filter();
    filter.insert("event_id", event_id);

    let update = Subscription::subscribe_doc(&identity, event_id, notify.unwrap_or(true))?;
    let options = UpdateOptions::builder().upsert(true).build();
    let result = subscriptions.update_one(filter, update, options).await;
    if is_duplicate_key_error(result.as_ref()) {
        // Lost the insert race: the row exists, which is what we wanted.
        return Ok(());
    }
    result?;
    Ok(())
}

/// Stop following an event. Unsubscribing when not subscribed is a no-op
/// returning success.
#[delete("/events/<event_id>/subscription")]
async fn unsubscribe(
    identity: Identity,
    event_id: Id,
    subscriptions: Coll<Subscription>,
) -> Result<()> {
    let mut filter = identity.as_owner_filter();
    filter.insert("event_id", event_id);
    subscriptions.delete_one(filter, None).await?;
    Ok(())
}

/// All events the caller follows, with live-computed status, election date
/// ascending. Subscriptions whose event no longer exists are silently
/// dropped from the answer.
#[get("/subscriptions")]
async fn list_subscribed(
    identity: Identity,
    subscriptions: Coll<Subscription>,
    events: Coll<ElectionEvent>,
) -> Result<Json<Vec<EventView>>> {
    let subscribed: Vec<Subscription> = subscriptions
        .find(identity.as_owner_filter(), None)
        .await?
        .try_collect()
        .await?;

    let today = Utc::now().date_naive();
    let mut views = Vec::with_capacity(subscribed.len());
    for subscription in subscribed {
        if let Some(event) = events.find_one(subscription.event_id.as_doc(), None).await? {
            views.push(EventView::new(event, today, true));
        }
    }
    views.sort_by_key(|view| view.election_date);

    Ok(Json(views))
}
