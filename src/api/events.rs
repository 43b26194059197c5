use std::collections::HashSet;

use chrono::Utc;
use mongodb::bson::doc;
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::event::EventView,
    common::{MaybeIdentity, UsState, Visibility},
    db::{event::ElectionEvent, subscription::Subscription},
    mongodb::{Coll, Id},
};

pub fn routes() -> Vec<Route> {
    routes![list_events, get_event]
}

/// Public, non-archived events for a state, annotated with live status and
/// the caller's subscriptions, in listing order.
#[get("/events?<state>")]
async fn list_events(
    state: UsState,
    identity: MaybeIdentity,
    events: Coll<ElectionEvent>,
    subscriptions: Coll<Subscription>,
) -> Result<Json<Vec<EventView>>> {
    let filter = doc! {
        "state": state,
        "visibility": Visibility::Public,
        "archived": false,
    };
    let matching: Vec<ElectionEvent> = events.find(filter, None).await?.try_collect().await?;

    let subscribed = subscribed_events(&identity, &subscriptions).await?;

    let today = Utc::now().date_naive();
    let mut views: Vec<EventView> = matching
        .into_iter()
        .map(|event| {
            let is_subscribed = subscribed.contains(&event.id);
            EventView::new(event, today, is_subscribed)
        })
        .collect();
    views.sort_by_key(EventView::listing_key);

    Ok(Json(views))
}

/// Fetch one event by ID. Archived events still resolve here, so existing
/// cards referencing them keep working.
#[get("/events/<event_id>")]
async fn get_event(
    event_id: Id,
    identity: MaybeIdentity,
    events: Coll<ElectionEvent>,
    subscriptions: Coll<Subscription>,
) -> Result<Json<EventView>> {
    let event = events
        .find_one(event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Event {}", event_id)))?;

    let subscribed = subscribed_events(&identity, &subscriptions).await?;
    let today = Utc::now().date_naive();
    let is_subscribed = subscribed.contains(&event.id);
    Ok(Json(EventView::new(event, today, is_subscribed)))
}

/// The set of event IDs the caller is subscribed to; empty for anonymous
/// callers with no visitor ID.
async fn subscribed_events(
    identity: &MaybeIdentity,
    subscriptions: &Coll<Subscription>,
) -> Result<HashSet<Id>> {
    let Some(ref identity) = identity.0 else {
        return Ok(HashSet::new());
    };
    let ids = subscriptions
        .find(identity.as_owner_filter(), None)
        .await?
        .map_ok(|subscription| subscription.event_id)
        .try_collect()
        .await?;
    Ok(ids)
}
