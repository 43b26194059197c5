use chrono::Utc;
use mongodb::bson::doc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::card::{CardPatch, CardView, FinalizeRequest, PublicCard},
    common::{Identity, MaybeIdentity},
    db::{
        card::{CardContent, VoterCard},
        event::ElectionEvent,
    },
    mongodb::{is_duplicate_key_error, Coll, Id},
};

pub fn routes() -> Vec<Route> {
    routes![
        finalize,
        update_card,
        get_card,
        list_cards,
        get_public_card,
    ]
}

/// Snapshot the caller's decisions into their finalized card for one event.
///
/// Idempotent per (identity, event): the write is a single atomic upsert
/// against the unique card index, so N calls (including retries racing each
/// other) converge to one card holding the latest snapshot, with `id` and
/// `created_at` fixed by the first call. A visitor card and a user card for
/// the same event live in disjoint key spaces and are never unified.
#[post("/cards", data = "<request>", format = "json")]
async fn finalize(
    identity: Identity,
    request: Json<FinalizeRequest>,
    events: Coll<ElectionEvent>,
    cards: Coll<VoterCard>,
    config: &State<Config>,
) -> Result<Json<CardView>> {
    let request = request.0;

    // Foreign-key style check: a card must reference a real event. Archived
    // events are fine; the voter may still be updating recent decisions.
    let event = events
        .find_one(request.event_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Event {}", request.event_id)))?;

    let content = CardContent {
        ballot_id: request.ballot_id,
        template: request.template,
        location: request.location,
        state: request.state,
        election_date: event.election_date,
        election_type: event.event_type,
        decisions: request.decisions,
        show_notes: request.show_notes,
    };

    let mut filter = identity.as_owner_filter();
    filter.insert("event_id", request.event_id);

    let update = VoterCard::finalize_doc(
        &content,
        &identity,
        request.event_id,
        Id::new(),
        config.hostname(),
        Utc::now(),
    )?;
    let options = FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build();

    let mut result = cards
        .find_one_and_update(filter.clone(), update.clone(), options.clone())
        .await;
    // Two simultaneous first finalizes can race the upsert; the loser hits
    // the unique index and succeeds on retry as a plain update.
    if is_duplicate_key_error(result.as_ref()) {
        result = cards.find_one_and_update(filter, update, options).await;
    }
    let mut card = result?.ok_or_else(|| {
        Error::Conflict(format!("Card upsert for event {} vanished", request.event_id))
    })?;

    // The surviving `_id` is only known after the upsert, so the share URL
    // is refreshed here when it no longer matches the configured hostname.
    let share_url = VoterCard::share_url(config.hostname(), card.id);
    if card.share_url.as_deref() != Some(share_url.as_str()) {
        cards
            .update_one(
                card.id.as_doc(),
                doc! { "$set": { "share_url": &share_url } },
                None,
            )
            .await?;
        card.share_url = Some(share_url);
    }

    Ok(Json(card.into()))
}

/// Field-level edits post-creation: template swap, visibility toggle,
/// per-decision hidden flags, notes. Owner only; never changes the owner,
/// event, ID or creation time.
#[patch("/cards/<card_id>", data = "<patch>", format = "json")]
async fn update_card(
    identity: Identity,
    card_id: Id,
    patch: Json<CardPatch>,
    cards: Coll<VoterCard>,
) -> Result<Json<CardView>> {
    if patch.is_empty() {
        return Err(Error::Validation("Patch contains no fields".to_string()));
    }

    let card = cards
        .find_one(card_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Card {}", card_id)))?;
    if card.owner != identity {
        return Err(Error::forbidden(format!(
            "Card {} belongs to a different identity",
            card_id
        )));
    }

    // Apply and read back in one step, so the answer is the state this
    // patch produced rather than that of a concurrent later write.
    let set = patch.as_set_doc(Utc::now())?;
    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let updated = cards
        .find_one_and_update(card_id.as_doc(), doc! { "$set": set }, options)
        .await?
        .ok_or_else(|| Error::not_found(format!("Card {}", card_id)))?;
    Ok(Json(updated.into()))
}

/// The full stored card, owner only. Unlike the public view, hidden
/// decisions and notes are always present here.
#[get("/cards/<card_id>")]
async fn get_card(identity: Identity, card_id: Id, cards: Coll<VoterCard>) -> Result<Json<CardView>> {
    let card = cards
        .find_one(card_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Card {}", card_id)))?;
    if card.owner != identity {
        return Err(Error::forbidden(format!(
            "Card {} belongs to a different identity",
            card_id
        )));
    }
    Ok(Json(card.into()))
}

/// All cards owned by the calling identity.
#[get("/cards")]
async fn list_cards(identity: Identity, cards: Coll<VoterCard>) -> Result<Json<Vec<CardView>>> {
    let owned: Vec<VoterCard> = cards
        .find(identity.as_owner_filter(), None)
        .await?
        .try_collect()
        .await?;
    let mut views: Vec<CardView> = owned.into_iter().map(CardView::from).collect();
    views.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    Ok(Json(views))
}

/// The shareable rendering of a card: hidden decisions filtered, notes
/// stripped when `show_notes` is off, owner never included. Derived at read
/// time; the stored card is untouched.
///
/// A private card responds exactly like a missing one to anybody but the
/// owner, so probing cannot distinguish the two.
#[get("/cards/<card_id>/public")]
async fn get_public_card(
    identity: MaybeIdentity,
    card_id: Id,
    cards: Coll<VoterCard>,
) -> Result<Json<PublicCard>> {
    let card = cards
        .find_one(card_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Card {}", card_id)))?;

    let is_owner = matches!(identity.0, Some(ref caller) if *caller == card.owner);
    if !card.is_public && !is_owner {
        return Err(Error::not_found(format!("Card {}", card_id)));
    }

    Ok(Json(card.into()))
}
