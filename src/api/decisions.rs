use chrono::Utc;
use mongodb::options::UpdateOptions;
use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::decision::DecisionSetView,
    common::{BallotId, Identity},
    db::decision::{DecisionSet, DecisionSnapshot},
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![sync_decisions, get_decisions, clear_decisions]
}

/// Store the caller's complete decision snapshot for one ballot.
///
/// Full-replace semantics: the ledger keeps the latest snapshot the client
/// sent, not a delta log. Last write wins; concurrent edits from multiple
/// devices are not merged.
#[put("/decisions/<ballot_id>", data = "<snapshot>", format = "json")]
async fn sync_decisions(
    identity: Identity,
    ballot_id: BallotId,
    snapshot: Json<DecisionSnapshot>,
    decisions: Coll<DecisionSet>,
) -> Result<Json<DecisionSetView>> {
    let mut filter = identity.as_owner_filter();
    filter.insert("ballot_id", &ballot_id);

    let update = snapshot.0.sync_doc(&identity, &ballot_id, Utc::now())?;
    let options = UpdateOptions::builder().upsert(true).build();
    let result = decisions.update_one(filter.clone(), update, options).await?;

    // The first snapshot for an (identity, ballot) pair is the
    // "decisions started" signal used by completion-rate analytics.
    if result.upserted_id.is_some() {
        info!("Decisions started for ballot {ballot_id}");
    }

    let stored = decisions
        .find_one(filter, None)
        .await?
        .ok_or_else(|| {
            Error::Conflict(format!("Decision upsert for ballot {} vanished", ballot_id))
        })?;
    Ok(Json(stored.into()))
}

/// The stored snapshot, or 404 if this identity never synced this ballot.
#[get("/decisions/<ballot_id>")]
async fn get_decisions(
    identity: Identity,
    ballot_id: BallotId,
    decisions: Coll<DecisionSet>,
) -> Result<Json<DecisionSetView>> {
    let mut filter = identity.as_owner_filter();
    filter.insert("ballot_id", &ballot_id);

    let set = decisions
        .find_one(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Decisions for ballot {}", ballot_id)))?;
    Ok(Json(set.into()))
}

/// Explicit data-clear; the only way decisions are ever deleted. Idempotent.
#[delete("/decisions/<ballot_id>")]
async fn clear_decisions(
    identity: Identity,
    ballot_id: BallotId,
    decisions: Coll<DecisionSet>,
) -> Result<()> {
    let mut filter = identity.as_owner_filter();
    filter.insert("ballot_id", &ballot_id);

    let result = decisions.delete_one(filter, None).await?;
    if result.deleted_count == 1 {
        info!("Cleared decisions for ballot {ballot_id}");
    }
    Ok(())
}
