use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mongodb::bson::{
    doc, ser::Error as BsonSerError, serde_helpers::chrono_datetime_as_bson_datetime, to_bson,
    to_document, Bson, DateTime as BsonDateTime, Document,
};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{BallotId, CandidateId, Identity, MeasureId, OfficeId},
    mongodb::Id,
};

/// A voter's stance on a single ballot measure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Yes,
    No,
    Undecided,
}

impl From<Stance> for Bson {
    fn from(stance: Stance) -> Self {
        to_bson(&stance).expect("Serialisation is infallible")
    }
}

/// A decision on one ballot measure: a stance plus an optional note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureDecision {
    pub decision: Stance,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// The latest complete decision snapshot for one identity on one ballot.
///
/// The ledger stores whole snapshots, not deltas: each client sync replaces
/// the previous one wholesale (last-write-wins). Concurrent multi-device
/// edits are not merged; writes originate from one device at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSet {
    #[serde(rename = "_id")]
    pub id: Id,
    /// Owning identity.
    pub owner: Identity,
    /// The ballot these decisions belong to.
    pub ballot_id: BallotId,
    #[serde(flatten)]
    pub decisions: DecisionSnapshot,
    /// When the first snapshot for this (identity, ballot) pair was written.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub started_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// The mutable payload of a decision set: everything the client syncs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSnapshot {
    /// At most one decision per measure.
    #[serde(default)]
    pub measure_decisions: HashMap<MeasureId, MeasureDecision>,
    /// At most one selected candidate per office; absence means no selection.
    #[serde(default)]
    pub candidate_selections: HashMap<OfficeId, CandidateId>,
    /// Free-text notes per office.
    #[serde(default)]
    pub notes: HashMap<OfficeId, String>,
}

impl DecisionSnapshot {
    /// Build the update document for a sync upsert.
    ///
    /// The whole snapshot replaces the stored one in `$set` (full-replace,
    /// last write wins), while the identity, ballot key and `started_at`
    /// appear only in `$setOnInsert`, so the first-write timestamp survives
    /// every later sync.
    pub fn sync_doc(
        &self,
        owner: &Identity,
        ballot_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Document, BsonSerError> {
        let mut set = to_document(self)?;
        set.insert("updated_at", BsonDateTime::from_chrono(now));
        Ok(doc! {
            "$set": set,
            "$setOnInsert": {
                "_id": Id::new(),
                "owner": to_bson(owner)?,
                "ballot_id": ballot_id,
                "started_at": BsonDateTime::from_chrono(now),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl DecisionSnapshot {
        pub fn example() -> Self {
            Self {
                measure_decisions: HashMap::from_iter(vec![
                    (
                        "prop-17".to_string(),
                        MeasureDecision {
                            decision: Stance::Yes,
                            note: Some("Funds transit".to_string()),
                        },
                    ),
                    (
                        "prop-22".to_string(),
                        MeasureDecision {
                            decision: Stance::Undecided,
                            note: None,
                        },
                    ),
                ]),
                candidate_selections: HashMap::from_iter(vec![(
                    "governor".to_string(),
                    "candidate-9".to_string(),
                )]),
                notes: HashMap::from_iter(vec![(
                    "governor".to_string(),
                    "Strong on housing".to_string(),
                )]),
            }
        }
    }

    #[test]
    fn sync_doc_replaces_snapshot_but_keeps_started_at() {
        let snapshot = DecisionSnapshot::example();
        let owner = Identity::User("u1".to_string());
        let update = snapshot.sync_doc(&owner, "ca-alameda-2026", Utc::now()).unwrap();

        let set = update.get_document("$set").unwrap();
        for field in ["measure_decisions", "candidate_selections", "notes", "updated_at"] {
            assert!(set.contains_key(field), "missing {field}");
        }

        let on_insert = update.get_document("$setOnInsert").unwrap();
        for field in ["_id", "owner", "ballot_id", "started_at"] {
            assert!(on_insert.contains_key(field), "missing {field}");
            assert!(!set.contains_key(field), "unexpected {field}");
        }
    }

    #[test]
    fn snapshot_round_trips_through_bson() {
        let snapshot = DecisionSnapshot::example();
        let doc = mongodb::bson::to_document(&snapshot).unwrap();
        let back: DecisionSnapshot = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(snapshot, back);
    }

    #[test]
    fn snapshot_fields_default_to_empty() {
        let snapshot: DecisionSnapshot =
            mongodb::bson::from_document(mongodb::bson::doc! {}).unwrap();
        assert!(snapshot.measure_decisions.is_empty());
        assert!(snapshot.candidate_selections.is_empty());
        assert!(snapshot.notes.is_empty());
    }
}
