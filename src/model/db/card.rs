use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{
    doc, ser::Error as BsonSerError, serde_helpers::chrono_datetime_as_bson_datetime, to_bson,
    to_document, Bson, DateTime as BsonDateTime, Document,
};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{BallotId, EventType, Identity, UsState},
    mongodb::Id,
};

/// Display template for a rendered card. Rendering itself is out of scope;
/// the choice is just stored and echoed back.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTemplate {
    Classic,
    Modern,
    Minimal,
}

impl From<CardTemplate> for Bson {
    fn from(template: CardTemplate) -> Self {
        to_bson(&template).expect("Serialisation is infallible")
    }
}

/// Whether a card line came from a ballot measure or a candidate race.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardDecisionKind {
    Measure,
    Candidate,
}

/// One line on a finalized voter card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDecision {
    pub kind: CardDecisionKind,
    /// Measure or race title.
    pub title: String,
    /// Display string for the decision ("Yes", "Jane Doe", ...).
    pub decision: String,
    /// Hidden lines are excluded from the public view but kept in storage.
    #[serde(default)]
    pub hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A finalized voter card: the snapshot of one identity's decisions for one
/// election event.
///
/// There is at most one card per (identity, event); creation is an upsert
/// against the unique index, so retried finalize calls converge to one row.
/// `id`, `owner`, `event_id` and `created_at` never change after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterCard {
    #[serde(rename = "_id")]
    pub id: Id,
    /// Owning identity. Never served to non-owners.
    pub owner: Identity,
    /// The event this card snapshots decisions for.
    pub event_id: Id,
    #[serde(flatten)]
    pub content: CardContent,
    /// Whether anyone may view the card via its share URL.
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// The card fields that every finalize call overwrites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardContent {
    /// The ballot the snapshotted decisions came from, if the client tracked one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ballot_id: Option<BallotId>,
    pub template: CardTemplate,
    /// Human-readable location ("Alameda County, CA").
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<UsState>,
    /// Election date, snapshotted from the event at finalize time.
    pub election_date: NaiveDate,
    /// Election type, snapshotted from the event at finalize time.
    pub election_type: EventType,
    pub decisions: Vec<CardDecision>,
    /// When false, notes are stripped from the public view (but kept in
    /// storage, so the toggle is lossless).
    pub show_notes: bool,
}

impl VoterCard {
    /// The share URL for a card with the given ID, on the given hostname.
    pub fn share_url(hostname: &str, id: Id) -> String {
        format!("https://{}/card/{}", hostname, id)
    }

    /// Build the update document for a finalize upsert.
    ///
    /// Every mutable field lands in `$set` (absent options overwrite as
    /// null), while `_id`, `owner`, `event_id` and the creation metadata
    /// appear only in `$setOnInsert`, so re-finalizing updates the one
    /// existing card in place without touching its identity.
    pub fn finalize_doc(
        content: &CardContent,
        owner: &Identity,
        event_id: Id,
        new_id: Id,
        hostname: &str,
        now: DateTime<Utc>,
    ) -> Result<Document, BsonSerError> {
        let mut set = to_document(content)?;
        set.insert("updated_at", BsonDateTime::from_chrono(now));
        if content.ballot_id.is_none() {
            set.insert("ballot_id", Bson::Null);
        }
        if content.state.is_none() {
            set.insert("state", Bson::Null);
        }
        Ok(doc! {
            "$set": set,
            "$setOnInsert": {
                "_id": new_id,
                "owner": to_bson(owner)?,
                "event_id": event_id,
                "is_public": true,
                "share_url": Self::share_url(hostname, new_id),
                "created_at": BsonDateTime::from_chrono(now),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl CardContent {
        pub fn example() -> Self {
            Self {
                ballot_id: Some("ca-alameda-2026".to_string()),
                template: CardTemplate::Classic,
                location: "Alameda County, CA".to_string(),
                state: Some("CA".parse().unwrap()),
                election_date: "2026-11-03".parse().unwrap(),
                election_type: EventType::General,
                decisions: vec![
                    CardDecision {
                        kind: CardDecisionKind::Measure,
                        title: "Proposition 17".to_string(),
                        decision: "Yes".to_string(),
                        hidden: false,
                        note: Some("Funds transit".to_string()),
                        description: Some("Transit bond measure".to_string()),
                    },
                    CardDecision {
                        kind: CardDecisionKind::Candidate,
                        title: "Governor".to_string(),
                        decision: "Jane Doe".to_string(),
                        hidden: true,
                        note: None,
                        description: None,
                    },
                ],
                show_notes: true,
            }
        }
    }

    impl VoterCard {
        pub fn example(owner: Identity, event_id: Id) -> Self {
            let id = Id::new();
            let now = Utc::now();
            Self {
                id,
                owner,
                event_id,
                content: CardContent::example(),
                is_public: true,
                share_url: Some(VoterCard::share_url("example.com", id)),
                created_at: now,
                updated_at: now,
            }
        }
    }

    #[test]
    fn share_url_contains_card_id() {
        let id = Id::new();
        let url = VoterCard::share_url("vote.example.com", id);
        assert_eq!(url, format!("https://vote.example.com/card/{}", id));
    }

    #[test]
    fn share_url_tracks_hostname() {
        // Re-finalizing after a hostname change must produce a different
        // URL, which is what drives the stored card's refresh.
        let id = Id::new();
        assert_ne!(
            VoterCard::share_url("old.example.com", id),
            VoterCard::share_url("new.example.com", id)
        );
    }

    #[test]
    fn finalize_doc_overwrites_all_mutable_fields() {
        let content = CardContent::example();
        let owner = Identity::Visitor("v1".to_string());
        let update =
            VoterCard::finalize_doc(&content, &owner, Id::new(), Id::new(), "example.com", Utc::now())
                .unwrap();
        let set = update.get_document("$set").unwrap();
        for field in [
            "ballot_id",
            "template",
            "location",
            "state",
            "election_date",
            "election_type",
            "decisions",
            "show_notes",
            "updated_at",
        ] {
            assert!(set.contains_key(field), "missing {field}");
        }
    }

    #[test]
    fn finalize_doc_overwrites_absent_options_as_null() {
        let mut content = CardContent::example();
        content.ballot_id = None;
        content.state = None;
        let owner = Identity::Visitor("v1".to_string());
        let update =
            VoterCard::finalize_doc(&content, &owner, Id::new(), Id::new(), "example.com", Utc::now())
                .unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get("ballot_id"), Some(&Bson::Null));
        assert_eq!(set.get("state"), Some(&Bson::Null));
    }

    #[test]
    fn finalize_doc_sets_identity_and_creation_metadata_only_on_insert() {
        let content = CardContent::example();
        let owner = Identity::Visitor("v1".to_string());
        let update =
            VoterCard::finalize_doc(&content, &owner, Id::new(), Id::new(), "example.com", Utc::now())
                .unwrap();
        let set = update.get_document("$set").unwrap();
        let on_insert = update.get_document("$setOnInsert").unwrap();

        // A second finalize therefore leaves the card's `_id` and
        // `created_at` untouched and only replaces the snapshot.
        for field in ["_id", "owner", "event_id", "is_public", "share_url", "created_at"] {
            assert!(on_insert.contains_key(field), "missing {field}");
            assert!(!set.contains_key(field), "unexpected {field}");
        }
        for field in ["template", "decisions", "updated_at"] {
            assert!(!on_insert.contains_key(field), "unexpected {field}");
        }
    }

    #[test]
    fn hidden_defaults_to_false() {
        let doc = mongodb::bson::doc! {
            "kind": "measure",
            "title": "Prop 1",
            "decision": "No",
        };
        let decision: CardDecision = mongodb::bson::from_document(doc).unwrap();
        assert!(!decision.hidden);
    }
}
