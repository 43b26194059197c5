use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{doc, ser::Error as BsonSerError, to_bson, DateTime as BsonDateTime, Document};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{BallotId, EventType, UsState},
    db::card::{CardDecision, CardTemplate, VoterCard},
    mongodb::Id,
};

/// A finalize call: snapshot the caller's decisions into their card for one
/// event. Idempotent per (identity, event): repeated calls update the same
/// card in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeRequest {
    /// The event this card is for. Must resolve to an existing event.
    pub event_id: Id,
    /// The ballot the decisions came from, if the client tracked one.
    pub ballot_id: Option<BallotId>,
    pub template: CardTemplate,
    pub location: String,
    pub state: Option<UsState>,
    /// May be empty: an empty card is valid, just not useful. Gating on
    /// "decisions complete" is the caller's job.
    #[serde(default)]
    pub decisions: Vec<CardDecision>,
    pub show_notes: bool,
}

/// A field-level patch to an existing card. Only the owning identity may
/// apply one. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardPatch {
    pub template: Option<CardTemplate>,
    pub is_public: Option<bool>,
    pub show_notes: Option<bool>,
    /// Full replacement of the decision lines; covers per-item hidden flags
    /// and note edits.
    pub decisions: Option<Vec<CardDecision>>,
}

impl CardPatch {
    /// Build the `$set` document for this patch. `updated_at` is always
    /// bumped; owner, event and creation metadata are never touched.
    pub fn as_set_doc(&self, now: DateTime<Utc>) -> Result<Document, BsonSerError> {
        let mut set = doc! {
            "updated_at": BsonDateTime::from_chrono(now),
        };
        if let Some(template) = self.template {
            set.insert("template", template);
        }
        if let Some(is_public) = self.is_public {
            set.insert("is_public", is_public);
        }
        if let Some(show_notes) = self.show_notes {
            set.insert("show_notes", show_notes);
        }
        if let Some(ref decisions) = self.decisions {
            set.insert("decisions", to_bson(decisions)?);
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.template.is_none()
            && self.is_public.is_none()
            && self.show_notes.is_none()
            && self.decisions.is_none()
    }
}

/// A card as served to its owner: everything except the internal owner
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub id: Id,
    pub event_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ballot_id: Option<BallotId>,
    pub template: CardTemplate,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<UsState>,
    pub election_date: NaiveDate,
    pub election_type: EventType,
    pub decisions: Vec<CardDecision>,
    pub show_notes: bool,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VoterCard> for CardView {
    fn from(card: VoterCard) -> Self {
        Self {
            id: card.id,
            event_id: card.event_id,
            ballot_id: card.content.ballot_id,
            template: card.content.template,
            location: card.content.location,
            state: card.content.state,
            election_date: card.content.election_date,
            election_type: card.content.election_type,
            decisions: card.content.decisions,
            show_notes: card.content.show_notes,
            is_public: card.is_public,
            share_url: card.share_url,
            created_at: card.created_at,
            updated_at: card.updated_at,
        }
    }
}

/// The public rendering of a card, derived at read time. Hidden decisions
/// are filtered out and notes are stripped when `show_notes` is off; the
/// stored card is never mutated, so toggling `show_notes` is reversible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicCard {
    pub id: Id,
    pub template: CardTemplate,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<UsState>,
    pub election_date: NaiveDate,
    pub election_type: EventType,
    pub decisions: Vec<CardDecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_url: Option<String>,
}

impl From<VoterCard> for PublicCard {
    fn from(card: VoterCard) -> Self {
        let show_notes = card.content.show_notes;
        let decisions = card
            .content
            .decisions
            .into_iter()
            .filter(|d| !d.hidden)
            .map(|mut d| {
                if !show_notes {
                    d.note = None;
                }
                d
            })
            .collect();
        Self {
            id: card.id,
            template: card.content.template,
            location: card.content.location,
            state: card.content.state,
            election_date: card.content.election_date,
            election_type: card.content.election_type,
            decisions,
            share_url: card.share_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::common::Identity;

    fn example_card() -> VoterCard {
        VoterCard::example(Identity::Visitor("v1".to_string()), Id::new())
    }

    #[test]
    fn public_view_filters_hidden_decisions() {
        let card = example_card();
        assert_eq!(card.content.decisions.len(), 2);
        assert!(card.content.decisions[1].hidden);

        let public = PublicCard::from(card);
        assert_eq!(public.decisions.len(), 1);
        assert!(public.decisions.iter().all(|d| !d.hidden));
    }

    #[test]
    fn public_view_keeps_notes_when_shown() {
        let card = example_card();
        assert!(card.content.show_notes);
        let public = PublicCard::from(card);
        assert!(public.decisions[0].note.is_some());
    }

    #[test]
    fn public_view_strips_notes_when_hidden() {
        let mut card = example_card();
        card.content.show_notes = false;
        let public = PublicCard::from(card.clone());
        assert!(public.decisions.iter().all(|d| d.note.is_none()));

        // The stored card still holds the note: the toggle is lossless.
        assert!(card.content.decisions[0].note.is_some());
    }

    #[test]
    fn public_view_has_no_owner() {
        let card = example_card();
        let doc = mongodb::bson::to_document(&PublicCard::from(card)).unwrap();
        assert!(!doc.contains_key("owner"));
    }

    #[test]
    fn patch_sets_only_provided_fields() {
        let patch = CardPatch {
            is_public: Some(false),
            ..Default::default()
        };
        let set = patch.as_set_doc(Utc::now()).unwrap();
        assert!(set.contains_key("updated_at"));
        assert!(set.contains_key("is_public"));
        assert!(!set.contains_key("template"));
        assert!(!set.contains_key("show_notes"));
        assert!(!set.contains_key("decisions"));
    }

    #[test]
    fn patch_never_touches_immutable_fields() {
        let patch = CardPatch {
            template: Some(CardTemplate::Modern),
            is_public: Some(true),
            show_notes: Some(false),
            decisions: Some(vec![]),
        };
        let set = patch.as_set_doc(Utc::now()).unwrap();
        for immutable in ["_id", "owner", "event_id", "created_at"] {
            assert!(!set.contains_key(immutable));
        }
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(CardPatch::default().is_empty());
        let patch = CardPatch {
            show_notes: Some(true),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
