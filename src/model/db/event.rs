use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{EventStatus, EventType, UsState, Visibility},
    mongodb::Id,
};

/// An election event as stored in the database, with its unique ID.
///
/// The temporal status is deliberately absent: it is derived on every read
/// via [`ElectionEvent::status`], so it can never go stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionEvent {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub event: EventCore,
}

impl ElectionEvent {
    /// The live status of this event as of `today`.
    pub fn status(&self, today: NaiveDate) -> EventStatus {
        EventStatus::derive(self.event.election_date, today)
    }
}

impl std::ops::Deref for ElectionEvent {
    type Target = EventCore;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}

/// An election event without an ID, for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewElectionEvent {
    #[serde(flatten)]
    pub event: EventCore,
}

/// Core election event data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCore {
    /// State the event takes place in.
    pub state: UsState,
    /// County, where the event is not state-wide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    /// Display title.
    pub title: String,
    /// Kind of election.
    pub event_type: EventType,
    /// Calendar date of the election; no time component.
    pub election_date: NaiveDate,
    /// Voter registration deadline, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_deadline: Option<NaiveDate>,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the event appears in public listings.
    pub visibility: Visibility,
    /// Soft-delete flag. Archived events are excluded from listings but
    /// remain fetchable by ID so existing cards still resolve.
    pub archived: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    impl EventCore {
        pub fn example() -> Self {
            Self {
                state: "CA".parse().unwrap(),
                county: Some("Alameda".to_string()),
                title: "California General Election".to_string(),
                event_type: EventType::General,
                election_date: "2026-11-03".parse().unwrap(),
                registration_deadline: Some("2026-10-19".parse().unwrap()),
                description: None,
                visibility: Visibility::Public,
                archived: false,
            }
        }
    }

    impl ElectionEvent {
        pub fn example() -> Self {
            Self {
                id: Id::new(),
                event: EventCore::example(),
            }
        }
    }

    #[test]
    fn status_is_derived_from_date() {
        let event = ElectionEvent::example();
        assert_eq!(
            event.status("2026-10-01".parse().unwrap()),
            EventStatus::Upcoming
        );
        assert_eq!(
            event.status("2026-11-05".parse().unwrap()),
            EventStatus::Current
        );
        assert_eq!(
            event.status("2026-12-01".parse().unwrap()),
            EventStatus::Passed
        );
    }

    #[test]
    fn stored_form_has_no_status_field() {
        let event = ElectionEvent::example();
        let doc = mongodb::bson::to_document(&event).unwrap();
        assert!(!doc.contains_key("status"));
    }
}
