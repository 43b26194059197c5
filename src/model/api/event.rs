use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{EventStatus, EventType, UsState, Visibility},
    db::event::{ElectionEvent, EventCore, NewElectionEvent},
    mongodb::Id,
};

/// An election event specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSpec {
    pub state: UsState,
    pub county: Option<String>,
    pub title: String,
    pub event_type: EventType,
    pub election_date: NaiveDate,
    pub registration_deadline: Option<NaiveDate>,
    pub description: Option<String>,
    pub visibility: Visibility,
}

impl From<EventSpec> for NewElectionEvent {
    fn from(spec: EventSpec) -> Self {
        Self {
            event: EventCore {
                state: spec.state,
                county: spec.county,
                title: spec.title,
                event_type: spec.event_type,
                election_date: spec.election_date,
                registration_deadline: spec.registration_deadline,
                description: spec.description,
                visibility: spec.visibility,
                archived: false,
            },
        }
    }
}

/// An event as served to callers: the stored fields plus the live-derived
/// status and, where an identity was supplied, the caller's subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventView {
    pub id: Id,
    pub state: UsState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<String>,
    pub title: String,
    pub event_type: EventType,
    pub election_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_deadline: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub visibility: Visibility,
    pub archived: bool,
    /// Derived at read time, never stored.
    pub status: EventStatus,
    pub subscribed: bool,
}

impl EventView {
    pub fn new(event: ElectionEvent, today: NaiveDate, subscribed: bool) -> Self {
        let status = event.status(today);
        let core = event.event;
        Self {
            id: event.id,
            state: core.state,
            county: core.county,
            title: core.title,
            event_type: core.event_type,
            election_date: core.election_date,
            registration_deadline: core.registration_deadline,
            description: core.description,
            visibility: core.visibility,
            archived: core.archived,
            status,
            subscribed,
        }
    }

    /// Listing order: status priority (upcoming < current < passed),
    /// then election date ascending.
    pub fn listing_key(&self) -> (EventStatus, NaiveDate) {
        (self.status, self.election_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(date: &str, today: &str) -> EventView {
        let mut event = ElectionEvent::example();
        event.event.election_date = date.parse().unwrap();
        EventView::new(event, today.parse().unwrap(), false)
    }

    #[test]
    fn listing_sorts_by_status_then_date() {
        let today = "2026-08-26";
        let passed = view("2026-01-10", today);
        let current = view("2026-08-24", today);
        let upcoming_near = view("2026-09-01", today);
        let upcoming_far = view("2026-11-03", today);

        let mut views = vec![
            passed.clone(),
            upcoming_far.clone(),
            current.clone(),
            upcoming_near.clone(),
        ];
        views.sort_by_key(EventView::listing_key);

        let dates: Vec<_> = views.iter().map(|v| v.election_date).collect();
        assert_eq!(
            dates,
            vec![
                upcoming_near.election_date,
                upcoming_far.election_date,
                current.election_date,
                passed.election_date,
            ]
        );
    }

    #[test]
    fn spec_creates_unarchived_event() {
        let spec = EventSpec {
            state: "TX".parse().unwrap(),
            county: None,
            title: "Texas Primary".to_string(),
            event_type: EventType::Primary,
            election_date: "2027-03-02".parse().unwrap(),
            registration_deadline: None,
            description: None,
            visibility: Visibility::Public,
        };
        let new_event: NewElectionEvent = spec.into();
        assert!(!new_event.event.archived);
    }
}
