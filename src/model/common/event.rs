use chrono::{Duration, NaiveDate};
use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// Days after the election date during which an event still counts as "current".
/// A just-passed election stays prominently visible for updating decisions
/// before it drops into history.
pub const CURRENT_WINDOW_DAYS: i64 = 7;

/// The kind of election an event represents.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Primary,
    General,
    Midterm,
    Special,
    Runoff,
}

impl From<EventType> for Bson {
    fn from(event_type: EventType) -> Self {
        to_bson(&event_type).expect("Serialisation is infallible")
    }
}

/// Whether an event appears in public listings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl From<Visibility> for Bson {
    fn from(visibility: Visibility) -> Self {
        to_bson(&visibility).expect("Serialisation is infallible")
    }
}

/// An event's temporal status. Always derived from the election date and the
/// current date, never stored; a persisted copy could drift from wall-clock
/// truth.
///
/// The `Ord` impl is the listing priority: upcoming sorts before current,
/// current before passed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Upcoming,
    Current,
    Passed,
}

impl EventStatus {
    /// Derive the status of an event with the given election date as of `today`.
    pub fn derive(election_date: NaiveDate, today: NaiveDate) -> Self {
        if today < election_date {
            Self::Upcoming
        } else if today <= election_date + Duration::days(CURRENT_WINDOW_DAYS) {
            Self::Current
        } else {
            Self::Passed
        }
    }
}

/// A validated two-letter US state or territory code, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsState(String);

/// All supported state codes: the 50 states, DC, and the territories.
const STATE_CODES: [&str; 56] = [
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA", "KS",
    "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ", "NM", "NY",
    "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA", "WV",
    "WI", "WY", "DC", "AS", "GU", "MP", "PR", "VI",
];

impl UsState {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for UsState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.to_ascii_uppercase();
        if STATE_CODES.contains(&code.as_str()) {
            Ok(Self(code))
        } else {
            Err(format!("Unsupported state code '{}'", s))
        }
    }
}

impl TryFrom<String> for UsState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsState> for String {
    fn from(state: UsState) -> Self {
        state.0
    }
}

impl std::fmt::Display for UsState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<UsState> for Bson {
    fn from(state: UsState) -> Self {
        Bson::String(state.0)
    }
}

#[rocket::async_trait]
impl<'r> rocket::form::FromFormField<'r> for UsState {
    fn from_value(field: rocket::form::ValueField<'r>) -> rocket::form::Result<'r, Self> {
        field
            .value
            .parse::<UsState>()
            .map_err(|err| rocket::form::Error::validation(err).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn status_before_election_is_upcoming() {
        let status = EventStatus::derive(date("2026-11-03"), date("2026-10-01"));
        assert_eq!(status, EventStatus::Upcoming);
    }

    #[test]
    fn status_on_election_day_is_current() {
        let status = EventStatus::derive(date("2026-11-03"), date("2026-11-03"));
        assert_eq!(status, EventStatus::Current);
    }

    #[test]
    fn status_three_days_after_is_current() {
        let status = EventStatus::derive(date("2026-11-03"), date("2026-11-06"));
        assert_eq!(status, EventStatus::Current);
    }

    #[test]
    fn status_on_window_boundary_is_current() {
        let status = EventStatus::derive(date("2026-11-03"), date("2026-11-10"));
        assert_eq!(status, EventStatus::Current);
    }

    #[test]
    fn status_eight_days_after_is_passed() {
        let status = EventStatus::derive(date("2026-11-03"), date("2026-11-11"));
        assert_eq!(status, EventStatus::Passed);
    }

    #[test]
    fn status_listing_priority() {
        assert!(EventStatus::Upcoming < EventStatus::Current);
        assert!(EventStatus::Current < EventStatus::Passed);
    }

    #[test]
    fn state_codes_parse_case_insensitively() {
        assert_eq!("ca".parse::<UsState>().unwrap().as_str(), "CA");
        assert_eq!("Tx".parse::<UsState>().unwrap().as_str(), "TX");
        assert_eq!("DC".parse::<UsState>().unwrap().as_str(), "DC");
    }

    #[test]
    fn unsupported_state_codes_are_rejected() {
        assert!("ZZ".parse::<UsState>().is_err());
        assert!("CAL".parse::<UsState>().is_err());
        assert!("".parse::<UsState>().is_err());
    }
}
