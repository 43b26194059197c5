//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Datetimes are serialised as RFC 3339 strings, dates as `YYYY-MM-DD`.

pub mod card;
pub mod decision;
pub mod event;
pub mod upstream;
