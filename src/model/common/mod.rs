mod event;
mod identity;

pub use event::{EventStatus, EventType, UsState, Visibility, CURRENT_WINDOW_DAYS};
pub use identity::{Identity, MaybeIdentity, VISITOR_ID_HEADER};

/// Ballot measure IDs are opaque strings from the ballot content provider.
pub type MeasureId = String;
/// Office/race IDs are opaque strings from the ballot content provider.
pub type OfficeId = String;
/// Candidate IDs are opaque strings from the ballot content provider.
pub type CandidateId = String;
/// Ballot IDs identify one state/county ballot document.
pub type BallotId = String;
