use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::BallotId,
    db::decision::{DecisionSet, DecisionSnapshot},
};

/// The ledger's answer to a read: the stored snapshot plus its timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionSetView {
    pub ballot_id: BallotId,
    #[serde(flatten)]
    pub decisions: DecisionSnapshot,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DecisionSet> for DecisionSetView {
    fn from(set: DecisionSet) -> Self {
        Self {
            ballot_id: set.ballot_id,
            decisions: set.decisions,
            started_at: set.started_at,
            updated_at: set.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::{common::Identity, mongodb::Id};

    #[test]
    fn view_drops_the_owner() {
        let set = DecisionSet {
            id: Id::new(),
            owner: Identity::User("u1".to_string()),
            ballot_id: "ca-alameda-2026".to_string(),
            decisions: DecisionSnapshot::example(),
            started_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let view = DecisionSetView::from(set.clone());
        assert_eq!(view.decisions, set.decisions);
        let json = rocket::serde::json::serde_json::to_value(&view).unwrap();
        assert!(json.get("owner").is_none());
    }
}
