use serde::{Deserialize, Serialize};

use crate::model::common::{BallotId, CandidateId, MeasureId, OfficeId, UsState};

/// A ballot document from the content provider, passed through opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotDocument {
    pub id: BallotId,
    #[serde(default)]
    pub measures: Vec<BallotMeasure>,
    #[serde(default)]
    pub candidates: Vec<BallotRace>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotMeasure {
    pub id: MeasureId,
    pub title: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotRace {
    pub office_id: OfficeId,
    pub office: String,
    #[serde(default)]
    pub candidates: Vec<BallotCandidate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotCandidate {
    pub id: CandidateId,
    pub name: String,
    #[serde(default)]
    pub party: Option<String>,
}

/// Input to the text-simplification service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifyRequest {
    pub text: String,
    pub title: String,
}

/// Simplified summary of a measure's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub one_sentence: String,
    pub simple: String,
    pub detailed: String,
    #[serde(default)]
    pub fiscal_impact: Option<String>,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// Input to the bias-check service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasCheckRequest {
    pub content: String,
    pub kind: String,
}

/// Bias report for a piece of ballot content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasReport {
    /// 0 (hopelessly slanted) to 100 (neutral).
    pub score: u8,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    pub is_balanced: bool,
}

/// A ZIP code resolved to a state and county.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZipLocation {
    pub state: UsState,
    #[serde(default)]
    pub county: Option<String>,
}
