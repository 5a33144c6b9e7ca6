use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::TaskKind;
use crate::error::Result;
use crate::invoker::{malformed_payload, TaskPayload};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
    Mixed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

/// Document-level sentiment verdict with its per-class confidence scores.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentimentScore {
    pub sentiment: SentimentLabel,
    pub confidence_scores: ConfidenceScores,
}

impl TaskPayload for SentimentScore {
    const TASK: TaskKind = TaskKind::Sentiment;

    fn from_payload(payload: &Value) -> Result<Self> {
        serde_json::from_value(payload.clone()).map_err(|e| malformed_payload(Self::TASK, e))
    }
}
