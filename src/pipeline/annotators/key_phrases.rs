use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::TaskKind;
use crate::error::Result;
use crate::invoker::{malformed_payload, TaskPayload};

/// Key phrases the service extracted from one document, plus any warnings it
/// attached. Warnings belong to this payload, not to the batch-level result,
/// so a warned document still counts as a success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyPhrases {
    pub key_phrases: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<DocumentWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentWarning {
    pub code: String,
    pub message: String,
}

impl TaskPayload for KeyPhrases {
    const TASK: TaskKind = TaskKind::KeyPhrases;

    fn from_payload(payload: &Value) -> Result<Self> {
        serde_json::from_value(payload.clone()).map_err(|e| malformed_payload(Self::TASK, e))
    }
}
