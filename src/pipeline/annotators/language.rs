use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::TaskKind;
use crate::error::Result;
use crate::invoker::{malformed_payload, TaskPayload};

/// The language the service detected for one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedLanguage {
    /// Human readable name, e.g. "English".
    pub name: String,
    /// Two-letter ISO 639-1 code, e.g. "en".
    pub iso6391_name: String,
    pub confidence_score: f64,
}

// Wire shape: {"id": "...", "detectedLanguage": {...}, "statistics": ...}
#[derive(Deserialize)]
struct LanguagePayload {
    #[serde(rename = "detectedLanguage")]
    detected_language: DetectedLanguage,
}

impl TaskPayload for DetectedLanguage {
    const TASK: TaskKind = TaskKind::DetectLanguage;

    fn from_payload(payload: &Value) -> Result<Self> {
        let parsed: LanguagePayload = serde_json::from_value(payload.clone())
            .map_err(|e| malformed_payload(Self::TASK, e))?;
        Ok(parsed.detected_language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use serde_json::json;

    #[test]
    fn maps_detected_language() {
        let payload = json!({
            "id": "0",
            "detectedLanguage": {
                "name": "English",
                "iso6391Name": "en",
                "confidenceScore": 0.95
            },
            "statistics": {"characterCount": 11, "transactionCount": 1}
        });

        let detected = DetectedLanguage::from_payload(&payload).unwrap();
        assert_eq!(detected.name, "English");
        assert_eq!(detected.iso6391_name, "en");
        assert!((detected.confidence_score - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_language_field_is_batch_level() {
        let payload = json!({"id": "0"});
        let err = DetectedLanguage::from_payload(&payload).unwrap_err();
        match err {
            AnalyticsError::Remote { code, message, .. } => {
                assert_eq!(code, "InvalidResponse");
                assert!(message.contains("detect_language"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
