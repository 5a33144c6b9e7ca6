use serde_json::Value;

use crate::client::RemoteDocumentOutcome;
use crate::data_model::DocumentOutcome;
use crate::error::{AnalyticsError, Result};

/// Converts one remote outcome into the typed per-document outcome. Pure,
/// no side effects. An outcome marked erroneous yields `Failure` with the
/// service's descriptor; a successful one runs `map_payload` over the raw
/// payload and keeps the statistics when present.
///
/// An outcome violating its own shape (error flag without a descriptor,
/// success without a payload) means the response is broken, which is a
/// batch-level failure rather than a document error.
pub fn assemble<T, F>(outcome: &RemoteDocumentOutcome, map_payload: F) -> Result<DocumentOutcome<T>>
where
    F: FnOnce(&Value) -> Result<T>,
{
    if outcome.is_error {
        let error = outcome.error.clone().ok_or_else(|| {
            malformed_outcome(&outcome.id, "error flag set without an error descriptor")
        })?;
        return Ok(DocumentOutcome::Failure { error });
    }

    let payload = outcome
        .payload
        .as_ref()
        .ok_or_else(|| malformed_outcome(&outcome.id, "successful outcome without a payload"))?;
    let payload = map_payload(payload)?;
    Ok(DocumentOutcome::Success {
        payload,
        statistics: outcome.statistics,
    })
}

fn malformed_outcome(id: &str, detail: &str) -> AnalyticsError {
    AnalyticsError::Remote {
        code: "InvalidResponse".to_string(),
        message: format!("Malformed outcome for document '{}': {}", id, detail),
        target: Some(id.to_string()),
    }
}
