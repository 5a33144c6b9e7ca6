use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::assembler;
use crate::client::{TaskKind, TextAnalyticsClient};
use crate::data_model::{BatchResult, Document, DocumentOutcome};
use crate::error::{AnalyticsError, Result};
use crate::utils::prometheus_metrics::{
    DOCUMENT_ERRORS_TOTAL, REMOTE_CALLS_TOTAL, REMOTE_CALL_FAILURES_TOTAL,
};

/// Typed view of one successful per-document payload. One implementation per
/// task kind; the mapper must be total over well-formed payloads, a payload
/// it cannot read means the response is broken (batch-level failure).
pub trait TaskPayload: Sized + Send {
    /// Task selector submitted with every batch this payload type maps.
    const TASK: TaskKind;

    fn from_payload(payload: &Value) -> Result<Self>;
}

/// Batch-level error for a payload a mapper could not read.
pub fn malformed_payload(task: TaskKind, err: impl std::fmt::Display) -> AnalyticsError {
    AnalyticsError::Remote {
        code: "InvalidResponse".to_string(),
        message: format!("Malformed {} payload: {}", task.name(), err),
        target: None,
    }
}

/// Issues one remote call per batch of (text, language hint) pairs and
/// assembles the per-document outcomes into a positionally aligned
/// [`BatchResult`]. Stateless apart from the shared client handle, so one
/// invoker serves any number of concurrent units.
pub struct BatchInvoker<T> {
    client: Arc<dyn TextAnalyticsClient>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: TaskPayload> BatchInvoker<T> {
    pub fn new(client: Arc<dyn TextAnalyticsClient>) -> Self {
        BatchInvoker {
            client,
            _payload: PhantomData,
        }
    }

    /// Analyzes `texts` in one remote call. `language_hints` pairs with
    /// `texts` positionally; empty hints are omitted from the request.
    ///
    /// Document ids are the positional index rendered as a string, so they
    /// are unique within the call without any global id state.
    pub async fn invoke(
        &self,
        texts: &[String],
        language_hints: &[String],
    ) -> Result<BatchResult<T>> {
        if texts.len() != language_hints.len() {
            return Err(AnalyticsError::InvalidInput(format!(
                "texts and language hints differ in length: {} vs {}",
                texts.len(),
                language_hints.len()
            )));
        }
        if texts.is_empty() {
            return Ok(BatchResult::default());
        }

        let documents: Vec<Document> = texts
            .iter()
            .zip(language_hints)
            .enumerate()
            .map(|(index, (text, hint))| Document {
                id: index.to_string(),
                text: text.clone(),
                language: (!hint.is_empty()).then(|| hint.clone()),
            })
            .collect();

        debug!(
            task = T::TASK.name(),
            documents = documents.len(),
            "Invoking remote analytics batch"
        );
        REMOTE_CALLS_TOTAL.inc();

        // Exactly one client call per batch. Whatever the client raised is
        // surfaced as the one batch-level error shape; partial results do
        // not exist for a failed batch.
        let response = match self.client.invoke_batch(&documents, T::TASK).await {
            Ok(response) => response,
            Err(err) => {
                REMOTE_CALL_FAILURES_TOTAL.inc();
                return Err(err.into_remote());
            }
        };

        if response.outcomes.len() != documents.len() {
            REMOTE_CALL_FAILURES_TOTAL.inc();
            return Err(AnalyticsError::Remote {
                code: "InvalidResponse".to_string(),
                message: format!(
                    "Sent {} documents, service answered for {}",
                    documents.len(),
                    response.outcomes.len()
                ),
                target: None,
            });
        }

        let mut batch = BatchResult::with_capacity(documents.len());
        for outcome in &response.outcomes {
            // An outcome or payload the mapper cannot read fails the whole
            // batch and counts as a failed call.
            let assembled = assembler::assemble(outcome, T::from_payload).map_err(|err| {
                REMOTE_CALL_FAILURES_TOTAL.inc();
                err
            })?;
            if matches!(assembled, DocumentOutcome::Failure { .. }) {
                DOCUMENT_ERRORS_TOTAL.inc();
            }
            batch.push(assembled);
        }
        batch.model_version = response.model_version;

        debug!(
            task = T::TASK.name(),
            successes = batch.results.iter().filter(|r| r.is_some()).count(),
            errors = batch.errors.iter().filter(|e| e.is_some()).count(),
            model_version = batch.model_version.as_deref().unwrap_or("unknown"),
            "Assembled remote batch response"
        );
        Ok(batch)
    }
}
