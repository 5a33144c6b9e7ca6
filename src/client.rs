use async_trait::async_trait;
use serde_json::Value;

use crate::data_model::{Document, DocumentStatistics, ErrorDescriptor};
use crate::error::Result;

/// Which analysis the remote service should run on a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    DetectLanguage,
    KeyPhrases,
    Sentiment,
}

impl TaskKind {
    /// For logging/error reporting.
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::DetectLanguage => "detect_language",
            TaskKind::KeyPhrases => "key_phrases",
            TaskKind::Sentiment => "sentiment",
        }
    }

    /// Path segment of the service endpoint serving this task.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            TaskKind::DetectLanguage => "languages",
            TaskKind::KeyPhrases => "keyPhrases",
            TaskKind::Sentiment => "sentiment",
        }
    }
}

/// What the service said about one document, already aligned to the
/// position the document had in the request. Exactly one of `payload` /
/// `error` is expected to be set, matching `is_error`; the invoker treats a
/// violation as a malformed response, not as a document failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocumentOutcome {
    pub id: String,
    pub is_error: bool,
    pub payload: Option<Value>,
    pub error: Option<ErrorDescriptor>,
    pub statistics: Option<DocumentStatistics>,
}

impl RemoteDocumentOutcome {
    pub fn success(id: impl Into<String>, payload: Value) -> Self {
        RemoteDocumentOutcome {
            id: id.into(),
            is_error: false,
            payload: Some(payload),
            error: None,
            statistics: None,
        }
    }

    pub fn failure(id: impl Into<String>, error: ErrorDescriptor) -> Self {
        RemoteDocumentOutcome {
            id: id.into(),
            is_error: true,
            payload: None,
            error: Some(error),
            statistics: None,
        }
    }

    pub fn with_statistics(mut self, statistics: DocumentStatistics) -> Self {
        self.statistics = Some(statistics);
        self
    }
}

/// Response to one batch call: per-document outcomes in request order plus
/// the model version shared by the whole batch.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBatchResponse {
    pub outcomes: Vec<RemoteDocumentOutcome>,
    pub model_version: Option<String>,
}

/// The remote analytics capability. Implementations own the wire format and
/// any transport policy (pooling, retry-after handling); callers see either
/// positional outcomes or one batch-level error.
///
/// Implementations must be safe for concurrent use, many units of work share
/// one client.
#[async_trait]
pub trait TextAnalyticsClient: Send + Sync {
    async fn invoke_batch(
        &self,
        documents: &[Document],
        task: TaskKind,
    ) -> Result<RemoteBatchResponse>;
}
