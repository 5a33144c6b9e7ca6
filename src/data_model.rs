use std::collections::HashMap;

use itertools::izip;
use serde::{Deserialize, Serialize};

/// One unit of text submitted to the remote analytics service. Ids are
/// assigned by the invoker and only need to be unique within a single batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Error reported by the service for a single document. `target` names the
/// field or document the service blamed, when it says.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorDescriptor {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Usage statistics the service optionally returns per document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStatistics {
    pub character_count: u64,
    pub transaction_count: u64,
}

/// Outcome of analyzing one document. Exactly one arm holds; statistics only
/// accompany a success and only when the service returned them.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome<T> {
    Success {
        payload: T,
        statistics: Option<DocumentStatistics>,
    },
    Failure {
        error: ErrorDescriptor,
    },
}

/// Per-batch result: three sequences positionally aligned with the input
/// batch. For every index exactly one of `results[i]` / `errors[i]` is
/// populated; `statistics[i]` is independently optional. Appending through
/// [`BatchResult::push`] keeps the alignment by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<T> {
    pub results: Vec<Option<T>>,
    pub errors: Vec<Option<ErrorDescriptor>>,
    pub statistics: Vec<Option<DocumentStatistics>>,
    pub model_version: Option<String>,
}

impl<T> BatchResult<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        BatchResult {
            results: Vec::with_capacity(capacity),
            errors: Vec::with_capacity(capacity),
            statistics: Vec::with_capacity(capacity),
            model_version: None,
        }
    }

    /// Appends one document outcome, keeping the three sequences aligned.
    pub fn push(&mut self, outcome: DocumentOutcome<T>) {
        match outcome {
            DocumentOutcome::Success {
                payload,
                statistics,
            } => {
                self.results.push(Some(payload));
                self.errors.push(None);
                self.statistics.push(statistics);
            }
            DocumentOutcome::Failure { error } => {
                self.results.push(None);
                self.errors.push(Some(error));
                self.statistics.push(None);
            }
        }
    }

    /// Number of documents covered by this result.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Flattens the aligned sequences into one per-document view, repeating
    /// the batch-level model version into each entry.
    pub fn into_annotations(self) -> Vec<Annotation<T>> {
        let model_version = self.model_version;
        izip!(self.results, self.errors, self.statistics)
            .map(|(result, error, statistics)| Annotation {
                result,
                error,
                statistics,
                model_version: model_version.clone(),
            })
            .collect()
    }
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        BatchResult::with_capacity(0)
    }
}

/// Per-row view of a singleton batch result. This is the structure written
/// into a record's output column, serialized as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Annotation<T> {
    pub result: Option<T>,
    pub error: Option<ErrorDescriptor>,
    pub statistics: Option<DocumentStatistics>,
    pub model_version: Option<String>,
}

/// One tabular row as the Parquet runner sees it. The core processor is
/// generic over the row type; this is the concrete record the bundled
/// readers, writers and annotators operate on. `annotations` maps an output
/// column name to the JSON-encoded [`Annotation`] for that column.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TextRecord {
    pub id: String,
    pub source: String,
    pub text: String,
    pub language: Option<String>,
    pub annotations: HashMap<String, String>,
}
