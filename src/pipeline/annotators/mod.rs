// src/pipeline/annotators/mod.rs

mod key_phrases;
mod language;
mod sentiment;

// Re-export the payload types
pub use key_phrases::{DocumentWarning, KeyPhrases};
pub use language::DetectedLanguage;
pub use sentiment::{ConfidenceScores, SentimentLabel, SentimentScore};

use std::sync::Arc;

use futures::stream::{Stream, TryStreamExt};
use serde::Serialize;

use crate::client::TextAnalyticsClient;
use crate::config::AnalyticsServiceConfig;
use crate::data_model::{BatchResult, TextRecord};
use crate::error::{AnalyticsError, Result};
use crate::invoker::{BatchInvoker, TaskPayload};
use crate::processor::ConcurrentRowProcessor;

/// Binds one analytics task to the row processor: each record's text (and
/// language hint, when present) goes out as a singleton batch, and the
/// per-row annotation comes back JSON-encoded under `output_column`.
pub struct Annotator<T> {
    invoker: Arc<BatchInvoker<T>>,
    processor: Arc<ConcurrentRowProcessor>,
    output_column: String,
}

pub type LanguageAnnotator = Annotator<DetectedLanguage>;
pub type KeyPhraseAnnotator = Annotator<KeyPhrases>;
pub type SentimentAnnotator = Annotator<SentimentScore>;

impl<T> Annotator<T>
where
    T: TaskPayload + Serialize + 'static,
{
    pub fn new(
        client: Arc<dyn TextAnalyticsClient>,
        processor: Arc<ConcurrentRowProcessor>,
        output_column: impl Into<String>,
    ) -> Self {
        Annotator {
            invoker: Arc::new(BatchInvoker::new(client)),
            processor,
            output_column: output_column.into(),
        }
    }

    /// Builds the annotator with its own processor sized from the config.
    pub fn from_config(
        client: Arc<dyn TextAnalyticsClient>,
        config: &AnalyticsServiceConfig,
    ) -> Result<Self> {
        let processor = Arc::new(ConcurrentRowProcessor::new(
            config.concurrency,
            config.timeout(),
        )?);
        Ok(Annotator::new(
            client,
            processor,
            config.output_column.clone(),
        ))
    }

    pub fn output_column(&self) -> &str {
        &self.output_column
    }

    /// Lazy, ordered annotation of `records`. Any yielded error is fatal
    /// for this annotation run.
    pub fn annotate_stream(
        &self,
        records: impl IntoIterator<Item = TextRecord>,
    ) -> impl Stream<Item = Result<TextRecord>> {
        let output_column = self.output_column.clone();
        self.processor.run(
            records,
            Arc::clone(&self.invoker),
            |record: &TextRecord| {
                (
                    record.text.clone(),
                    record.language.clone().unwrap_or_default(),
                )
            },
            move |mut record: TextRecord, batch: BatchResult<T>| {
                let annotation = batch.into_annotations().into_iter().next().ok_or_else(|| {
                    AnalyticsError::Unexpected(
                        "Empty batch result for a singleton invocation".to_string(),
                    )
                })?;
                record
                    .annotations
                    .insert(output_column.clone(), serde_json::to_string(&annotation)?);
                Ok(record)
            },
        )
    }

    /// Annotates every record, failing fast on the first fatal unit. On
    /// failure no records are returned.
    pub async fn annotate(
        &self,
        records: impl IntoIterator<Item = TextRecord>,
    ) -> Result<Vec<TextRecord>> {
        self.annotate_stream(records).try_collect().await
    }
}
