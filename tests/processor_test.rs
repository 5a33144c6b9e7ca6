use async_trait::async_trait;
use futures::{pin_mut, StreamExt};
use rand::Rng;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use TextAnnotator::client::{
    RemoteBatchResponse, RemoteDocumentOutcome, TaskKind, TextAnalyticsClient,
};
use TextAnnotator::data_model::{BatchResult, Document, ErrorDescriptor};
use TextAnnotator::error::{AnalyticsError, Result};
use TextAnnotator::invoker::BatchInvoker;
use TextAnnotator::pipeline::annotators::DetectedLanguage;
use TextAnnotator::processor::ConcurrentRowProcessor;

// A row for processor tests: the input position plus the text to analyze.
#[derive(Debug, Clone)]
struct Row {
    index: usize,
    text: String,
}

fn make_rows(n: usize) -> Vec<Row> {
    (0..n)
        .map(|i| Row {
            index: i,
            text: format!("row {}", i),
        })
        .collect()
}

fn language_payload() -> serde_json::Value {
    json!({
        "detectedLanguage": {
            "name": "English",
            "iso6391Name": "en",
            "confidenceScore": 0.99
        }
    })
}

// Mock client that sleeps per call, optionally per text, and tracks how many
// calls were in flight at once. Texts matching `poison` fail the whole call;
// `reject_documents` turns every outcome into a document-level error instead.
struct SlowClient {
    default_delay_ms: u64,
    delays_ms: HashMap<String, u64>,
    poison: Option<String>,
    reject_documents: bool,
    active: AtomicUsize,
    high_water: AtomicUsize,
}

impl SlowClient {
    fn new(default_delay_ms: u64) -> Arc<Self> {
        Arc::new(SlowClient {
            default_delay_ms,
            delays_ms: HashMap::new(),
            poison: None,
            reject_documents: false,
            active: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        })
    }

    fn with_delays(delays_ms: HashMap<String, u64>) -> Arc<Self> {
        Arc::new(SlowClient {
            default_delay_ms: 5,
            delays_ms,
            poison: None,
            reject_documents: false,
            active: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        })
    }

    fn with_poison(default_delay_ms: u64, poison: &str) -> Arc<Self> {
        Arc::new(SlowClient {
            default_delay_ms,
            delays_ms: HashMap::new(),
            poison: Some(poison.to_string()),
            reject_documents: false,
            active: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        })
    }

    fn rejecting_documents() -> Arc<Self> {
        Arc::new(SlowClient {
            default_delay_ms: 1,
            delays_ms: HashMap::new(),
            poison: None,
            reject_documents: true,
            active: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
        })
    }

    fn high_water_mark(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextAnalyticsClient for SlowClient {
    async fn invoke_batch(
        &self,
        documents: &[Document],
        _task: TaskKind,
    ) -> Result<RemoteBatchResponse> {
        if let Some(poison) = &self.poison {
            if documents.iter().any(|d| &d.text == poison) {
                return Err(AnalyticsError::Unexpected("connection reset".to_string()));
            }
        }

        let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(current, Ordering::SeqCst);

        let delay = documents
            .first()
            .and_then(|d| self.delays_ms.get(&d.text).copied())
            .unwrap_or(self.default_delay_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;

        self.active.fetch_sub(1, Ordering::SeqCst);

        let outcomes = documents
            .iter()
            .map(|d| {
                if self.reject_documents {
                    RemoteDocumentOutcome::failure(
                        d.id.clone(),
                        ErrorDescriptor {
                            code: "InvalidDocument".to_string(),
                            message: "Document text is empty.".to_string(),
                            target: None,
                        },
                    )
                } else {
                    RemoteDocumentOutcome::success(d.id.clone(), language_payload())
                }
            })
            .collect();
        Ok(RemoteBatchResponse {
            outcomes,
            model_version: Some("2023-01-01".to_string()),
        })
    }
}

fn extract_text(row: &Row) -> (String, String) {
    (row.text.clone(), String::new())
}

fn keep_row(row: Row, _batch: BatchResult<DetectedLanguage>) -> Result<Row> {
    Ok(row)
}

// Iterator wrapper counting how many rows the processor has pulled.
struct CountingRows {
    inner: std::vec::IntoIter<Row>,
    produced: Arc<AtomicUsize>,
}

impl Iterator for CountingRows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        let item = self.inner.next();
        if item.is_some() {
            self.produced.fetch_add(1, Ordering::SeqCst);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rows_come_back_in_input_order() {
        let n = 12;
        let mut rng = rand::thread_rng();
        let delays: HashMap<String, u64> = (0..n)
            .map(|i| (format!("row {}", i), rng.gen_range(5..60)))
            .collect();
        let client = SlowClient::with_delays(delays);
        let invoker = Arc::new(BatchInvoker::<DetectedLanguage>::new(client));
        let processor = ConcurrentRowProcessor::new(4, Duration::from_secs(5)).unwrap();

        let out = processor
            .run_to_vec(make_rows(n), invoker, extract_text, keep_row)
            .await
            .unwrap();

        let order: Vec<usize> = out.iter().map(|r| r.index).collect();
        assert_eq!(order, (0..n).collect::<Vec<usize>>());
    }

    #[tokio::test]
    async fn reversed_latency_still_preserves_order() {
        // Later rows answer first, output order must not change.
        let n = 6;
        let delays: HashMap<String, u64> = (0..n)
            .map(|i| (format!("row {}", i), ((n - i) as u64) * 15))
            .collect();
        let client = SlowClient::with_delays(delays);
        let invoker = Arc::new(BatchInvoker::<DetectedLanguage>::new(client));
        let processor = ConcurrentRowProcessor::new(n, Duration::from_secs(5)).unwrap();

        let out = processor
            .run_to_vec(make_rows(n), invoker, extract_text, keep_row)
            .await
            .unwrap();

        let order: Vec<usize> = out.iter().map(|r| r.index).collect();
        assert_eq!(order, (0..n).collect::<Vec<usize>>());
    }

    #[tokio::test]
    async fn concurrency_budget_is_respected_and_saturated() {
        for limit in [1usize, 2, 8] {
            let client = SlowClient::new(30);
            let invoker = Arc::new(BatchInvoker::<DetectedLanguage>::new(client.clone()));
            let processor = ConcurrentRowProcessor::new(limit, Duration::from_secs(5)).unwrap();

            processor
                .run_to_vec(make_rows(limit * 3), invoker, extract_text, keep_row)
                .await
                .unwrap();

            assert_eq!(
                client.high_water_mark(),
                limit,
                "high water mark for limit {}",
                limit
            );
        }
    }

    #[tokio::test]
    async fn unit_timeout_is_fatal() {
        let client = SlowClient::new(500);
        let invoker = Arc::new(BatchInvoker::<DetectedLanguage>::new(client));
        let processor = ConcurrentRowProcessor::new(2, Duration::from_millis(50)).unwrap();

        let err = processor
            .run_to_vec(make_rows(3), invoker, extract_text, keep_row)
            .await
            .unwrap_err();

        match err {
            AnalyticsError::Timeout { limit } => assert_eq!(limit, Duration::from_millis(50)),
            other => panic!("Expected a timeout, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn document_error_does_not_abort_the_run() {
        let client = SlowClient::rejecting_documents();
        let invoker = Arc::new(BatchInvoker::<DetectedLanguage>::new(client));
        let processor = ConcurrentRowProcessor::new(2, Duration::from_secs(5)).unwrap();

        let document_errors = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&document_errors);
        let out = processor
            .run_to_vec(
                make_rows(5),
                invoker,
                extract_text,
                move |row: Row, batch: BatchResult<DetectedLanguage>| {
                    if batch.errors.iter().any(|e| e.is_some()) {
                        seen.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(row)
                },
            )
            .await
            .unwrap();

        assert_eq!(out.len(), 5);
        assert_eq!(document_errors.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn transport_error_fails_the_whole_run() {
        let client = SlowClient::with_poison(5, "row 3");
        let invoker = Arc::new(BatchInvoker::<DetectedLanguage>::new(client));
        let processor = ConcurrentRowProcessor::new(2, Duration::from_secs(5)).unwrap();

        let result = processor
            .run_to_vec(make_rows(6), invoker, extract_text, keep_row)
            .await;

        match result {
            Err(AnalyticsError::Remote { code, .. }) => assert_eq!(code, "TransportError"),
            other => panic!("Expected a remote error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn rows_are_pulled_lazily() {
        let concurrency = 4;
        let produced = Arc::new(AtomicUsize::new(0));
        let rows = CountingRows {
            inner: make_rows(100).into_iter(),
            produced: Arc::clone(&produced),
        };
        let client = SlowClient::new(10);
        let invoker = Arc::new(BatchInvoker::<DetectedLanguage>::new(client));
        let processor = ConcurrentRowProcessor::new(concurrency, Duration::from_secs(5)).unwrap();

        let stream = processor.run(rows, invoker, extract_text, keep_row);
        pin_mut!(stream);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.index, 0);

        let pulled = produced.load(Ordering::SeqCst);
        assert!(
            pulled >= concurrency && pulled <= concurrency + 2,
            "pulled {} rows for a budget of {}",
            pulled,
            concurrency
        );
    }

    #[tokio::test]
    async fn runs_on_one_processor_share_the_budget() {
        let client = SlowClient::new(25);
        let invoker = Arc::new(BatchInvoker::<DetectedLanguage>::new(client.clone()));
        let processor = ConcurrentRowProcessor::new(4, Duration::from_secs(5)).unwrap();

        let (a, b) = tokio::join!(
            processor.run_to_vec(make_rows(8), Arc::clone(&invoker), extract_text, keep_row),
            processor.run_to_vec(make_rows(8), invoker, extract_text, keep_row),
        );
        a.unwrap();
        b.unwrap();

        assert!(
            client.high_water_mark() <= 4,
            "two concurrent runs exceeded the shared budget: {}",
            client.high_water_mark()
        );
    }

    #[test]
    fn rejects_invalid_limits() {
        assert!(matches!(
            ConcurrentRowProcessor::new(0, Duration::from_secs(1)),
            Err(AnalyticsError::ConfigValidationError(_))
        ));
        assert!(matches!(
            ConcurrentRowProcessor::new(4, Duration::ZERO),
            Err(AnalyticsError::ConfigValidationError(_))
        ));
    }
}
