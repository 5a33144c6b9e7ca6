use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{RemoteBatchResponse, RemoteDocumentOutcome, TaskKind, TextAnalyticsClient};
use crate::config::AnalyticsServiceConfig;
use crate::data_model::{Document, ErrorDescriptor};
use crate::error::{AnalyticsError, Result};

/// Collection-level response shape of the service: successful documents and
/// rejected documents arrive in two separate arrays keyed by document id.
#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(default)]
    errors: Vec<WireDocumentError>,
    #[serde(rename = "modelVersion")]
    model_version: Option<String>,
}

#[derive(Deserialize)]
struct WireDocumentError {
    id: String,
    error: ErrorDescriptor,
}

#[derive(Deserialize)]
struct WireErrorEnvelope {
    error: ErrorDescriptor,
}

/// reqwest-backed implementation of the analytics capability. POSTs the
/// document batch to `{endpoint}/{task path}` with the subscription key
/// header, then folds the keyed wire response back into request order.
///
/// Retry-after handling is deliberately absent here; a failed call is
/// reported as-is and the caller decides what a batch failure means.
#[derive(Clone)]
pub struct HttpTextAnalyticsClient {
    http: reqwest::Client,
    endpoint: String,
    subscription_key: String,
    options: HashMap<String, String>,
}

impl HttpTextAnalyticsClient {
    pub fn new(config: &AnalyticsServiceConfig) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder().build().map_err(|e| {
            AnalyticsError::ConfigError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(HttpTextAnalyticsClient {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            subscription_key: config.subscription_key.clone(),
            options: config.options.clone(),
        })
    }

    fn task_url(&self, task: TaskKind) -> String {
        format!("{}/{}", self.endpoint, task.endpoint_path())
    }
}

#[async_trait]
impl TextAnalyticsClient for HttpTextAnalyticsClient {
    async fn invoke_batch(
        &self,
        documents: &[Document],
        task: TaskKind,
    ) -> Result<RemoteBatchResponse> {
        let url = self.task_url(task);
        debug!(
            task = task.name(),
            documents = documents.len(),
            "Sending analytics request"
        );

        let response = self
            .http
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .query(&self.options)
            .json(&json!({ "documents": documents }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_from_status(status, &body));
        }

        let body = response.text().await?;
        let wire: WireResponse = serde_json::from_str(&body)
            .map_err(|e| invalid_response(&format!("Failed to decode response body: {}", e)))?;

        align_outcomes(documents, wire)
    }
}

/// Reorders the keyed wire response into one outcome per request document,
/// in request order. Every sent document must be accounted for on exactly
/// one side of the response.
fn align_outcomes(documents: &[Document], wire: WireResponse) -> Result<RemoteBatchResponse> {
    let mut successes: HashMap<String, Value> = HashMap::with_capacity(wire.documents.len());
    for doc in wire.documents {
        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| invalid_response("a returned document is missing its id"))?;
        successes.insert(id, doc);
    }
    let mut failures: HashMap<String, ErrorDescriptor> = wire
        .errors
        .into_iter()
        .map(|entry| (entry.id, entry.error))
        .collect();

    let mut outcomes = Vec::with_capacity(documents.len());
    for document in documents {
        if let Some(payload) = successes.remove(&document.id) {
            let statistics = match payload.get("statistics") {
                Some(raw) => serde_json::from_value(raw.clone()).map(Some).map_err(|e| {
                    invalid_response(&format!(
                        "Bad statistics for document '{}': {}",
                        document.id, e
                    ))
                })?,
                None => None,
            };
            let mut outcome = RemoteDocumentOutcome::success(document.id.clone(), payload);
            outcome.statistics = statistics;
            outcomes.push(outcome);
        } else if let Some(error) = failures.remove(&document.id) {
            outcomes.push(RemoteDocumentOutcome::failure(document.id.clone(), error));
        } else {
            return Err(invalid_response(&format!(
                "Service answered nothing for document '{}'",
                document.id
            )));
        }
    }

    Ok(RemoteBatchResponse {
        outcomes,
        model_version: wire.model_version,
    })
}

fn error_from_status(status: StatusCode, body: &str) -> AnalyticsError {
    // The service wraps request-level failures as {"error": {...}}. Fall
    // back to the bare status when the body is not that shape.
    if let Ok(envelope) = serde_json::from_str::<WireErrorEnvelope>(body) {
        return AnalyticsError::Remote {
            code: envelope.error.code,
            message: envelope.error.message,
            target: envelope.error.target,
        };
    }
    AnalyticsError::Remote {
        code: format!("HTTP{}", status.as_u16()),
        message: status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        target: None,
    }
}

fn invalid_response(detail: &str) -> AnalyticsError {
    AnalyticsError::Remote {
        code: "InvalidResponse".to_string(),
        message: detail.to_string(),
        target: None,
    }
}
