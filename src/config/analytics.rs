use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AnalyticsError, Result};

/// Connection and tuning settings for the remote text analytics service,
/// read from YAML. Column names address the input rows; `options` is passed
/// through to the service as query parameters without interpretation.
#[derive(Deserialize, Clone)]
pub struct AnalyticsServiceConfig {
    /// Base URL of the service, e.g. "https://example.cognitive.invalid/text/analytics/v3.1".
    pub endpoint: String,
    /// Secret key sent with every request. Never logged.
    pub subscription_key: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_text_column")]
    pub text_column: String,
    #[serde(default)]
    pub language_column: Option<String>,
    #[serde(default = "default_output_column")]
    pub output_column: String,
    #[serde(default)]
    pub options: HashMap<String, String>,
}

fn default_concurrency() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_text_column() -> String {
    "text".to_string()
}

fn default_output_column() -> String {
    "analytics".to_string()
}

impl AnalyticsServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            return Err(AnalyticsError::ConfigValidationError(
                "AnalyticsServiceConfig: endpoint cannot be empty".to_string(),
            ));
        }
        let url = reqwest::Url::parse(&self.endpoint).map_err(|e| {
            AnalyticsError::ConfigValidationError(format!(
                "AnalyticsServiceConfig: endpoint '{}' is not a valid URL: {}",
                self.endpoint, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(AnalyticsError::ConfigValidationError(format!(
                "AnalyticsServiceConfig: endpoint scheme must be http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.subscription_key.is_empty() {
            return Err(AnalyticsError::ConfigValidationError(
                "AnalyticsServiceConfig: subscription_key cannot be empty".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(AnalyticsError::ConfigValidationError(
                "AnalyticsServiceConfig: concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(AnalyticsError::ConfigValidationError(
                "AnalyticsServiceConfig: timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.text_column.is_empty() {
            return Err(AnalyticsError::ConfigValidationError(
                "AnalyticsServiceConfig: text_column cannot be empty".to_string(),
            ));
        }
        if let Some(language_column) = &self.language_column {
            if language_column.is_empty() {
                return Err(AnalyticsError::ConfigValidationError(
                    "AnalyticsServiceConfig: language_column cannot be empty when set"
                        .to_string(),
                ));
            }
        }
        if self.output_column.is_empty() {
            return Err(AnalyticsError::ConfigValidationError(
                "AnalyticsServiceConfig: output_column cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Manual Debug so the subscription key cannot end up in logs or error
// messages through {:?} formatting.
impl fmt::Debug for AnalyticsServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyticsServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("subscription_key", &"[redacted]")
            .field("concurrency", &self.concurrency)
            .field("timeout_secs", &self.timeout_secs)
            .field("text_column", &self.text_column)
            .field("language_column", &self.language_column)
            .field("output_column", &self.output_column)
            .field("options", &self.options)
            .finish()
    }
}

/// Loads and parses the analytics service configuration YAML file.
pub fn load_analytics_config<P: AsRef<Path>>(config_path: P) -> Result<AnalyticsServiceConfig> {
    let path_ref = config_path.as_ref();
    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        AnalyticsError::ConfigError(format!(
            "Failed to read analytics config file '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    let config: AnalyticsServiceConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        AnalyticsError::ConfigError(format!(
            "Failed to parse analytics config YAML from '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    config.validate()?;

    Ok(config)
}
