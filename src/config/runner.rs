// --- Command-Line Arguments Struct ---
// Lives here rather than in src/bin/annotate.rs so library tests can
// construct and parse it.
use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::client::TaskKind;
use crate::config::analytics::{load_analytics_config, AnalyticsServiceConfig};
use crate::error::{AnalyticsError, Result};

/// Which analysis task the runner submits for every row.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskArg {
    Language,
    KeyPhrases,
    Sentiment,
}

impl TaskArg {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskArg::Language => TaskKind::DetectLanguage,
            TaskArg::KeyPhrases => TaskKind::KeyPhrases,
            TaskArg::Sentiment => TaskKind::Sentiment,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input Parquet file
    #[arg(short, long)]
    pub input_file: String,

    /// Path to the output Parquet file
    #[arg(short = 'o', long, default_value = "output_annotated.parquet")]
    pub output_file: String,

    /// Analytics task to run for every row
    #[arg(short, long, value_enum, default_value_t = TaskArg::Language)]
    pub task: TaskArg,

    /// Text column name in the Parquet file
    #[arg(long, default_value = "text")]
    pub text_column: String,

    /// Optional language hint column name in the Parquet file
    #[arg(long)]
    pub language_column: Option<String>,

    /// Optional ID column name in the Parquet file
    #[arg(long)]
    pub id_column: Option<String>,

    /// Column name the serialized annotation is written to
    #[arg(long, default_value = "analytics")]
    pub output_column: String,

    /// Base URL of the text analytics service
    #[arg(short, long, required_unless_present = "service_config")]
    pub endpoint: Option<String>,

    /// Subscription key for the service; omit to read it from the
    /// TEXT_ANALYTICS_KEY environment variable
    #[arg(long)]
    pub subscription_key: Option<String>,

    /// Path to a YAML file with the analytics service settings. When given,
    /// the service and column flags are ignored in favor of the file.
    #[arg(long)]
    pub service_config: Option<PathBuf>,

    /// Maximum number of rows annotated concurrently
    #[arg(short, long, default_value_t = 4)]
    pub concurrency: usize,

    /// Per-row deadline in seconds for the remote call
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Ask the service to include per-document statistics in its responses
    #[arg(long, default_value_t = false)]
    pub show_stats: bool,

    /// Optional: Port for the Prometheus metrics HTTP endpoint
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

impl Args {
    /// The subscription key from the flag, falling back to the
    /// TEXT_ANALYTICS_KEY environment variable.
    pub fn resolve_subscription_key(&self) -> Result<String> {
        if let Some(key) = &self.subscription_key {
            return Ok(key.clone());
        }
        std::env::var("TEXT_ANALYTICS_KEY").map_err(|_| {
            AnalyticsError::ConfigError(
                "No subscription key: pass --subscription-key or set TEXT_ANALYTICS_KEY"
                    .to_string(),
            )
        })
    }

    /// Resolves the service configuration, either from the YAML file named
    /// by `--service-config` or from the individual flags.
    pub fn analytics_config(&self) -> Result<AnalyticsServiceConfig> {
        if let Some(path) = &self.service_config {
            return load_analytics_config(path);
        }
        let endpoint = self.endpoint.clone().ok_or_else(|| {
            AnalyticsError::ConfigError(
                "No endpoint: pass --endpoint or --service-config".to_string(),
            )
        })?;
        let mut options = HashMap::new();
        if self.show_stats {
            options.insert("showStats".to_string(), "true".to_string());
        }
        let config = AnalyticsServiceConfig {
            endpoint,
            subscription_key: self.resolve_subscription_key()?,
            concurrency: self.concurrency,
            timeout_secs: self.timeout_secs,
            text_column: self.text_column.clone(),
            language_column: self.language_column.clone(),
            output_column: self.output_column.clone(),
            options,
        };
        config.validate()?;
        Ok(config)
    }
}
