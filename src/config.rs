// src/config.rs

pub mod analytics;
pub mod parquet;
pub mod runner;

pub use analytics::{load_analytics_config, AnalyticsServiceConfig};
pub use parquet::ParquetInputConfig;
