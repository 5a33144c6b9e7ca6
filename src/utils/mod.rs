// Utils

pub mod common;
pub mod prometheus_metrics;

pub use common::setup_prometheus_metrics;
