// src/utils/prometheus_metrics.rs

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_gauge, register_histogram, Counter, Gauge, Histogram};

// Metrics from the batch invoker
pub static REMOTE_CALLS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_remote_calls_total",
        "Total number of batch calls issued against the remote analytics service."
    )
    .expect("Failed to register REMOTE_CALLS_TOTAL counter")
});

pub static REMOTE_CALL_FAILURES_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_remote_call_failures_total",
        "Total number of batch calls that failed as a whole (transport, auth, malformed response)."
    )
    .expect("Failed to register REMOTE_CALL_FAILURES_TOTAL counter")
});

pub static DOCUMENT_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_document_errors_total",
        "Total number of documents the service rejected individually."
    )
    .expect("Failed to register DOCUMENT_ERRORS_TOTAL counter")
});

// Metrics from the row processor
pub static UNITS_COMPLETED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_units_completed_total",
        "Total number of units of work that ran to completion."
    )
    .expect("Failed to register UNITS_COMPLETED_TOTAL counter")
});

pub static UNIT_TIMEOUTS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_unit_timeouts_total",
        "Total number of units of work aborted for exceeding their deadline."
    )
    .expect("Failed to register UNIT_TIMEOUTS_TOTAL counter")
});

pub static ACTIVE_UNITS: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "annotator_active_units",
        "Number of units of work currently holding a concurrency slot."
    )
    .expect("Failed to register ACTIVE_UNITS gauge")
});

pub static UNIT_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "annotator_unit_duration_seconds",
        "Histogram of unit durations (from slot acquisition to attached result)."
    )
    .expect("Failed to register UNIT_DURATION_SECONDS histogram")
});

// Metrics from the annotate runner
pub static ROWS_ANNOTATED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_rows_annotated_total",
        "Total number of rows annotated and written out."
    )
    .expect("Failed to register ROWS_ANNOTATED_TOTAL counter")
});

pub static ROW_READ_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "annotator_row_read_errors_total",
        "Total number of input rows skipped because they could not be read."
    )
    .expect("Failed to register ROW_READ_ERRORS_TOTAL counter")
});
