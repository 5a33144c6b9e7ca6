// src/bin/annotate.rs

//! # Annotate Binary
//!
//! This binary runs one text analytics task over every row of a Parquet
//! dataset. Its main roles are:
//!
//! 1.  **Reading Data**: It reads text rows from a specified input Parquet
//!     file. The input file is expected to have a column for the text data
//!     and optionally language hint and ID columns.
//!
//! 2.  **Annotating Rows**: Each row's text is submitted to the remote text
//!     analytics service (language detection, key phrase extraction, or
//!     sentiment analysis) under a bounded concurrency budget and a per-row
//!     deadline. Document-level failures reported by the service are kept
//!     as data; transport failures and deadline overruns abort the run.
//!
//! 3.  **Writing Output**: Annotated rows are written to an output Parquet
//!     file in their input order, with the serialized annotation attached
//!     under the configured output column.
//!
//! The binary utilizes `clap` for command-line argument parsing, `reqwest`
//! (via `TextAnnotator::http_client`) for the remote service calls,
//! `parquet` (via `TextAnnotator::pipeline` modules) for reading and writing
//! Parquet files, `indicatif` for progress bars, and `tracing` for logging.
//! It also supports exposing Prometheus metrics for monitoring.

use clap::Parser;
use futures::{pin_mut, StreamExt};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};
use TextAnnotator::client::TextAnalyticsClient;
use TextAnnotator::config::runner::{Args, TaskArg};
use TextAnnotator::config::{AnalyticsServiceConfig, ParquetInputConfig};
use TextAnnotator::data_model::TextRecord;
use TextAnnotator::error::Result;
use TextAnnotator::http_client::HttpTextAnalyticsClient;
use TextAnnotator::invoker::TaskPayload;
use TextAnnotator::pipeline::annotators::{
    Annotator, KeyPhraseAnnotator, LanguageAnnotator, SentimentAnnotator,
};
use TextAnnotator::pipeline::readers::ParquetReader;
use TextAnnotator::pipeline::writers::{BaseWriter, ParquetWriter};
use TextAnnotator::utils::common::setup_prometheus_metrics;
use TextAnnotator::utils::prometheus_metrics::*; // Import shared metrics

const PARQUET_WRITE_BATCH_SIZE: usize = 500; // Configurable batch size for writing

/// Creates and configures a new `ProgressBar` or `ProgressBar::new_spinner()`
/// for displaying progress during long-running operations.
///
/// # Arguments
///
/// * `total_items` - The total number of items to process. If 0, a spinner is
///   used, suitable for when the total count is unknown.
/// * `message` - A message to display alongside the progress bar.
/// * `template` - A string defining the style and content of the progress bar.
///   See the `indicatif` crate documentation for template syntax.
///
/// # Returns
///
/// A configured `ProgressBar` instance.
fn create_progress_bar(total_items: u64, message: &str, template: &str) -> ProgressBar {
    let pb = if total_items == 0 {
        // Spinner if total is unknown (or 0)
        ProgressBar::new_spinner()
    } else {
        ProgressBar::new(total_items)
    };
    pb.set_message(message.to_string());
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar()) // Fallback style
            .progress_chars("=> "),
    );
    pb
}

/// Reads all rows from the input Parquet file.
///
/// Rows that cannot be read (for example a null text cell) are logged,
/// counted, and skipped rather than aborting the run. Progress is reported
/// on `reading_pb`.
///
/// # Returns
///
/// A `Result` containing the readable rows together with the number of rows
/// that were skipped.
fn read_input(
    args: &Args,
    config: &AnalyticsServiceConfig,
    reading_pb: &ProgressBar,
) -> Result<(Vec<TextRecord>, u64)> {
    let parquet_config = ParquetInputConfig {
        path: args.input_file.clone(),
        text_column: config.text_column.clone(),
        id_column: args.id_column.clone(),
        language_column: config.language_column.clone(),
        batch_size: Some(1024), // Example batch size for reading
    };
    let reader = ParquetReader::new(parquet_config);

    info!("Reading rows from {}...", args.input_file);
    let mut records = Vec::new();
    let mut read_errors = 0u64;
    let read_start_time = Instant::now();

    for record_result in reader.read_records()? {
        reading_pb.tick();
        match record_result {
            Ok(record) => {
                records.push(record);
                reading_pb.inc(1);
            }
            Err(e) => {
                ROW_READ_ERRORS_TOTAL.inc();
                reading_pb.println(format!("Error reading row: {}. Skipping.", e));
                read_errors += 1;
            }
        }
    }

    reading_pb.finish_with_message(format!(
        "Finished reading {} rows in {}. Read errors: {}",
        records.len(),
        HumanDuration(read_start_time.elapsed()),
        read_errors
    ));
    Ok((records, read_errors))
}

/// Runs one annotator over `records` and writes the annotated rows out in
/// batches of `PARQUET_WRITE_BATCH_SIZE`.
///
/// The annotation stream is consumed lazily, so no more than the configured
/// concurrency budget of rows is in flight at once. The first fatal unit
/// error (transport failure or deadline overrun) stops the run.
///
/// # Returns
///
/// A `Result` containing the number of rows annotated and written.
async fn run_annotation<T>(
    annotator: &Annotator<T>,
    records: Vec<TextRecord>,
    writer: &mut ParquetWriter,
    annotation_pb: &ProgressBar,
) -> Result<u64>
where
    T: TaskPayload + Serialize + 'static,
{
    let mut annotated_batch = Vec::with_capacity(PARQUET_WRITE_BATCH_SIZE);
    let mut annotated_count = 0u64;

    let stream = annotator.annotate_stream(records);
    pin_mut!(stream);

    while let Some(outcome) = stream.next().await {
        let record = match outcome {
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "Fatal annotation error. Stopping.");
                return Err(e);
            }
        };
        annotated_count += 1;
        ROWS_ANNOTATED_TOTAL.inc();
        annotation_pb.inc(1);
        annotated_batch.push(record);

        if annotated_batch.len() >= PARQUET_WRITE_BATCH_SIZE {
            writer.write_batch(&annotated_batch)?;
            annotation_pb.println(format!(
                "Written Parquet batch ({} rows). Total annotated: {}",
                annotated_batch.len(),
                annotated_count
            ));
            annotated_batch.clear();
        }
    }

    if !annotated_batch.is_empty() {
        info!(
            "Writing final batch of annotated rows ({} rows)...",
            annotated_batch.len()
        );
        writer.write_batch(&annotated_batch)?;
    }
    Ok(annotated_count)
}

/// Main entry point for the annotate binary.
///
/// Orchestrates the entire annotation workflow:
/// 1. Parses command-line arguments.
/// 2. Initializes logging and optionally a Prometheus metrics endpoint.
/// 3. Resolves the analytics service configuration and builds the HTTP client.
/// 4. Reads rows from the input Parquet file.
/// 5. Annotates every row with the selected analytics task.
/// 6. Writes the annotated rows to the output Parquet file.
/// 7. Prints a final summary of the operations.
///
/// # Returns
///
/// `Result<()>` which is `Ok(())` on successful completion,
/// or an `AnalyticsError` if any stage encounters an unrecoverable error.
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing subscriber
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")); // Default to info if RUST_LOG is not set
    fmt::Subscriber::builder().with_env_filter(filter).init();

    // Setup Prometheus Metrics Endpoint
    if let Err(e) = setup_prometheus_metrics(args.metrics_port).await {
        error!("Failed to start Prometheus metrics endpoint: {}", e);
        // Depending on policy, you might want to exit or just log the error.
        // For now, just logging.
    }

    info!("Annotator started.");
    info!("Input file: {}", args.input_file);
    info!("Task: {}", args.task.kind().name());
    info!("Output File: {}", args.output_file);

    // 1. Resolve configuration and build the remote client
    let config = args.analytics_config()?;
    info!("Analytics endpoint: {}", config.endpoint);
    let client: Arc<dyn TextAnalyticsClient> = Arc::new(HttpTextAnalyticsClient::new(&config)?);

    // --- Progress Bar for Reading ---
    let reading_pb_template =
        "{spinner:.green} [{elapsed_precise}] {msg} Rows read: {pos} ({per_sec})";
    let reading_pb = create_progress_bar(0, "Reading input", reading_pb_template);

    // 2. Read Input
    let (records, read_errors) = match read_input(&args, &config, &reading_pb) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Failed during input reading: {}", e);
            reading_pb.finish_with_message(format!("Reading failed: {}", e));
            return Err(e);
        }
    };

    // Early exit if no rows were read (nothing to annotate)
    if records.is_empty() {
        info!("No rows were read. Exiting.");
        return Ok(());
    }

    if let Some(parent_dir) = std::path::Path::new(&args.output_file).parent() {
        tokio::fs::create_dir_all(parent_dir).await?;
    }
    let mut writer = ParquetWriter::new(&args.output_file, &config.output_column)?;
    info!("Initialized Parquet writer for: {}", args.output_file);

    // --- Progress Bar for Annotation ---
    let annotation_pb_template = "{spinner:.blue} [{elapsed_precise}] {msg} Rows annotated: {pos}/{len} ({percent}%) ({per_sec}, ETA: {eta})";
    let annotation_pb = create_progress_bar(
        records.len() as u64,
        "Annotating rows",
        annotation_pb_template,
    );

    // 3. Annotate
    let annotation_start_time = Instant::now();
    let annotation_outcome = match args.task {
        TaskArg::Language => {
            let annotator = LanguageAnnotator::from_config(Arc::clone(&client), &config)?;
            run_annotation(&annotator, records, &mut writer, &annotation_pb).await
        }
        TaskArg::KeyPhrases => {
            let annotator = KeyPhraseAnnotator::from_config(Arc::clone(&client), &config)?;
            run_annotation(&annotator, records, &mut writer, &annotation_pb).await
        }
        TaskArg::Sentiment => {
            let annotator = SentimentAnnotator::from_config(Arc::clone(&client), &config)?;
            run_annotation(&annotator, records, &mut writer, &annotation_pb).await
        }
    };
    let annotated_count = match annotation_outcome {
        Ok(count) => count,
        Err(e) => {
            error!("Failed during annotation: {}", e);
            annotation_pb.finish_with_message(format!("Annotation failed: {}", e));
            return Err(e);
        }
    };
    annotation_pb.finish_with_message(format!(
        "Finished annotating {} rows in {}.",
        annotated_count,
        HumanDuration(annotation_start_time.elapsed())
    ));

    info!("Closing Parquet writer for {}...", args.output_file);
    writer.close()?;
    info!("Parquet writer closed successfully.");

    // Final Summary
    info!("--------------------");
    info!("Annotation Summary:");
    info!("  Task: {}", args.task.kind().name());
    info!("  Rows Annotated: {}", annotated_count);
    info!("  Rows Skipped (read errors): {}", read_errors);
    info!("  Output Column: {}", config.output_column);
    info!("  Output File: {}", args.output_file);
    info!("--------------------");

    if read_errors > 0 {
        warn!(
            rows_skipped = read_errors,
            "Some input rows could not be read and were skipped. Output will not cover them."
        );
    }

    Ok(())
}
