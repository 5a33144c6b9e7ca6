// src/pipeline/readers/parquet_reader.rs

use std::collections::HashMap;
use std::fs::File;

use arrow::array::{Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatchReader;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::config::ParquetInputConfig;
use crate::data_model::TextRecord;
use crate::error::{AnalyticsError, Result};

/// Reads TextRecords from a Parquet file.
#[derive(Debug)]
pub struct ParquetReader {
    config: ParquetInputConfig,
}

impl ParquetReader {
    /// Creates a new ParquetReader with the given configuration.
    pub fn new(config: ParquetInputConfig) -> Self {
        ParquetReader { config }
    }

    /// Opens the file and returns a lazy iterator over records. Schema
    /// problems (missing or mistyped columns) surface here; per-row
    /// problems surface as `Err` items of the iterator.
    pub fn read_records(self) -> Result<impl Iterator<Item = Result<TextRecord>>> {
        self.config.validate()?;
        let file = File::open(&self.config.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let builder = if let Some(batch_size) = self.config.batch_size {
            builder.with_batch_size(batch_size)
        } else {
            builder
        };
        let reader = builder.build()?;
        let schema = reader.schema();

        let text_idx = required_utf8_column(&schema, &self.config.text_column, "Text")?;
        let id_idx = optional_utf8_column(&schema, self.config.id_column.as_deref(), "ID")?;
        let language_idx =
            optional_utf8_column(&schema, self.config.language_column.as_deref(), "Language")?;

        let text_column = self.config.text_column.clone();
        let path = self.config.path.clone();
        // Row numbers continue across record batches so fallback ids stay
        // unique within the file.
        let mut row_offset = 0usize;

        let iterator = reader.into_iter().flat_map(move |batch_result| {
            let batch = match batch_result {
                Ok(batch) => batch,
                Err(e) => {
                    return vec![Err(AnalyticsError::Unexpected(format!(
                        "Failed to read Parquet batch from '{}': {}",
                        path, e
                    )))]
                }
            };

            let base_row = row_offset;
            row_offset += batch.num_rows();

            let texts = match utf8_array(&batch, text_idx, &text_column) {
                Ok(texts) => texts,
                Err(e) => return vec![Err(e)],
            };
            let ids = match id_idx.map(|idx| utf8_array(&batch, idx, "id")).transpose() {
                Ok(ids) => ids,
                Err(e) => return vec![Err(e)],
            };
            let languages = match language_idx
                .map(|idx| utf8_array(&batch, idx, "language"))
                .transpose()
            {
                Ok(languages) => languages,
                Err(e) => return vec![Err(e)],
            };

            (0..batch.num_rows())
                .map(|i| {
                    if texts.is_null(i) {
                        return Err(AnalyticsError::Unexpected(format!(
                            "Row {} in source '{}' has null value in text column '{}'",
                            base_row + i,
                            path,
                            text_column
                        )));
                    }
                    let text = texts.value(i).to_string();

                    let id = match ids {
                        Some(ids_arr) if !ids_arr.is_null(i) => ids_arr.value(i).to_string(),
                        _ => format!("{}_row_{}", path, base_row + i),
                    };

                    let language = match languages {
                        Some(lang_arr) if !lang_arr.is_null(i) && !lang_arr.value(i).is_empty() => {
                            Some(lang_arr.value(i).to_string())
                        }
                        _ => None,
                    };

                    Ok(TextRecord {
                        id,
                        source: path.clone(),
                        text,
                        language,
                        annotations: HashMap::new(),
                    })
                })
                .collect::<Vec<_>>()
        });

        Ok(iterator)
    }
}

fn required_utf8_column(schema: &Schema, name: &str, what: &str) -> Result<usize> {
    let idx = schema.index_of(name).map_err(|_| {
        AnalyticsError::ConfigError(format!(
            "{} column '{}' not found in Parquet schema.",
            what, name
        ))
    })?;
    match schema.field(idx).data_type() {
        DataType::Utf8 => Ok(idx),
        other => Err(AnalyticsError::ConfigError(format!(
            "Expected {} column '{}' to be Utf8, but found {:?}",
            what, name, other
        ))),
    }
}

fn optional_utf8_column(schema: &Schema, name: Option<&str>, what: &str) -> Result<Option<usize>> {
    match name {
        Some(name) => required_utf8_column(schema, name, what).map(Some),
        None => Ok(None),
    }
}

fn utf8_array<'a>(batch: &'a RecordBatch, idx: usize, name: &str) -> Result<&'a StringArray> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| {
            AnalyticsError::Unexpected(format!("Column '{}' is not a valid Utf8 StringArray", name))
        })
}
