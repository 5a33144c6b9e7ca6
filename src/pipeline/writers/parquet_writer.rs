use std::fs::File;
use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;

use crate::data_model::TextRecord;
use crate::error::{AnalyticsError, Result};
use crate::pipeline::writers::BaseWriter;

const FIXED_COLUMNS: [&str; 4] = ["id", "source", "text", "language"];

fn create_schema(annotation_column: &str) -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new("language", DataType::Utf8, true),
        Field::new(annotation_column, DataType::Utf8, true),
    ]))
}

/// Writes TextRecords to a Parquet file: the fixed record columns plus one
/// nullable Utf8 column holding the JSON-encoded annotation.
#[derive(Debug)]
pub struct ParquetWriter {
    schema: SchemaRef,
    annotation_column: String,
    writer: Option<ArrowWriter<File>>,
}

impl ParquetWriter {
    pub fn new(path: &str, annotation_column: &str) -> Result<Self> {
        if FIXED_COLUMNS.contains(&annotation_column) {
            return Err(AnalyticsError::ConfigError(format!(
                "Annotation column '{}' collides with a fixed output column",
                annotation_column
            )));
        }
        let schema = create_schema(annotation_column);
        let file = File::create(path)?;
        let props = WriterProperties::builder().build();
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        Ok(ParquetWriter {
            schema,
            annotation_column: annotation_column.to_string(),
            writer: Some(writer),
        })
    }
}

impl BaseWriter for ParquetWriter {
    fn write_batch(&mut self, records: &[TextRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut id_builder = StringBuilder::new();
        let mut source_builder = StringBuilder::new();
        let mut text_builder = StringBuilder::new();
        let mut language_builder = StringBuilder::new();
        let mut annotation_builder = StringBuilder::new();

        for record in records {
            id_builder.append_value(&record.id);
            source_builder.append_value(&record.source);
            text_builder.append_value(&record.text);

            match &record.language {
                Some(language) => language_builder.append_value(language),
                None => language_builder.append_null(),
            }

            match record.annotations.get(&self.annotation_column) {
                Some(encoded) => annotation_builder.append_value(encoded),
                None => annotation_builder.append_null(),
            }
        }

        let batch = RecordBatch::try_new(
            self.schema.clone(),
            vec![
                Arc::new(id_builder.finish()) as ArrayRef,
                Arc::new(source_builder.finish()) as ArrayRef,
                Arc::new(text_builder.finish()) as ArrayRef,
                Arc::new(language_builder.finish()) as ArrayRef,
                Arc::new(annotation_builder.finish()) as ArrayRef,
            ],
        )?;

        if let Some(writer) = self.writer.as_mut() {
            writer.write(&batch)?;
        }

        Ok(())
    }

    fn close(mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.close()?;
        }
        Ok(())
    }
}
