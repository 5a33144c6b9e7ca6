use std::collections::HashMap;
use std::fs::File;
use std::sync::Arc;
use tempfile::NamedTempFile;
use TextAnnotator::config::parquet::ParquetInputConfig;
use TextAnnotator::data_model::TextRecord;
use TextAnnotator::error::{AnalyticsError, Result};
use TextAnnotator::pipeline::readers::ParquetReader;
use TextAnnotator::pipeline::writers::{BaseWriter, ParquetWriter};

fn create_sample_record(
    id: &str,
    text: &str,
    language: Option<&str>,
    annotation: Option<(&str, &str)>,
) -> TextRecord {
    let mut annotations = HashMap::new();
    if let Some((column, value)) = annotation {
        annotations.insert(column.to_string(), value.to_string());
    }
    TextRecord {
        id: id.to_string(),
        source: "reviews.parquet".to_string(),
        text: text.to_string(),
        language: language.map(|l| l.to_string()),
        annotations,
    }
}

fn reader_config(path: &str) -> ParquetInputConfig {
    ParquetInputConfig {
        path: path.to_string(),
        text_column: "text".to_string(),
        id_column: Some("id".to_string()),
        language_column: Some("language".to_string()),
        batch_size: Some(10),
    }
}

#[test]
fn test_parquet_read_write_roundtrip() -> Result<()> {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let file_path_str = temp_file.path().to_str().unwrap();

    let records = vec![
        create_sample_record(
            "r1",
            "Hello Parquet!",
            Some("en"),
            Some(("analytics", r#"{"result":null}"#)),
        ),
        create_sample_record("r2", "Second row", None, None),
    ];

    let mut writer = ParquetWriter::new(file_path_str, "analytics")?;
    writer.write_batch(&records)?;
    writer.close()?;

    let reader = ParquetReader::new(reader_config(file_path_str));
    let mut read_records = vec![];
    for result in reader.read_records()? {
        read_records.push(result?);
    }

    assert_eq!(read_records.len(), 2);
    assert_eq!(read_records[0].id, "r1");
    assert_eq!(read_records[0].text, "Hello Parquet!");
    assert_eq!(read_records[0].language.as_deref(), Some("en"));
    assert_eq!(read_records[1].id, "r2");
    assert_eq!(read_records[1].language, None);
    // The reader marks every record with the file it came from and starts
    // with a clean annotation map.
    for record in &read_records {
        assert_eq!(record.source, file_path_str);
        assert!(record.annotations.is_empty());
    }

    Ok(())
}

#[test]
fn test_generated_ids_without_id_column() -> Result<()> {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let file_path_str = temp_file.path().to_str().unwrap();

    let records = vec![
        create_sample_record("a", "one", None, None),
        create_sample_record("b", "two", None, None),
    ];
    let mut writer = ParquetWriter::new(file_path_str, "analytics")?;
    writer.write_batch(&records)?;
    writer.close()?;

    let config = ParquetInputConfig {
        id_column: None,
        ..reader_config(file_path_str)
    };
    let reader = ParquetReader::new(config);
    let read_records: Vec<TextRecord> = reader
        .read_records()?
        .collect::<Result<Vec<TextRecord>>>()?;

    assert_eq!(read_records.len(), 2);
    assert!(read_records[0].id.ends_with("_row_0"));
    assert!(read_records[1].id.ends_with("_row_1"));
    assert_ne!(read_records[0].id, read_records[1].id);

    Ok(())
}

#[test]
fn test_generated_ids_continue_across_batches() -> Result<()> {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let file_path_str = temp_file.path().to_str().unwrap();

    let records: Vec<TextRecord> = (0..25)
        .map(|i| create_sample_record("unused", &format!("text {}", i), None, None))
        .collect();
    let mut writer = ParquetWriter::new(file_path_str, "analytics")?;
    writer.write_batch(&records)?;
    writer.close()?;

    // Force several small record batches; row numbering must not restart
    // at a batch boundary.
    let config = ParquetInputConfig {
        id_column: None,
        batch_size: Some(10),
        ..reader_config(file_path_str)
    };
    let reader = ParquetReader::new(config);
    let read_records: Vec<TextRecord> = reader
        .read_records()?
        .collect::<Result<Vec<TextRecord>>>()?;

    assert_eq!(read_records.len(), 25);
    for (i, record) in read_records.iter().enumerate() {
        assert!(
            record.id.ends_with(&format!("_row_{}", i)),
            "row {} got id {}",
            i,
            record.id
        );
    }

    Ok(())
}

#[test]
fn test_missing_text_column_is_config_error() -> Result<()> {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let file_path_str = temp_file.path().to_str().unwrap();

    let records = vec![create_sample_record("r1", "text here", None, None)];
    let mut writer = ParquetWriter::new(file_path_str, "analytics")?;
    writer.write_batch(&records)?;
    writer.close()?;

    let config = ParquetInputConfig {
        text_column: "body".to_string(),
        ..reader_config(file_path_str)
    };
    let reader = ParquetReader::new(config);
    match reader.read_records() {
        Err(AnalyticsError::ConfigError(msg)) => {
            assert!(msg.contains("body"), "message should name the column: {}", msg)
        }
        Err(other) => panic!("Expected ConfigError, got: {:?}", other),
        Ok(_) => panic!("Expected error due to missing column"),
    }

    Ok(())
}

#[test]
fn test_null_text_rows_are_item_errors() -> Result<()> {
    use arrow::array::StringBuilder;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let file_path_str = temp_file.path().to_str().unwrap();

    // Hand-build a file whose text column allows nulls.
    let schema = Arc::new(Schema::new(vec![Field::new("text", DataType::Utf8, true)]));
    let mut builder = StringBuilder::new();
    builder.append_value("first");
    builder.append_null();
    builder.append_value("third");
    let batch = RecordBatch::try_new(schema.clone(), vec![Arc::new(builder.finish())])
        .expect("Failed to build record batch");
    let file = File::create(file_path_str).expect("Failed to create parquet file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to open writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    let config = ParquetInputConfig {
        id_column: None,
        language_column: None,
        ..reader_config(file_path_str)
    };
    let reader = ParquetReader::new(config);
    let results: Vec<Result<TextRecord>> = reader.read_records()?.collect();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().text, "first");
    assert!(results[1].is_err(), "null text row should be an error item");
    assert_eq!(results[2].as_ref().unwrap().text, "third");

    Ok(())
}

#[test]
fn test_annotation_column_collision_rejected() {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let file_path_str = temp_file.path().to_str().unwrap();

    match ParquetWriter::new(file_path_str, "text") {
        Err(AnalyticsError::ConfigError(_)) => {}
        other => panic!("Expected ConfigError for reserved column name, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_output_readable_by_polars() -> Result<()> {
    let temp_file = NamedTempFile::new().expect("Failed to create temp file");
    let file_path_str = temp_file.path().to_str().unwrap().to_string();

    let records = vec![create_sample_record(
        "r1",
        "Bonjour",
        Some("fr"),
        Some(("analytics", r#"{"result":{"name":"French"}}"#)),
    )];
    let mut writer = ParquetWriter::new(&file_path_str, "analytics")?;
    writer.write_batch(&records)?;
    writer.close()?;

    let scan_path = file_path_str.clone();
    let df = tokio::task::spawn_blocking(move || {
        polars::prelude::LazyFrame::scan_parquet(scan_path, Default::default())
            .unwrap()
            .collect()
            .unwrap()
    })
    .await
    .expect("polars scan task failed");

    assert_eq!(df.height(), 1);
    let id_col = df.column("id").unwrap().str().unwrap();
    assert_eq!(id_col.get(0), Some("r1"));
    let annotation_col = df.column("analytics").unwrap().str().unwrap();
    assert_eq!(annotation_col.get(0), Some(r#"{"result":{"name":"French"}}"#));
    let language_col = df.column("language").unwrap().str().unwrap();
    assert_eq!(language_col.get(0), Some("fr"));

    Ok(())
}
