use serde::Deserialize;

use crate::error::{AnalyticsError, Result};

/// Where and how to read input rows from Parquet.
#[derive(Deserialize, Debug, Clone)]
pub struct ParquetInputConfig {
    pub path: String,                    // Path to the Parquet file
    pub text_column: String,             // Name of the column containing the text to analyze
    pub id_column: Option<String>,       // Optional: Name of a column to use as record ID
    pub language_column: Option<String>, // Optional: Name of a column holding a language hint
    pub batch_size: Option<usize>,       // Optional: Arrow batch size for reading
}

impl ParquetInputConfig {
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(AnalyticsError::ConfigValidationError(
                "ParquetInputConfig: path cannot be empty".to_string(),
            ));
        }
        if self.text_column.is_empty() {
            return Err(AnalyticsError::ConfigValidationError(
                "ParquetInputConfig: text_column cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
