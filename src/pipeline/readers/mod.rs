// src/pipeline/readers/mod.rs

pub mod parquet_reader;

// Re-export the main type
pub use parquet_reader::ParquetReader;
