// src/pipeline/writers/mod.rs

pub mod base_writer;
pub mod parquet_writer;

// Re-export the writer surface
pub use base_writer::BaseWriter;
pub use parquet_writer::ParquetWriter;
