#![allow(non_snake_case)]
#![allow(clippy::too_many_arguments)]

// Declare the modules that form the library's public API (or internal structure)
// Using `pub mod` makes them accessible from the binaries using `use TextAnnotator::module_name;`
pub mod assembler;
pub mod client;
pub mod config;
pub mod data_model;
pub mod error;
pub mod http_client;
pub mod invoker;
pub mod pipeline;
pub mod processor;
pub mod utils;

// You might also want to re-export common types for convenience, e.g.:
// pub use error::{Result, AnalyticsError};
// pub use data_model::TextRecord;
// pub use invoker::BatchInvoker;
