//! Storage layer for benchmark tables.
//!
//! Tables are always serialized to CSV first; backends import from that file.

pub mod csv;

// Re-export key types
pub use csv::{CsvExporter, csv_path, quote_field};
