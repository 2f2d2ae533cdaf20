//! Core types for benchmark-db.
//!
//! This module contains the column schema registry and the collaborators that
//! supply per-row metadata (system facts and the benchmark version).

pub mod env;
pub mod meta;
pub mod schema;

// Re-export key types for convenience
pub use env::{SystemInfo, SystemInfoSource, SysinfoSource};
pub use meta::{BenchmarkMeta, IniBenchmarkMeta};
pub use schema::{
    Column, ColumnType, DirSchemaSource, MemorySchemaSource, SchemaRegistry, SchemaSource,
    TableSchema,
};
