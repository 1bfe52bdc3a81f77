//! Schema contracts for spangen.
//!
//! This crate defines the input schema types consumed by the code generator
//! and the structural checks run before any resolution happens.

pub mod constraints;
pub mod error;
pub mod schema;
pub mod types;
pub mod validation;

pub use constraints::{ForeignKey, Index};
pub use error::{Error, Result};
pub use schema::{Column, DatabaseSchema, Table};
pub use types::ColumnType;
pub use validation::validate_schema;

/// Current contract version for `schema.json` inputs.
pub const SCHEMA_VERSION: &str = "0.1";
