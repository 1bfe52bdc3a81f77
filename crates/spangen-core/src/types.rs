use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Raw Spanner type metadata for a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnType {
    /// Type as written in DDL (e.g. `STRING(MAX)`, `ARRAY<INT64>`).
    pub data_type: String,
}

impl ColumnType {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
        }
    }
}
