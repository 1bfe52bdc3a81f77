use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Foreign key definition preserving column ordering.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

/// Secondary index definition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Index {
    pub name: String,
    /// Key columns in index order.
    pub columns: Vec<String>,
    #[serde(default)]
    pub is_unique: bool,
    /// Columns carried by the index without being part of its key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storing: Vec<String>,
}
