use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::packages::Package;

/// Options for the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Go package name written at the top of every artifact.
    pub package_name: String,
    /// Suffix appended to artifact file names.
    pub file_suffix: String,
    /// Suffix appended to short names that collide within a scope.
    pub name_conflict_suffix: String,
    /// Columns left out of rendered field lists, as `Column` or `Table.Column`.
    pub ignore_fields: Vec<String>,
    /// Struct tag keys emitted next to the `spanner` tag.
    pub tags: Vec<String>,
    /// Irregular singular to plural pairs for table and type naming.
    pub irregular: BTreeMap<String, String>,
    /// Extra identifiers generated code must not declare, as one name or a
    /// list of names.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub reserved_names: Value,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            package_name: "models".to_string(),
            file_suffix: ".spangen.go".to_string(),
            name_conflict_suffix: "z".to_string(),
            ignore_fields: Vec::new(),
            tags: vec!["json".to_string()],
            irregular: BTreeMap::new(),
            reserved_names: Value::Null,
        }
    }
}

impl GenerateOptions {
    /// Returns true when `column` of `table` is in the ignore list.
    pub fn is_ignored(&self, table: &str, column: &str) -> bool {
        self.ignore_fields.iter().any(|entry| match entry.split_once('.') {
            Some((table_name, column_name)) => table_name == table && column_name == column,
            None => entry == column,
        })
    }
}

/// Kind of rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Model code for one table, including its index and foreign key accessors.
    Table,
    /// Helpers shared by every table artifact.
    Shared,
}

/// One unit of generated source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Table name, or `shared` for the helper artifact.
    pub name: String,
    pub kind: ArtifactKind,
    /// Suggested file name for the emitter.
    pub file_name: String,
    pub text: String,
    /// Imports required by `text`, ordered by path.
    pub packages: Vec<Package>,
}

/// Result of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub artifacts: Vec<Artifact>,
}

impl Generation {
    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_list_matches_bare_and_qualified_names() {
        let options = GenerateOptions {
            ignore_fields: vec!["UpdatedAt".to_string(), "Orders.Secret".to_string()],
            ..GenerateOptions::default()
        };

        assert!(options.is_ignored("Users", "UpdatedAt"));
        assert!(options.is_ignored("Orders", "Secret"));
        assert!(!options.is_ignored("Users", "Secret"));
        assert!(!options.is_ignored("Orders", "Status"));
    }
}
