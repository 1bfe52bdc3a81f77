use std::path::Path;

use serde::{Deserialize, Serialize};

use spangen_core::DatabaseSchema;
use spangen_generate::GenerateOptions;

use super::{WorkspaceError, WorkspaceResult};

/// Contents of `spangen.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpangenSettings {
    pub generate: GenerateOptions,
    pub custom_types: Vec<CustomTypeOverride>,
}

/// Assigns a custom Go type to one column, as `path/to/pkg.Type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTypeOverride {
    pub table: String,
    pub column: String,
    #[serde(rename = "type")]
    pub go_type: String,
}

/// Loads settings from `path`. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> WorkspaceResult<SpangenSettings> {
    if !path.exists() {
        return Ok(SpangenSettings::default());
    }
    let content = std::fs::read_to_string(path)?;
    parse_settings(&content)
}

fn parse_settings(content: &str) -> WorkspaceResult<SpangenSettings> {
    let settings: SpangenSettings = toml::from_str(content)?;
    for entry in &settings.custom_types {
        if !entry.go_type.contains('.') {
            return Err(WorkspaceError::Invalid(format!(
                "custom type for {}.{} must be qualified as path/pkg.Type, got {}",
                entry.table, entry.column, entry.go_type
            )));
        }
    }
    Ok(settings)
}

/// Writes every override into the matching column of `schema`.
pub fn apply_custom_types(
    schema: &mut DatabaseSchema,
    overrides: &[CustomTypeOverride],
) -> WorkspaceResult<()> {
    for entry in overrides {
        let column = schema
            .tables
            .iter_mut()
            .find(|table| table.name == entry.table)
            .and_then(|table| {
                table
                    .columns
                    .iter_mut()
                    .find(|column| column.name == entry.column)
            })
            .ok_or_else(|| {
                WorkspaceError::Invalid(format!(
                    "custom type targets unknown column {}.{}",
                    entry.table, entry.column
                ))
            })?;
        column.custom_type = Some(entry.go_type.clone());
    }
    Ok(())
}
