use thiserror::Error;

/// Errors emitted while resolving or rendering a schema.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("unsupported type '{data_type}' for column {table}.{column}")]
    UnsupportedType {
        table: String,
        column: String,
        data_type: String,
    },
    #[error("index {table}.{index} references unknown column '{column}'")]
    DanglingIndexColumn {
        table: String,
        index: String,
        column: String,
    },
    #[error("foreign key {table}.{foreign_key} is incompatible: {reason}")]
    IncompatibleForeignKey {
        table: String,
        foreign_key: String,
        reason: String,
    },
    #[error("could not resolve a unique name for '{name}' in scope '{scope}'")]
    NameResolutionConflict { name: String, scope: String },
    #[error("unsupported scope conflict kind: {0}")]
    UnsupportedConflictKind(String),
    #[error(transparent)]
    InvalidSchema(#[from] spangen_core::Error),
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    #[error("failed to generate {artifact}: {source}")]
    Artifact {
        artifact: String,
        #[source]
        source: Box<GenerateError>,
    },
}

impl GenerateError {
    /// Attach the artifact being generated, keeping the original error as source.
    pub fn in_artifact(self, artifact: &str) -> Self {
        match self {
            GenerateError::Artifact { .. } => self,
            other => GenerateError::Artifact {
                artifact: artifact.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Innermost error, skipping artifact annotations.
    pub fn root(&self) -> &GenerateError {
        match self {
            GenerateError::Artifact { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Errors returned by template renderers.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("formatting failed")]
    Fmt(#[from] std::fmt::Error),
    #[error("{0}")]
    Template(String),
}
