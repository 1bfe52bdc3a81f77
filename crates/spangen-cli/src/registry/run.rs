use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use spangen_generate::{ArtifactKind, GenerateOptions, Generation, Package};

use crate::workspace::{write_bytes_atomic, write_json_atomic};

use super::{RegistryError, RegistryResult};

pub const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MANIFEST_FILE: &str = "manifest.json";

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub schema_path: PathBuf,
    pub out_dir: PathBuf,
}

impl RunContext {
    pub fn new(schema_path: PathBuf, out_dir: PathBuf) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            schema_path,
            out_dir,
        }
    }
}

/// JSON record written next to the generated files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub cli_version: String,
    pub schema_version: String,
    pub schema_path: String,
    pub package_name: String,
    pub files: Vec<ManifestFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFile {
    pub name: String,
    pub kind: ArtifactKind,
    pub file_name: String,
    pub packages: Vec<Package>,
}

/// Writes every artifact into the run's output directory, then the manifest.
pub fn write_generation(
    ctx: &RunContext,
    schema_version: &str,
    options: &GenerateOptions,
    generation: &Generation,
) -> RegistryResult<RunManifest> {
    let mut files = Vec::with_capacity(generation.artifacts.len());
    for artifact in &generation.artifacts {
        let path = artifact_path(&ctx.out_dir, &artifact.file_name)?;
        write_bytes_atomic(&path, artifact.text.as_bytes())?;
        tracing::info!(
            event = "artifact_written",
            artifact = %artifact.name,
            path = %path.display(),
            bytes = artifact.text.len()
        );
        files.push(ManifestFile {
            name: artifact.name.clone(),
            kind: artifact.kind,
            file_name: artifact.file_name.clone(),
            packages: artifact.packages.clone(),
        });
    }

    let manifest = RunManifest {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        finished_at: Utc::now().to_rfc3339(),
        cli_version: CLI_VERSION.to_string(),
        schema_version: schema_version.to_string(),
        schema_path: ctx.schema_path.display().to_string(),
        package_name: options.package_name.clone(),
        files,
    };
    let manifest_path = ctx.out_dir.join(MANIFEST_FILE);
    write_json_atomic(&manifest_path, &manifest)?;
    tracing::info!(event = "manifest_written", path = %manifest_path.display());

    Ok(manifest)
}

fn artifact_path(out_dir: &Path, file_name: &str) -> RegistryResult<PathBuf> {
    let plain = Path::new(file_name)
        .file_name()
        .is_some_and(|name| name == file_name);
    if !plain || file_name == MANIFEST_FILE {
        return Err(RegistryError::InvalidArtifact(file_name.to_string()));
    }
    Ok(out_dir.join(file_name))
}
