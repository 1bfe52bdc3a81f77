mod registry;
mod workspace;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use registry::{RunContext, init_logging, write_generation};
use spangen_core::{DatabaseSchema, Error as CoreError, SCHEMA_VERSION, validate_schema};
use spangen_generate::{GenerateError, GenerateOptions, Generator, GoRenderer};
use thiserror::Error;
use workspace::{SpangenSettings, apply_custom_types, load_settings, write_bytes_atomic};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("workspace error: {0}")]
    Workspace(#[from] workspace::WorkspaceError),
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Generate(#[from] GenerateError),
    #[error("failed to read {path}: {source}")]
    ReadSchema {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    ParseSchema {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported schema version {found}, expected {expected}")]
    SchemaVersion { found: String, expected: String },
}

#[derive(Parser, Debug)]
#[command(name = "spangen", version, about = "Go model generator for Cloud Spanner schemas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate Go model files from a schema.json snapshot.
    Generate(GenerateArgs),
    /// Print the JSON Schema of the schema.json input format.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Path to schema.json.
    #[arg(long, default_value = "schema.json")]
    schema: PathBuf,
    /// Output directory for generated files and manifest.json.
    #[arg(long, default_value = "models")]
    out: PathBuf,
    /// Path to spangen.toml. Missing files fall back to defaults.
    #[arg(long, default_value = "spangen.toml")]
    config: PathBuf,
    /// Go package name written into every file.
    #[arg(long)]
    package: Option<String>,
    /// Suffix appended to generated file names.
    #[arg(long)]
    suffix: Option<String>,
    /// Columns to leave out of models, as `Column` or `Table.Column`.
    #[arg(long, value_delimiter = ',')]
    ignore_fields: Vec<String>,
    /// Struct tag keys emitted next to the spanner tag.
    #[arg(long, value_delimiter = ',')]
    tags: Option<Vec<String>>,
    /// Append JSON logs to this file instead of logging to stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the JSON Schema here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Schema(args) => run_schema(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    let default_level = if args.log_file.is_some() { "info" } else { "warn" };
    init_logging(args.log_file.as_deref(), default_level)?;

    let ctx = RunContext::new(args.schema.clone(), args.out.clone());
    tracing::info!(event = "run_started", run_id = %ctx.run_id, schema = %ctx.schema_path.display());

    let timer = Instant::now();
    let settings = load_settings(&args.config)?;
    let options = merge_options(&settings, &args);

    let mut schema = read_schema(&args.schema)?;
    apply_custom_types(&mut schema, &settings.custom_types)?;
    validate_schema(&schema)?;
    tracing::info!(event = "schema_loaded", tables = schema.tables.len());

    let generator = Generator::new(options, GoRenderer);
    let generation = generator.generate(&schema)?;
    let manifest = write_generation(&ctx, &schema.schema_version, generator.options(), &generation)?;

    tracing::info!(
        event = "run_finished",
        run_id = %ctx.run_id,
        files = manifest.files.len(),
        elapsed_ms = timer.elapsed().as_millis() as u64
    );
    println!(
        "wrote {} files to {} (run {})",
        manifest.files.len(),
        ctx.out_dir.display(),
        manifest.run_id
    );
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = schemars::schema_for!(DatabaseSchema);
    let mut encoded = serde_json::to_vec_pretty(&schema)?;
    encoded.push(b'\n');
    match args.out {
        Some(path) => write_bytes_atomic(&path, &encoded)?,
        None => print!("{}", String::from_utf8_lossy(&encoded)),
    }
    Ok(())
}

fn read_schema(path: &Path) -> Result<DatabaseSchema, CliError> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::ReadSchema {
        path: path.to_path_buf(),
        source,
    })?;
    let schema: DatabaseSchema =
        serde_json::from_str(&content).map_err(|source| CliError::ParseSchema {
            path: path.to_path_buf(),
            source,
        })?;
    if schema.schema_version != SCHEMA_VERSION {
        return Err(CliError::SchemaVersion {
            found: schema.schema_version,
            expected: SCHEMA_VERSION.to_string(),
        });
    }
    Ok(schema)
}

/// Applies command line flags on top of the settings file.
fn merge_options(settings: &SpangenSettings, args: &GenerateArgs) -> GenerateOptions {
    let mut options = settings.generate.clone();
    if let Some(package) = &args.package {
        options.package_name = package.clone();
    }
    if let Some(suffix) = &args.suffix {
        options.file_suffix = suffix.clone();
    }
    for field in &args.ignore_fields {
        if !options.ignore_fields.contains(field) {
            options.ignore_fields.push(field.clone());
        }
    }
    if let Some(tags) = &args.tags {
        options.tags = tags.clone();
    }
    options
}
