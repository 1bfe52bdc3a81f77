//! Model code generation for Spanner schemas.
//!
//! This crate consumes a `schema.json` model, resolves Go types and names for
//! every table, links indexes and foreign keys, and hands the resolved model
//! to a pluggable renderer. Nothing here touches the filesystem.

pub mod engine;
pub mod errors;
pub mod funcs;
pub mod model;
pub mod names;
pub mod packages;
pub mod relations;
pub mod render;
pub mod resolve;
pub mod types;

pub use engine::{GenerationRun, Generator, SHARED_ARTIFACT};
pub use errors::{GenerateError, RenderError};
pub use model::{Artifact, ArtifactKind, GenerateOptions, Generation};
pub use packages::{Imports, Package, PackageRegistry};
pub use render::{GoRenderer, TemplateRenderer};
pub use types::FieldType;
