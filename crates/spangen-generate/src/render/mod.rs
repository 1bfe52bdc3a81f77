//! Renderer seam: the engine resolves everything, renderers only format.

pub mod go;

pub use go::GoRenderer;

use crate::errors::RenderError;
use crate::model::{ArtifactKind, GenerateOptions};
use crate::packages::{Imports, PackageRef};
use crate::relations::{LinkedForeignKey, LinkedIndex, TableLinks};
use crate::resolve::{Field, ResolvedTable};

/// Values available to the file header of any artifact.
#[derive(Debug)]
pub struct HeaderContext<'a> {
    pub options: &'a GenerateOptions,
    pub imports: &'a Imports,
    pub kind: ArtifactKind,
    /// Table name, or the shared artifact name.
    pub artifact: &'a str,
}

/// Values for the model section of a table artifact.
#[derive(Debug)]
pub struct TableContext<'a> {
    pub options: &'a GenerateOptions,
    pub imports: &'a Imports,
    /// Table with its types qualified in this unit.
    pub table: &'a ResolvedTable,
    /// Rendered fields, ignored columns removed.
    pub fields: &'a [Field],
    pub short_name: &'a str,
}

/// Values for one index finder.
#[derive(Debug)]
pub struct IndexContext<'a> {
    pub options: &'a GenerateOptions,
    pub imports: &'a Imports,
    pub table: &'a ResolvedTable,
    pub fields: &'a [Field],
    pub short_name: &'a str,
    /// Index with its key fields qualified in this unit.
    pub index: &'a LinkedIndex,
    pub func_name: &'a str,
}

/// Which side of a foreign key the rendering table sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignKeyDirection {
    /// The table owns the foreign key and reads the referenced row.
    Outgoing,
    /// The table is referenced and reads the referencing rows.
    Incoming,
}

/// Values for one foreign key accessor.
#[derive(Debug)]
pub struct ForeignKeyContext<'a> {
    pub options: &'a GenerateOptions,
    pub imports: &'a Imports,
    pub table: &'a ResolvedTable,
    pub short_name: &'a str,
    pub foreign_key: &'a LinkedForeignKey,
    pub direction: ForeignKeyDirection,
    /// Rendered fields of the table on the other side.
    pub other_fields: &'a [Field],
    pub func_name: &'a str,
}

/// Values for the helper artifact shared by every table.
#[derive(Debug)]
pub struct SharedContext<'a> {
    pub options: &'a GenerateOptions,
    pub imports: &'a Imports,
    pub tables: &'a [ResolvedTable],
}

/// Formats resolved contexts into target source text.
///
/// Renderers never register packages: everything they may qualify is
/// declared up front through [`TemplateRenderer::imports`] or comes from a
/// field type.
pub trait TemplateRenderer {
    /// Packages the rendered unit uses beyond its field types. `links` is
    /// `None` for the shared artifact.
    fn imports(&self, kind: ArtifactKind, links: Option<&TableLinks>) -> Vec<PackageRef>;

    /// Identifiers the rendered code declares as locals or helpers; short
    /// names and parameter names never take one of them.
    fn scope_locals(&self) -> Vec<String>;

    fn render_header(&self, ctx: &HeaderContext<'_>, out: &mut String) -> Result<(), RenderError>;

    fn render_table(&self, ctx: &TableContext<'_>, out: &mut String) -> Result<(), RenderError>;

    fn render_index(&self, ctx: &IndexContext<'_>, out: &mut String) -> Result<(), RenderError>;

    fn render_foreign_key(
        &self,
        ctx: &ForeignKeyContext<'_>,
        out: &mut String,
    ) -> Result<(), RenderError>;

    fn render_shared(&self, ctx: &SharedContext<'_>, out: &mut String) -> Result<(), RenderError>;

    /// File name suggested for an artifact.
    fn file_name(&self, kind: ArtifactKind, type_name: &str, options: &GenerateOptions) -> String {
        match kind {
            ArtifactKind::Table => format!("{}{}", type_name.to_lowercase(), options.file_suffix),
            ArtifactKind::Shared => format!("spangen_db{}", options.file_suffix),
        }
    }
}
