use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, info};

use spangen_core::{DatabaseSchema, validate_schema};

use crate::errors::GenerateError;
use crate::funcs::{filter_fields, has_column, has_field};
use crate::model::{Artifact, ArtifactKind, GenerateOptions, Generation};
use crate::names::{
    DynamicConflicts, Inflector, ScopeConflict, ShortNames, field_name, scoped_param_names,
};
use crate::packages::{Imports, PackageRegistry, presets};
use crate::relations::{LinkedForeignKey, LinkedIndex, LinkedSchema, TableLinks, link};
use crate::render::{
    ForeignKeyContext, ForeignKeyDirection, HeaderContext, IndexContext, SharedContext,
    TableContext, TemplateRenderer,
};
use crate::resolve::{Field, ResolvedTable, resolve_table};

/// Name of the helper artifact shared by every table artifact.
pub const SHARED_ARTIFACT: &str = "shared";

/// State owned by one `generate` call.
#[derive(Debug)]
pub struct GenerationRun {
    pub short_names: ShortNames,
    pub inflector: Inflector,
    /// Renderer locals and configured reserved names; parameters avoid them.
    pub locals: BTreeSet<String>,
}

impl GenerationRun {
    pub fn new(
        options: &GenerateOptions,
        always_conflicting: Vec<String>,
    ) -> Result<Self, GenerateError> {
        let configured = match &options.reserved_names {
            Value::Null => Vec::new(),
            value => DynamicConflicts::try_from(value)?.0,
        };
        let locals: BTreeSet<String> = always_conflicting.into_iter().chain(configured).collect();
        let package_names = presets().into_iter().map(|preset| preset.name.to_string());
        Ok(Self {
            short_names: ShortNames::new(options.name_conflict_suffix.clone())
                .with_always_conflicting(package_names.chain(locals.iter().cloned())),
            inflector: Inflector::new(&options.irregular),
            locals,
        })
    }
}

/// Entry point for generating model code from a schema.
#[derive(Debug, Clone)]
pub struct Generator<R> {
    options: GenerateOptions,
    renderer: R,
}

impl<R: TemplateRenderer> Generator<R> {
    pub fn new(options: GenerateOptions, renderer: R) -> Self {
        Self { options, renderer }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Generate one artifact per table, in declaration order, then the
    /// shared helper artifact.
    pub fn generate(&self, schema: &DatabaseSchema) -> Result<Generation, GenerateError> {
        let mut run = GenerationRun::new(&self.options, self.renderer.scope_locals())?;
        info!(
            tables = schema.tables.len(),
            package = %self.options.package_name,
            "generation started"
        );

        validate_schema(schema)?;

        let resolved = schema
            .tables
            .iter()
            .map(|table| {
                resolve_table(table, &run.inflector).map_err(|err| err.in_artifact(&table.name))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut type_names = BTreeSet::new();
        for table in &resolved {
            if !type_names.insert(table.type_name.as_str()) {
                return Err(GenerateError::NameResolutionConflict {
                    name: table.type_name.clone(),
                    scope: "schema".to_string(),
                }
                .in_artifact(&table.table_name));
            }
        }

        let linked = link(&resolved, schema).map_err(|err| {
            let owner = match &err {
                GenerateError::DanglingIndexColumn { table, .. }
                | GenerateError::IncompatibleForeignKey { table, .. } => Some(table.clone()),
                _ => None,
            };
            match owner {
                Some(table) => err.in_artifact(&table),
                None => err,
            }
        })?;

        let mut artifacts = Vec::with_capacity(resolved.len() + 1);
        let mut file_names = BTreeSet::new();
        for table in &resolved {
            let artifact = self
                .table_artifact(&mut run, table, &resolved, &linked)
                .map_err(|err| err.in_artifact(&table.table_name))?;
            claim_file_name(&mut file_names, &artifact)?;
            artifacts.push(artifact);
        }
        let shared = self
            .shared_artifact(&resolved)
            .map_err(|err| err.in_artifact(SHARED_ARTIFACT))?;
        claim_file_name(&mut file_names, &shared)?;
        artifacts.push(shared);

        info!(artifacts = artifacts.len(), "generation finished");
        Ok(Generation { artifacts })
    }

    fn table_artifact(
        &self,
        run: &mut GenerationRun,
        table: &ResolvedTable,
        resolved: &[ResolvedTable],
        linked: &LinkedSchema,
    ) -> Result<Artifact, GenerateError> {
        let kept = self.rendered_fields(table);
        let links = match linked.links(&table.table_name) {
            Some(links) => rendered_links(table, links, &kept),
            None => TableLinks::default(),
        };

        let mut registry = PackageRegistry::new();
        for package in self.renderer.imports(ArtifactKind::Table, Some(&links)) {
            registry.register_ref(package);
        }

        let mut qualified = ResolvedTable {
            fields: kept.iter().map(|field| field.qualified(&mut registry)).collect(),
            primary_keys: table
                .primary_keys
                .iter()
                .map(|field| field.qualified(&mut registry))
                .collect(),
            ..table.clone()
        };
        let mut indexes: Vec<LinkedIndex> = links
            .indexes
            .iter()
            .map(|index| LinkedIndex {
                fields: index
                    .fields
                    .iter()
                    .map(|field| field.qualified(&mut registry))
                    .collect(),
                ..index.clone()
            })
            .collect();

        let package_names: Vec<String> = registry
            .resolve()
            .iter()
            .map(|package| package.display_name().to_string())
            .collect();
        let mut conflicts = vec![ScopeConflict::Fields(&table.fields)];
        conflicts.extend(package_names.iter().map(|name| ScopeConflict::Name(name)));
        let short_name = run.short_names.short_name(&table.type_name, &conflicts)?;

        let mut reserved = run.locals.clone();
        reserved.extend(package_names.iter().cloned());
        reserved.insert(short_name.clone());
        let params = scoped_param_names(
            &table.fields,
            &reserved,
            &self.options.name_conflict_suffix,
            &table.table_name,
        )?;
        let rendered = qualified
            .fields
            .iter_mut()
            .chain(qualified.primary_keys.iter_mut())
            .chain(indexes.iter_mut().flat_map(|index| index.fields.iter_mut()));
        for field in rendered {
            if let Some(param) = params.get(&field.column_name) {
                field.param_name = param.clone();
            }
        }

        let imports = Imports::new(registry.resolve());
        info!(
            table = %table.table_name,
            type_name = %table.type_name,
            short_name = %short_name,
            fields = qualified.fields.len(),
            imports = imports.packages().len(),
            "rendering table"
        );

        let mut text = String::new();
        self.renderer.render_header(
            &HeaderContext {
                options: &self.options,
                imports: &imports,
                kind: ArtifactKind::Table,
                artifact: &table.table_name,
            },
            &mut text,
        )?;
        self.renderer.render_table(
            &TableContext {
                options: &self.options,
                imports: &imports,
                table: &qualified,
                fields: &qualified.fields,
                short_name: &short_name,
            },
            &mut text,
        )?;

        let mut taken: BTreeSet<String> = BTreeSet::new();
        for index in &indexes {
            let func_name = self.index_func_name(run, table, index, &mut taken)?;
            self.renderer.render_index(
                &IndexContext {
                    options: &self.options,
                    imports: &imports,
                    table: &qualified,
                    fields: &qualified.fields,
                    short_name: &short_name,
                    index,
                    func_name: &func_name,
                },
                &mut text,
            )?;
        }

        let outgoing = links
            .foreign_keys
            .iter()
            .map(|fk| (fk, ForeignKeyDirection::Outgoing, &fk.referenced_table));
        let incoming = links
            .referenced_by
            .iter()
            .map(|fk| (fk, ForeignKeyDirection::Incoming, &fk.table));
        for (fk, direction, other) in outgoing.chain(incoming) {
            let other_fields = resolved
                .iter()
                .find(|candidate| &candidate.table_name == other)
                .map(|other| self.rendered_fields(other))
                .unwrap_or_default();
            let func_name = self.foreign_key_func_name(run, table, fk, direction, &mut taken)?;
            self.renderer.render_foreign_key(
                &ForeignKeyContext {
                    options: &self.options,
                    imports: &imports,
                    table: &qualified,
                    short_name: &short_name,
                    foreign_key: fk,
                    direction,
                    other_fields: &other_fields,
                    func_name: &func_name,
                },
                &mut text,
            )?;
        }

        Ok(Artifact {
            name: table.table_name.clone(),
            kind: ArtifactKind::Table,
            file_name: self
                .renderer
                .file_name(ArtifactKind::Table, &table.type_name, &self.options),
            text,
            packages: imports.packages().to_vec(),
        })
    }

    fn shared_artifact(&self, resolved: &[ResolvedTable]) -> Result<Artifact, GenerateError> {
        let mut registry = PackageRegistry::new();
        for package in self.renderer.imports(ArtifactKind::Shared, None) {
            registry.register_ref(package);
        }
        let imports = Imports::new(registry.resolve());

        let mut text = String::new();
        self.renderer.render_header(
            &HeaderContext {
                options: &self.options,
                imports: &imports,
                kind: ArtifactKind::Shared,
                artifact: SHARED_ARTIFACT,
            },
            &mut text,
        )?;
        self.renderer.render_shared(
            &SharedContext {
                options: &self.options,
                imports: &imports,
                tables: resolved,
            },
            &mut text,
        )?;

        Ok(Artifact {
            name: SHARED_ARTIFACT.to_string(),
            kind: ArtifactKind::Shared,
            file_name: self
                .renderer
                .file_name(ArtifactKind::Shared, SHARED_ARTIFACT, &self.options),
            text,
            packages: imports.packages().to_vec(),
        })
    }

    /// Fields rendered for `table`: ignored columns are dropped, primary
    /// key columns are always kept.
    fn rendered_fields(&self, table: &ResolvedTable) -> Vec<Field> {
        let ignored: Vec<&str> = table
            .fields
            .iter()
            .filter(|field| {
                !field.is_primary_key && self.options.is_ignored(&table.table_name, &field.column_name)
            })
            .map(|field| field.name.as_str())
            .collect();
        filter_fields(&table.fields, &ignored)
    }

    fn index_func_name(
        &self,
        run: &GenerationRun,
        table: &ResolvedTable,
        index: &LinkedIndex,
        taken: &mut BTreeSet<String>,
    ) -> Result<String, GenerateError> {
        let subject = if index.is_unique {
            table.type_name.clone()
        } else {
            run.inflector.pluralize(&table.type_name)
        };
        let by_fields: String = index.fields.iter().map(|field| field.name.as_str()).collect();
        claim(
            taken,
            [
                format!("Find{subject}By{by_fields}"),
                format!("Find{subject}By{}", field_name(&index.name)),
            ],
            &table.table_name,
        )
    }

    fn foreign_key_func_name(
        &self,
        run: &GenerationRun,
        table: &ResolvedTable,
        fk: &LinkedForeignKey,
        direction: ForeignKeyDirection,
        taken: &mut BTreeSet<String>,
    ) -> Result<String, GenerateError> {
        let subject = match direction {
            ForeignKeyDirection::Outgoing => fk.referenced_type_name.clone(),
            ForeignKeyDirection::Incoming => run.inflector.pluralize(&fk.type_name),
        };
        let by_fields: String = fk.fields.iter().map(|field| field.name.as_str()).collect();
        claim(
            taken,
            [
                format!("{subject}By{by_fields}"),
                format!("{subject}By{}", field_name(&fk.name)),
            ],
            &table.table_name,
        )
        .and_then(|name| {
            // Methods share the struct namespace with fields.
            if has_field(&table.fields, &name) {
                Err(GenerateError::NameResolutionConflict {
                    name,
                    scope: table.type_name.clone(),
                })
            } else {
                Ok(name)
            }
        })
    }
}

/// Relations rendered for `table`. Accessors reading a receiver field that
/// is not rendered are dropped.
fn rendered_links(table: &ResolvedTable, links: &TableLinks, kept: &[Field]) -> TableLinks {
    let renderable = |fields: &[Field], fk: &LinkedForeignKey| {
        let ok = fields
            .iter()
            .all(|field| has_column(kept, &field.column_name));
        if !ok {
            debug!(
                table = %table.table_name,
                foreign_key = %fk.name,
                "skipping accessor on ignored column"
            );
        }
        ok
    };

    TableLinks {
        indexes: links.indexes.clone(),
        foreign_keys: links
            .foreign_keys
            .iter()
            .filter(|fk| renderable(&fk.fields, fk))
            .cloned()
            .collect(),
        referenced_by: links
            .referenced_by
            .iter()
            .filter(|fk| renderable(&fk.referenced_fields, fk))
            .cloned()
            .collect(),
    }
}

/// Records the artifact's file name; names equal up to case collide.
fn claim_file_name(
    file_names: &mut BTreeSet<String>,
    artifact: &Artifact,
) -> Result<(), GenerateError> {
    if file_names.insert(artifact.file_name.to_lowercase()) {
        Ok(())
    } else {
        Err(GenerateError::NameResolutionConflict {
            name: artifact.file_name.clone(),
            scope: "files".to_string(),
        }
        .in_artifact(&artifact.name))
    }
}

/// First candidate not taken yet, recorded as taken.
fn claim<const N: usize>(
    taken: &mut BTreeSet<String>,
    candidates: [String; N],
    scope: &str,
) -> Result<String, GenerateError> {
    let fallback = candidates.first().cloned().unwrap_or_default();
    for candidate in candidates {
        if taken.insert(candidate.clone()) {
            return Ok(candidate);
        }
        debug!(scope = %scope, name = %candidate, "function name taken");
    }
    Err(GenerateError::NameResolutionConflict {
        name: fallback,
        scope: scope.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::GoRenderer;
    use serde_json::json;

    fn schema() -> DatabaseSchema {
        serde_json::from_value(json!({
            "schema_version": "0.1",
            "tables": [
                {
                    "name": "Items",
                    "columns": [
                        {"ordinal_position": 1, "name": "Id", "column_type": {"data_type": "INT64"}, "is_nullable": false},
                        {"ordinal_position": 2, "name": "Sku", "column_type": {"data_type": "STRING(32)"}, "is_nullable": false},
                        {"ordinal_position": 3, "name": "Secret", "column_type": {"data_type": "STRING(MAX)"}, "is_nullable": true}
                    ],
                    "primary_key": ["Id"],
                    "indexes": [
                        {"name": "ItemsBySku", "columns": ["Sku"]},
                        {"name": "ItemsBySkuStoring", "columns": ["Sku"], "storing": ["Secret"]}
                    ]
                }
            ]
        }))
        .expect("schema fixture")
    }

    #[test]
    fn duplicate_index_columns_fall_back_to_index_name() {
        let generation = Generator::new(GenerateOptions::default(), GoRenderer)
            .generate(&schema())
            .unwrap();
        let text = &generation.artifact("Items").unwrap().text;
        assert!(text.contains("func FindItemsBySku("));
        assert!(text.contains("func FindItemsByItemsBySkuStoring("));
    }

    #[test]
    fn ignored_columns_are_not_rendered() {
        let options = GenerateOptions {
            ignore_fields: vec!["Items.Secret".to_string(), "Id".to_string()],
            ..GenerateOptions::default()
        };
        let generation = Generator::new(options, GoRenderer).generate(&schema()).unwrap();
        let text = &generation.artifact("Items").unwrap().text;
        assert!(!text.contains("\"Secret\""));
        assert!(text.contains("\t\t\"Id\",\n"));
    }

    #[test]
    fn each_run_starts_with_a_fresh_memo() {
        let generator = Generator::new(GenerateOptions::default(), GoRenderer);
        let first = generator.generate(&schema()).unwrap();
        let second = generator.generate(&schema()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn run_conflicts_include_package_names_and_locals() {
        let mut run =
            GenerationRun::new(&GenerateOptions::default(), GoRenderer.scope_locals()).unwrap();
        assert_eq!(run.short_names.short_name("FooMapTable", &[]).unwrap(), "fmtz");
        assert_eq!(run.short_names.short_name("Row", &[]).unwrap(), "rz");
        assert_eq!(run.short_names.short_name("Item", &[]).unwrap(), "i");
    }

    #[test]
    fn claim_fails_when_every_candidate_is_taken() {
        let mut taken = BTreeSet::new();
        assert_eq!(
            claim(&mut taken, ["FindItemsBySku".to_string(), "FindItemsByItemsBySku".to_string()], "Items")
                .unwrap(),
            "FindItemsBySku"
        );
        assert_eq!(
            claim(&mut taken, ["FindItemsBySku".to_string(), "FindItemsByItemsBySku".to_string()], "Items")
                .unwrap(),
            "FindItemsByItemsBySku"
        );

        let err = claim(
            &mut taken,
            ["FindItemsBySku".to_string(), "FindItemsByItemsBySku".to_string()],
            "Items",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::NameResolutionConflict { ref name, ref scope }
                if name == "FindItemsBySku" && scope == "Items"
        ));
    }

    #[test]
    fn configured_reserved_names_rename_parameters() {
        let options = GenerateOptions {
            reserved_names: json!(["sku"]),
            ..GenerateOptions::default()
        };
        let generation = Generator::new(options, GoRenderer).generate(&schema()).unwrap();
        let text = &generation.artifact("Items").unwrap().text;
        assert!(text.contains(
            "func FindItemsBySku(ctx context.Context, db SpangenRODB, skuz string) ([]*Item, error) {"
        ));
        assert!(text.contains("\tstmt.Params[\"param0\"] = skuz\n"));
    }

    #[test]
    fn malformed_reserved_names_are_rejected() {
        let options = GenerateOptions {
            reserved_names: json!({"sku": true}),
            ..GenerateOptions::default()
        };
        let err = Generator::new(options, GoRenderer).generate(&schema()).unwrap_err();
        assert!(matches!(err, GenerateError::UnsupportedConflictKind(ref kind) if kind == "object"));
    }

    /// Go output squeezed into one file name per kind.
    struct SingleFile;

    impl TemplateRenderer for SingleFile {
        fn imports(&self, kind: ArtifactKind, links: Option<&TableLinks>) -> Vec<crate::packages::PackageRef> {
            GoRenderer.imports(kind, links)
        }

        fn scope_locals(&self) -> Vec<String> {
            GoRenderer.scope_locals()
        }

        fn render_header(&self, ctx: &HeaderContext<'_>, out: &mut String) -> Result<(), crate::errors::RenderError> {
            GoRenderer.render_header(ctx, out)
        }

        fn render_table(&self, ctx: &TableContext<'_>, out: &mut String) -> Result<(), crate::errors::RenderError> {
            GoRenderer.render_table(ctx, out)
        }

        fn render_index(&self, ctx: &IndexContext<'_>, out: &mut String) -> Result<(), crate::errors::RenderError> {
            GoRenderer.render_index(ctx, out)
        }

        fn render_foreign_key(
            &self,
            ctx: &ForeignKeyContext<'_>,
            out: &mut String,
        ) -> Result<(), crate::errors::RenderError> {
            GoRenderer.render_foreign_key(ctx, out)
        }

        fn render_shared(&self, ctx: &SharedContext<'_>, out: &mut String) -> Result<(), crate::errors::RenderError> {
            GoRenderer.render_shared(ctx, out)
        }

        fn file_name(&self, _kind: ArtifactKind, _type_name: &str, _options: &GenerateOptions) -> String {
            "models.go".to_string()
        }
    }

    #[test]
    fn colliding_file_names_are_reported() {
        let err = Generator::new(GenerateOptions::default(), SingleFile)
            .generate(&schema())
            .unwrap_err();
        assert!(matches!(&err, GenerateError::Artifact { artifact, .. } if artifact == SHARED_ARTIFACT));
        assert!(matches!(
            err.root(),
            GenerateError::NameResolutionConflict { name, scope } if name == "models.go" && scope == "files"
        ));
    }
}
