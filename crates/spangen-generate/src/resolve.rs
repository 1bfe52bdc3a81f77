use std::collections::BTreeSet;

use spangen_core::Table;

use crate::errors::GenerateError;
use crate::names::{Inflector, field_name, param_name, type_name};
use crate::packages::PackageRegistry;
use crate::types::{FieldType, resolve_column_type};

/// A column resolved to Go names and types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name as declared in the schema.
    pub column_name: String,
    /// Exported Go field name.
    pub name: String,
    /// Parameter-style name used in function signatures.
    pub param_name: String,
    pub field_type: FieldType,
    /// Go type as written in the current unit.
    pub type_name: String,
    pub is_nullable: bool,
    pub ordinal_position: i16,
    pub is_primary_key: bool,
}

impl Field {
    /// Re-qualify the type in the unit owning `registry`.
    pub fn qualified(&self, registry: &mut PackageRegistry) -> Field {
        Field {
            type_name: self.field_type.type_name(registry),
            ..self.clone()
        }
    }
}

/// A table with all of its names and types resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub table_name: String,
    /// Singular Go type name.
    pub type_name: String,
    /// Fields in ordinal order.
    pub fields: Vec<Field>,
    /// Primary key fields in key order.
    pub primary_keys: Vec<Field>,
    pub parent: Option<String>,
}

impl ResolvedTable {
    pub fn field_by_column(&self, column: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.column_name == column)
    }
}

/// Resolve the Go model of `table`.
pub fn resolve_table(table: &Table, inflector: &Inflector) -> Result<ResolvedTable, GenerateError> {
    let mut columns: Vec<_> = table.columns.iter().collect();
    columns.sort_by_key(|column| column.ordinal_position);

    let mut registry = PackageRegistry::new();
    let mut fields = Vec::with_capacity(columns.len());
    let mut names = BTreeSet::new();
    for column in columns {
        let field_type = resolve_column_type(&table.name, column)?;
        let name = field_name(&column.name);
        if !names.insert(name.clone()) {
            return Err(GenerateError::NameResolutionConflict {
                name,
                scope: table.name.clone(),
            });
        }
        fields.push(Field {
            column_name: column.name.clone(),
            param_name: param_name(&name),
            name,
            type_name: field_type.type_name(&mut registry),
            field_type,
            is_nullable: column.is_nullable,
            ordinal_position: column.ordinal_position,
            is_primary_key: table.primary_key.contains(&column.name),
        });
    }

    let primary_keys = table
        .primary_key
        .iter()
        .map(|column| {
            fields
                .iter()
                .find(|field| &field.column_name == column)
                .cloned()
                .ok_or_else(|| {
                    GenerateError::InvalidSchema(spangen_core::Error::InvalidSchema(format!(
                        "primary key column not found: {}.{}",
                        table.name, column
                    )))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedTable {
        table_name: table.name.clone(),
        type_name: type_name(&table.name, inflector),
        fields,
        primary_keys,
        parent: table.parent.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use spangen_core::{Column, ColumnType};

    fn column(ordinal: i16, name: &str, data_type: &str, nullable: bool) -> Column {
        Column {
            ordinal_position: ordinal,
            name: name.to_string(),
            column_type: ColumnType::new(data_type),
            is_nullable: nullable,
            custom_type: None,
            comment: None,
        }
    }

    fn composite_table() -> Table {
        Table {
            name: "CompositePrimaryKeys".to_string(),
            columns: vec![
                column(2, "PKey1", "STRING(32)", false),
                column(1, "Id", "INT64", false),
                column(3, "PKey2", "INT64", false),
                column(4, "Error", "INT64", false),
            ],
            primary_key: vec!["PKey1".to_string(), "PKey2".to_string()],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            parent: None,
        }
    }

    #[test]
    fn fields_follow_ordinal_order_and_keys_follow_key_order() {
        let resolved = resolve_table(&composite_table(), &Inflector::default()).unwrap();
        let names: Vec<_> = resolved.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["ID", "PKey1", "PKey2", "Error"]);

        let keys: Vec<_> = resolved
            .primary_keys
            .iter()
            .map(|f| f.param_name.as_str())
            .collect();
        assert_eq!(keys, vec!["pKey1", "pKey2"]);
        assert_eq!(resolved.type_name, "CompositePrimaryKey");
    }

    #[test]
    fn reserved_field_params_are_substituted() {
        let resolved = resolve_table(&composite_table(), &Inflector::default()).unwrap();
        let error = resolved.field_by_column("Error").unwrap();
        assert_eq!(error.name, "Error");
        assert_eq!(error.param_name, "e");
        assert!(!error.is_primary_key);
        assert!(resolved.field_by_column("PKey2").unwrap().is_primary_key);
    }

    #[test]
    fn unsupported_column_type_names_the_column() {
        let mut table = composite_table();
        table.columns.push(column(5, "Area", "GEOGRAPHY", false));
        let err = resolve_table(&table, &Inflector::default()).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::UnsupportedType { ref column, .. } if column == "Area"
        ));
    }

    #[test]
    fn columns_mapping_to_one_field_name_conflict() {
        let mut table = composite_table();
        table.columns.push(column(5, "customer_id", "INT64", false));
        table.columns.push(column(6, "CustomerId", "STRING(36)", false));
        let err = resolve_table(&table, &Inflector::default()).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::NameResolutionConflict { ref name, ref scope }
                if name == "CustomerID" && scope == "CompositePrimaryKeys"
        ));
    }
}
