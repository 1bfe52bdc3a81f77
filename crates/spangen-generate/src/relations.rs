//! Cross-references indexes and foreign keys against resolved tables.

use spangen_core::{DatabaseSchema, ForeignKey, Index, Table};

use crate::errors::GenerateError;
use crate::resolve::{Field, ResolvedTable};
use crate::types::compatible;

/// An index with its columns resolved to fields of the owning table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedIndex {
    pub name: String,
    pub is_unique: bool,
    /// Key fields in index order.
    pub fields: Vec<Field>,
    pub storing: Vec<Field>,
}

/// A foreign key with both sides resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedForeignKey {
    pub name: String,
    /// Referencing table and its type name.
    pub table: String,
    pub type_name: String,
    pub fields: Vec<Field>,
    pub referenced_table: String,
    pub referenced_type_name: String,
    pub referenced_fields: Vec<Field>,
    /// True when the referenced columns are exactly the referenced primary key.
    pub references_primary_key: bool,
}

/// Relations of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableLinks {
    pub indexes: Vec<LinkedIndex>,
    pub foreign_keys: Vec<LinkedForeignKey>,
    /// Foreign keys of other tables pointing at this one.
    pub referenced_by: Vec<LinkedForeignKey>,
}

/// Relations of every table, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedSchema {
    tables: Vec<(String, TableLinks)>,
}

impl LinkedSchema {
    pub fn links(&self, table: &str) -> Option<&TableLinks> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, links)| links)
    }
}

/// Link indexes and foreign keys of `schema` against `resolved`.
pub fn link(resolved: &[ResolvedTable], schema: &DatabaseSchema) -> Result<LinkedSchema, GenerateError> {
    let mut tables = Vec::with_capacity(schema.tables.len());
    for table in &schema.tables {
        let owner = find_resolved(resolved, &table.name)?;
        let indexes = table
            .indexes
            .iter()
            .map(|index| link_index(owner, index))
            .collect::<Result<Vec<_>, _>>()?;
        let foreign_keys = table
            .foreign_keys
            .iter()
            .map(|fk| link_foreign_key(resolved, schema, table, owner, fk))
            .collect::<Result<Vec<_>, _>>()?;
        tables.push((
            table.name.clone(),
            TableLinks {
                indexes,
                foreign_keys,
                referenced_by: Vec::new(),
            },
        ));
    }

    let incoming: Vec<LinkedForeignKey> = tables
        .iter()
        .flat_map(|(_, links)| links.foreign_keys.iter().cloned())
        .collect();
    for fk in incoming {
        if let Some((_, links)) = tables
            .iter_mut()
            .find(|(name, _)| *name == fk.referenced_table)
        {
            links.referenced_by.push(fk);
        }
    }

    Ok(LinkedSchema { tables })
}

fn find_resolved<'a>(
    resolved: &'a [ResolvedTable],
    table: &str,
) -> Result<&'a ResolvedTable, GenerateError> {
    resolved
        .iter()
        .find(|candidate| candidate.table_name == table)
        .ok_or_else(|| {
            GenerateError::InvalidSchema(spangen_core::Error::InvalidSchema(format!(
                "table not resolved: {table}"
            )))
        })
}

fn link_index(owner: &ResolvedTable, index: &Index) -> Result<LinkedIndex, GenerateError> {
    let resolve = |column: &String| {
        owner
            .field_by_column(column)
            .cloned()
            .ok_or_else(|| GenerateError::DanglingIndexColumn {
                table: owner.table_name.clone(),
                index: index.name.clone(),
                column: column.clone(),
            })
    };

    Ok(LinkedIndex {
        name: index.name.clone(),
        is_unique: index.is_unique,
        fields: index.columns.iter().map(resolve).collect::<Result<_, _>>()?,
        storing: index.storing.iter().map(resolve).collect::<Result<_, _>>()?,
    })
}

fn link_foreign_key(
    resolved: &[ResolvedTable],
    schema: &DatabaseSchema,
    table: &Table,
    owner: &ResolvedTable,
    fk: &ForeignKey,
) -> Result<LinkedForeignKey, GenerateError> {
    let incompatible = |reason: String| GenerateError::IncompatibleForeignKey {
        table: table.name.clone(),
        foreign_key: fk.name.clone(),
        reason,
    };

    let referenced = schema
        .table(&fk.referenced_table)
        .ok_or_else(|| incompatible(format!("referenced table {} not found", fk.referenced_table)))?;
    let referenced_owner = resolved
        .iter()
        .find(|candidate| candidate.table_name == referenced.name)
        .ok_or_else(|| incompatible(format!("referenced table {} not resolved", referenced.name)))?;

    if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
        return Err(incompatible(format!(
            "{} referencing columns but {} referenced columns",
            fk.columns.len(),
            fk.referenced_columns.len()
        )));
    }

    let mut fields = Vec::with_capacity(fk.columns.len());
    let mut referenced_fields = Vec::with_capacity(fk.columns.len());
    for (column, referenced_column) in fk.columns.iter().zip(&fk.referenced_columns) {
        let local = table
            .column(column)
            .ok_or_else(|| incompatible(format!("column {column} not found")))?;
        let remote = referenced.column(referenced_column).ok_or_else(|| {
            incompatible(format!(
                "referenced column {}.{referenced_column} not found",
                referenced.name
            ))
        })?;
        if !compatible(&local.column_type, &remote.column_type) {
            return Err(incompatible(format!(
                "{column} ({}) does not match {}.{referenced_column} ({})",
                local.column_type.data_type, referenced.name, remote.column_type.data_type
            )));
        }

        fields.push(
            owner
                .field_by_column(column)
                .cloned()
                .ok_or_else(|| incompatible(format!("column {column} not resolved")))?,
        );
        referenced_fields.push(
            referenced_owner
                .field_by_column(referenced_column)
                .cloned()
                .ok_or_else(|| {
                    incompatible(format!("referenced column {referenced_column} not resolved"))
                })?,
        );
    }

    let references_primary_key = referenced.primary_key == fk.referenced_columns;
    Ok(LinkedForeignKey {
        name: fk.name.clone(),
        table: table.name.clone(),
        type_name: owner.type_name.clone(),
        fields,
        referenced_table: referenced.name.clone(),
        referenced_type_name: referenced_owner.type_name.clone(),
        referenced_fields,
        references_primary_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names::Inflector;
    use crate::resolve::resolve_table;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> DatabaseSchema {
        serde_json::from_value(value).expect("schema fixture")
    }

    fn shop() -> serde_json::Value {
        json!({
            "schema_version": "0.1",
            "tables": [
                {
                    "name": "Customers",
                    "columns": [
                        {"ordinal_position": 1, "name": "Id", "column_type": {"data_type": "STRING(36)"}, "is_nullable": false},
                        {"ordinal_position": 2, "name": "Email", "column_type": {"data_type": "STRING(MAX)"}, "is_nullable": false}
                    ],
                    "primary_key": ["Id"],
                    "indexes": [
                        {"name": "CustomersByEmail", "columns": ["Email"], "is_unique": true}
                    ]
                },
                {
                    "name": "Orders",
                    "columns": [
                        {"ordinal_position": 1, "name": "Id", "column_type": {"data_type": "STRING(36)"}, "is_nullable": false},
                        {"ordinal_position": 2, "name": "CustomerId", "column_type": {"data_type": "STRING(MAX)"}, "is_nullable": false},
                        {"ordinal_position": 3, "name": "Status", "column_type": {"data_type": "STRING(16)"}, "is_nullable": true}
                    ],
                    "primary_key": ["Id"],
                    "indexes": [
                        {"name": "OrdersByStatus", "columns": ["Status"], "storing": ["CustomerId"]}
                    ],
                    "foreign_keys": [
                        {"name": "FK_Orders_Customers", "columns": ["CustomerId"], "referenced_table": "Customers", "referenced_columns": ["Id"]}
                    ]
                },
                {
                    "name": "Reviews",
                    "columns": [
                        {"ordinal_position": 1, "name": "Id", "column_type": {"data_type": "INT64"}, "is_nullable": false},
                        {"ordinal_position": 2, "name": "Author", "column_type": {"data_type": "STRING(36)"}, "is_nullable": true}
                    ],
                    "primary_key": ["Id"],
                    "foreign_keys": [
                        {"name": "FK_Reviews_Customers", "columns": ["Author"], "referenced_table": "Customers", "referenced_columns": ["Id"]}
                    ]
                }
            ]
        })
    }

    fn linked(value: serde_json::Value) -> Result<LinkedSchema, GenerateError> {
        let schema = schema(value);
        let inflector = Inflector::default();
        let resolved = schema
            .tables
            .iter()
            .map(|table| resolve_table(table, &inflector))
            .collect::<Result<Vec<_>, _>>()?;
        link(&resolved, &schema)
    }

    #[test]
    fn links_indexes_in_declaration_order() {
        let linked = linked(shop()).unwrap();
        let orders = linked.links("Orders").unwrap();
        assert_eq!(orders.indexes.len(), 1);
        let index = &orders.indexes[0];
        assert!(!index.is_unique);
        assert_eq!(index.fields[0].name, "Status");
        assert_eq!(index.storing[0].column_name, "CustomerId");

        let customers = linked.links("Customers").unwrap();
        assert!(customers.indexes[0].is_unique);
    }

    #[test]
    fn links_foreign_keys_both_directions() {
        let linked = linked(shop()).unwrap();
        let fk = &linked.links("Orders").unwrap().foreign_keys[0];
        assert_eq!(fk.referenced_type_name, "Customer");
        assert_eq!(fk.fields[0].name, "CustomerID");
        assert_eq!(fk.referenced_fields[0].name, "ID");
        assert!(fk.references_primary_key);

        let incoming: Vec<_> = linked
            .links("Customers")
            .unwrap()
            .referenced_by
            .iter()
            .map(|fk| fk.name.as_str())
            .collect();
        assert_eq!(incoming, vec!["FK_Orders_Customers", "FK_Reviews_Customers"]);
        assert!(linked.links("Orders").unwrap().referenced_by.is_empty());
    }

    #[test]
    fn dangling_index_column_is_reported() {
        let mut value = shop();
        value["tables"][1]["indexes"][0]["columns"] = json!(["Missing"]);
        let err = linked(value).unwrap_err();
        assert!(matches!(
            err,
            GenerateError::DanglingIndexColumn { ref table, ref index, ref column }
                if table == "Orders" && index == "OrdersByStatus" && column == "Missing"
        ));
    }

    #[test]
    fn dangling_storing_column_is_reported() {
        let mut value = shop();
        value["tables"][1]["indexes"][0]["storing"] = json!(["Gone"]);
        assert!(matches!(
            linked(value).unwrap_err(),
            GenerateError::DanglingIndexColumn { ref column, .. } if column == "Gone"
        ));
    }

    #[test]
    fn foreign_key_type_mismatch_is_incompatible() {
        let mut value = shop();
        value["tables"][2]["columns"][1]["column_type"]["data_type"] = json!("INT64");
        let err = linked(value).unwrap_err();
        match err {
            GenerateError::IncompatibleForeignKey {
                table,
                foreign_key,
                reason,
            } => {
                assert_eq!(table, "Reviews");
                assert_eq!(foreign_key, "FK_Reviews_Customers");
                assert!(reason.contains("INT64"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn foreign_key_to_missing_table_is_incompatible() {
        let mut value = shop();
        value["tables"][1]["foreign_keys"][0]["referenced_table"] = json!("Accounts");
        assert!(matches!(
            linked(value).unwrap_err(),
            GenerateError::IncompatibleForeignKey { ref reason, .. } if reason.contains("Accounts")
        ));
    }

    #[test]
    fn foreign_key_column_count_mismatch_is_incompatible() {
        let mut value = shop();
        value["tables"][1]["foreign_keys"][0]["referenced_columns"] = json!(["Id", "Email"]);
        assert!(matches!(
            linked(value).unwrap_err(),
            GenerateError::IncompatibleForeignKey { .. }
        ));
    }
}
