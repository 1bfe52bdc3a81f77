use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::schema::DatabaseSchema;

/// Validate internal consistency of a database schema.
///
/// This checks:
/// - duplicate tables/columns
/// - primary key is non-empty, without duplicates, and its columns exist
///
/// Index and foreign key references are resolved later by the relation
/// linker, which reports them with dedicated errors.
pub fn validate_schema(schema: &DatabaseSchema) -> Result<()> {
    let mut catalog: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for table in &schema.tables {
        if catalog.contains_key(table.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "duplicate table name: {}",
                table.name
            )));
        }

        let mut columns = BTreeSet::new();
        for column in &table.columns {
            if !columns.insert(column.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate column name: {}.{}",
                    table.name, column.name
                )));
            }
        }

        catalog.insert(table.name.as_str(), columns);
    }

    for table in &schema.tables {
        let columns = catalog.get(table.name.as_str()).ok_or_else(|| {
            Error::InvalidSchema(format!("missing table in catalog: {}", table.name))
        })?;

        if table.primary_key.is_empty() {
            return Err(Error::InvalidSchema(format!(
                "table has no primary key: {}",
                table.name
            )));
        }

        let mut seen = BTreeSet::new();
        for column in &table.primary_key {
            if !columns.contains(column.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "primary key column not found: {}.{}",
                    table.name, column
                )));
            }
            if !seen.insert(column.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate primary key column: {}.{}",
                    table.name, column
                )));
            }
        }

        if let Some(parent) = &table.parent {
            if !catalog.contains_key(parent.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "parent table not found: {} (interleaved in {})",
                    parent, table.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, Table};
    use crate::types::ColumnType;

    fn column(ordinal: i16, name: &str) -> Column {
        Column {
            ordinal_position: ordinal,
            name: name.to_string(),
            column_type: ColumnType::new("INT64"),
            is_nullable: false,
            custom_type: None,
            comment: None,
        }
    }

    fn table(name: &str, columns: &[&str], primary_key: &[&str]) -> Table {
        Table {
            name: name.to_string(),
            columns: columns
                .iter()
                .enumerate()
                .map(|(idx, name)| column(idx as i16 + 1, name))
                .collect(),
            primary_key: primary_key.iter().map(|name| name.to_string()).collect(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            parent: None,
        }
    }

    fn schema(tables: Vec<Table>) -> DatabaseSchema {
        DatabaseSchema {
            schema_version: "0.1".to_string(),
            database: None,
            tables,
        }
    }

    #[test]
    fn accepts_composite_primary_key() {
        let schema = schema(vec![table(
            "CompositePrimaryKeys",
            &["Id", "PKey1", "PKey2"],
            &["PKey1", "PKey2"],
        )]);
        assert!(validate_schema(&schema).is_ok());
    }

    #[test]
    fn rejects_duplicate_columns() {
        let schema = schema(vec![table("Users", &["Id", "Id"], &["Id"])]);
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("duplicate column name: Users.Id"));
    }

    #[test]
    fn rejects_empty_primary_key() {
        let schema = schema(vec![table("Users", &["Id"], &[])]);
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("no primary key"));
    }

    #[test]
    fn rejects_unknown_primary_key_column() {
        let schema = schema(vec![table("Users", &["Id"], &["UserId"])]);
        let err = validate_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("primary key column not found: Users.UserId"));
    }

    #[test]
    fn rejects_missing_parent() {
        let mut child = table("Items", &["Id"], &["Id"]);
        child.parent = Some("Orders".to_string());
        let err = validate_schema(&schema(vec![child])).unwrap_err();
        assert!(err.to_string().contains("parent table not found"));
    }
}
