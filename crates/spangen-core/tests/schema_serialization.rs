use spangen_core::{Column, ColumnType, DatabaseSchema, Index, Table};

#[test]
fn serializes_schema_deterministically() {
    let schema = DatabaseSchema {
        schema_version: "0.1".to_string(),
        database: Some("db".to_string()),
        tables: vec![Table {
            name: "Orders".to_string(),
            columns: vec![Column {
                ordinal_position: 1,
                name: "Id".to_string(),
                column_type: ColumnType::new("INT64"),
                is_nullable: false,
                custom_type: None,
                comment: None,
            }],
            primary_key: vec!["Id".to_string()],
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            parent: None,
        }],
    };

    let json = serde_json::to_string_pretty(&schema).expect("serialize schema");
    let expected = r#"{
  "schema_version": "0.1",
  "database": "db",
  "tables": [
    {
      "name": "Orders",
      "columns": [
        {
          "ordinal_position": 1,
          "name": "Id",
          "column_type": {
            "data_type": "INT64"
          },
          "is_nullable": false
        }
      ],
      "primary_key": [
        "Id"
      ],
      "indexes": [],
      "foreign_keys": []
    }
  ]
}"#;
    assert_eq!(json, expected);
}

#[test]
fn deserializes_with_optional_sections_missing() {
    let json = r#"{
        "schema_version": "0.1",
        "tables": [
            {
                "name": "Orders",
                "columns": [
                    {
                        "ordinal_position": 1,
                        "name": "Id",
                        "column_type": { "data_type": "INT64" },
                        "is_nullable": false
                    }
                ],
                "primary_key": ["Id"]
            }
        ]
    }"#;

    let schema: DatabaseSchema = serde_json::from_str(json).expect("parse schema");
    assert_eq!(schema.database, None);
    let table = schema.table("Orders").expect("table exists");
    assert!(table.indexes.is_empty());
    assert!(table.foreign_keys.is_empty());
    assert!(table.column("Id").is_some());
}

#[test]
fn index_defaults_to_non_unique() {
    let index: Index =
        serde_json::from_str(r#"{"name": "OrdersByStatus", "columns": ["Status"]}"#)
            .expect("parse index");
    assert!(!index.is_unique);
    assert!(index.storing.is_empty());
}
