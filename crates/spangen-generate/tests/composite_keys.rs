use spangen_core::{Column, ColumnType, DatabaseSchema, Index, Table};
use spangen_generate::{GenerateOptions, Generator, GoRenderer};

fn column(ordinal: i16, name: &str, data_type: &str) -> Column {
    Column {
        ordinal_position: ordinal,
        name: name.to_string(),
        column_type: ColumnType::new(data_type),
        is_nullable: false,
        custom_type: None,
        comment: None,
    }
}

fn index(name: &str, columns: &[&str]) -> Index {
    Index {
        name: name.to_string(),
        columns: columns.iter().map(|c| c.to_string()).collect(),
        is_unique: false,
        storing: Vec::new(),
    }
}

fn schema_fixture() -> DatabaseSchema {
    DatabaseSchema {
        schema_version: spangen_core::SCHEMA_VERSION.to_string(),
        database: None,
        tables: vec![Table {
            name: "CompositePrimaryKeys".to_string(),
            columns: vec![
                column(1, "Id", "INT64"),
                column(2, "PKey1", "STRING(32)"),
                column(3, "PKey2", "INT64"),
                column(4, "Error", "INT64"),
                column(5, "X", "STRING(32)"),
                column(6, "Y", "STRING(32)"),
                column(7, "Z", "STRING(32)"),
            ],
            primary_key: vec!["PKey1".to_string(), "PKey2".to_string()],
            indexes: vec![
                index("CompositePrimaryKeysByError", &["Error"]),
                index("CompositePrimaryKeysByXY", &["X", "Y"]),
            ],
            foreign_keys: Vec::new(),
            parent: None,
        }],
    }
}

fn render() -> String {
    let generation = Generator::new(GenerateOptions::default(), GoRenderer)
        .generate(&schema_fixture())
        .expect("generation succeeds");
    generation
        .artifact("CompositePrimaryKeys")
        .expect("table artifact")
        .text
        .clone()
}

#[test]
fn header_imports_only_what_the_table_uses() {
    let text = render();
    assert!(text.starts_with(
        "// Code generated by spangen from table 'CompositePrimaryKeys'. DO NOT EDIT.\n\
         // Package models contains the types.\n\
         package models\n\
         \n\
         import (\n\
         \t\"context\"\n\
         \t\"fmt\"\n\
         \n\
         \t\"cloud.google.com/go/spanner\"\n\
         \t\"google.golang.org/api/iterator\"\n\
         \t\"google.golang.org/grpc/codes\"\n\
         )\n"
    ));
}

#[test]
fn struct_fields_are_aligned_and_tagged() {
    let text = render();
    assert!(text.contains(
        "type CompositePrimaryKey struct {\n\
         \tID    int64  `spanner:\"Id\" json:\"Id\"`       // Id\n\
         \tPKey1 string `spanner:\"PKey1\" json:\"PKey1\"` // PKey1\n\
         \tPKey2 int64  `spanner:\"PKey2\" json:\"PKey2\"` // PKey2\n\
         \tError int64  `spanner:\"Error\" json:\"Error\"` // Error\n\
         \tX     string `spanner:\"X\" json:\"X\"`         // X\n\
         \tY     string `spanner:\"Y\" json:\"Y\"`         // Y\n\
         \tZ     string `spanner:\"Z\" json:\"Z\"`         // Z\n\
         }\n"
    ));
}

#[test]
fn primary_key_lookup_uses_key_order() {
    let text = render();
    assert!(text.contains(
        "func CompositePrimaryKeyPrimaryKeys() []string {\n\treturn []string{\n\t\t\"PKey1\",\n\t\t\"PKey2\",\n\t}\n}\n"
    ));
    assert!(text.contains(
        "func FindCompositePrimaryKey(ctx context.Context, db SpangenRODB, pKey1 string, pKey2 int64) (*CompositePrimaryKey, error) {\n\
         \tkey := spanner.Key{pKey1, pKey2}\n"
    ));
    assert!(text.contains("func (cpk *CompositePrimaryKey) Delete(ctx context.Context) *spanner.Mutation {"));
}

#[test]
fn index_finders_use_safe_parameter_names() {
    let text = render();
    assert!(text.contains(
        "func FindCompositePrimaryKeysByError(ctx context.Context, db SpangenRODB, e int64) ([]*CompositePrimaryKey, error) {"
    ));
    assert!(text.contains("\tstmt.Params[\"param0\"] = e\n"));
    assert!(text.contains("\tSpangenLog(ctx, sqlstr, e)\n"));
    assert!(text.contains(
        "\tconst sqlstr = \"SELECT \" +\n\
         \t\t\"Id, PKey1, PKey2, Error, X, Y, Z \" +\n\
         \t\t\"FROM CompositePrimaryKeys@{FORCE_INDEX=CompositePrimaryKeysByXY} \" +\n\
         \t\t\"WHERE X = @param0 AND Y = @param1\"\n"
    ));
    assert!(text.contains(
        "func FindCompositePrimaryKeysByXY(ctx context.Context, db SpangenRODB, x string, y string) ([]*CompositePrimaryKey, error) {"
    ));
}

#[test]
fn batch_mutations_cover_every_kind() {
    let text = render();
    for func in [
        "func InsertCompositePrimaryKeyAll(",
        "func UpdateCompositePrimaryKeyAll(",
        "func InsertOrUpdateCompositePrimaryKeyAll(",
        "func UpdateCompositePrimaryKeyColumnsAll(",
        "func DeleteCompositePrimaryKeyAll(",
    ] {
        assert!(text.contains(func), "missing {func}");
    }
}
