//! Pure helpers used by renderers to turn ordered field lists into code
//! fragments.

use crate::resolve::Field;

/// Spanner GoogleSQL reserved keywords; column names matching one are quoted.
const SPANNER_RESERVED: &[&str] = &[
    "ALL",
    "AND",
    "ANY",
    "ARRAY",
    "AS",
    "ASC",
    "ASSERT_ROWS_MODIFIED",
    "AT",
    "BETWEEN",
    "BY",
    "CASE",
    "CAST",
    "COLLATE",
    "CONTAINS",
    "CREATE",
    "CROSS",
    "CUBE",
    "CURRENT",
    "DEFAULT",
    "DEFINE",
    "DESC",
    "DISTINCT",
    "ELSE",
    "END",
    "ENUM",
    "ESCAPE",
    "EXCEPT",
    "EXCLUDE",
    "EXISTS",
    "EXTRACT",
    "FALSE",
    "FETCH",
    "FOLLOWING",
    "FOR",
    "FROM",
    "FULL",
    "GROUP",
    "GROUPING",
    "GROUPS",
    "HASH",
    "HAVING",
    "IF",
    "IGNORE",
    "IN",
    "INNER",
    "INTERSECT",
    "INTERVAL",
    "INTO",
    "IS",
    "JOIN",
    "LATERAL",
    "LEFT",
    "LIKE",
    "LIMIT",
    "LOOKUP",
    "MERGE",
    "NATURAL",
    "NEW",
    "NO",
    "NOT",
    "NULL",
    "NULLS",
    "OF",
    "ON",
    "OR",
    "ORDER",
    "OUTER",
    "OVER",
    "PARTITION",
    "PRECEDING",
    "PROTO",
    "RANGE",
    "RECURSIVE",
    "RESPECT",
    "RIGHT",
    "ROLLUP",
    "ROWS",
    "SELECT",
    "SET",
    "SOME",
    "STRUCT",
    "TABLESAMPLE",
    "THEN",
    "TO",
    "TREAT",
    "TRUE",
    "UNBOUNDED",
    "UNION",
    "UNNEST",
    "USING",
    "WHEN",
    "WHERE",
    "WINDOW",
    "WITH",
    "WITHIN",
];

/// Name of the generated helper that encodes custom values for queries.
pub const ENCODE_HELPER: &str = "spangenEncode";
/// Name of the generated interface implemented by custom nullable values.
pub const IS_NULL_HELPER: &str = "spangenIsNull";

/// `fields` without the ones whose Go name is in `ignore`, order preserved.
pub fn filter_fields(fields: &[Field], ignore: &[&str]) -> Vec<Field> {
    fields
        .iter()
        .filter(|field| !ignore.contains(&field.name.as_str()))
        .cloned()
        .collect()
}

/// Column name quoted with backticks when it is a reserved keyword.
pub fn escape_column(column: &str) -> String {
    let upper = column.to_ascii_uppercase();
    if SPANNER_RESERVED.contains(&upper.as_str()) {
        format!("`{column}`")
    } else {
        column.to_string()
    }
}

/// Query placeholder for the `n`th parameter.
pub fn nth_param(n: usize) -> String {
    format!("@param{n}")
}

/// `A, B, C` with reserved names escaped.
pub fn column_names(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| escape_column(&field.column_name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `A = @param0{sep}B = @param1`.
pub fn column_names_query(fields: &[Field], sep: &str) -> String {
    fields
        .iter()
        .enumerate()
        .map(|(n, field)| format!("{} = {}", escape_column(&field.column_name), nth_param(n)))
        .collect::<Vec<_>>()
        .join(sep)
}

/// `p.FieldA, p.FieldB`.
pub fn field_names(fields: &[Field], prefix: &str) -> String {
    fields
        .iter()
        .map(|field| format!("{prefix}.{}", field.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `a, b`, prefixed with `, ` when `add_prefix` and non-empty.
pub fn params(fields: &[Field], add_prefix: bool) -> String {
    join_params(fields, add_prefix, |_, param| param)
}

/// `a T1, b T2` using each field's unit-qualified type.
pub fn param_defs(fields: &[Field], add_prefix: bool) -> String {
    join_params(fields, add_prefix, |field, param| {
        format!("{param} {}", field.type_name)
    })
}

/// Like `params`, with custom-typed values wrapped in `spangenEncode`.
pub fn encoded_params(fields: &[Field], add_prefix: bool) -> String {
    join_params(fields, add_prefix, |field, param| {
        if field.field_type.is_custom() {
            encoded_param(&param)
        } else {
            param
        }
    })
}

pub fn encoded_param(param: &str) -> String {
    format!("{ENCODE_HELPER}({param})")
}

pub fn has_column(fields: &[Field], column: &str) -> bool {
    fields.iter().any(|field| field.column_name == column)
}

pub fn has_field(fields: &[Field], name: &str) -> bool {
    fields.iter().any(|field| field.name == name)
}

/// Go condition that is true when the parameter for `field` holds NULL.
pub fn nullcheck(field: &Field) -> String {
    let param = &field.param_name;
    if field.field_type.is_null_wrapper() {
        format!("{param}.IsNull()")
    } else {
        format!("sg, ok := interface{{}}({param}).({IS_NULL_HELPER}); ok && sg.IsNull()")
    }
}

fn join_params(fields: &[Field], add_prefix: bool, render: impl Fn(&Field, String) -> String) -> String {
    let joined = fields
        .iter()
        .enumerate()
        .map(|(n, field)| {
            let param = if field.param_name.is_empty() {
                format!("v{n}")
            } else {
                field.param_name.clone()
            };
            render(field, param)
        })
        .collect::<Vec<_>>()
        .join(", ");

    if add_prefix && !joined.is_empty() {
        format!(", {joined}")
    } else {
        joined
    }
}
