//! Mapping from raw Spanner column types to Go types.

use spangen_core::{Column, ColumnType};

use crate::errors::GenerateError;
use crate::packages::{CIVIL, MATH_BIG, Package, PackageRef, PackageRegistry, SPANNER, TIME};

/// Scalar Spanner type, with any length suffix stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpannerKind {
    Bool,
    Int64,
    Float32,
    Float64,
    Numeric,
    String,
    Bytes,
    Date,
    Timestamp,
    Json,
}

impl SpannerKind {
    pub fn parse(raw: &str) -> Option<Self> {
        let base = match raw.find('(') {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let kind = match base.trim().to_ascii_uppercase().as_str() {
            "BOOL" => SpannerKind::Bool,
            "INT64" => SpannerKind::Int64,
            "FLOAT32" => SpannerKind::Float32,
            "FLOAT64" => SpannerKind::Float64,
            "NUMERIC" => SpannerKind::Numeric,
            "STRING" => SpannerKind::String,
            "BYTES" => SpannerKind::Bytes,
            "DATE" => SpannerKind::Date,
            "TIMESTAMP" => SpannerKind::Timestamp,
            "JSON" => SpannerKind::Json,
            _ => return None,
        };
        Some(kind)
    }

    /// Go type for this kind. Nullable kinds use the Spanner null wrappers so
    /// an explicit NULL stays distinguishable from a zero value.
    pub fn field_type(self, nullable: bool) -> FieldType {
        match (self, nullable) {
            (SpannerKind::Bool, false) => FieldType::builtin("bool"),
            (SpannerKind::Int64, false) => FieldType::builtin("int64"),
            (SpannerKind::Float32, false) => FieldType::builtin("float32"),
            (SpannerKind::Float64, false) => FieldType::builtin("float64"),
            (SpannerKind::Numeric, false) => FieldType::external(MATH_BIG, "Rat"),
            (SpannerKind::String, false) => FieldType::builtin("string"),
            (SpannerKind::Date, false) => FieldType::external(CIVIL, "Date"),
            (SpannerKind::Timestamp, false) => FieldType::external(TIME, "Time"),
            (SpannerKind::Bytes, _) => FieldType::builtin("[]byte"),
            (SpannerKind::Json, _) => FieldType::external(SPANNER, "NullJSON"),
            (SpannerKind::Bool, true) => FieldType::external(SPANNER, "NullBool"),
            (SpannerKind::Int64, true) => FieldType::external(SPANNER, "NullInt64"),
            (SpannerKind::Float32, true) => FieldType::external(SPANNER, "NullFloat32"),
            (SpannerKind::Float64, true) => FieldType::external(SPANNER, "NullFloat64"),
            (SpannerKind::Numeric, true) => FieldType::external(SPANNER, "NullNumeric"),
            (SpannerKind::String, true) => FieldType::external(SPANNER, "NullString"),
            (SpannerKind::Date, true) => FieldType::external(SPANNER, "NullDate"),
            (SpannerKind::Timestamp, true) => FieldType::external(SPANNER, "NullTime"),
        }
    }
}

/// Parsed raw column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawType {
    Scalar(SpannerKind),
    Array(SpannerKind),
}

impl RawType {
    /// Parse `data_type`; nested arrays and unknown kinds yield `None`.
    pub fn parse(data_type: &str) -> Option<Self> {
        let trimmed = data_type.trim();
        let upper = trimmed.to_ascii_uppercase();
        if let Some(inner) = upper
            .strip_prefix("ARRAY")
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix('<'))
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return match RawType::parse(inner)? {
                RawType::Scalar(kind) => Some(RawType::Array(kind)),
                RawType::Array(_) => None,
            };
        }
        SpannerKind::parse(trimmed).map(RawType::Scalar)
    }
}

/// Resolved Go type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A builtin or library type, qualified by its package when it has one.
    Plain {
        name: String,
        package: Option<Package>,
    },
    /// A slice of the element type.
    Array(Box<FieldType>),
    /// A user supplied type, encoded and decoded through the generated helpers.
    Custom {
        name: String,
        package: Option<Package>,
    },
}

impl FieldType {
    fn builtin(name: &str) -> Self {
        FieldType::Plain {
            name: name.to_string(),
            package: None,
        }
    }

    fn external(package: PackageRef, name: &str) -> Self {
        FieldType::Plain {
            name: name.to_string(),
            package: Some(package.to_package()),
        }
    }

    /// Go type as written in the unit owning `registry`, registering the
    /// packages it needs.
    pub fn type_name(&self, registry: &mut PackageRegistry) -> String {
        match self {
            FieldType::Plain { name, package } | FieldType::Custom { name, package } => {
                match package {
                    Some(package) => registry.qualify(package, name),
                    None => name.clone(),
                }
            }
            FieldType::Array(element) => format!("[]{}", element.type_name(registry)),
        }
    }

    /// Packages required by this type, outermost first.
    pub fn packages(&self) -> Vec<Package> {
        match self {
            FieldType::Plain { package, .. } | FieldType::Custom { package, .. } => {
                package.iter().cloned().collect()
            }
            FieldType::Array(element) => element.packages(),
        }
    }

    pub fn is_custom(&self) -> bool {
        match self {
            FieldType::Custom { .. } => true,
            FieldType::Array(element) => element.is_custom(),
            FieldType::Plain { .. } => false,
        }
    }

    /// True for the Spanner null wrappers, which expose `IsNull()`.
    pub fn is_null_wrapper(&self) -> bool {
        match self {
            FieldType::Plain {
                name,
                package: Some(package),
            } => package.path == SPANNER.path && name.starts_with("Null"),
            _ => false,
        }
    }
}

/// Resolve the Go type of `column` in `table`.
///
/// A custom override is trusted verbatim; otherwise the raw type is mapped.
pub fn resolve_column_type(table: &str, column: &Column) -> Result<FieldType, GenerateError> {
    if let Some(custom) = column.custom_type.as_deref() {
        return Ok(custom_field_type(custom));
    }

    match RawType::parse(&column.column_type.data_type) {
        Some(RawType::Scalar(kind)) => Ok(kind.field_type(column.is_nullable)),
        Some(RawType::Array(kind)) => Ok(FieldType::Array(Box::new(kind.field_type(false)))),
        None => Err(GenerateError::UnsupportedType {
            table: table.to_string(),
            column: column.name.clone(),
            data_type: column.column_type.data_type.clone(),
        }),
    }
}

/// Types are compatible when their kinds and array-ness match.
pub fn compatible(left: &ColumnType, right: &ColumnType) -> bool {
    match (
        RawType::parse(&left.data_type),
        RawType::parse(&right.data_type),
    ) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Split `path/to/pkg.Type` into a package and a type name.
fn custom_field_type(custom: &str) -> FieldType {
    let custom = custom.trim();
    let (dir, last) = match custom.rsplit_once('/') {
        Some((dir, last)) => (Some(dir), last),
        None => (None, custom),
    };

    match last.split_once('.') {
        Some((pkg, name)) if !pkg.is_empty() && !name.is_empty() => {
            let path = match dir {
                Some(dir) => format!("{dir}/{pkg}"),
                None => pkg.to_string(),
            };
            FieldType::Custom {
                name: name.to_string(),
                package: Some(Package::new(path, pkg)),
            }
        }
        _ => FieldType::Custom {
            name: custom.to_string(),
            package: None,
        },
    }
}
