//! Go identifier derivation: field names, parameter names, short names and
//! table/type inflection.

use std::collections::{BTreeMap, BTreeSet};

use heck::ToSnakeCase;
use serde_json::Value;
use tracing::debug;

use crate::errors::GenerateError;
use crate::resolve::Field;

/// Go keywords and predeclared types, with their safe replacements.
const GO_RESERVED: &[(&str, &str)] = &[
    ("break", "brk"),
    ("case", "cs"),
    ("chan", "chn"),
    ("const", "cnst"),
    ("continue", "cnt"),
    ("default", "def"),
    ("defer", "dfr"),
    ("else", "els"),
    ("fallthrough", "flthrough"),
    ("for", "fr"),
    ("func", "fn"),
    ("go", "goVal"),
    ("goto", "gt"),
    ("if", "ifVal"),
    ("import", "imp"),
    ("interface", "iface"),
    ("map", "mp"),
    ("package", "pkg"),
    ("range", "rnge"),
    ("return", "ret"),
    ("select", "slct"),
    ("struct", "strct"),
    ("switch", "swtch"),
    ("type", "typ"),
    ("var", "vr"),
    ("error", "e"),
    ("bool", "b"),
    ("string", "str"),
    ("byte", "byt"),
    ("rune", "r"),
    ("uintptr", "uptr"),
    ("int", "i"),
    ("int8", "i8"),
    ("int16", "i16"),
    ("int32", "i32"),
    ("int64", "i64"),
    ("uint", "u"),
    ("uint8", "u8"),
    ("uint16", "u16"),
    ("uint32", "u32"),
    ("uint64", "u64"),
    ("float32", "z"),
    ("float64", "f"),
    ("complex64", "c"),
    ("complex128", "c128"),
];

/// Words written fully upper-case in Go identifiers.
const INITIALISMS: &[&str] = &[
    "ACL", "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID",
    "IP", "JSON", "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SQL", "SSH", "TCP", "TLS",
    "TTL", "UDP", "UI", "UID", "URI", "URL", "UTF8", "UUID", "VM", "XML", "XSRF", "XSS",
];

/// Replacement for `name` when it is a Go reserved word.
pub fn reserved_substitute(name: &str) -> Option<&'static str> {
    GO_RESERVED
        .iter()
        .find(|(reserved, _)| *reserved == name)
        .map(|(_, safe)| *safe)
}

pub fn is_reserved(name: &str) -> bool {
    reserved_substitute(name).is_some()
}

/// Lower-case words of `raw`, whatever its casing convention.
pub fn words(raw: &str) -> Vec<String> {
    raw.to_snake_case()
        .split('_')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Exported Go identifier for a schema name (`customer_id` -> `CustomerID`).
pub fn field_name(raw: &str) -> String {
    let mut name = String::new();
    for word in words(raw) {
        let upper = word.to_ascii_uppercase();
        if INITIALISMS.contains(&upper.as_str()) {
            name.push_str(&upper);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                name.extend(first.to_uppercase());
                name.push_str(chars.as_str());
            }
        }
    }

    if name.is_empty() {
        return "Field".to_string();
    }
    if name.starts_with(|ch: char| ch.is_ascii_digit()) {
        name.insert(0, 'X');
    }

    match reserved_substitute(&name) {
        Some(safe) => safe.to_string(),
        None => name,
    }
}

/// Parameter-style name: only the first word is lower-cased
/// (`CustomerID` -> `customerID`), then reserved words are substituted.
pub fn param_name(raw: &str) -> String {
    let first = words(raw).into_iter().next().unwrap_or_default();
    let prefix_len = first.chars().count();
    let prefix: String = raw.chars().take(prefix_len).collect();

    let mut name = if prefix.to_lowercase() == first {
        let rest: String = raw.chars().skip(prefix_len).collect();
        format!("{first}{rest}")
    } else {
        let mut chars = raw.chars();
        match chars.next() {
            Some(head) => head.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    };

    if let Some(safe) = reserved_substitute(&name.to_lowercase()) {
        name = safe.to_string();
    }
    name
}

/// An identifier set a short name must not collide with.
#[derive(Debug, Clone, Copy)]
pub enum ScopeConflict<'a> {
    Name(&'a str),
    /// Conflicts with each field's Go name and parameter name.
    Fields(&'a [Field]),
}

impl ScopeConflict<'_> {
    fn contains(&self, candidate: &str) -> bool {
        match self {
            ScopeConflict::Name(name) => *name == candidate,
            ScopeConflict::Fields(fields) => fields
                .iter()
                .any(|field| field.name == candidate || field.param_name == candidate),
        }
    }

    fn size(&self) -> usize {
        match self {
            ScopeConflict::Name(_) => 1,
            ScopeConflict::Fields(fields) => fields.len() * 2,
        }
    }
}

/// Conflicting names read from loosely typed configuration: a single name or
/// a list of names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicConflicts(pub Vec<String>);

impl TryFrom<&Value> for DynamicConflicts {
    type Error = GenerateError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(DynamicConflicts(vec![name.clone()])),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(name) => Ok(name.clone()),
                    other => Err(GenerateError::UnsupportedConflictKind(kind_of(other))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(DynamicConflicts),
            other => Err(GenerateError::UnsupportedConflictKind(kind_of(other))),
        }
    }
}

fn kind_of(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}

/// Run-scoped short name derivation with its memo.
#[derive(Debug, Clone)]
pub struct ShortNames {
    cache: BTreeMap<String, String>,
    suffix: String,
    always_conflicting: BTreeSet<String>,
}

impl ShortNames {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            cache: BTreeMap::new(),
            suffix: suffix.into(),
            always_conflicting: BTreeSet::new(),
        }
    }

    /// Names that conflict in every scope (e.g. imported package names).
    pub fn with_always_conflicting<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_conflicting
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Short identifier for `type_name` (`CompositePrimaryKey` -> `cpk`).
    ///
    /// The derived base is memoized per type name. The conflict suffix is
    /// appended until the candidate is free in `conflicts`.
    pub fn short_name(
        &mut self,
        type_name: &str,
        conflicts: &[ScopeConflict<'_>],
    ) -> Result<String, GenerateError> {
        let base = match self.cache.get(type_name) {
            Some(cached) => {
                debug!(type_name = %type_name, short_name = %cached, "short name memo hit");
                cached.clone()
            }
            None => {
                let derived = derive_short_name(type_name);
                self.cache.insert(type_name.to_string(), derived.clone());
                derived
            }
        };

        let limit = conflicts.iter().map(ScopeConflict::size).sum::<usize>()
            + self.always_conflicting.len()
            + 1;
        let mut candidate = base;
        for _ in 0..=limit {
            if !self.collides(&candidate, conflicts) {
                return Ok(candidate);
            }
            candidate.push_str(&self.suffix);
        }

        Err(GenerateError::NameResolutionConflict {
            name: type_name.to_string(),
            scope: conflict_scope(conflicts),
        })
    }

    pub fn cached(&self, type_name: &str) -> Option<&str> {
        self.cache.get(type_name).map(String::as_str)
    }

    fn collides(&self, candidate: &str, conflicts: &[ScopeConflict<'_>]) -> bool {
        self.always_conflicting.contains(candidate)
            || conflicts.iter().any(|conflict| conflict.contains(candidate))
    }
}

fn derive_short_name(type_name: &str) -> String {
    let short: String = words(type_name)
        .iter()
        .filter(|word| word.as_str() != "id")
        .filter_map(|word| word.chars().next())
        .collect();
    let short = if short.is_empty() {
        "v".to_string()
    } else {
        short
    };

    match reserved_substitute(&short) {
        Some(safe) => safe.to_string(),
        None => short,
    }
}

fn conflict_scope(conflicts: &[ScopeConflict<'_>]) -> String {
    conflicts
        .iter()
        .map(|conflict| match conflict {
            ScopeConflict::Name(name) => name.to_string(),
            ScopeConflict::Fields(fields) => fields
                .iter()
                .map(|field| field.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parameter name per column of `fields`, suffixed until it is free of
/// `reserved` and of every other parameter in the list.
pub fn scoped_param_names(
    fields: &[Field],
    reserved: &BTreeSet<String>,
    suffix: &str,
    scope: &str,
) -> Result<BTreeMap<String, String>, GenerateError> {
    let limit = reserved.len() + fields.len() + 1;
    let mut taken: BTreeSet<String> = BTreeSet::new();
    let mut resolved = BTreeMap::new();
    for field in fields {
        let mut candidate = field.param_name.clone();
        let mut attempts = 0;
        while reserved.contains(&candidate) || taken.contains(&candidate) {
            if attempts == limit || suffix.is_empty() {
                return Err(GenerateError::NameResolutionConflict {
                    name: field.param_name.clone(),
                    scope: scope.to_string(),
                });
            }
            candidate.push_str(suffix);
            attempts += 1;
        }
        if candidate != field.param_name {
            debug!(scope = %scope, param = %field.param_name, resolved = %candidate, "parameter renamed");
        }
        taken.insert(candidate.clone());
        resolved.insert(field.column_name.clone(), candidate);
    }
    Ok(resolved)
}

/// English singular/plural rules with configurable irregular pairs.
#[derive(Debug, Clone)]
pub struct Inflector {
    irregular: BTreeMap<String, String>,
}

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "information",
    "metadata",
    "news",
    "series",
    "species",
];

impl Default for Inflector {
    fn default() -> Self {
        let irregular = [
            ("person", "people"),
            ("child", "children"),
            ("man", "men"),
            ("woman", "women"),
            ("mouse", "mice"),
        ]
        .into_iter()
        .map(|(singular, plural)| (singular.to_string(), plural.to_string()))
        .collect();
        Self { irregular }
    }
}

impl Inflector {
    pub fn new(extra: &BTreeMap<String, String>) -> Self {
        let mut inflector = Self::default();
        for (singular, plural) in extra {
            inflector
                .irregular
                .insert(singular.to_lowercase(), plural.to_lowercase());
        }
        inflector
    }

    pub fn pluralize(&self, name: &str) -> String {
        let (prefix, word) = split_last_word(name);
        format!("{prefix}{}", self.pluralize_word(word))
    }

    pub fn singularize(&self, name: &str) -> String {
        let (prefix, word) = split_last_word(name);
        format!("{prefix}{}", self.singularize_word(word))
    }

    fn pluralize_word(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if UNCOUNTABLE.contains(&lower.as_str()) {
            return word.to_string();
        }
        if let Some(plural) = self.irregular.get(&lower) {
            return match_case(word, plural);
        }
        if self.irregular.values().any(|plural| *plural == lower) {
            return word.to_string();
        }

        if ["s", "x", "z", "ch", "sh"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
        {
            format!("{word}es")
        } else if lower.ends_with('y') && !ends_with_vowel_y(&lower) {
            format!("{}ies", &word[..word.len() - 1])
        } else {
            format!("{word}s")
        }
    }

    fn singularize_word(&self, word: &str) -> String {
        let lower = word.to_lowercase();
        if UNCOUNTABLE.contains(&lower.as_str()) {
            return word.to_string();
        }
        if let Some((singular, _)) = self.irregular.iter().find(|(_, plural)| **plural == lower) {
            return match_case(word, singular);
        }
        if self.irregular.contains_key(&lower) {
            return word.to_string();
        }

        if lower.ends_with("ies") && lower.len() > 3 {
            format!("{}y", &word[..word.len() - 3])
        } else if ["sses", "shes", "ches", "xes", "zes", "uses"]
            .iter()
            .any(|suffix| lower.ends_with(suffix))
        {
            word[..word.len() - 2].to_string()
        } else if ["ss", "us", "is"].iter().any(|suffix| lower.ends_with(suffix)) {
            word.to_string()
        } else if lower.ends_with('s') && lower.len() > 1 {
            word[..word.len() - 1].to_string()
        } else {
            word.to_string()
        }
    }
}

/// Split a camel or snake cased name before its last word.
fn split_last_word(name: &str) -> (&str, &str) {
    let bytes = name.as_bytes();
    let mut start = 0;
    for idx in 1..bytes.len() {
        let prev = bytes[idx - 1];
        let current = bytes[idx];
        if prev == b'_' || (current.is_ascii_uppercase() && !prev.is_ascii_uppercase()) {
            start = idx;
        }
    }
    name.split_at(start)
}

fn ends_with_vowel_y(lower: &str) -> bool {
    let mut chars = lower.chars().rev();
    chars.next();
    matches!(chars.next(), Some('a' | 'e' | 'i' | 'o' | 'u'))
}

fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        replacement.to_string()
    }
}

/// Singular Go type name for a table (`CompositePrimaryKeys` -> `CompositePrimaryKey`).
pub fn type_name(table_name: &str, inflector: &Inflector) -> String {
    field_name(&inflector.singularize(table_name))
}
