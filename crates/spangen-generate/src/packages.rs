use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// An import required by generated code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Package {
    /// Import path (e.g. `cloud.google.com/go/spanner`).
    pub path: String,
    /// Default package name derived from the path.
    pub name: String,
    /// Disambiguating alias when `name` is already taken in the unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Package {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        let path = path.into();
        let name = name.into();
        let name = if name.is_empty() {
            default_name(&path)
        } else {
            name
        };
        Self {
            path,
            name,
            alias: None,
        }
    }

    /// Name used to qualify identifiers from this package.
    pub fn display_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Standard library packages have no dot in their first path segment.
    pub fn is_standard(&self) -> bool {
        self.path
            .split('/')
            .next()
            .map(|segment| !segment.contains('.'))
            .unwrap_or(true)
    }

    /// Import spec as written inside an `import (...)` block.
    pub fn import_spec(&self) -> String {
        match &self.alias {
            Some(alias) => format!("{alias} \"{}\"", self.path),
            None => format!("\"{}\"", self.path),
        }
    }
}

/// Statically known package used by the type mapping and the default renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageRef {
    pub path: &'static str,
    pub name: &'static str,
}

impl PackageRef {
    pub fn to_package(self) -> Package {
        Package::new(self.path, self.name)
    }
}

pub const CONTEXT: PackageRef = PackageRef {
    path: "context",
    name: "context",
};
pub const ERRORS: PackageRef = PackageRef {
    path: "errors",
    name: "errors",
};
pub const FMT: PackageRef = PackageRef {
    path: "fmt",
    name: "fmt",
};
pub const STRCONV: PackageRef = PackageRef {
    path: "strconv",
    name: "strconv",
};
pub const STRINGS: PackageRef = PackageRef {
    path: "strings",
    name: "strings",
};
pub const TIME: PackageRef = PackageRef {
    path: "time",
    name: "time",
};
pub const MATH_BIG: PackageRef = PackageRef {
    path: "math/big",
    name: "big",
};
pub const SPANNER: PackageRef = PackageRef {
    path: "cloud.google.com/go/spanner",
    name: "spanner",
};
pub const CIVIL: PackageRef = PackageRef {
    path: "cloud.google.com/go/civil",
    name: "civil",
};
pub const ITERATOR: PackageRef = PackageRef {
    path: "google.golang.org/api/iterator",
    name: "iterator",
};
pub const GRPC_CODES: PackageRef = PackageRef {
    path: "google.golang.org/grpc/codes",
    name: "codes",
};
pub const GRPC_STATUS: PackageRef = PackageRef {
    path: "google.golang.org/grpc/status",
    name: "status",
};
pub const GAX_APIERROR: PackageRef = PackageRef {
    path: "github.com/googleapis/gax-go/v2/apierror",
    name: "apierror",
};

/// Every preset package, ordered by path.
pub fn presets() -> Vec<PackageRef> {
    let mut presets = vec![
        CONTEXT,
        ERRORS,
        FMT,
        STRCONV,
        STRINGS,
        TIME,
        MATH_BIG,
        SPANNER,
        CIVIL,
        ITERATOR,
        GRPC_CODES,
        GRPC_STATUS,
        GAX_APIERROR,
    ];
    presets.sort_by_key(|preset| preset.path);
    presets
}

/// Tracks the imports of one generation unit.
///
/// Registration is idempotent per path. A path whose default name is already
/// displayed by another path gets the first free numbered alias (`util2`,
/// `util3`, ...), so no two registered packages share a display name.
#[derive(Debug, Clone, Default)]
pub struct PackageRegistry {
    packages: BTreeMap<String, Package>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, path: &str, default_name: &str) -> Package {
        if let Some(existing) = self.packages.get(path) {
            return existing.clone();
        }

        let mut package = Package::new(path, default_name);
        if self.is_taken(&package.name) {
            let alias = (2_usize..)
                .map(|n| format!("{}{n}", package.name))
                .find(|candidate| !self.is_taken(candidate))
                .unwrap_or_else(|| format!("{}_", package.name));
            debug!(path = %path, name = %package.name, alias = %alias, "package aliased");
            package.alias = Some(alias);
        }

        self.packages.insert(package.path.clone(), package.clone());
        package
    }

    /// Register a package built elsewhere, using its name as the default.
    pub fn register_package(&mut self, package: &Package) -> Package {
        self.register(&package.path, &package.name)
    }

    pub fn register_ref(&mut self, package: PackageRef) -> Package {
        self.register(package.path, package.name)
    }

    /// Qualify `ident` with the display name of `package`, registering it.
    pub fn qualify(&mut self, package: &Package, ident: &str) -> String {
        let registered = self.register_package(package);
        format!("{}.{ident}", registered.display_name())
    }

    /// Registered packages ordered by import path.
    pub fn resolve(&self) -> Vec<Package> {
        self.packages.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn is_taken(&self, display_name: &str) -> bool {
        self.packages
            .values()
            .any(|package| package.display_name() == display_name)
    }
}

/// Read-only view of a resolved registry handed to renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    packages: Vec<Package>,
}

impl Imports {
    pub fn new(packages: Vec<Package>) -> Self {
        Self { packages }
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// `display.ident` for a registered path, or the bare identifier otherwise.
    pub fn qualify(&self, package: PackageRef, ident: &str) -> String {
        match self.packages.iter().find(|p| p.path == package.path) {
            Some(registered) => format!("{}.{ident}", registered.display_name()),
            None => ident.to_string(),
        }
    }

    /// Standard library imports followed by third-party imports, each by path.
    pub fn grouped(&self) -> (Vec<&Package>, Vec<&Package>) {
        self.packages.iter().partition(|package| package.is_standard())
    }
}

fn default_name(path: &str) -> String {
    let mut segments = path.rsplit('/').filter(|segment| !segment.is_empty());
    let last = segments.next().unwrap_or(path);
    let name = if is_major_version(last) {
        segments.next().unwrap_or(last)
    } else {
        last
    };
    name.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect()
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_path_is_idempotent() {
        let mut registry = PackageRegistry::new();
        let first = registry.register("pkgA/util", "");
        let second = registry.register("pkgA/util", "");
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn colliding_names_get_numbered_aliases() {
        let mut registry = PackageRegistry::new();
        let a = registry.register("pkgA/util", "");
        let b = registry.register("pkgB/util", "");
        let c = registry.register("pkgC/util", "");

        assert_eq!(a.display_name(), "util");
        assert_eq!(b.display_name(), "util2");
        assert_eq!(c.display_name(), "util3");
    }

    #[test]
    fn alias_skips_names_already_displayed() {
        let mut registry = PackageRegistry::new();
        registry.register("pkgA/util2", "");
        registry.register("pkgB/util", "");
        let aliased = registry.register("pkgC/util", "");
        assert_eq!(aliased.display_name(), "util3");
    }

    #[test]
    fn resolve_orders_by_path() {
        let mut registry = PackageRegistry::new();
        registry.register_ref(SPANNER);
        registry.register_ref(CONTEXT);
        registry.register_ref(FMT);

        let paths: Vec<_> = registry.resolve().into_iter().map(|p| p.path).collect();
        assert_eq!(paths, vec!["cloud.google.com/go/spanner", "context", "fmt"]);
    }

    #[test]
    fn default_name_skips_major_version_segment() {
        assert_eq!(Package::new("github.com/acme/thing/v2", "").name, "thing");
        assert_eq!(GAX_APIERROR.to_package().name, "apierror");
        assert_eq!(Package::new("math/big", "").name, "big");
    }

    #[test]
    fn imports_group_standard_library_first() {
        let mut registry = PackageRegistry::new();
        registry.register_ref(SPANNER);
        registry.register_ref(CONTEXT);
        let imports = Imports::new(registry.resolve());
        let (std, third_party) = imports.grouped();
        assert_eq!(std[0].path, "context");
        assert_eq!(third_party[0].path, "cloud.google.com/go/spanner");
        assert_eq!(imports.qualify(SPANNER, "Row"), "spanner.Row");
        assert_eq!(imports.qualify(ITERATOR, "Done"), "Done");
    }

    #[test]
    fn import_spec_includes_alias() {
        let mut registry = PackageRegistry::new();
        registry.register("pkgA/util", "");
        let aliased = registry.register("pkgB/util", "");
        assert_eq!(aliased.import_spec(), "util2 \"pkgB/util\"");
    }
}
