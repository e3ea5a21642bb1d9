//! Dependency directives
//!
//! A directive is a declared package graph that analysed code can be
//! compared against. [`Directive`] carries the building blocks shared by all
//! directives (prescribed packages, an optional package filter and the match
//! mode); implementors supply the comparison itself.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{GraphError, PackageGraph};
use crate::package::{Package, PackageId, parse_name};

/// Which couplings a directive verifies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Verify afferent couplings only
    AfferentOnly,
    /// Verify efferent couplings only
    EfferentOnly,
    /// Verify both afferent and efferent couplings
    #[default]
    Both,
}

impl MatchMode {
    pub fn checks_afferents(self) -> bool {
        matches!(self, MatchMode::AfferentOnly | MatchMode::Both)
    }

    pub fn checks_efferents(self) -> bool {
        matches!(self, MatchMode::EfferentOnly | MatchMode::Both)
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::AfferentOnly => write!(f, "afferent-only"),
            MatchMode::EfferentOnly => write!(f, "efferent-only"),
            MatchMode::Both => write!(f, "both"),
        }
    }
}

/// Set of package names restricting which observed packages are checked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageFilter {
    names: HashSet<String>,
}

impl PackageFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from raw names; `.*` suffixes are stripped
    pub fn from_names<I, S>(names: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for name in names {
            let (normalized, _) = parse_name(name.as_ref())?;
            filter.names.insert(normalized);
        }
        Ok(filter)
    }

    /// Build a filter from packages, compared by name only
    pub fn from_packages<'a>(packages: impl IntoIterator<Item = &'a Package>) -> Self {
        let mut filter = Self::new();
        for package in packages {
            filter.insert(package);
        }
        filter
    }

    pub fn insert(&mut self, package: &Package) {
        self.names.insert(package.name().to_string());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// State shared by every directive
#[derive(Debug, Clone, Default)]
pub struct DirectiveBase {
    packages: PackageGraph,
    filter: Option<PackageFilter>,
    match_mode: MatchMode,
}

impl DirectiveBase {
    /// A directive applying to all analysed packages
    pub fn new() -> Self {
        Self::default()
    }

    /// A directive applying only to the packages named by `filter`
    pub fn with_filter(filter: PackageFilter) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    pub fn packages(&self) -> &PackageGraph {
        &self.packages
    }

    pub fn filter(&self) -> Option<&PackageFilter> {
        self.filter.as_ref()
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }
}

/// A declared dependency graph that analysed packages can be checked against
pub trait Directive {
    fn base(&self) -> &DirectiveBase;

    fn base_mut(&mut self) -> &mut DirectiveBase;

    /// Whether the observed packages follow this directive
    fn follows_directive(&self, observed: &PackageGraph) -> bool;

    /// Verify afferent couplings only; efferent couplings are ignored
    fn match_afferent_only(&mut self) {
        self.set_match_mode(MatchMode::AfferentOnly);
    }

    /// Verify efferent couplings only; afferent couplings are ignored
    fn match_efferent_only(&mut self) {
        self.set_match_mode(MatchMode::EfferentOnly);
    }

    /// Verify all couplings (the default)
    fn match_all(&mut self) {
        self.set_match_mode(MatchMode::Both);
    }

    fn set_match_mode(&mut self, mode: MatchMode) {
        self.base_mut().match_mode = mode;
    }

    fn match_mode(&self) -> MatchMode {
        self.base().match_mode
    }

    /// Add a prescribed package, or return the one already registered under
    /// the same name. The returned id can be coupled to other packages.
    fn add_package(&mut self, name: &str) -> Result<PackageId, GraphError> {
        self.base_mut().packages.add_package(name)
    }

    /// Register a constructed package unless its name is already taken
    ///
    /// Fails if the name is taken by a package with a different component flag.
    fn add_existing_package(&mut self, package: Package) -> Result<PackageId, GraphError> {
        self.base_mut().packages.insert(package)
    }

    /// Declare a prescribed dependency between two added packages
    fn depends_upon(&mut self, from: PackageId, to: PackageId) -> Result<(), GraphError> {
        self.base_mut().packages.depends_upon(from, to)
    }

    /// The prescribed packages
    fn packages(&self) -> &PackageGraph {
        self.base().packages()
    }

    fn package_filter(&self) -> Option<&PackageFilter> {
        self.base().filter()
    }

    /// Ids of the observed packages this directive applies to
    ///
    /// Without a filter every observed package is returned; otherwise only
    /// those whose names are in the filter, in observed order.
    fn apply_package_filter(&self, observed: &PackageGraph) -> Vec<PackageId> {
        match self.package_filter() {
            None => observed.ids().collect(),
            Some(filter) => observed
                .iter()
                .filter(|(_, package)| filter.contains(package.name()))
                .map(|(id, _)| id)
                .collect(),
        }
    }
}
