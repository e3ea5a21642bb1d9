//! Package data structures and design-quality metrics
//!
//! A [`Package`] is one node of a [`PackageGraph`](crate::graph::PackageGraph).
//! It owns its class records and knows its afferent (incoming) and efferent
//! (outgoing) couplings as [`PackageId`] handles into the graph that owns it.
//!
//! The metrics follow Robert C. Martin's package design principles:
//!
//! - **Ca** - afferent coupling, packages depending on this one
//! - **Ce** - efferent coupling, packages this one depends on
//! - **I** - instability, `Ce / (Ce + Ca)`
//! - **A** - abstractness, abstract classes / total classes
//! - **D** - distance from the main sequence, `|A + I - 1|` scaled by volatility

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::graph::GraphError;

/// Suffix that declares a package name as a component (`org.util.*`)
pub const COMPONENT_SUFFIX: &str = ".*";

/// Volatility assigned to packages that don't specify one
pub const DEFAULT_VOLATILITY: f64 = 1.0;

/// Dense handle of a package inside the graph that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PackageId(pub u32);

impl PackageId {
    /// Position of the package in the graph's arena
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A class owned by a package, as reported by the extraction step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassInfo {
    /// Class name (unique within its package)
    pub name: String,
    /// Whether the class is abstract (interface, trait, abstract class)
    #[serde(rename = "abstract", default)]
    pub is_abstract: bool,
}

impl ClassInfo {
    /// A concrete class
    pub fn concrete(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_abstract: false,
        }
    }

    /// An abstract class
    pub fn abstract_class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_abstract: true,
        }
    }
}

/// A package in a dependency graph
///
/// Two packages are equal when their names are equal, regardless of their
/// classes, volatility or edges. Hashing follows the same rule.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    volatility: f64,
    classes: Vec<ClassInfo>,
    pub(crate) afferents: Vec<PackageId>,
    pub(crate) efferents: Vec<PackageId>,
    is_component: bool,
}

impl Package {
    /// Create a package with the default volatility
    ///
    /// A trailing `.*` is stripped from the name and marks the package as a
    /// component standing in for the whole namespace below it.
    pub fn new(name: &str) -> Result<Self, GraphError> {
        let (name, is_component) = parse_name(name)?;
        Ok(Self {
            name,
            volatility: DEFAULT_VOLATILITY,
            classes: Vec::new(),
            afferents: Vec::new(),
            efferents: Vec::new(),
            is_component,
        })
    }

    /// Create a package with the given volatility
    pub fn with_volatility(name: &str, volatility: f64) -> Result<Self, GraphError> {
        let mut package = Self::new(name)?;
        package.set_volatility(volatility);
        Ok(package)
    }

    /// Normalized package name (without the component suffix)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as it would be declared, with `.*` re-attached for components
    pub fn declared_name(&self) -> String {
        if self.is_component {
            format!("{}{}", self.name, COMPONENT_SUFFIX)
        } else {
            self.name.clone()
        }
    }

    /// Whether this package was declared with a wildcard suffix
    pub fn is_component(&self) -> bool {
        self.is_component
    }

    /// Volatility weight (0.0 - 1.0)
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Set the volatility weight, clamped to 0.0 - 1.0. NaN is ignored.
    pub fn set_volatility(&mut self, volatility: f64) {
        if volatility.is_nan() {
            return;
        }
        self.volatility = volatility.clamp(0.0, 1.0);
    }

    /// Add a class record. A class whose name is already present is ignored.
    pub fn add_class(&mut self, class: ClassInfo) {
        if !self.classes.iter().any(|c| c.name == class.name) {
            self.classes.push(class);
        }
    }

    /// All owned classes
    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn abstract_class_count(&self) -> usize {
        self.classes.iter().filter(|c| c.is_abstract).count()
    }

    pub fn concrete_class_count(&self) -> usize {
        self.classes.iter().filter(|c| !c.is_abstract).count()
    }

    /// Packages depending on this one, in insertion order
    pub fn afferents(&self) -> &[PackageId] {
        &self.afferents
    }

    /// Packages this one depends on, in insertion order
    pub fn efferents(&self) -> &[PackageId] {
        &self.efferents
    }

    /// Afferent coupling (Ca)
    pub fn afferent_coupling(&self) -> usize {
        self.afferents.len()
    }

    /// Efferent coupling (Ce)
    pub fn efferent_coupling(&self) -> usize {
        self.efferents.len()
    }

    /// Instability (0.0 - 1.0), 0.0 for a package without couplings
    pub fn instability(&self) -> f64 {
        let total = self.efferent_coupling() + self.afferent_coupling();
        if total == 0 {
            return 0.0;
        }
        self.efferent_coupling() as f64 / total as f64
    }

    /// Abstractness (0.0 - 1.0), 0.0 for a package without classes
    pub fn abstractness(&self) -> f64 {
        let total = self.class_count();
        if total == 0 {
            return 0.0;
        }
        self.abstract_class_count() as f64 / total as f64
    }

    /// Distance from the main sequence, scaled by volatility
    pub fn distance(&self) -> f64 {
        (self.abstractness() + self.instability() - 1.0).abs() * self.volatility
    }

    /// Drop all edges; used when a package moves into another graph
    pub(crate) fn clear_edges(&mut self) {
        self.afferents.clear();
        self.efferents.clear();
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Split a raw package name into its normalized name and component flag
pub(crate) fn parse_name(raw: &str) -> Result<(String, bool), GraphError> {
    let trimmed = raw.trim();
    let (name, is_component) = match trimmed.strip_suffix(COMPONENT_SUFFIX) {
        Some(stripped) => (stripped, true),
        None => (trimmed, false),
    };
    if name.is_empty() {
        return Err(GraphError::EmptyName);
    }
    Ok((name.to_string(), is_component))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_plain_package() {
        let package = Package::new("com.fubar").unwrap();
        assert_eq!(package.name(), "com.fubar");
        assert!(!package.is_component());
        assert_eq!(package.declared_name(), "com.fubar");
    }

    #[test]
    fn test_component() {
        let package = Package::new("com.fubar.*").unwrap();
        assert_eq!(package.name(), "com.fubar");
        assert!(package.is_component());
        assert_eq!(package.declared_name(), "com.fubar.*");
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(matches!(Package::new(""), Err(GraphError::EmptyName)));
        assert!(matches!(Package::new("   "), Err(GraphError::EmptyName)));
        assert!(matches!(Package::new(".*"), Err(GraphError::EmptyName)));
    }

    #[test]
    fn test_equality_by_name() {
        let mut a = Package::new("com.fu").unwrap();
        let b = Package::with_volatility("com.fu", 0.5).unwrap();
        a.add_class(ClassInfo::concrete("Foo"));
        assert_eq!(a, b);

        let set: HashSet<Package> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_volatility_clamped() {
        let mut package = Package::new("p").unwrap();
        assert_eq!(package.volatility(), DEFAULT_VOLATILITY);

        package.set_volatility(2.5);
        assert_eq!(package.volatility(), 1.0);
        package.set_volatility(-1.0);
        assert_eq!(package.volatility(), 0.0);
        package.set_volatility(f64::NAN);
        assert_eq!(package.volatility(), 0.0);
    }

    #[test]
    fn test_class_counts() {
        let mut package = Package::new("p").unwrap();
        package.add_class(ClassInfo::concrete("Impl"));
        package.add_class(ClassInfo::abstract_class("Api"));
        package.add_class(ClassInfo::abstract_class("Spi"));
        // duplicate name
        package.add_class(ClassInfo::concrete("Api"));

        assert_eq!(package.class_count(), 3);
        assert_eq!(package.abstract_class_count(), 2);
        assert_eq!(package.concrete_class_count(), 1);
    }

    #[test]
    fn test_metrics_without_denominators() {
        let package = Package::new("lonely").unwrap();
        assert_eq!(package.instability(), 0.0);
        assert_eq!(package.abstractness(), 0.0);
        // |0 + 0 - 1| * 1
        assert_eq!(package.distance(), 1.0);
    }

    #[test]
    fn test_abstractness() {
        let mut package = Package::new("p").unwrap();
        package.add_class(ClassInfo::abstract_class("A"));
        package.add_class(ClassInfo::concrete("B"));
        package.add_class(ClassInfo::concrete("C"));
        package.add_class(ClassInfo::concrete("D"));
        assert_eq!(package.abstractness(), 0.25);
    }

    #[test]
    fn test_distance_scales_with_volatility() {
        let mut package = Package::with_volatility("p", 0.5).unwrap();
        package.add_class(ClassInfo::concrete("Impl"));
        // A = 0, I = 0 -> |0 + 0 - 1| * 0.5
        assert_eq!(package.distance(), 0.5);

        package.set_volatility(0.0);
        assert_eq!(package.distance(), 0.0);
    }

    #[test]
    fn test_display() {
        let package = Package::new("org.util.*").unwrap();
        assert_eq!(package.to_string(), "org.util");
        assert_eq!(PackageId(7).to_string(), "#7");
    }
}
