//! Dependency prescriptions
//!
//! A [`Prescription`] is a directive that holds when the observed package
//! graph is equivalent to the prescribed one: every checked package exists
//! in the prescription and has exactly the prescribed afferents and/or
//! efferents.
//!
//! ## Components
//!
//! A package declared as `org.util.*` is a component. When two dependency
//! lists are compared, every package at or below a component present in
//! either list is counted as the component itself, so
//! `com.fu -> org.util.*` is satisfied by `com.fu -> org.util.text` and by
//! `com.fu -> {org.util.a, org.util.b}` alike.
//!
//! ```
//! use coupling_directive::{Directive, PackageGraph, Prescription};
//!
//! # fn main() -> Result<(), coupling_directive::GraphError> {
//! let mut prescription = Prescription::new();
//! let ejb = prescription.add_package("com.xyz.ejb")?;
//! let util = prescription.add_package("com.xyz.util")?;
//! prescription.depends_upon(ejb, util)?;
//!
//! let mut observed = PackageGraph::new();
//! observed.add_dependency("com.xyz.ejb", "com.xyz.util")?;
//!
//! assert!(prescription.follows_directive(&observed));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::directive::{Directive, DirectiveBase, PackageFilter};
use crate::graph::PackageGraph;
use crate::package::Package;

/// Why an observed graph does not follow a prescription
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("Expected {prescribed} packages but observed {observed}")]
    PackageCountMismatch { prescribed: usize, observed: usize },

    #[error("No observed packages to check")]
    NothingToCheck,

    #[error("Package {0} is not prescribed")]
    UnprescribedPackage(String),

    #[error("Afferents of {package} differ: prescribed {prescribed:?}, observed {observed:?}")]
    AfferentMismatch {
        package: String,
        prescribed: BTreeSet<String>,
        observed: BTreeSet<String>,
    },

    #[error("Efferents of {package} differ: prescribed {prescribed:?}, observed {observed:?}")]
    EfferentMismatch {
        package: String,
        prescribed: BTreeSet<String>,
        observed: BTreeSet<String>,
    },
}

/// Directive requiring the observed graph to match the prescribed one
#[derive(Debug, Clone, Default)]
pub struct Prescription {
    base: DirectiveBase,
}

impl Prescription {
    /// A prescription without package filter: every analysed package and all
    /// of its dependencies must be prescribed
    pub fn new() -> Self {
        Self::default()
    }

    /// A prescription that only checks the packages named by `filter`
    pub fn with_filter(filter: PackageFilter) -> Self {
        Self {
            base: DirectiveBase::with_filter(filter),
        }
    }

    /// Check the observed graph, reporting the first violation found
    pub fn verify(&self, observed: &PackageGraph) -> Result<(), Violation> {
        let prescribed = self.packages();

        if self.package_filter().is_none() && observed.len() != prescribed.len() {
            return Err(Violation::PackageCountMismatch {
                prescribed: prescribed.len(),
                observed: observed.len(),
            });
        }

        let checked = self.apply_package_filter(observed);
        if checked.is_empty() {
            return Err(Violation::NothingToCheck);
        }

        for package in observed.resolve(&checked) {
            self.match_package(package, observed)?;
        }
        Ok(())
    }

    fn match_package(&self, analysed: &Package, observed: &PackageGraph) -> Result<(), Violation> {
        let prescribed = self.packages();
        let Some(expected) = prescribed.find(analysed.name()) else {
            return Err(Violation::UnprescribedPackage(analysed.name().to_string()));
        };
        let mode = self.match_mode();

        if mode.checks_afferents() {
            let (want, got) = compress_pair(
                prescribed.resolve(expected.afferents()),
                observed.resolve(analysed.afferents()),
            );
            if want != got {
                return Err(Violation::AfferentMismatch {
                    package: analysed.name().to_string(),
                    prescribed: owned(want),
                    observed: owned(got),
                });
            }
        }

        if mode.checks_efferents() {
            let (want, got) = compress_pair(
                prescribed.resolve(expected.efferents()),
                observed.resolve(analysed.efferents()),
            );
            if want != got {
                return Err(Violation::EfferentMismatch {
                    package: analysed.name().to_string(),
                    prescribed: owned(want),
                    observed: owned(got),
                });
            }
        }

        Ok(())
    }
}

impl Directive for Prescription {
    fn base(&self) -> &DirectiveBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut DirectiveBase {
        &mut self.base
    }

    fn follows_directive(&self, observed: &PackageGraph) -> bool {
        match self.verify(observed) {
            Ok(()) => true,
            Err(violation) => {
                debug!(%violation, mode = %self.match_mode(), "Prescription not followed");
                false
            }
        }
    }
}

/// Whether two dependency collections are equal once compressed to the
/// components declared in either of them
pub fn equivalent_dependencies<'a>(
    a: impl IntoIterator<Item = &'a Package>,
    b: impl IntoIterator<Item = &'a Package>,
) -> bool {
    let (a, b) = compress_pair(a, b);
    a == b
}

/// Whether `name` is the component itself or lies below it
pub fn belongs_to_component(name: &str, component: &str) -> bool {
    name.strip_prefix(component)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Compress both collections against the union of their components
fn compress_pair<'a>(
    a: impl IntoIterator<Item = &'a Package>,
    b: impl IntoIterator<Item = &'a Package>,
) -> (BTreeSet<&'a str>, BTreeSet<&'a str>) {
    let a: Vec<&Package> = a.into_iter().collect();
    let b: Vec<&Package> = b.into_iter().collect();

    let components = components(a.iter().chain(&b).copied());
    (compress(&a, &components), compress(&b, &components))
}

/// Component names, longest first so the most specific component wins
fn components<'a>(packages: impl Iterator<Item = &'a Package>) -> Vec<&'a str> {
    let mut names: Vec<&str> = packages
        .filter(|p| p.is_component())
        .map(Package::name)
        .collect();
    names.sort_unstable_by(|x, y| y.len().cmp(&x.len()).then_with(|| x.cmp(y)));
    names.dedup();
    names
}

/// Names of the packages, with members of a component replaced by it
fn compress<'a>(packages: &[&'a Package], components: &[&'a str]) -> BTreeSet<&'a str> {
    packages
        .iter()
        .map(|package| {
            if package.is_component() {
                return package.name();
            }
            components
                .iter()
                .copied()
                .find(|component| belongs_to_component(package.name(), component))
                .unwrap_or(package.name())
        })
        .collect()
}

fn owned(names: BTreeSet<&str>) -> BTreeSet<String> {
    names.into_iter().map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str) -> Package {
        Package::new(name).unwrap()
    }

    #[test]
    fn test_belongs_to_component() {
        assert!(belongs_to_component("org.util", "org.util"));
        assert!(belongs_to_component("org.util.text", "org.util"));
        assert!(belongs_to_component("org.util.text.impl", "org.util"));
        assert!(!belongs_to_component("org.utility", "org.util"));
        assert!(!belongs_to_component("org", "org.util"));
    }

    #[test]
    fn test_component_absorbs_members() {
        let component = pkg("org.util.*");
        let text = pkg("org.util.text");
        let io = pkg("org.util.io");
        assert!(equivalent_dependencies([&component], [&text]));
        assert!(equivalent_dependencies([&component], [&text, &io]));
    }

    #[test]
    fn test_component_does_not_absorb_siblings() {
        let component = pkg("org.util.*");
        let text = pkg("org.util.text");
        let other = pkg("com.bar.xyz");
        let none: [&Package; 0] = [];
        assert!(!equivalent_dependencies([&component], [&text, &other]));
        assert!(!equivalent_dependencies([&component], none));
    }

    #[test]
    fn test_plain_sets_ignore_order() {
        let a = pkg("a");
        let b = pkg("b");
        assert!(equivalent_dependencies([&a, &b], [&b, &a]));
        let none: [&Package; 0] = [];
        assert!(!equivalent_dependencies([&a], [&a, &b]));
        assert!(equivalent_dependencies(none, none));
    }

    #[test]
    fn test_longest_component_wins() {
        let broad = pkg("org.a.*");
        let narrow = pkg("org.a.b.*");
        let member = pkg("org.a.b.c");
        let sibling = pkg("org.a.x");

        // org.a.b.c belongs to org.a.b, org.a.x to org.a
        assert!(equivalent_dependencies(
            [&broad, &narrow],
            [&member, &sibling]
        ));
        assert!(!equivalent_dependencies([&broad], [&member, &narrow]));
    }

    #[test]
    fn test_components_sorted_and_deduplicated() {
        let packages = [pkg("a.*"), pkg("a.b.*"), pkg("z.*"), pkg("a.b.*"), pkg("q")];
        assert_eq!(components(packages.iter()), vec!["a.b", "a", "z"]);
    }

    #[test]
    fn test_verify_reports_count_mismatch() {
        let mut prescription = Prescription::new();
        prescription.add_package("a").unwrap();

        let mut observed = PackageGraph::new();
        observed.add_dependency("a", "b").unwrap();

        assert_eq!(
            prescription.verify(&observed),
            Err(Violation::PackageCountMismatch {
                prescribed: 1,
                observed: 2
            })
        );
    }

    #[test]
    fn test_verify_reports_efferent_mismatch() {
        let mut prescription = Prescription::new();
        let a = prescription.add_package("a").unwrap();
        let b = prescription.add_package("b").unwrap();
        prescription.add_package("c").unwrap();
        prescription.depends_upon(a, b).unwrap();

        let mut observed = PackageGraph::new();
        observed.add_dependency("a", "b").unwrap();
        observed.add_dependency("a", "c").unwrap();

        let violation = prescription.verify(&observed).unwrap_err();
        assert_eq!(
            violation,
            Violation::EfferentMismatch {
                package: "a".to_string(),
                prescribed: ["b".to_string()].into_iter().collect(),
                observed: ["b".to_string(), "c".to_string()].into_iter().collect(),
            }
        );
        assert!(violation.to_string().starts_with("Efferents of a differ"));
    }

    #[test]
    fn test_verify_reports_unprescribed_package() {
        let filter = PackageFilter::from_names(["ghost"]).unwrap();
        let mut prescription = Prescription::with_filter(filter);
        prescription.add_package("a").unwrap();

        let mut observed = PackageGraph::new();
        observed.add_package("ghost").unwrap();

        assert_eq!(
            prescription.verify(&observed),
            Err(Violation::UnprescribedPackage("ghost".to_string()))
        );
    }

    #[test]
    fn test_afferent_mismatch_checked_before_efferents() {
        let mut prescription = Prescription::new();
        let a = prescription.add_package("a").unwrap();
        let b = prescription.add_package("b").unwrap();
        prescription.depends_upon(a, b).unwrap();

        // reversed edge: afferents of a differ first
        let mut observed = PackageGraph::new();
        observed.add_package("a").unwrap();
        observed.add_dependency("b", "a").unwrap();

        assert!(matches!(
            prescription.verify(&observed),
            Err(Violation::AfferentMismatch { package, .. }) if package == "a"
        ));
    }

    #[test]
    fn test_empty_prescription_never_holds() {
        let prescription = Prescription::new();
        let observed = PackageGraph::new();
        assert_eq!(
            prescription.verify(&observed),
            Err(Violation::NothingToCheck)
        );
        assert!(!prescription.follows_directive(&observed));
    }
}
