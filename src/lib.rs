//! # coupling-directive - Package Dependency Directives
//!
//! Models a directed graph of packages and their dependencies, measures the
//! classic package design metrics on it, and checks whether an observed
//! graph follows a declared one.
//!
//! ## Overview
//!
//! - [`PackageGraph`] owns [`Package`]s and the edges between them
//! - [`Package`] exposes afferent/efferent coupling, instability,
//!   abstractness and distance from the main sequence
//! - [`PackageGraph::collect_cycle`] / [`PackageGraph::collect_all_cycles`]
//!   find dependency cycles
//! - [`Prescription`] declares the intended graph and verifies an observed
//!   one against it
//!
//! Extraction of packages from real code is left to the caller; it hands
//! over a finished graph, built in code or through a [`GraphSnapshot`].
//!
//! ## Usage
//!
//! ```
//! use coupling_directive::{Directive, PackageFilter, PackageGraph, Prescription};
//!
//! # fn main() -> Result<(), coupling_directive::GraphError> {
//! // com.fu may depend on anything below org.util, and nothing else
//! let mut prescription = Prescription::with_filter(PackageFilter::from_names(["com.fu"])?);
//! let fu = prescription.add_package("com.fu")?;
//! let util = prescription.add_package("org.util.*")?;
//! prescription.depends_upon(fu, util)?;
//!
//! let mut observed = PackageGraph::new();
//! observed.add_dependency("com.fu", "org.util.text")?;
//! observed.add_dependency("com.fu", "org.util.io")?;
//! assert!(prescription.follows_directive(&observed));
//!
//! observed.add_dependency("com.fu", "com.bar.xyz")?;
//! assert!(!prescription.follows_directive(&observed));
//! # Ok(())
//! # }
//! ```
//!
//! ## Metrics
//!
//! ```text
//! I = Ce / (Ce + Ca)
//! A = abstract classes / classes
//! D = |A + I - 1| * volatility
//! ```

pub mod config;
pub mod directive;
pub mod graph;
pub mod metrics;
pub mod package;
pub mod prescription;

pub use config::{
    ConfigError, DirectiveConfig, discover_directive, find_directive_file, load_directive,
    load_snapshot, parse_directive,
};
pub use directive::{Directive, DirectiveBase, MatchMode, PackageFilter};
pub use graph::{CycleSearch, GraphError, GraphSnapshot, PackageGraph, PackageSnapshot};
pub use metrics::{CycleSummary, PackageCycle, PackageMetrics};
pub use package::{COMPONENT_SUFFIX, ClassInfo, DEFAULT_VOLATILITY, Package, PackageId};
pub use prescription::{Prescription, Violation, belongs_to_component, equivalent_dependencies};
