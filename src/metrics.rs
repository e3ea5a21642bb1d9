//! Graph-wide metric rows and cycle summaries
//!
//! These are plain serializable views over a [`PackageGraph`], meant for
//! whatever renders reports. Nothing here mutates the graph.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::graph::PackageGraph;
use crate::package::{Package, PackageId};

/// Metrics of a single package
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageMetrics {
    pub name: String,
    pub is_component: bool,
    pub class_count: usize,
    pub abstract_class_count: usize,
    pub concrete_class_count: usize,
    /// Afferent coupling (Ca)
    pub afferent_coupling: usize,
    /// Efferent coupling (Ce)
    pub efferent_coupling: usize,
    /// Abstractness (A)
    pub abstractness: f64,
    /// Instability (I)
    pub instability: f64,
    /// Distance from the main sequence (D)
    pub distance: f64,
    pub volatility: f64,
    /// Whether a dependency cycle is reachable from this package
    pub has_cycle: bool,
}

impl PackageMetrics {
    fn collect(graph: &PackageGraph, id: PackageId, package: &Package) -> Self {
        Self {
            name: package.name().to_string(),
            is_component: package.is_component(),
            class_count: package.class_count(),
            abstract_class_count: package.abstract_class_count(),
            concrete_class_count: package.concrete_class_count(),
            afferent_coupling: package.afferent_coupling(),
            efferent_coupling: package.efferent_coupling(),
            abstractness: package.abstractness(),
            instability: package.instability(),
            distance: package.distance(),
            volatility: package.volatility(),
            has_cycle: graph.contains_cycle(id),
        }
    }
}

/// A cycle found from one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageCycle {
    /// Package the search started from
    pub origin: String,
    /// Visited packages, ending with the one that closes the cycle
    pub path: Vec<String>,
}

/// Summary of dependency cycles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// One entry per package from which a cycle is reachable
    pub cycles: Vec<PackageCycle>,
    /// Number of distinct packages appearing on any cycle path
    pub affected_packages: usize,
}

impl CycleSummary {
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}

impl PackageGraph {
    /// Metric rows for every package, in insertion order
    pub fn metrics(&self) -> Vec<PackageMetrics> {
        self.iter()
            .map(|(id, package)| PackageMetrics::collect(self, id, package))
            .collect()
    }

    /// Average distance from the main sequence
    pub fn average_distance(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = self.iter().map(|(_, package)| package.distance()).sum();
        Some(sum / self.len() as f64)
    }

    /// First cycle reachable from each package
    pub fn cycles(&self) -> CycleSummary {
        let mut cycles = Vec::new();
        let mut affected: HashSet<PackageId> = HashSet::new();

        for (id, package) in self.iter() {
            let mut path = Vec::new();
            if !self.collect_cycle(id, &mut path) {
                continue;
            }
            debug!(
                package = package.name(),
                length = path.len(),
                "Dependency cycle detected"
            );
            affected.extend(path.iter().copied());
            cycles.push(PackageCycle {
                origin: package.name().to_string(),
                path: self.names(&path).into_iter().map(String::from).collect(),
            });
        }

        CycleSummary {
            cycles,
            affected_packages: affected.len(),
        }
    }
}
