//! Package dependency graph
//!
//! A [`PackageGraph`] owns every [`Package`] in a dense arena. Edges are
//! [`PackageId`] handles, so afferent/efferent lists never hold references to
//! each other. Both the prescribed graph of a directive and the observed
//! graph produced by extraction are `PackageGraph`s.
//!
//! Edge insertion de-duplicates and silently drops self-dependencies.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::package::{ClassInfo, DEFAULT_VOLATILITY, Package, PackageId, parse_name};

/// Errors raised when building a graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Package name must not be empty")]
    EmptyName,

    #[error("Unknown package id: {0}")]
    UnknownPackage(PackageId),

    #[error("Package {name} is already declared with component flag {is_component}")]
    ComponentConflict { name: String, is_component: bool },

    #[error("Invalid graph snapshot: {0}")]
    InvalidSnapshot(#[from] serde_json::Error),
}

/// Traversal policy of the cycle search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleSearch {
    /// Stop at the first cycle found
    First,
    /// Visit every efferent, keeping all cycles on the path
    All,
}

/// Directed graph of packages
#[derive(Debug, Clone, Default)]
pub struct PackageGraph {
    packages: Vec<Package>,
    index: HashMap<String, PackageId>,
}

impl PackageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a package by name, returning the existing one if the normalized
    /// name is already present
    ///
    /// `org.util` and `org.util.*` share a name, so declaring one after the
    /// other is rejected rather than silently merged.
    pub fn add_package(&mut self, name: &str) -> Result<PackageId, GraphError> {
        let (normalized, is_component) = parse_name(name)?;
        if let Some(id) = self.existing(&normalized, is_component)? {
            return Ok(id);
        }
        self.insert(Package::new(name)?)
    }

    /// Register a constructed package unless one with the same name exists
    ///
    /// The package's edge lists are dropped: edges are only meaningful inside
    /// the graph that created them.
    #[allow(clippy::cast_possible_truncation)]
    pub fn insert(&mut self, mut package: Package) -> Result<PackageId, GraphError> {
        if let Some(id) = self.existing(package.name(), package.is_component())? {
            return Ok(id);
        }
        package.clear_edges();
        let id = PackageId(self.packages.len() as u32);
        self.index.insert(package.name().to_string(), id);
        self.packages.push(package);
        Ok(id)
    }

    /// Id registered under `name`, provided its component flag agrees
    fn existing(&self, name: &str, is_component: bool) -> Result<Option<PackageId>, GraphError> {
        let Some(&id) = self.index.get(name) else {
            return Ok(None);
        };
        let declared = self.packages[id.index()].is_component();
        if declared != is_component {
            return Err(GraphError::ComponentConflict {
                name: name.to_string(),
                is_component: declared,
            });
        }
        Ok(Some(id))
    }

    /// Declare that `from` depends upon `to`
    ///
    /// Adds `to` to the efferents of `from` and `from` to the afferents of
    /// `to`. Duplicate edges and self-dependencies are ignored.
    pub fn depends_upon(&mut self, from: PackageId, to: PackageId) -> Result<(), GraphError> {
        self.check(from)?;
        self.check(to)?;
        if from == to {
            return Ok(());
        }

        let source = &mut self.packages[from.index()];
        if !source.efferents.contains(&to) {
            source.efferents.push(to);
        }
        let target = &mut self.packages[to.index()];
        if !target.afferents.contains(&from) {
            target.afferents.push(from);
        }
        Ok(())
    }

    /// Add both packages by name (if needed) and the edge between them
    pub fn add_dependency(
        &mut self,
        from: &str,
        to: &str,
    ) -> Result<(PackageId, PackageId), GraphError> {
        let from = self.add_package(from)?;
        let to = self.add_package(to)?;
        self.depends_upon(from, to)?;
        Ok((from, to))
    }

    pub fn get(&self, id: PackageId) -> Option<&Package> {
        self.packages.get(id.index())
    }

    pub fn get_mut(&mut self, id: PackageId) -> Option<&mut Package> {
        self.packages.get_mut(id.index())
    }

    /// Look up a package id by normalized name
    pub fn id_of(&self, name: &str) -> Option<PackageId> {
        self.index.get(name).copied()
    }

    /// Look up a package by normalized name
    pub fn find(&self, name: &str) -> Option<&Package> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// All package ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.iter().map(|(id, _)| id)
    }

    /// All packages with their ids, in insertion order
    #[allow(clippy::cast_possible_truncation)]
    pub fn iter(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, package)| (PackageId(i as u32), package))
    }

    /// Resolve ids of this graph to packages, skipping unknown ids
    pub fn resolve<'a>(&'a self, ids: &'a [PackageId]) -> impl Iterator<Item = &'a Package> + 'a {
        ids.iter().filter_map(move |&id| self.get(id))
    }

    /// Names of the given packages, e.g. for reporting a cycle path
    pub fn names(&self, ids: &[PackageId]) -> Vec<&str> {
        ids.iter()
            .filter_map(|&id| self.get(id))
            .map(Package::name)
            .collect()
    }

    /// Collect the first dependency cycle reachable from `id` into `path`
    ///
    /// Returns `true` if a cycle exists. The path ends with the package that
    /// closes the cycle, repeated.
    pub fn collect_cycle(&self, id: PackageId, path: &mut Vec<PackageId>) -> bool {
        self.search_cycles(id, path, CycleSearch::First)
    }

    /// Collect every package taking part in a cycle reachable from `id`
    ///
    /// Unlike [`collect_cycle`](Self::collect_cycle) this keeps exploring
    /// after a cycle is found, so `path` can hold several cycles.
    pub fn collect_all_cycles(&self, id: PackageId, path: &mut Vec<PackageId>) -> bool {
        self.search_cycles(id, path, CycleSearch::All)
    }

    /// Whether a cycle is reachable from `id`
    pub fn contains_cycle(&self, id: PackageId) -> bool {
        self.collect_cycle(id, &mut Vec::new())
    }

    /// Whether any package of the graph is on a reachable cycle
    pub fn contains_cycles(&self) -> bool {
        self.ids().any(|id| self.contains_cycle(id))
    }

    /// Cycle search from `id` under the given policy
    ///
    /// Unknown ids report no cycle and leave `path` untouched.
    pub fn search_cycles(
        &self,
        id: PackageId,
        path: &mut Vec<PackageId>,
        search: CycleSearch,
    ) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.dfs_cycles(id, path, search)
    }

    /// DFS helper for cycle detection
    fn dfs_cycles(&self, id: PackageId, path: &mut Vec<PackageId>, search: CycleSearch) -> bool {
        if path.contains(&id) {
            path.push(id);
            return true;
        }

        path.push(id);

        let mut found = false;
        for &efferent in self.packages[id.index()].efferents() {
            if self.dfs_cycles(efferent, path, search) {
                found = true;
                if search == CycleSearch::First {
                    break;
                }
            }
        }

        // Children that found nothing have already backtracked, so `id` is last
        if !found {
            path.pop();
        }
        found
    }

    /// Build a graph from a snapshot, normalizing as it goes
    ///
    /// Names go through the component rule, efferent targets missing from
    /// the package list are created, duplicate edges and self-loops dropped.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<Self, GraphError> {
        let mut graph = Self::new();

        for entry in &snapshot.packages {
            let id = graph.add_package(&entry.name)?;
            if let Some(package) = graph.get_mut(id) {
                package.set_volatility(entry.volatility);
                for class in &entry.classes {
                    package.add_class(class.clone());
                }
            }
        }

        let mut edges = 0usize;
        for entry in &snapshot.packages {
            for target in &entry.efferents {
                graph.add_dependency(&entry.name, target)?;
                edges += 1;
            }
        }

        trace!(
            packages = graph.len(),
            declared_edges = edges,
            "Ingested graph snapshot"
        );
        Ok(graph)
    }

    /// Parse a JSON snapshot into a graph
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        let snapshot: GraphSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(&snapshot)
    }

    /// Serializable form of this graph; components keep their `.*` suffix
    pub fn to_snapshot(&self) -> GraphSnapshot {
        let packages = self
            .packages
            .iter()
            .map(|package| PackageSnapshot {
                name: package.declared_name(),
                volatility: package.volatility(),
                classes: package.classes().to_vec(),
                efferents: self
                    .resolve(package.efferents())
                    .map(Package::declared_name)
                    .collect(),
            })
            .collect();
        GraphSnapshot { packages }
    }

    fn check(&self, id: PackageId) -> Result<(), GraphError> {
        match self.get(id) {
            Some(_) => Ok(()),
            None => Err(GraphError::UnknownPackage(id)),
        }
    }
}

/// Serialized package graph, as handed over by an extraction step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub packages: Vec<PackageSnapshot>,
}

/// One package of a [`GraphSnapshot`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageSnapshot {
    /// Package name, optionally with a `.*` component suffix
    pub name: String,

    #[serde(default = "default_volatility")]
    pub volatility: f64,

    #[serde(default)]
    pub classes: Vec<ClassInfo>,

    /// Names of the packages this one depends on
    #[serde(default)]
    pub efferents: Vec<String>,
}

fn default_volatility() -> f64 {
    DEFAULT_VOLATILITY
}
