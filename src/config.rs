//! Directive definition files
//!
//! A prescription can be written down as a `.directive.toml` file instead of
//! being built in code.
//!
//! ## File Format
//!
//! ```toml
//! # .directive.toml
//!
//! # "afferent-only", "efferent-only" or "both" (default)
//! match_mode = "efferent-only"
//!
//! # Only check these observed packages (optional; default checks all)
//! filter = ["com.xyz.ejb", "com.xyz.web"]
//!
//! # Prescribed packages and their efferents. A trailing `.*` declares a
//! # component standing in for the whole namespace below it.
//! [packages]
//! "com.xyz.ejb" = ["com.xyz.util"]
//! "com.xyz.web" = ["com.xyz.util", "org.util.*"]
//! "com.xyz.util" = []
//! ```
//!
//! Dependency targets that have no entry of their own are still added to
//! the prescribed graph.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::directive::{Directive, MatchMode, PackageFilter};
use crate::graph::{GraphError, PackageGraph};
use crate::prescription::Prescription;

/// File names searched for by [`find_directive_file`], in order
pub const DIRECTIVE_FILE_NAMES: [&str; 2] = [".directive.toml", "directive.toml"];

/// Errors that can occur when loading a directive or a graph snapshot
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse directive file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid package graph: {0}")]
    GraphError(#[from] GraphError),
}

/// Raw directive definition as written in a TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectiveConfig {
    /// Which couplings to verify
    #[serde(default)]
    pub match_mode: MatchMode,

    /// Observed packages to check; `None` checks all of them
    #[serde(default)]
    pub filter: Option<Vec<String>>,

    /// Prescribed package name -> names of the packages it depends on
    #[serde(default)]
    pub packages: BTreeMap<String, Vec<String>>,
}

impl DirectiveConfig {
    /// Build the prescription described by this definition
    pub fn into_prescription(self) -> Result<Prescription, ConfigError> {
        let mut prescription = match &self.filter {
            Some(names) => Prescription::with_filter(PackageFilter::from_names(names)?),
            None => Prescription::new(),
        };
        prescription.set_match_mode(self.match_mode);

        for (name, efferents) in &self.packages {
            let from = prescription.add_package(name)?;
            for efferent in efferents {
                let to = prescription.add_package(efferent)?;
                prescription.depends_upon(from, to)?;
            }
        }

        Ok(prescription)
    }
}

/// Parse a directive definition from TOML text
pub fn parse_directive(content: &str) -> Result<Prescription, ConfigError> {
    let config: DirectiveConfig = toml::from_str(content)?;
    config.into_prescription()
}

/// Load a directive definition from a file
pub fn load_directive(path: &Path) -> Result<Prescription, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_directive(&content)
}

/// Find and load the nearest directive file above `start_path`
///
/// Returns `Ok(None)` when no directive file exists.
pub fn discover_directive(start_path: &Path) -> Result<Option<Prescription>, ConfigError> {
    match find_directive_file(start_path) {
        Some(path) => load_directive(&path).map(Some),
        None => Ok(None),
    }
}

/// Find the directive file by searching up the directory tree
pub fn find_directive_file(start_path: &Path) -> Option<PathBuf> {
    let mut current = if start_path.is_file() {
        start_path.parent()?.to_path_buf()
    } else {
        start_path.to_path_buf()
    };

    loop {
        for name in &DIRECTIVE_FILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return None,
        }
    }
}

/// Load an observed package graph from a JSON snapshot file
pub fn load_snapshot(path: &Path) -> Result<PackageGraph, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(PackageGraph::from_json(&content)?)
}
