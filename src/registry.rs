//! Package registry loading.
//!
//! The registry is either a directory of per-package documents or a single
//! `package-list.json` array. The directory wins when it holds any package
//! documents. Malformed entries are skipped with a warning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::models::{EnvVarSpec, Package};
use crate::naming::registry_file_stem;
use crate::paths::{ConfigPaths, PACKAGE_LIST_FILE};

/// Files in the registry directory that are not package documents.
const NON_PACKAGE_FILES: &[&str] = &[PACKAGE_LIST_FILE, "index.json"];

#[derive(Debug, Clone)]
pub struct Registry {
    dir: PathBuf,
    package_list: PathBuf,
}

impl Registry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let package_list = dir.join(PACKAGE_LIST_FILE);
        Self { dir, package_list }
    }

    pub fn from_paths(paths: &ConfigPaths) -> Self {
        Self::new(paths.registry_dir())
    }

    /// Use a list document that lives outside the registry directory.
    pub fn with_package_list(mut self, path: impl Into<PathBuf>) -> Self {
        self.package_list = path.into();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn package_list_path(&self) -> &Path {
        &self.package_list
    }

    /// Load every package. Never fails; problems are logged.
    pub fn load_all_packages(&self) -> Vec<Package> {
        let files = self.package_files();
        if !files.is_empty() {
            debug!(dir = %self.dir.display(), count = files.len(), "loading registry directory");
            return files
                .iter()
                .filter_map(|path| load_package_file(path))
                .collect();
        }

        if self.package_list.is_file() {
            debug!(path = %self.package_list.display(), "loading package list");
            return self.load_package_list();
        }

        warn!(dir = %self.dir.display(), "no package registry found");
        Vec::new()
    }

    /// Look up one package by canonical name.
    pub fn load_package(&self, name: &str) -> Option<Package> {
        // Registry filename scheme (`@` dropped, `/` -> `--`), not the config-key scheme.
        let path = self.dir.join(format!("{}.json", registry_file_stem(name)));
        if path.is_file() {
            // `a/b` and `@a/b` share a stem; only accept the exact name.
            if let Some(pkg) = load_package_file(&path).filter(|p| p.name == name) {
                return Some(pkg);
            }
        }

        if self.package_list.is_file() {
            return self
                .load_package_list()
                .into_iter()
                .find(|p| p.name == name);
        }

        None
    }

    /// Declared environment variables for `name`; empty when unknown.
    pub fn environment_variables_for(&self, name: &str) -> BTreeMap<String, EnvVarSpec> {
        self.load_package(name)
            .and_then(|p| p.environment_variables)
            .unwrap_or_default()
    }

    /// Case-insensitive substring match on name, description and vendor.
    pub fn search_packages(&self, query: &str) -> Vec<Package> {
        let query = query.to_lowercase();
        self.load_all_packages()
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&query)
                    || p.description.to_lowercase().contains(&query)
                    || p.vendor.to_lowercase().contains(&query)
            })
            .collect()
    }

    /// Per-package documents in the registry directory, sorted by filename.
    pub fn package_files(&self) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| !NON_PACKAGE_FILES.contains(&n))
            })
            .collect();
        files.sort();
        files
    }

    fn load_package_list(&self) -> Vec<Package> {
        let content = match std::fs::read_to_string(&self.package_list) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.package_list.display(), error = %e, "failed to read package list");
                return Vec::new();
            }
        };

        let entries: Vec<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(v) => v,
            Err(e) => {
                warn!(path = %self.package_list.display(), error = %e, "package list is not a JSON array");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .enumerate()
            .filter_map(|(i, value)| match serde_json::from_value::<Package>(value) {
                Ok(p) if !p.name.is_empty() => Some(p),
                Ok(_) => {
                    warn!(index = i, "skipping package list entry without a name");
                    None
                }
                Err(e) => {
                    warn!(index = i, error = %e, "skipping malformed package list entry");
                    None
                }
            })
            .collect()
    }
}

fn load_package_file(path: &Path) -> Option<Package> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read package");
            return None;
        }
    };

    match serde_json::from_str::<Package>(&content) {
        Ok(p) if !p.name.is_empty() => Some(p),
        Ok(_) => {
            warn!(path = %path.display(), "skipping package without a name");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not load package");
            None
        }
    }
}
