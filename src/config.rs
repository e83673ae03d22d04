//! Host config and preferences store.
//!
//! Reads never fail: a missing or unparsable file yields the empty default.
//! A document that parses is kept whole, whatever its entries look like.
//! Writes propagate every error, since a config that silently failed to
//! persist would disagree with what the user was told.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{HostConfig, Package, Preferences, Runtime, ServerEntry};
use crate::naming::server_key;
use crate::paths::ConfigPaths;

/// Result of removing a server entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
    /// Entry deleted under this key and the config persisted.
    Removed(String),
    /// Nothing to delete; the file was not touched.
    NotInstalled,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    paths: ConfigPaths,
}

impl ConfigStore {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn config_path(&self) -> &Path {
        self.paths.config_path()
    }

    pub fn read_config(&self) -> HostConfig {
        read_json_or_default(self.paths.config_path(), "config")
    }

    pub fn write_config(&self, config: &HostConfig) -> Result<(), ConfigError> {
        write_json(self.paths.config_path(), config)
    }

    pub fn read_preferences(&self) -> Preferences {
        read_json_or_default(self.paths.preferences_path(), "preferences")
    }

    pub fn write_preferences(&self, prefs: &Preferences) -> Result<(), ConfigError> {
        write_json(self.paths.preferences_path(), prefs)
    }

    /// True iff the normalized key for `name` is present.
    pub fn is_package_installed(&self, name: &str) -> bool {
        // Config-key scheme (`/` -> `-`), not the registry filename scheme.
        self.read_config().contains_server(&server_key(name))
    }

    /// Write (or overwrite) the server entry for `pkg`. Returns the key used.
    pub fn install_package(
        &self,
        pkg: &Package,
        env: Option<BTreeMap<String, String>>,
    ) -> Result<String, ConfigError> {
        let mut config = self.read_config();
        // Config-key scheme (`/` -> `-`).
        let key = server_key(&pkg.name);
        let entry = serde_json::to_value(server_entry_for(pkg, env)).map_err(ConfigError::Serialize)?;

        if config.insert_server(key.clone(), entry).is_some() {
            debug!(key = %key, "replacing existing server entry");
        }
        self.write_config(&config)?;
        Ok(key)
    }

    /// Remove the entry for `name`. The normalized key is tried first, then
    /// the raw name for legacy or hand-edited configs.
    pub fn uninstall_package(&self, name: &str) -> Result<Removal, ConfigError> {
        let Some(key) = installed_key(&self.read_config(), name) else {
            debug!(package = name, "not installed, nothing to remove");
            return Ok(Removal::NotInstalled);
        };
        self.remove_server(&key)
    }

    /// Remove the entry stored under exactly `key`.
    pub fn remove_server(&self, key: &str) -> Result<Removal, ConfigError> {
        let mut config = self.read_config();
        if !config.remove_server(key) {
            debug!(key, "no such server entry, nothing to remove");
            return Ok(Removal::NotInstalled);
        }
        self.write_config(&config)?;
        Ok(Removal::Removed(key.to_string()))
    }
}

/// Key under which `name` is installed, probing the normalized form first.
pub fn installed_key(config: &HostConfig, name: &str) -> Option<String> {
    let normalized = server_key(name);
    if config.contains_server(&normalized) {
        return Some(normalized);
    }
    config.contains_server(name).then(|| name.to_string())
}

/// Build the launcher entry for a package from its runtime.
pub fn server_entry_for(pkg: &Package, env: Option<BTreeMap<String, String>>) -> ServerEntry {
    let runtime = pkg.runtime_or_default();
    let (command, args) = match runtime {
        Runtime::Node => (
            Some("npx".to_string()),
            Some(vec!["-y".to_string(), pkg.name.clone()]),
        ),
        Runtime::Python => (Some("uvx".to_string()), Some(vec![pkg.name.clone()])),
        Runtime::Go => {
            warn!(package = %pkg.name, "no launcher known for go packages; entry has no command");
            (None, None)
        }
    };

    ServerEntry {
        runtime: Some(runtime.as_str().to_string()),
        command,
        args,
        env,
        extra: serde_json::Map::new(),
    }
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path, what: &str) -> T {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return T::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read {what}, using defaults");
            return T::default();
        }
    };

    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse {what}, using defaults");
            T::default()
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let output = serde_json::to_string_pretty(value).map_err(ConfigError::Serialize)?;
    std::fs::write(path, output).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote json");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
