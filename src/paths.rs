//! Path resolution for the host config, preferences and the package registry.
//!
//! Paths are computed once at startup from the platform and environment, then
//! handed to every component that touches disk. Nothing reads these locations
//! from global state.

use std::path::{Path, PathBuf};

const HOST_APP_DIR: &str = "Claude";
const HOST_CONFIG_FILE: &str = "claude_desktop_config.json";
const TOOL_DIR: &str = "mcp-get";
const TOOL_DOT_DIR: &str = ".mcp-get";
const PREFERENCES_FILE: &str = "preferences.json";

/// Consolidated registry document, used when no per-package files exist.
pub const PACKAGE_LIST_FILE: &str = "package-list.json";

/// Overrides the registry directory on every platform.
pub const REGISTRY_ENV: &str = "MCP_GET_REGISTRY";

/// Platform families with distinct host config locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }
}

/// Resolved on-disk locations.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub platform: Platform,
    pub config_file: PathBuf,
    pub preferences_file: PathBuf,
    pub registry_dir: PathBuf,
}

impl ConfigPaths {
    /// Resolve paths for the running platform from the process environment.
    pub fn resolve() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| expand_tilde("~"));
        Self::for_platform(Platform::current(), &home, |key| std::env::var(key).ok())
    }

    /// Pure path policy: `env` is consulted for `APPDATA` (Windows),
    /// `XDG_CONFIG_HOME` (Linux only) and the registry override.
    pub fn for_platform<F>(platform: Platform, home: &Path, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            env(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| expand_tilde(&v))
        };

        let (config_file, preferences_file, tool_dir) = match platform {
            Platform::Windows => {
                let app_data =
                    non_empty("APPDATA").unwrap_or_else(|| home.join("AppData").join("Roaming"));
                (
                    app_data.join(HOST_APP_DIR).join(HOST_CONFIG_FILE),
                    app_data.join(TOOL_DIR).join(PREFERENCES_FILE),
                    app_data.join(TOOL_DIR),
                )
            }
            Platform::MacOs => (
                home.join("Library")
                    .join("Application Support")
                    .join(HOST_APP_DIR)
                    .join(HOST_CONFIG_FILE),
                home.join(TOOL_DOT_DIR).join(PREFERENCES_FILE),
                home.join(TOOL_DOT_DIR),
            ),
            Platform::Linux => {
                let config_home =
                    non_empty("XDG_CONFIG_HOME").unwrap_or_else(|| home.join(".config"));
                (
                    config_home.join(HOST_APP_DIR).join(HOST_CONFIG_FILE),
                    home.join(TOOL_DOT_DIR).join(PREFERENCES_FILE),
                    home.join(TOOL_DOT_DIR),
                )
            }
        };

        let registry_dir = non_empty(REGISTRY_ENV).unwrap_or_else(|| tool_dir.join("packages"));

        Self {
            platform,
            config_file,
            preferences_file,
            registry_dir,
        }
    }

    /// Everything under one directory. Used by tests and sandboxed runs.
    pub fn under_root(root: &Path) -> Self {
        Self {
            platform: Platform::current(),
            config_file: root.join(HOST_APP_DIR).join(HOST_CONFIG_FILE),
            preferences_file: root.join(TOOL_DIR).join(PREFERENCES_FILE),
            registry_dir: root.join("packages"),
        }
    }

    pub fn with_registry_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.registry_dir = dir.into();
        self
    }

    /// Host application config (`claude_desktop_config.json`).
    pub fn config_path(&self) -> &Path {
        &self.config_file
    }

    pub fn preferences_path(&self) -> &Path {
        &self.preferences_file
    }

    /// Directory of per-package registry documents.
    pub fn registry_dir(&self) -> &Path {
        &self.registry_dir
    }

    pub fn package_list_path(&self) -> PathBuf {
        self.registry_dir.join(PACKAGE_LIST_FILE)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    let expanded = shellexpand::tilde(path);
    PathBuf::from(expanded.as_ref())
}
