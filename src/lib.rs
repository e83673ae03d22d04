//! mcp-get - package manager for MCP servers
//!
//! Installs and removes MCP servers in the Claude desktop app's config file,
//! using a curated registry of package metadata.

pub mod browse;
pub mod config;
pub mod env_vars;
pub mod install;
pub mod models;
pub mod naming;
pub mod paths;
pub mod prompt;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod telemetry;
pub mod validate;

pub use browse::{BrowseMode, Browser};
pub use config::{ConfigError, ConfigStore, Removal};
pub use env_vars::{collect_env_vars, EnvSource, ProcessEnv};
pub use install::{InstallError, InstallOutcome, Installer, RestartPolicy, UninstallOutcome};
pub use models::{EnvVarSpec, HostConfig, Package, Preferences, ResolvedPackage, Runtime, ServerEntry};
pub use naming::{display_name_from_key, registry_file_stem, server_key};
pub use paths::{ConfigPaths, Platform};
pub use prompt::{PromptError, Prompter, TerminalPrompter};
pub use registry::Registry;
pub use resolver::Resolver;
pub use runner::{CommandRunner, SystemRunner};
pub use telemetry::{HttpTelemetry, NoopTelemetry, TelemetrySink};
pub use validate::{check_registry, validate_package_value, RegistryReport};
