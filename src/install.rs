//! Install and uninstall MCP servers.
//!
//! An install walks through [`InstallStage`] in order. Only the config write
//! can fail the operation; every later step is best effort. Nothing is
//! written before that step, so a cancelled install leaves disk untouched.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{installed_key, ConfigError, ConfigStore, Removal};
use crate::env_vars::{collect_env_vars, EnvSource, ProcessEnv};
use crate::models::{Package, ResolvedPackage, Runtime};
use crate::prompt::{PromptError, Prompter};
use crate::registry::Registry;
use crate::resolver::Resolver;
use crate::runner::{CommandRunner, PYTHON_LAUNCHER};
use crate::telemetry::{analytics_consent, InstallEvent, NoopTelemetry, TelemetrySink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    Idle,
    CheckingLauncher,
    CollectingEnvVars,
    WritingConfig,
    ReportingTelemetry,
    PromptingRestart,
    Done,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstallStage::Idle => "starting",
            InstallStage::CheckingLauncher => "checking launcher",
            InstallStage::CollectingEnvVars => "collecting environment variables",
            InstallStage::WritingConfig => "writing config",
            InstallStage::ReportingTelemetry => "reporting telemetry",
            InstallStage::PromptingRestart => "restarting host app",
            InstallStage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Whether to offer a host restart after changing the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    #[default]
    Prompt,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartStatus {
    NotRequested,
    Restarted,
    /// Restart was attempted and failed. The config change still stands.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub package: String,
    pub server_key: String,
    /// Required variables the user left unset.
    pub missing_required: Vec<String>,
    /// Launcher binary that was missing at install time.
    pub launcher_missing: Option<&'static str>,
    pub restart: RestartStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed(InstallReport),
    Cancelled { stage: InstallStage },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    Uninstalled {
        server_key: String,
        restart: RestartStatus,
    },
    NotInstalled,
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("failed to persist config: {0}")]
    Persist(#[from] ConfigError),
    #[error("prompt failed while {stage}: {source}")]
    Prompt {
        stage: InstallStage,
        #[source]
        source: std::io::Error,
    },
}

/// Drives installs and uninstalls against one config store.
pub struct Installer<'a> {
    store: &'a ConfigStore,
    registry: &'a Registry,
    prompter: &'a mut dyn Prompter,
    runner: &'a dyn CommandRunner,
    telemetry: &'a dyn TelemetrySink,
    env: &'a dyn EnvSource,
    restart: RestartPolicy,
    stage: InstallStage,
}

impl<'a> Installer<'a> {
    pub fn new(
        store: &'a ConfigStore,
        registry: &'a Registry,
        prompter: &'a mut dyn Prompter,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        Self {
            store,
            registry,
            prompter,
            runner,
            telemetry: &NoopTelemetry,
            env: &ProcessEnv,
            restart: RestartPolicy::default(),
            stage: InstallStage::Idle,
        }
    }

    pub fn with_telemetry(mut self, telemetry: &'a dyn TelemetrySink) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_env(mut self, env: &'a dyn EnvSource) -> Self {
        self.env = env;
        self
    }

    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }

    /// Stage reached by the last operation.
    pub fn stage(&self) -> InstallStage {
        self.stage
    }

    /// Host config file this installer writes.
    pub fn config_path(&self) -> &'a std::path::Path {
        self.store.config_path()
    }

    pub fn resolver(&self) -> Resolver<'a> {
        Resolver::new(self.registry, self.store)
    }

    pub(crate) fn prompter(&mut self) -> &mut dyn Prompter {
        &mut *self.prompter
    }

    pub(crate) fn runner(&self) -> &'a dyn CommandRunner {
        self.runner
    }

    fn enter(&mut self, stage: InstallStage) {
        debug!(from = %self.stage, to = %stage, "install stage");
        self.stage = stage;
    }

    /// Install a package by name. Names the registry doesn't know are
    /// installed only after the user confirms and picks a runtime.
    pub fn install_by_name(&mut self, name: &str) -> Result<InstallOutcome, InstallError> {
        self.enter(InstallStage::Idle);
        if let Some(resolved) = self.resolver().resolve_package(name).filter(|r| r.is_verified) {
            return self.install(&resolved.package);
        }

        warn!(package = name, "package not found in the curated list");
        let proceed = match self.prompter.confirm(
            &format!("Would you like to try installing {name} anyway? This package hasn't been verified."),
            false,
        ) {
            Ok(answer) => answer,
            Err(e) => return self.cancelled_or_failed(e),
        };
        if !proceed {
            return Ok(InstallOutcome::Cancelled { stage: self.stage });
        }

        let choices = ["Node.js".to_string(), "Python".to_string()];
        let runtime = match self
            .prompter
            .select("What runtime does this package use?", &choices, 0)
        {
            Ok(1) => Runtime::Python,
            Ok(_) => Runtime::Node,
            Err(e) => return self.cancelled_or_failed(e),
        };

        self.install(&Package::unverified(name, runtime))
    }

    pub fn install(&mut self, pkg: &Package) -> Result<InstallOutcome, InstallError> {
        self.enter(InstallStage::Idle);
        info!(package = %pkg.name, "installing");

        self.enter(InstallStage::CheckingLauncher);
        let launcher_missing = self.check_launcher(pkg.runtime_or_default());

        self.enter(InstallStage::CollectingEnvVars);
        // Registry entry is authoritative; fall back to what the caller passed.
        let mut declared = self.registry.environment_variables_for(&pkg.name);
        if declared.is_empty() {
            declared = pkg.environment_variables.clone().unwrap_or_default();
        }
        let collected = match collect_env_vars(&declared, self.env, &mut *self.prompter) {
            Ok(c) => c,
            Err(e) => return self.cancelled_or_failed(e),
        };

        self.enter(InstallStage::WritingConfig);
        let server_key = self.store.install_package(pkg, collected.values)?;
        info!(package = %pkg.name, key = %server_key, "updated host configuration");

        self.enter(InstallStage::ReportingTelemetry);
        self.report_install(pkg);

        let restart = self.maybe_restart();
        self.enter(InstallStage::Done);

        Ok(InstallOutcome::Installed(InstallReport {
            package: pkg.name.clone(),
            server_key,
            missing_required: collected.missing_required,
            launcher_missing,
            restart,
        }))
    }

    /// Remove an installed server. Not being installed is a normal outcome.
    pub fn uninstall(&mut self, name: &str) -> Result<UninstallOutcome, InstallError> {
        let key = installed_key(&self.store.read_config(), name);
        self.remove(name, key)
    }

    /// Remove the exact config entry `pkg` was resolved from.
    pub fn uninstall_resolved(&mut self, pkg: &ResolvedPackage) -> Result<UninstallOutcome, InstallError> {
        self.remove(pkg.name(), pkg.server_key.clone())
    }

    /// [`Self::uninstall`] behind an "are you sure" prompt (default no).
    pub fn uninstall_with_confirmation(&mut self, name: &str) -> Result<UninstallOutcome, InstallError> {
        let key = installed_key(&self.store.read_config(), name);
        self.confirm_then_remove(name, key)
    }

    /// [`Self::uninstall_resolved`] behind an "are you sure" prompt.
    pub fn uninstall_resolved_with_confirmation(
        &mut self,
        pkg: &ResolvedPackage,
    ) -> Result<UninstallOutcome, InstallError> {
        self.confirm_then_remove(pkg.name(), pkg.server_key.clone())
    }

    fn confirm_then_remove(&mut self, name: &str, key: Option<String>) -> Result<UninstallOutcome, InstallError> {
        self.enter(InstallStage::Idle);
        if key.is_none() {
            return Ok(UninstallOutcome::NotInstalled);
        }

        match self
            .prompter
            .confirm(&format!("Are you sure you want to uninstall {name}?"), false)
        {
            Ok(true) => self.remove(name, key),
            Ok(false) | Err(PromptError::Cancelled) => Ok(UninstallOutcome::Cancelled),
            Err(PromptError::Terminal(source)) => Err(InstallError::Prompt {
                stage: self.stage,
                source,
            }),
        }
    }

    fn remove(&mut self, name: &str, key: Option<String>) -> Result<UninstallOutcome, InstallError> {
        self.enter(InstallStage::WritingConfig);
        let removal = match key {
            Some(key) => self.store.remove_server(&key)?,
            None => Removal::NotInstalled,
        };
        let server_key = match removal {
            Removal::Removed(key) => key,
            Removal::NotInstalled => {
                self.enter(InstallStage::Done);
                return Ok(UninstallOutcome::NotInstalled);
            }
        };
        info!(package = name, key = %server_key, "uninstalled");

        let restart = self.maybe_restart();
        self.enter(InstallStage::Done);
        Ok(UninstallOutcome::Uninstalled { server_key, restart })
    }

    fn cancelled_or_failed(&self, e: PromptError) -> Result<InstallOutcome, InstallError> {
        match e {
            PromptError::Cancelled => {
                debug!(stage = %self.stage, "install cancelled");
                Ok(InstallOutcome::Cancelled { stage: self.stage })
            }
            PromptError::Terminal(source) => Err(InstallError::Prompt {
                stage: self.stage,
                source,
            }),
        }
    }

    /// Python packages need `uvx`. A missing launcher is reported, never fatal.
    fn check_launcher(&mut self, runtime: Runtime) -> Option<&'static str> {
        if runtime != Runtime::Python || self.runner.binary_available(PYTHON_LAUNCHER) {
            return None;
        }

        warn!(launcher = PYTHON_LAUNCHER, "launcher not found on PATH");
        let install = self.prompter.confirm(
            "UV package manager is required for Python MCP servers. Would you like to install it?",
            true,
        );
        match install {
            Ok(true) => match self.runner.install_uv() {
                Ok(()) => {
                    info!("installed uv");
                    return None;
                }
                Err(e) => warn!(error = %e, "failed to install uv"),
            },
            Ok(false) | Err(PromptError::Cancelled) => {
                debug!("uv install declined")
            }
            Err(e) => warn!(error = %e, "uv prompt failed"),
        }
        Some(PYTHON_LAUNCHER)
    }

    fn report_install(&mut self, pkg: &Package) {
        let verified = self.registry.load_package(&pkg.name).is_some();
        match analytics_consent(self.store, &mut *self.prompter, self.env) {
            Ok(true) => {
                let event = InstallEvent::new(&pkg.name, pkg.runtime_or_default(), verified);
                if let Err(e) = self.telemetry.report_install(&event) {
                    debug!(error = %e, "telemetry failed");
                }
            }
            Ok(false) => debug!("analytics not allowed"),
            Err(e) => warn!(error = %e, "could not resolve analytics preference"),
        }
    }

    fn maybe_restart(&mut self) -> RestartStatus {
        self.enter(InstallStage::PromptingRestart);
        if self.restart == RestartPolicy::Skip {
            return RestartStatus::NotRequested;
        }

        match self.prompter.confirm(
            "Would you like to restart the Claude desktop app to apply changes?",
            true,
        ) {
            Ok(true) => match self.runner.restart_host() {
                Ok(()) => RestartStatus::Restarted,
                Err(e) => {
                    warn!(error = %e, "failed to restart host app");
                    RestartStatus::Failed(e.to_string())
                }
            },
            Ok(false) | Err(PromptError::Cancelled) => RestartStatus::NotRequested,
            Err(e) => {
                warn!(error = %e, "restart prompt failed");
                RestartStatus::Failed(e.to_string())
            }
        }
    }
}

impl fmt::Debug for Installer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("store", &self.store)
            .field("registry", &self.registry)
            .field("restart", &self.restart)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}
