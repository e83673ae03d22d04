//! Anonymous install analytics.
//!
//! Reporting is opt-in and fire-and-forget: callers log failures and move on.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::config::{ConfigError, ConfigStore};
use crate::env_vars::EnvSource;
use crate::models::{Preferences, Runtime};
use crate::prompt::{PromptError, Prompter};

/// Endpoint that receives install events. Unset means no reporting.
pub const ANALYTICS_URL_ENV: &str = "MCP_GET_ANALYTICS_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallEvent {
    pub package_name: String,
    pub runtime: Runtime,
    pub verified: bool,
    pub tool_version: &'static str,
}

impl InstallEvent {
    pub fn new(package_name: &str, runtime: Runtime, verified: bool) -> Self {
        Self {
            package_name: package_name.to_string(),
            runtime,
            verified,
            tool_version: env!("CARGO_PKG_VERSION"),
        }
    }
}

pub trait TelemetrySink {
    fn report_install(&self, event: &InstallEvent) -> Result<(), TelemetryError>;
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn report_install(&self, event: &InstallEvent) -> Result<(), TelemetryError> {
        debug!(package = %event.package_name, "telemetry disabled, dropping event");
        Ok(())
    }
}

/// POSTs events as JSON.
#[derive(Debug, Clone)]
pub struct HttpTelemetry {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpTelemetry {
    pub fn new(endpoint: &str) -> Result<Self, TelemetryError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("mcp-get/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(TelemetryError::HttpClient)?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Sink for the endpoint in [`ANALYTICS_URL_ENV`], if configured.
    pub fn from_env(env: &dyn EnvSource) -> Option<Result<Self, TelemetryError>> {
        env.var(ANALYTICS_URL_ENV).map(|url| Self::new(url.trim()))
    }
}

impl TelemetrySink for HttpTelemetry {
    fn report_install(&self, event: &InstallEvent) -> Result<(), TelemetryError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(event)
            .send()
            .map_err(TelemetryError::Send)?;
        resp.error_for_status().map_err(TelemetryError::Send)?;
        debug!(package = %event.package_name, "reported install");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to send event: {0}")]
    Send(#[source] reqwest::Error),
    #[error("failed to save analytics preference: {0}")]
    Preferences(#[from] ConfigError),
    #[error("analytics prompt failed: {0}")]
    Prompt(#[source] PromptError),
}

/// Whether `CI` marks this as an unattended run.
pub fn is_ci(env: &dyn EnvSource) -> bool {
    env.var("CI")
        .is_some_and(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false"))
}

/// Stored analytics consent, asking (and persisting the answer) the first time.
///
/// In CI nothing is asked and consent defaults to off. Escaping the prompt
/// counts as "no" for this run and is not persisted.
pub fn analytics_consent(
    store: &ConfigStore,
    prompter: &mut dyn Prompter,
    env: &dyn EnvSource,
) -> Result<bool, TelemetryError> {
    let prefs = store.read_preferences();
    if let Some(allowed) = prefs.allow_analytics {
        return Ok(allowed);
    }

    let allowed = if is_ci(env) {
        debug!("CI detected, analytics default to off");
        false
    } else {
        match prompter.confirm(
            "Would you like to help improve mcp-get by sharing anonymous installation analytics?",
            true,
        ) {
            Ok(answer) => answer,
            Err(PromptError::Cancelled) => return Ok(false),
            Err(e) => return Err(TelemetryError::Prompt(e)),
        }
    };

    store.write_preferences(&Preferences {
        allow_analytics: Some(allowed),
    })?;
    Ok(allowed)
}
