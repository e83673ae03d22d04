//! Shared fixtures for integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;

use mcp_get::config::ConfigError;
use mcp_get::naming::registry_file_stem;
use mcp_get::prompt::{PromptError, Prompter, Validator};
use mcp_get::runner::{CommandRunner, RunnerError};
use mcp_get::telemetry::{InstallEvent, TelemetryError, TelemetrySink};
use mcp_get::{ConfigPaths, ConfigStore, Registry};
use serde_json::Value;
use tempfile::TempDir;

/// A temp root holding the host config, preferences and registry.
pub struct Fixture {
    pub dir: TempDir,
    pub store: ConfigStore,
    pub registry: Registry,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths::under_root(dir.path());
        fs::create_dir_all(paths.registry_dir()).unwrap();
        let registry = Registry::from_paths(&paths);
        let store = ConfigStore::new(paths);
        Self {
            dir,
            store,
            registry,
        }
    }

    /// Write a per-package registry document.
    pub fn add_package(&self, package: Value) {
        let name = package["name"].as_str().unwrap();
        let path = self
            .registry
            .dir()
            .join(format!("{}.json", registry_file_stem(name)));
        fs::write(path, serde_json::to_string_pretty(&package).unwrap()).unwrap();
    }

    pub fn write_config(&self, config: Value) {
        self.write_config_text(&serde_json::to_string_pretty(&config).unwrap());
    }

    pub fn write_config_text(&self, text: &str) {
        let path = self.config_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    pub fn config_path(&self) -> PathBuf {
        self.store.config_path().to_path_buf()
    }

    pub fn config_bytes(&self) -> Option<Vec<u8>> {
        fs::read(self.config_path()).ok()
    }

    pub fn config_json(&self) -> Value {
        serde_json::from_slice(&self.config_bytes().expect("config written")).unwrap()
    }
}

pub fn node_package(name: &str) -> Value {
    serde_json::json!({
        "name": name,
        "description": format!("{name} server"),
        "vendor": "Acme",
        "sourceUrl": format!("https://github.com/acme/{name}"),
        "homepage": "https://acme.dev",
        "license": "MIT",
        "runtime": "node"
    })
}

/// Unattended environment: no analytics prompt.
pub fn ci_env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    let mut env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env.insert("CI".to_string(), "true".to_string());
    env
}

#[derive(Debug, Clone)]
pub enum Answer {
    Confirm(bool),
    Select(usize),
    Input(&'static str),
    Escape,
}

/// Replays a fixed list of answers and records every prompt message.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: answers.into(),
            asked: Vec::new(),
        }
    }

    pub fn silent() -> Self {
        Self::new(Vec::new())
    }

    pub fn exhausted(&self) -> bool {
        self.answers.is_empty()
    }

    fn next(&mut self, message: &str) -> Answer {
        self.asked.push(message.to_string());
        self.answers
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected prompt: {message}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, message: &str, _default: bool) -> Result<bool, PromptError> {
        match self.next(message) {
            Answer::Confirm(b) => Ok(b),
            Answer::Escape => Err(PromptError::Cancelled),
            other => panic!("expected confirm for {message:?}, got {other:?}"),
        }
    }

    fn select(&mut self, message: &str, items: &[String], _default: usize) -> Result<usize, PromptError> {
        match self.next(message) {
            Answer::Select(i) => {
                assert!(i < items.len(), "index {i} out of range for {items:?}");
                Ok(i)
            }
            Answer::Escape => Err(PromptError::Cancelled),
            other => panic!("expected select for {message:?}, got {other:?}"),
        }
    }

    fn input(&mut self, message: &str, validate: Validator<'_>) -> Result<String, PromptError> {
        match self.next(message) {
            Answer::Input(s) => {
                validate(s).unwrap_or_else(|e| panic!("scripted input rejected: {e}"));
                Ok(s.to_string())
            }
            Answer::Escape => Err(PromptError::Cancelled),
            other => panic!("expected input for {message:?}, got {other:?}"),
        }
    }
}

/// Records commands instead of running them.
#[derive(Debug, Default)]
pub struct FakeRunner {
    pub has_uvx: bool,
    pub restart_fails: bool,
    pub calls: RefCell<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            has_uvx: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn binary_available(&self, binary: &str) -> bool {
        self.calls.borrow_mut().push(format!("which {binary}"));
        binary != "uvx" || self.has_uvx
    }

    fn install_uv(&self) -> Result<(), RunnerError> {
        self.calls.borrow_mut().push("install uv".to_string());
        Ok(())
    }

    fn restart_host(&self) -> Result<(), RunnerError> {
        self.calls.borrow_mut().push("restart".to_string());
        if self.restart_fails {
            return Err(RunnerError::EmptyCommand);
        }
        Ok(())
    }

    fn open_url(&self, url: &str) -> Result<(), RunnerError> {
        self.calls.borrow_mut().push(format!("open {url}"));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    pub events: RefCell<Vec<InstallEvent>>,
}

impl TelemetrySink for RecordingTelemetry {
    fn report_install(&self, event: &InstallEvent) -> Result<(), TelemetryError> {
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}

/// A sink whose every report fails.
#[derive(Debug, Default)]
pub struct FailingTelemetry {
    pub attempts: RefCell<usize>,
}

impl TelemetrySink for FailingTelemetry {
    fn report_install(&self, _event: &InstallEvent) -> Result<(), TelemetryError> {
        *self.attempts.borrow_mut() += 1;
        Err(TelemetryError::Preferences(ConfigError::Write {
            path: PathBuf::from("/unreachable"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }))
    }
}
