//! Registry validation.
//!
//! Loading is lenient; this is the strict pass a registry maintainer runs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde_json::Value;

use crate::naming::{registry_file_stem, server_key};
use crate::registry::Registry;

const REQUIRED_FIELDS: &[&str] = &[
    "name",
    "description",
    "vendor",
    "sourceUrl",
    "homepage",
    "license",
    "runtime",
];
const URL_FIELDS: &[&str] = &["sourceUrl", "homepage"];
const RUNTIMES: &[&str] = &["node", "python", "go"];

/// One problem, tied to the document it was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub location: String,
    pub message: String,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryReport {
    /// Number of package documents looked at.
    pub checked: usize,
    pub problems: Vec<Problem>,
}

impl RegistryReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    fn push(&mut self, location: &str, message: impl Into<String>) {
        self.problems.push(Problem {
            location: location.to_string(),
            message: message.into(),
        });
    }
}

/// Schema problems in one package document.
pub fn validate_package_value(value: &Value) -> Vec<String> {
    let Some(obj) = value.as_object() else {
        return vec!["package must be a JSON object".to_string()];
    };
    let mut problems = Vec::new();

    for field in REQUIRED_FIELDS {
        match obj.get(*field) {
            None => problems.push(format!("missing required field `{field}`")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                problems.push(format!("field `{field}` is empty"))
            }
            Some(Value::String(_)) => {}
            Some(_) => problems.push(format!("field `{field}` must be a string")),
        }
    }

    for field in URL_FIELDS {
        if let Some(url) = obj.get(*field).and_then(Value::as_str) {
            if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
                problems.push(format!("field `{field}` must be an http(s) URL, got `{url}`"));
            }
        }
    }

    if let Some(runtime) = obj.get("runtime").and_then(Value::as_str) {
        if !runtime.is_empty() && !RUNTIMES.contains(&runtime) {
            problems.push(format!(
                "runtime `{runtime}` is not one of {}",
                RUNTIMES.join(", ")
            ));
        }
    }

    match obj.get("environmentVariables") {
        None | Some(Value::Null) => {}
        Some(Value::Object(vars)) => {
            for (key, spec) in vars {
                problems.extend(validate_env_var(key, spec));
            }
        }
        Some(_) => problems.push("`environmentVariables` must be an object".to_string()),
    }

    problems
}

fn validate_env_var(key: &str, spec: &Value) -> Vec<String> {
    let Some(spec) = spec.as_object() else {
        return vec![format!("environment variable `{key}` must be an object")];
    };
    let mut problems = Vec::new();
    match spec.get("description") {
        Some(Value::String(s)) if !s.trim().is_empty() => {}
        _ => problems.push(format!(
            "environment variable `{key}` needs a non-empty `description`"
        )),
    }
    if !matches!(spec.get("required"), Some(Value::Bool(_))) {
        problems.push(format!("environment variable `{key}` needs a boolean `required`"));
    }
    if spec.get("argName").is_some_and(|v| !v.is_string()) {
        problems.push(format!("environment variable `{key}` has a non-string `argName`"));
    }
    problems
}

/// Check every document in `registry`.
pub fn check_registry(registry: &Registry) -> RegistryReport {
    let mut report = RegistryReport::default();
    let mut names: Vec<(String, String)> = Vec::new();

    let files = registry.package_files();
    if !files.is_empty() {
        for path in &files {
            let location = file_label(path);
            report.checked += 1;
            let Some(value) = read_json(path, &location, &mut report) else {
                continue;
            };
            check_document(&value, &location, &mut report, &mut names);

            if let Some(name) = value.get("name").and_then(Value::as_str) {
                let expected = registry_file_stem(name);
                let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
                if stem != expected {
                    report.push(&location, format!("file should be named `{expected}.json`"));
                }
            }
        }
    } else {
        let path = registry.package_list_path();
        let location = file_label(path);
        match read_json(path, &location, &mut report) {
            Some(Value::Array(entries)) => {
                for (i, value) in entries.iter().enumerate() {
                    report.checked += 1;
                    check_document(value, &format!("{location}[{i}]"), &mut report, &mut names);
                }
            }
            Some(_) => report.push(&location, "package list must be a JSON array"),
            None => {}
        }
    }

    check_names(&names, &mut report);
    report
}

fn check_document(
    value: &Value,
    location: &str,
    report: &mut RegistryReport,
    names: &mut Vec<(String, String)>,
) {
    for problem in validate_package_value(value) {
        report.push(location, problem);
    }
    if let Some(name) = value.get("name").and_then(Value::as_str) {
        if !name.is_empty() {
            names.push((name.to_string(), location.to_string()));
        }
    }
}

fn check_names(names: &[(String, String)], report: &mut RegistryReport) {
    let mut by_name: BTreeMap<&str, &str> = BTreeMap::new();
    let mut by_key: BTreeMap<String, &str> = BTreeMap::new();

    for (name, location) in names {
        if let Some(first) = by_name.get(name.as_str()) {
            report.push(location, format!("duplicate package name `{name}` (first in {first})"));
            continue;
        }
        by_name.insert(name, location);

        let key = server_key(name);
        match by_key.get(&key) {
            Some(other) => report.push(
                location,
                format!("`{name}` and `{other}` share the config key `{key}`"),
            ),
            None => {
                by_key.insert(key, name);
            }
        }
    }
}

fn read_json(path: &Path, location: &str, report: &mut RegistryReport) -> Option<Value> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            report.push(location, format!("cannot read: {e}"));
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(v) => Some(v),
        Err(e) => {
            report.push(location, format!("invalid JSON: {e}"));
            None
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
