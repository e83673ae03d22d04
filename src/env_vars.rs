//! Collects values for a package's declared environment variables.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::models::EnvVarSpec;
use crate::prompt::{PromptError, Prompter};

/// Read access to environment variables. Empty values count as unset.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.is_empty())
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// What the collector gathered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvCollection {
    /// `None` when nothing was configured; becomes the entry's `env`.
    pub values: Option<BTreeMap<String, String>>,
    /// Required variables the user chose not to set.
    pub missing_required: Vec<String>,
}

/// Ask for values of `declared`, preferring what is already in `env`.
///
/// Declining a required variable is not an error; it is listed in
/// `missing_required`. Escaping any prompt cancels the whole collection.
pub fn collect_env_vars(
    declared: &BTreeMap<String, EnvVarSpec>,
    env: &dyn EnvSource,
    prompter: &mut dyn Prompter,
) -> Result<EnvCollection, PromptError> {
    if declared.is_empty() {
        return Ok(EnvCollection::default());
    }

    let detected: BTreeMap<String, String> = declared
        .keys()
        .filter_map(|key| env.var(key).map(|v| (key.clone(), v)))
        .collect();
    let has_all_required = declared
        .iter()
        .filter(|(_, spec)| spec.required)
        .all(|(key, _)| detected.contains_key(key));

    if has_all_required && !detected.is_empty() {
        let use_detected = prompter.confirm(
            "Found all required environment variables. Would you like to use them automatically?",
            true,
        )?;
        if use_detected {
            debug!(count = detected.len(), "using detected environment variables");
            return Ok(EnvCollection {
                values: Some(detected),
                missing_required: Vec::new(),
            });
        }
    }

    let mut values = BTreeMap::new();
    let mut missing_required = Vec::new();

    for (key, spec) in declared {
        if let Some(existing) = detected.get(key) {
            let reuse = prompter.confirm(
                &format!("Found {key} in your environment variables. Would you like to use it?"),
                true,
            )?;
            if reuse {
                values.insert(key.clone(), existing.clone());
                continue;
            }
        }

        let label = if spec.required { "required" } else { "optional" };
        let configure = prompter.confirm(
            &format!("Configure {key} ({label}): {}?", spec.description),
            spec.required,
        )?;
        if !configure {
            if spec.required {
                warn!(var = %key, "required environment variable left unconfigured");
                missing_required.push(key.clone());
            }
            continue;
        }

        let required = spec.required;
        let validate = move |input: &str| {
            if required && input.trim().is_empty() {
                Err(format!("{key} is required"))
            } else {
                Ok(())
            }
        };
        let value = prompter.input(&format!("Please enter {}:", spec.description), &validate)?;
        // Stored as typed; whitespace only counts as empty.
        if value.trim().is_empty() {
            if required {
                missing_required.push(key.clone());
            }
            continue;
        }
        values.insert(key.clone(), value);
    }

    Ok(EnvCollection {
        values: (!values.is_empty()).then_some(values),
        missing_required,
    })
}
