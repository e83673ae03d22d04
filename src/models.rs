//! Data structures for registry packages, the host config and preferences.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Runtime a package is launched with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    #[default]
    Node,
    Python,
    Go,
}

impl Runtime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Runtime::Node => "node",
            Runtime::Python => "python",
            Runtime::Go => "go",
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Runtime {
    type Err = UnknownRuntime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" => Ok(Runtime::Node),
            "python" => Ok(Runtime::Python),
            "go" => Ok(Runtime::Go),
            other => Err(UnknownRuntime(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown runtime `{0}` (expected node, python or go)")]
pub struct UnknownRuntime(pub String);

/// Declared environment variable of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvVarSpec {
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg_name: Option<String>,
}

/// A registry entry. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub license: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<BTreeMap<String, EnvVarSpec>>,
}

impl Package {
    /// A package the registry does not know about, described only by name and runtime.
    pub fn unverified(name: &str, runtime: Runtime) -> Self {
        Self {
            name: name.to_string(),
            description: "Unverified package".to_string(),
            runtime: Some(runtime),
            ..Default::default()
        }
    }

    pub fn runtime_or_default(&self) -> Runtime {
        self.runtime.unwrap_or_default()
    }
}

/// A package merged with installed state. Computed per call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPackage {
    #[serde(flatten)]
    pub package: Package,
    pub is_installed: bool,
    pub is_verified: bool,
    /// Config key this package is installed under, when installed.
    #[serde(skip)]
    pub server_key: Option<String>,
}

impl ResolvedPackage {
    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn runtime(&self) -> Runtime {
        self.package.runtime_or_default()
    }

    /// Placeholder for an installed server with no registry entry.
    pub(crate) fn orphan(name: String, key: &str, runtime: Runtime) -> Self {
        Self {
            package: Package {
                name,
                description: "Installed package (not in package list)".to_string(),
                vendor: "Unknown".to_string(),
                source_url: String::new(),
                homepage: String::new(),
                license: "Unknown".to_string(),
                runtime: Some(runtime),
                version: None,
                environment_variables: None,
            },
            is_installed: true,
            is_verified: false,
            server_key: Some(key.to_string()),
        }
    }
}

/// One entry of `mcpServers` in the host config.
///
/// `runtime` is kept as a raw string so hand-edited entries with values we
/// don't recognise survive a rewrite. Unknown fields are carried along too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const MCP_SERVERS: &str = "mcpServers";

/// The host application's config document.
///
/// Held as the raw ordered JSON object so fields we don't own, and server
/// entries we can't interpret, are written back exactly as they were read.
/// A missing, `null` or non-object `mcpServers` reads as no servers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostConfig {
    document: Map<String, Value>,
}

impl HostConfig {
    fn servers(&self) -> Option<&Map<String, Value>> {
        self.document.get(MCP_SERVERS).and_then(Value::as_object)
    }

    /// Installed server keys in document order.
    pub fn server_keys(&self) -> impl Iterator<Item = &str> {
        self.servers()
            .into_iter()
            .flat_map(|servers| servers.keys().map(String::as_str))
    }

    pub fn server_count(&self) -> usize {
        self.servers().map_or(0, Map::len)
    }

    pub fn contains_server(&self, key: &str) -> bool {
        self.servers().is_some_and(|servers| servers.contains_key(key))
    }

    pub fn server(&self, key: &str) -> Option<&Value> {
        self.servers().and_then(|servers| servers.get(key))
    }

    /// Runtime recorded on an entry, if it is one we know.
    pub fn server_runtime(&self, key: &str) -> Option<Runtime> {
        self.server(key)?
            .get("runtime")
            .and_then(Value::as_str)
            .and_then(|r| r.parse().ok())
    }

    /// Top-level field other than the server map.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.document.get(name)
    }

    /// Insert or replace an entry. A replaced key keeps its position.
    pub fn insert_server(&mut self, key: String, entry: Value) -> Option<Value> {
        let slot = self
            .document
            .entry(MCP_SERVERS)
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            if !slot.is_null() {
                warn!(found = %slot, "replacing malformed mcpServers value");
            }
            *slot = Value::Object(Map::new());
        }
        slot.as_object_mut()?.insert(key, entry)
    }

    /// Remove an entry, keeping the order of the rest.
    pub fn remove_server(&mut self, key: &str) -> bool {
        let Some(servers) = self
            .document
            .get_mut(MCP_SERVERS)
            .and_then(Value::as_object_mut)
        else {
            return false;
        };
        if !servers.contains_key(key) {
            return false;
        }
        *servers = std::mem::take(servers)
            .into_iter()
            .filter(|(k, _)| k != key)
            .collect();
        true
    }
}

/// User preferences, stored apart from the host config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_analytics: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_parses_camel_case_fields() {
        let pkg: Package = serde_json::from_str(
            r#"{
                "name": "@scope/pkg",
                "description": "d",
                "vendor": "v",
                "sourceUrl": "https://example.com/src",
                "homepage": "https://example.com",
                "license": "MIT",
                "runtime": "python",
                "environmentVariables": {
                    "API_KEY": {"description": "key", "required": true, "argName": "--key"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(pkg.source_url, "https://example.com/src");
        assert_eq!(pkg.runtime, Some(Runtime::Python));
        let vars = pkg.environment_variables.unwrap();
        assert!(vars["API_KEY"].required);
        assert_eq!(vars["API_KEY"].arg_name.as_deref(), Some("--key"));
    }

    #[test]
    fn resolved_package_flattens_into_one_object() {
        let resolved = ResolvedPackage::orphan("orphan/tool".into(), "orphan-tool", Runtime::Node);
        let value = serde_json::to_value(&resolved).unwrap();
        assert_eq!(value["name"], "orphan/tool");
        assert_eq!(value["vendor"], "Unknown");
        assert_eq!(value["isInstalled"], true);
        assert_eq!(value["isVerified"], false);
        assert!(value.get("serverKey").is_none());
    }

    #[test]
    fn server_entry_keeps_unknown_fields() {
        let raw = r#"{"command":"docker","args":["run"],"cwd":"/tmp","runtime":"deno"}"#;
        let entry: ServerEntry = serde_json::from_str(raw).unwrap();
        assert_eq!(entry.runtime.as_deref(), Some("deno"));
        assert_eq!(entry.extra["cwd"], "/tmp");

        let back = serde_json::to_value(&entry).unwrap();
        assert_eq!(back["runtime"], "deno");
        assert_eq!(back["cwd"], "/tmp");
    }

    fn host_config(raw: &str) -> HostConfig {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn uninterpretable_entries_are_still_servers() {
        let config = host_config(
            r#"{"mcpServers":{"odd":{"command":"node","env":{"PORT":8080}},"py":{"runtime":"python"}}}"#,
        );
        assert_eq!(config.server_keys().collect::<Vec<_>>(), vec!["odd", "py"]);
        assert_eq!(config.server_runtime("odd"), None);
        assert_eq!(config.server_runtime("py"), Some(Runtime::Python));
        assert_eq!(config.server("odd").unwrap()["env"]["PORT"], 8080);
    }

    #[test]
    fn null_server_map_reads_empty_and_keeps_siblings() {
        let mut config = host_config(r#"{"globalShortcut":"Ctrl+Space","mcpServers":null}"#);
        assert_eq!(config.server_count(), 0);
        assert!(!config.remove_server("x"));

        config.insert_server("x".into(), serde_json::json!({"command": "npx"}));
        assert!(config.contains_server("x"));
        assert_eq!(config.field("globalShortcut").unwrap(), "Ctrl+Space");
    }

    #[test]
    fn removal_and_replacement_keep_order() {
        let mut config = host_config(r#"{"mcpServers":{"c":{},"a":{},"b":{}}}"#);
        assert!(config.remove_server("c"));
        config.insert_server("a".into(), serde_json::json!({"command": "uvx"}));
        config.insert_server("0".into(), serde_json::json!({}));
        assert_eq!(config.server_keys().collect::<Vec<_>>(), vec!["a", "b", "0"]);
    }

    #[test]
    fn runtime_from_str() {
        assert_eq!("go".parse::<Runtime>(), Ok(Runtime::Go));
        assert!("ruby".parse::<Runtime>().is_err());
    }
}
