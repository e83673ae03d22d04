mod support;

use std::collections::BTreeMap;

use mcp_get::config::server_entry_for;
use mcp_get::{HostConfig, Package, Preferences, Removal, Runtime};
use serde_json::json;
use support::Fixture;

#[test]
fn missing_config_reads_as_empty() {
    let fx = Fixture::new();
    assert_eq!(fx.store.read_config(), HostConfig::default());
}

#[test]
fn invalid_json_reads_as_default() {
    let fx = Fixture::new();
    fx.write_config_text("{ not json");
    assert_eq!(fx.store.read_config().server_count(), 0);
    assert!(!fx.store.is_package_installed("anything"));
}

#[test]
fn absent_server_map_is_synthesized_and_other_fields_kept() {
    let fx = Fixture::new();
    fx.write_config(json!({ "globalShortcut": "Ctrl+Space", "theme": { "mode": "dark" } }));

    let key = fx
        .store
        .install_package(&Package::unverified("pkg-a", Runtime::Node), None)
        .unwrap();

    assert_eq!(key, "pkg-a");
    let written = fx.config_json();
    assert_eq!(written["globalShortcut"], "Ctrl+Space");
    assert_eq!(written["theme"], json!({ "mode": "dark" }));
    assert_eq!(written["mcpServers"]["pkg-a"]["command"], "npx");
}

#[test]
fn write_of_read_is_byte_stable() {
    let fx = Fixture::new();
    // Hand-written: host fields first and servers out of alphabetical order.
    let text = r#"{
  "globalShortcut": "Ctrl+Space",
  "mcpServers": {
    "zeta": {
      "command": "custom",
      "cwd": "/opt/zeta"
    },
    "alpha": {
      "runtime": "python",
      "command": "uvx",
      "args": [
        "alpha"
      ],
      "env": {
        "Z_LAST": "1",
        "A_FIRST": "2"
      }
    }
  },
  "extra": [
    1,
    2,
    3
  ]
}"#;
    fx.write_config_text(text);

    fx.store.write_config(&fx.store.read_config()).unwrap();
    assert_eq!(String::from_utf8(fx.config_bytes().unwrap()).unwrap(), text);
}

#[test]
fn entries_we_cannot_interpret_survive_an_install() {
    let fx = Fixture::new();
    fx.write_config_text(
        r#"{"globalShortcut":"Ctrl+Space","mcpServers":{"keep-me":{"command":"node","args":["srv.js"],"env":{"PORT":8080}},"odd":{"args":"x"}}}"#,
    );

    fx.store
        .install_package(&Package::unverified("pkg-a", Runtime::Node), None)
        .unwrap();

    let written = fx.config_json();
    assert_eq!(written["globalShortcut"], "Ctrl+Space");
    assert_eq!(
        written["mcpServers"]["keep-me"],
        json!({ "command": "node", "args": ["srv.js"], "env": { "PORT": 8080 } })
    );
    assert_eq!(written["mcpServers"]["odd"], json!({ "args": "x" }));
    assert_eq!(written["mcpServers"]["pkg-a"]["command"], "npx");
    assert!(fx.store.is_package_installed("keep-me"));
}

#[test]
fn null_server_map_is_replaced_and_siblings_kept() {
    let fx = Fixture::new();
    fx.write_config(json!({ "globalShortcut": "Ctrl+Space", "mcpServers": null }));
    assert_eq!(fx.store.read_config().server_count(), 0);

    fx.store
        .install_package(&Package::unverified("pkg-a", Runtime::Node), None)
        .unwrap();

    let written = fx.config_json();
    assert_eq!(written["globalShortcut"], "Ctrl+Space");
    assert_eq!(written["mcpServers"]["pkg-a"]["args"], json!(["-y", "pkg-a"]));
}

#[test]
fn removal_targets_the_exact_key() {
    let fx = Fixture::new();
    fx.write_config(json!({
        "mcpServers": { "a-b": { "command": "x" }, "a/b": { "command": "y" } }
    }));

    assert_eq!(fx.store.remove_server("a/b").unwrap(), Removal::Removed("a/b".into()));
    assert_eq!(fx.config_json()["mcpServers"], json!({ "a-b": { "command": "x" } }));
    assert_eq!(fx.store.remove_server("a/b").unwrap(), Removal::NotInstalled);
}

#[test]
fn uninstall_reports_missing_entries() {
    let fx = Fixture::new();
    assert_eq!(fx.store.uninstall_package("ghost").unwrap(), Removal::NotInstalled);
    assert!(fx.config_bytes().is_none());
}

#[test]
fn entry_shape_follows_runtime() {
    let node = server_entry_for(&Package::unverified("@a/b", Runtime::Node), None);
    assert_eq!(node.command.as_deref(), Some("npx"));
    assert_eq!(node.args, Some(vec!["-y".to_string(), "@a/b".to_string()]));

    let env = BTreeMap::from([("TOKEN".to_string(), "t".to_string())]);
    let py = server_entry_for(&Package::unverified("tool", Runtime::Python), Some(env.clone()));
    assert_eq!(py.command.as_deref(), Some("uvx"));
    assert_eq!(py.args, Some(vec!["tool".to_string()]));
    assert_eq!(py.env, Some(env));

    let go = server_entry_for(&Package::unverified("gotool", Runtime::Go), None);
    assert_eq!(go.runtime.as_deref(), Some("go"));
    assert!(go.command.is_none());
}

#[test]
fn preferences_round_trip() {
    let fx = Fixture::new();
    assert_eq!(fx.store.read_preferences(), Preferences::default());
    fx.store
        .write_preferences(&Preferences {
            allow_analytics: Some(false),
        })
        .unwrap();
    assert_eq!(fx.store.read_preferences().allow_analytics, Some(false));
}
