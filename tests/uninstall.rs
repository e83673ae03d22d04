mod support;

use mcp_get::install::{RestartStatus, UninstallOutcome};
use mcp_get::{Installer, Resolver, RestartPolicy};
use serde_json::json;
use support::{Answer, FakeRunner, Fixture, ScriptedPrompter};

fn two_servers() -> serde_json::Value {
    json!({
        "mcpServers": {
            "@scope-pkg-b": { "runtime": "node", "command": "npx", "args": ["-y", "@scope/pkg-b"] },
            "other": { "command": "other-server" }
        },
        "theme": "dark"
    })
}

#[test]
fn removes_only_the_named_entry() {
    let fx = Fixture::new();
    fx.write_config(two_servers());
    let runner = FakeRunner::new();
    let mut prompter = ScriptedPrompter::silent();

    let outcome = Installer::new(&fx.store, &fx.registry, &mut prompter, &runner)
        .with_restart(RestartPolicy::Skip)
        .uninstall("@scope/pkg-b")
        .unwrap();

    assert_eq!(
        outcome,
        UninstallOutcome::Uninstalled {
            server_key: "@scope-pkg-b".to_string(),
            restart: RestartStatus::NotRequested,
        }
    );
    let config = fx.config_json();
    assert!(config["mcpServers"].get("@scope-pkg-b").is_none());
    assert_eq!(config["mcpServers"]["other"]["command"], "other-server");
    assert_eq!(config["theme"], "dark");
}

#[test]
fn not_installed_leaves_file_untouched() {
    let fx = Fixture::new();
    fx.write_config_text("{\n  \"mcpServers\": {},\n  \"zzz\":   1\n}\n");
    let before = fx.config_bytes();
    let runner = FakeRunner::new();
    let mut prompter = ScriptedPrompter::silent();

    let outcome = Installer::new(&fx.store, &fx.registry, &mut prompter, &runner)
        .uninstall("pkg-a")
        .unwrap();

    assert_eq!(outcome, UninstallOutcome::NotInstalled);
    assert_eq!(fx.config_bytes(), before);
}

#[test]
fn not_installed_without_a_config_creates_nothing() {
    let fx = Fixture::new();
    let runner = FakeRunner::new();
    let mut prompter = ScriptedPrompter::silent();

    let outcome = Installer::new(&fx.store, &fx.registry, &mut prompter, &runner)
        .uninstall_with_confirmation("pkg-a")
        .unwrap();

    assert_eq!(outcome, UninstallOutcome::NotInstalled);
    assert!(fx.config_bytes().is_none());
}

#[test]
fn legacy_raw_key_is_removed() {
    let fx = Fixture::new();
    fx.write_config(json!({
        "mcpServers": { "@scope/legacy": { "command": "npx" } }
    }));
    let runner = FakeRunner::new();
    let mut prompter = ScriptedPrompter::silent();

    let outcome = Installer::new(&fx.store, &fx.registry, &mut prompter, &runner)
        .with_restart(RestartPolicy::Skip)
        .uninstall("@scope/legacy")
        .unwrap();

    assert!(matches!(outcome, UninstallOutcome::Uninstalled { ref server_key, .. } if server_key == "@scope/legacy"));
    assert_eq!(fx.config_json()["mcpServers"], json!({}));
}

#[test]
fn declined_confirmation_keeps_entry() {
    let fx = Fixture::new();
    fx.write_config(two_servers());
    let before = fx.config_bytes();
    let runner = FakeRunner::new();
    let mut prompter = ScriptedPrompter::new(vec![Answer::Confirm(false)]);

    let outcome = Installer::new(&fx.store, &fx.registry, &mut prompter, &runner)
        .uninstall_with_confirmation("@scope/pkg-b")
        .unwrap();

    assert_eq!(outcome, UninstallOutcome::Cancelled);
    assert_eq!(fx.config_bytes(), before);
    assert_eq!(
        prompter.asked,
        vec!["Are you sure you want to uninstall @scope/pkg-b?".to_string()]
    );
}

#[test]
fn confirmed_uninstall_offers_restart() {
    let fx = Fixture::new();
    fx.write_config(two_servers());
    let runner = FakeRunner::new();
    let mut prompter = ScriptedPrompter::new(vec![Answer::Confirm(true), Answer::Confirm(true)]);

    let outcome = Installer::new(&fx.store, &fx.registry, &mut prompter, &runner)
        .uninstall_with_confirmation("other")
        .unwrap();

    assert!(matches!(
        outcome,
        UninstallOutcome::Uninstalled {
            restart: RestartStatus::Restarted,
            ..
        }
    ));
    assert_eq!(runner.calls(), vec!["restart".to_string()]);
}

#[test]
fn resolved_orphan_is_removed_by_its_own_key() {
    let fx = Fixture::new();
    fx.write_config(json!({
        "mcpServers": { "a-b": { "command": "x" }, "a/b": { "command": "y" } }
    }));
    let resolved = Resolver::new(&fx.registry, &fx.store)
        .resolve_package("a/b")
        .unwrap();
    let runner = FakeRunner::new();
    let mut prompter = ScriptedPrompter::silent();

    let outcome = Installer::new(&fx.store, &fx.registry, &mut prompter, &runner)
        .with_restart(RestartPolicy::Skip)
        .uninstall_resolved(&resolved)
        .unwrap();

    assert!(matches!(outcome, UninstallOutcome::Uninstalled { ref server_key, .. } if server_key == "a/b"));
    assert_eq!(fx.config_json()["mcpServers"], json!({ "a-b": { "command": "x" } }));
}
