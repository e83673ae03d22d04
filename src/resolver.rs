//! Reconciles the registry with installed servers from the host config.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::config::{installed_key, ConfigStore};
use crate::models::{HostConfig, Package, ResolvedPackage};
use crate::naming::{display_name_from_key, server_key};
use crate::registry::Registry;

/// Resolves packages against a registry and a config store.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a Registry,
    store: &'a ConfigStore,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry, store: &'a ConfigStore) -> Self {
        Self { registry, store }
    }

    /// Every registry package plus every orphaned install, one entry per name.
    /// Order is by name.
    pub fn resolve_packages(&self) -> Vec<ResolvedPackage> {
        let packages = self.registry.load_all_packages();
        let config = self.store.read_config();
        resolve(packages, &config)
    }

    /// Single-name lookup. Names known to neither the registry nor the
    /// config resolve to `None`.
    pub fn resolve_package(&self, name: &str) -> Option<ResolvedPackage> {
        let packages = self.registry.load_all_packages();
        let config = self.store.read_config();
        resolve_one(&packages, &config, name)
    }
}

/// Merge `packages` with the servers in `config`.
pub fn resolve(packages: Vec<Package>, config: &HostConfig) -> Vec<ResolvedPackage> {
    let mut resolved: BTreeMap<String, ResolvedPackage> = BTreeMap::new();
    for package in packages {
        if resolved.contains_key(&package.name) {
            warn!(package = %package.name, "duplicate registry entry, keeping the first");
            continue;
        }
        resolved.insert(
            package.name.clone(),
            ResolvedPackage {
                package,
                is_installed: false,
                is_verified: true,
                server_key: None,
            },
        );
    }

    let lookup = Lookup::build(resolved.keys());

    let mut orphans: Vec<&str> = Vec::new();
    for key in config.server_keys() {
        let Some(slot) = lookup.find(key).and_then(|name| resolved.get_mut(name)) else {
            orphans.push(key);
            continue;
        };
        slot.is_installed = true;
        // With both key forms present the normalized one wins, as on uninstall.
        if slot.server_key.is_none() || key == server_key(&slot.package.name) {
            slot.server_key = Some(key.to_string());
            if slot.package.runtime.is_none() {
                slot.package.runtime = config.server_runtime(key);
            }
        }
    }

    // Keys that read the same after denormalizing claim their names first;
    // a later orphan whose display name is taken keeps its raw key instead.
    orphans.sort_by_key(|key| display_name_from_key(key) != *key);
    for key in orphans {
        let display = display_name_from_key(key);
        let name = if resolved.contains_key(&display) {
            key.to_string()
        } else {
            display
        };
        debug!(key, name = %name, "installed server not in registry");
        let runtime = config.server_runtime(key).unwrap_or_default();
        resolved.insert(name.clone(), ResolvedPackage::orphan(name, key, runtime));
    }

    resolved
        .into_values()
        .map(|mut r| {
            r.package.runtime = Some(r.package.runtime_or_default());
            r
        })
        .collect()
}

/// Resolve a single name against `packages` and `config`.
///
/// Orphans answer to the name [`resolve`] lists them under, so a name picked
/// from a listing always maps back to the same config key.
pub fn resolve_one(packages: &[Package], config: &HostConfig, name: &str) -> Option<ResolvedPackage> {
    // Config-key scheme (`/` -> `-`).
    let normalized = server_key(name);
    let found = packages
        .iter()
        .find(|p| p.name == name)
        .or_else(|| packages.iter().find(|p| server_key(&p.name) == normalized));

    if let Some(pkg) = found {
        let key = installed_key(config, &pkg.name).or_else(|| installed_key(config, name));
        let mut package = pkg.clone();
        package.runtime = Some(
            pkg.runtime
                .or_else(|| key.as_deref().and_then(|k| config.server_runtime(k)))
                .unwrap_or_default(),
        );
        return Some(ResolvedPackage {
            package,
            is_installed: key.is_some(),
            is_verified: true,
            server_key: key,
        });
    }

    if let Some(listed) = resolve(packages.to_vec(), config)
        .into_iter()
        .find(|r| !r.is_verified && r.name() == name)
    {
        return Some(listed);
    }

    let key = installed_key(config, name)?;
    let runtime = config.server_runtime(&key).unwrap_or_default();
    Some(ResolvedPackage::orphan(name.to_string(), &key, runtime))
}

/// Registry index by canonical name and by normalized key, built once per
/// resolution.
struct Lookup {
    by_name: HashSet<String>,
    by_key: HashMap<String, String>,
}

impl Lookup {
    fn build<'n>(names: impl Iterator<Item = &'n String>) -> Self {
        let mut by_name = HashSet::new();
        let mut by_key: HashMap<String, String> = HashMap::new();
        for name in names {
            by_name.insert(name.clone());
            // Config-key scheme (`/` -> `-`).
            let key = server_key(name);
            if let Some(first) = by_key.get(&key) {
                warn!(key = %key, first = %first, second = %name, "registry names collide after normalization");
                continue;
            }
            by_key.insert(key, name.clone());
        }
        Self { by_name, by_key }
    }

    /// Registry name for a server key. Raw equality wins over a normalized match.
    fn find(&self, server_key: &str) -> Option<&str> {
        if let Some(name) = self.by_name.get(server_key) {
            return Some(name.as_str());
        }
        self.by_key.get(server_key).map(String::as_str)
    }
}
