//! Settings reconciliation: first-use initialization with legacy migration,
//! and overlaying an admin form submission onto the stored record.

use crate::error::{Dumont4wpError, Result};
use crate::form::FormData;
use crate::settings::{
    display_server_id, PluginSettings, INITIALIZED_KEY, MASTER_SERVER, SERVER_KEY, SINGLE_SERVER,
};
use crate::store::SettingsRepository;
use serde_json::{Map, Value};

/// Outcome of running one request through the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub settings: PluginSettings,
    /// True when the request saved the settings form.
    pub saved: bool,
}

/// Loads the record, initializing and migrating it on first use, and applies
/// the settings form when the request carries `action=update`.
pub fn reconcile(repo: &SettingsRepository, form: &FormData) -> Result<Reconciled> {
    let current = initialize_if_absent(repo)?;
    if !form.is_update() {
        return Ok(Reconciled {
            settings: current,
            saved: false,
        });
    }
    let settings = apply_submission(repo, &current, &form.settings())?;
    Ok(Reconciled {
        settings,
        saved: true,
    })
}

/// Returns the stored record, creating it from defaults when it is missing or
/// not flagged as initialized.
///
/// On creation every default key is looked up in legacy per-name storage; a
/// legacy value replaces the default and the legacy entry is deleted once the
/// new record is persisted. The initialization flag makes this a one-time step.
pub fn initialize_if_absent(repo: &SettingsRepository) -> Result<PluginSettings> {
    if let Some(existing) = repo.load()? {
        if existing.is_initialized() {
            return Ok(existing);
        }
        tracing::info!("Stored settings are not initialized, rebuilding from defaults");
    }

    let defaults = PluginSettings::default().to_map()?;
    let mut record = defaults.clone();
    let mut migrated = Vec::new();

    for key in defaults.keys() {
        let legacy = match repo.legacy_get(key)? {
            Some(Value::Null) | None => continue,
            Some(value) => value,
        };
        if !fits(&defaults, key, &legacy) {
            tracing::warn!(
                "Legacy option {} has an unusable shape, keeping the default",
                key
            );
            continue;
        }
        record.insert(key.clone(), legacy);
        migrated.push(key.clone());
    }
    record.insert(INITIALIZED_KEY.to_string(), Value::from(1));

    let settings = PluginSettings::from_map(record)?;
    repo.save(&settings)?;

    for key in &migrated {
        repo.legacy_delete(key)?;
    }
    tracing::info!(
        scope = ?repo.deployment().settings_scope(),
        migrated = migrated.len(),
        "Initialized connector settings"
    );
    Ok(settings)
}

/// Overlays the `settings[...]` part of a form submission onto `current`,
/// persists the result and returns the record as re-read from the store.
///
/// Keys missing from the submission, and submitted values that do not fit the
/// field, keep their stored value. Unknown submitted keys are ignored. The
/// server block is merged field by field, so a partial server entry keeps its
/// stored port and path.
pub fn apply_submission(
    repo: &SettingsRepository,
    current: &PluginSettings,
    submitted: &Map<String, Value>,
) -> Result<PluginSettings> {
    let old = current.to_map()?;
    let mut next = old.clone();

    for (key, old_value) in &old {
        let value = match (key.as_str(), submitted.get(key)) {
            (INITIALIZED_KEY, _) => trim_scalar(old_value.clone()),
            (_, None) => continue,
            (SERVER_KEY, Some(value)) => {
                prune_servers(merge_servers(value.clone(), old_value), old_value)
            }
            (_, Some(value)) => trim_scalar(value.clone()),
        };
        if fits(&old, key, &value) {
            next.insert(key.clone(), value);
        } else {
            tracing::warn!("Ignoring submitted value for {}: unexpected shape", key);
        }
    }

    let mut settings = PluginSettings::from_map(next)?;
    if let Some(single) = settings.server.info.get(SINGLE_SERVER).cloned() {
        settings.server.info.insert(MASTER_SERVER.to_string(), single);
    }
    settings.server.roles.search = MASTER_SERVER.to_string();
    settings.server.roles.update = MASTER_SERVER.to_string();

    repo.save(&settings)?;
    tracing::info!(
        servers = settings.server.info.len(),
        "Saved connector settings"
    );

    repo.load()?.ok_or_else(|| {
        Dumont4wpError::InvalidSettings("settings record missing right after save".to_string())
    })
}

/// Whether `value` deserializes when placed at `key` of `base`.
fn fits(base: &Map<String, Value>, key: &str, value: &Value) -> bool {
    let mut probe = base.clone();
    probe.insert(key.to_string(), value.clone());
    PluginSettings::from_map(probe).is_ok()
}

fn trim_scalar(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other,
    }
}

fn has_host(server: &Value) -> bool {
    server
        .get("host")
        .and_then(Value::as_str)
        .map(|h| !h.trim().is_empty())
        .unwrap_or(false)
}

/// Drops server entries without a host. The primary slot is never dropped: a
/// blank one keeps its previous value.
fn prune_servers(mut submitted: Value, previous: &Value) -> Value {
    let Some(info) = submitted.get_mut("info").and_then(Value::as_object_mut) else {
        return submitted;
    };

    let kept: Map<String, Value> = info
        .iter()
        .filter(|(id, server)| id.as_str() != SINGLE_SERVER && has_host(server))
        .map(|(id, server)| (id.clone(), server.clone()))
        .collect();

    let single = match info.get(SINGLE_SERVER) {
        Some(server) if has_host(server) => Some(server.clone()),
        _ => {
            let prior = previous
                .get("info")
                .and_then(|i| i.get(SINGLE_SERVER))
                .cloned();
            if prior.is_some() {
                tracing::warn!("Submitted primary server has no host, keeping the stored one");
            }
            prior
        }
    };

    let mut pruned = Map::new();
    if let Some(single) = single {
        pruned.insert(SINGLE_SERVER.to_string(), single);
    }
    pruned.extend(kept);
    *info = pruned;
    submitted
}

/// Overlays `overlay` onto `base`, recursing into objects present on both sides.
fn merge_over(base: Option<&Value>, overlay: Value) -> Value {
    match (base, overlay) {
        (Some(Value::Object(base)), Value::Object(overlay)) => {
            let mut merged = base.clone();
            for (key, value) in overlay {
                let next = merge_over(merged.get(&key), value);
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Merges a submitted server block onto the stored one. Each submitted
/// `info` entry is laid over the stored entry with the same id; stored numeric
/// ids match the `slave_<n>` name the page shows for them and take that name.
fn merge_servers(submitted: Value, stored: &Value) -> Value {
    let Value::Object(submitted) = submitted else {
        return submitted;
    };
    let mut merged = match stored {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };

    for (key, value) in submitted {
        if key != "info" {
            let next = merge_over(merged.get(&key), value);
            merged.insert(key, next);
            continue;
        }
        let mut info = match merged.get("info") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        match value {
            Value::Object(entries) => {
                for (id, entry) in entries {
                    let stored_id = if info.contains_key(&id) {
                        Some(id.clone())
                    } else {
                        info.keys()
                            .find(|stored_id| display_server_id(stored_id) == id)
                            .cloned()
                    };
                    let Some(stored_id) = stored_id else {
                        info.insert(id, entry);
                        continue;
                    };
                    let next = merge_over(info.get(&stored_id), entry);
                    if stored_id == id {
                        info.insert(id, next);
                    } else {
                        // rename in place
                        info = info
                            .into_iter()
                            .map(|(k, v)| {
                                if k == stored_id {
                                    (id.clone(), next.clone())
                                } else {
                                    (k, v)
                                }
                            })
                            .collect();
                    }
                }
                merged.insert("info".to_string(), Value::Object(info));
            }
            other => {
                merged.insert("info".to_string(), other);
            }
        }
    }
    Value::Object(merged)
}
