//! Option storage.
//!
//! The host CMS keeps options as name → value pairs in two scopes: one per
//! site and one shared by the whole network of a multi-site install. The
//! settings record is a single option in that table ([`SETTINGS_OPTION`]);
//! legacy per-name options live in the same table.

use crate::error::{Dumont4wpError, Result};
use crate::settings::{PluginSettings, SETTINGS_OPTION};
use dashmap::{DashMap, DashSet};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Network,
    Site(String),
}

pub trait OptionStore: Send + Sync {
    fn get(&self, scope: &Scope, name: &str) -> Result<Option<Value>>;
    fn set(&self, scope: &Scope, name: &str, value: Value) -> Result<()>;
    /// Deleting a missing option is a no-op.
    fn delete(&self, scope: &Scope, name: &str) -> Result<()>;
    /// Ids of every site known to the store, sorted.
    fn sites(&self) -> Result<Vec<String>>;
}

/// Where this process runs inside the host installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    pub site_id: String,
    pub multisite: bool,
    pub main_site_id: String,
}

impl Deployment {
    pub fn single_site(site_id: impl Into<String>) -> Self {
        let site_id = site_id.into();
        Self {
            main_site_id: site_id.clone(),
            site_id,
            multisite: false,
        }
    }

    pub fn multisite(site_id: impl Into<String>, main_site_id: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            multisite: true,
            main_site_id: main_site_id.into(),
        }
    }

    pub fn is_main_site(&self) -> bool {
        self.site_id == self.main_site_id
    }

    /// Network scope on multi-site installs, the current site otherwise.
    pub fn settings_scope(&self) -> Scope {
        if self.multisite {
            Scope::Network
        } else {
            Scope::Site(self.site_id.clone())
        }
    }

    /// Legacy options are read and deleted in the same scope the record lives in.
    pub fn legacy_scope(&self) -> Scope {
        self.settings_scope()
    }
}

/// Typed access to the settings record and legacy options for one deployment.
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn OptionStore>,
    deployment: Deployment,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn OptionStore>, deployment: Deployment) -> Self {
        Self { store, deployment }
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn store(&self) -> &Arc<dyn OptionStore> {
        &self.store
    }

    /// `None` when nothing usable is stored yet.
    pub fn load(&self) -> Result<Option<PluginSettings>> {
        let scope = self.deployment.settings_scope();
        match self.store.get(&scope, SETTINGS_OPTION)? {
            Some(Value::Object(map)) => PluginSettings::from_map(map).map(Some),
            Some(Value::Null) | None => Ok(None),
            Some(other) => {
                tracing::warn!(
                    "Ignoring non-object settings record in {:?}: {}",
                    scope,
                    other
                );
                Ok(None)
            }
        }
    }

    pub fn save(&self, settings: &PluginSettings) -> Result<()> {
        let scope = self.deployment.settings_scope();
        self.store
            .set(&scope, SETTINGS_OPTION, Value::Object(settings.to_map()?))
    }

    pub fn legacy_get(&self, name: &str) -> Result<Option<Value>> {
        self.store.get(&self.deployment.legacy_scope(), name)
    }

    pub fn legacy_delete(&self, name: &str) -> Result<()> {
        self.store.delete(&self.deployment.legacy_scope(), name)
    }

    /// Writes `settings` as the record of every site in the installation.
    /// Returns the number of sites written.
    pub fn copy_to_all_sites(&self, settings: &PluginSettings) -> Result<usize> {
        let value = Value::Object(settings.to_map()?);
        let sites = self.store.sites()?;
        for site in &sites {
            self.store
                .set(&Scope::Site(site.clone()), SETTINGS_OPTION, value.clone())?;
        }
        tracing::info!("Copied settings to {} site(s)", sites.len());
        Ok(sites.len())
    }
}

/// Process-local store. Used by tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryOptionStore {
    options: DashMap<(Scope, String), Value>,
    sites: DashSet<String>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sites<I, S>(sites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for site in sites {
            store.sites.insert(site.into());
        }
        store
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl OptionStore for MemoryOptionStore {
    fn get(&self, scope: &Scope, name: &str) -> Result<Option<Value>> {
        Ok(self
            .options
            .get(&(scope.clone(), name.to_string()))
            .map(|v| v.value().clone()))
    }

    fn set(&self, scope: &Scope, name: &str, value: Value) -> Result<()> {
        if let Scope::Site(id) = scope {
            self.sites.insert(id.clone());
        }
        self.options.insert((scope.clone(), name.to_string()), value);
        Ok(())
    }

    fn delete(&self, scope: &Scope, name: &str) -> Result<()> {
        self.options.remove(&(scope.clone(), name.to_string()));
        Ok(())
    }

    fn sites(&self) -> Result<Vec<String>> {
        let mut sites: Vec<String> = self.sites.iter().map(|s| s.key().clone()).collect();
        sites.sort();
        Ok(sites)
    }
}

/// JSON files under a data directory:
/// `network/options.json` and `sites/<site_id>/options.json`.
pub struct FileOptionStore {
    root: PathBuf,
    // Serialises read-modify-write of a scope file within this process.
    write_lock: Mutex<()>,
}

impl FileOptionStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_path(&self, scope: &Scope) -> Result<PathBuf> {
        match scope {
            Scope::Network => Ok(self.root.join("network").join("options.json")),
            Scope::Site(id) => {
                validate_site_id(id)?;
                Ok(self.root.join("sites").join(id).join("options.json"))
            }
        }
    }

    fn read_scope(&self, path: &Path) -> Result<Map<String, Value>> {
        if !path.exists() {
            return Ok(Map::new());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(Dumont4wpError::Io(format!(
                "{} does not hold a JSON object",
                path.display()
            ))),
            Err(e) => Err(Dumont4wpError::Io(format!(
                "corrupt option file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write_scope(&self, path: &Path, options: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(options)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn modify<F>(&self, scope: &Scope, f: F) -> Result<()>
    where
        F: FnOnce(&mut Map<String, Value>) -> bool,
    {
        let path = self.scope_path(scope)?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut options = self.read_scope(&path)?;
        if f(&mut options) {
            self.write_scope(&path, &options)?;
        }
        Ok(())
    }
}

fn validate_site_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Dumont4wpError::Config(format!("invalid site id: {:?}", id)))
    }
}

impl OptionStore for FileOptionStore {
    fn get(&self, scope: &Scope, name: &str) -> Result<Option<Value>> {
        let path = self.scope_path(scope)?;
        let mut options = self.read_scope(&path)?;
        Ok(options.remove(name))
    }

    fn set(&self, scope: &Scope, name: &str, value: Value) -> Result<()> {
        self.modify(scope, |options| {
            options.insert(name.to_string(), value);
            true
        })
    }

    fn delete(&self, scope: &Scope, name: &str) -> Result<()> {
        self.modify(scope, |options| options.remove(name).is_some())
    }

    fn sites(&self) -> Result<Vec<String>> {
        let sites_dir = self.root.join("sites");
        if !sites_dir.exists() {
            return Ok(Vec::new());
        }
        let mut sites: Vec<String> = std::fs::read_dir(&sites_dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .filter(|name| validate_site_id(name).is_ok())
            .collect();
        sites.sort();
        Ok(sites)
    }
}
