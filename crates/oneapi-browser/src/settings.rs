//! Persisted console settings
//!
//! A small process-wide key/value store holding the values the console
//! caches between runs: the preferred page size and the site information
//! fetched from `/api/status`, `/api/models` and `/api/about`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oneapi_core::{SystemStatus, DEFAULT_QUOTA_PER_UNIT};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SettingsError;
use crate::format::QuotaFormat;

/// Key of the preferred log page size
pub const PAGE_SIZE_KEY: &str = "page-size";
/// Key of the channel type → models map
pub const CHANNEL_MODELS_KEY: &str = "channel_models";
pub const QUOTA_PER_UNIT_KEY: &str = "quota_per_unit";
pub const DISPLAY_IN_CURRENCY_KEY: &str = "display_in_currency";
pub const ABOUT_KEY: &str = "about";
pub const SYSTEM_NAME_KEY: &str = "system_name";

/// Page size used when none has been stored
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Backing storage for settings values
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;
    fn snapshot(&self) -> Map<String, Value>;
}

/// Settings kept only for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn snapshot(&self) -> Map<String, Value> {
        self.values
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Settings stored as a JSON object in a file; every write goes to disk
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<Map<String, Value>>,
}

impl FileStore {
    /// Load the file at `path`, starting empty if it does not exist yet
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Map::new()
            } else {
                match serde_json::from_str::<Value>(&content)? {
                    Value::Object(map) => map,
                    _ => return Err(SettingsError::NotAnObject),
                }
            }
        } else {
            Map::new()
        };
        debug!("Loaded {} settings from {}", values.len(), path.display());

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(values)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        let mut values = self.values.write();
        values.insert(key.to_string(), value);
        self.persist(&values)
    }

    fn snapshot(&self) -> Map<String, Value> {
        self.values.read().clone()
    }
}

/// Typed access to the console settings
#[derive(Clone)]
pub struct Settings {
    store: Arc<dyn SettingsStore>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Settings {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Open a file-backed settings store
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        Ok(Self::new(Arc::new(FileStore::open(path)?)))
    }

    /// Preferred log page size; falls back to the default when unset or invalid
    pub fn page_size(&self) -> usize {
        self.store
            .get(PAGE_SIZE_KEY)
            .and_then(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .map(|n| n as usize)
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn set_page_size(&self, page_size: usize) -> Result<(), SettingsError> {
        self.store.set(PAGE_SIZE_KEY, Value::from(page_size))
    }

    pub fn quota_per_unit(&self) -> f64 {
        self.store
            .get(QUOTA_PER_UNIT_KEY)
            .and_then(|v| v.as_f64())
            .filter(|q| *q > 0.0)
            .unwrap_or(DEFAULT_QUOTA_PER_UNIT)
    }

    pub fn display_in_currency(&self) -> bool {
        self.store
            .get(DISPLAY_IN_CURRENCY_KEY)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn system_name(&self) -> Option<String> {
        self.string(SYSTEM_NAME_KEY)
    }

    pub fn about(&self) -> Option<String> {
        self.string(ABOUT_KEY)
    }

    pub fn set_about(&self, about: &str) -> Result<(), SettingsError> {
        self.store.set(ABOUT_KEY, Value::from(about))
    }

    /// Channel type → model names, empty when never fetched
    pub fn channel_models(&self) -> HashMap<String, Vec<String>> {
        self.store
            .get(CHANNEL_MODELS_KEY)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    pub fn set_channel_models(
        &self,
        models: &HashMap<String, Vec<String>>,
    ) -> Result<(), SettingsError> {
        self.store
            .set(CHANNEL_MODELS_KEY, serde_json::to_value(models)?)
    }

    /// Store the display values published by `/api/status`
    pub fn apply_status(&self, status: &SystemStatus) -> Result<(), SettingsError> {
        self.store
            .set(QUOTA_PER_UNIT_KEY, Value::from(status.quota_per_unit))?;
        self.store
            .set(DISPLAY_IN_CURRENCY_KEY, Value::from(status.display_in_currency))?;
        if !status.system_name.is_empty() {
            self.store
                .set(SYSTEM_NAME_KEY, Value::from(status.system_name.as_str()))?;
        }
        Ok(())
    }

    /// Quota rendering configured from the stored status values
    pub fn quota_format(&self) -> QuotaFormat {
        QuotaFormat::new(self.quota_per_unit(), self.display_in_currency())
    }

    /// Every stored key and value
    pub fn snapshot(&self) -> Map<String, Value> {
        self.store.snapshot()
    }

    fn string(&self, key: &str) -> Option<String> {
        self.store
            .get(key)
            .and_then(|v| v.as_str().map(String::from))
    }
}
