//! Durable key-value storage
//!
//! The browser's localStorage sits behind [`KeyValueStore`] so the config
//! store and history log can be handed any backing store.

use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;
use crate::error::{DashboardError, Result};

/// Storage key of the persisted configuration
pub const CONFIG_KEY: &str = "rag_dashboard_cfg";

/// Storage key of the request history
pub const HISTORY_KEY: &str = "rag_dashboard_history";

/// Minimal string key-value store
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// `window.localStorage`
#[derive(Debug, Clone)]
pub struct BrowserStorage {
    storage: web_sys::Storage,
}

impl BrowserStorage {
    pub fn from_window(window: &web_sys::Window) -> Result<Self> {
        let storage = window
            .local_storage()
            .map_err(DashboardError::storage)?
            .ok_or_else(|| DashboardError::Storage("No localStorage".to_string()))?;
        Ok(BrowserStorage { storage })
    }
}

impl KeyValueStore for BrowserStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.storage.get_item(key).map_err(DashboardError::storage)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.storage.set_item(key, value).map_err(DashboardError::storage)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.storage.remove_item(key).map_err(DashboardError::storage)
    }
}

/// Read a JSON value; a missing, unreadable or malformed blob yields the default.
pub(crate) fn load_json<S, T>(store: &S, key: &str) -> T
where
    S: KeyValueStore + ?Sized,
    T: DeserializeOwned + Default,
{
    match store.get_item(key) {
        Ok(Some(raw)) if !raw.is_empty() => serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("discarding malformed '{}' entry: {}", key, e);
            T::default()
        }),
        Ok(_) => T::default(),
        Err(e) => {
            log::warn!("could not read '{}': {}", key, e);
            T::default()
        }
    }
}

pub(crate) fn save_json<S, T>(store: &S, key: &str, value: &T) -> Result<()>
where
    S: KeyValueStore + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set_item(key, &raw)
}

/// The persisted configuration blob
#[derive(Debug, Clone)]
pub struct ConfigStore<S> {
    store: S,
}

impl<S: KeyValueStore> ConfigStore<S> {
    pub fn new(store: S) -> Self {
        ConfigStore { store }
    }

    /// Stored config, or an empty one when nothing usable is stored
    pub fn get(&self) -> Config {
        load_json(&self.store, CONFIG_KEY)
    }

    /// Overwrite the stored config
    pub fn set(&self, config: &Config) -> Result<()> {
        save_json(&self.store, CONFIG_KEY, config)
    }

    /// Layer `over` on top of the stored config, persist and return the result.
    pub fn merge(&self, over: &Config) -> Result<Config> {
        let merged = self.get().merged(over);
        self.set(&merged)?;
        Ok(merged)
    }

    /// Parse an imported file and merge it over the stored config.
    ///
    /// Nothing is written when the file is not a valid config.
    pub fn import(&self, text: &str) -> Result<Config> {
        let imported: Config = serde_json::from_str(text)
            .map_err(|e| DashboardError::InvalidImport(e.to_string()))?;
        self.merge(&imported)
    }

    /// Pretty-printed stored config, as offered for download
    pub fn export(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.get())?)
    }
}

/// In-memory store used by tests
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: std::rc::Rc<std::cell::RefCell<std::collections::HashMap<String, String>>>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}
