//! A map that logs suspicious access patterns

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use log::warn;

/// Key/value store that warns when a value is replaced or a missing key is read
///
/// Reads of missing keys return the configured default value.
#[derive(Debug, Clone)]
pub struct LoggingMap<K, V> {
    values: HashMap<K, V>,
    default_value: V,
    pub log_on_replace: bool,
    pub log_on_missing: bool,
}

impl<K, V: Default> Default for LoggingMap<K, V> {
    fn default() -> Self {
        Self::with_default(V::default())
    }
}

impl<K, V> LoggingMap<K, V> {
    pub fn with_default(default_value: V) -> Self {
        Self {
            values: HashMap::new(),
            default_value,
            log_on_replace: true,
            log_on_missing: true,
        }
    }

    pub fn default_value(&self) -> &V {
        &self.default_value
    }

    pub fn set_default_value(&mut self, default_value: V) {
        self.default_value = default_value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Eq + Hash + Debug, V: Clone + Debug> LoggingMap<K, V> {
    /// Insert a value, warning if it replaced an existing one
    pub fn put(&mut self, key: K, value: V) {
        if self.log_on_replace && self.values.contains_key(&key) {
            warn!("Replaced value in map with same key: {key:?}");
        }
        self.values.insert(key, value);
    }

    /// Value for `key`, or the default value (with a warning) if missing
    pub fn get(&self, key: &K) -> V {
        match self.values.get(key) {
            Some(value) => value.clone(),
            None => {
                if self.log_on_missing {
                    warn!(
                        "Value not found with key: {key:?}, returning default value: {:?}",
                        self.default_value
                    );
                }
                self.default_value.clone()
            }
        }
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.values.remove(key)
    }
}
