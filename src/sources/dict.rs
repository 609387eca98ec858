//! In-process settings mapping and the source that reads it.

use super::source::{Loaded, NameCase, SettingsSource, lookup_names};
use crate::core::SettingValue;
use crate::error::SourceError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A process-wide, in-place mutable mapping of settings.
///
/// Clones share the same underlying map. The map can be updated entry by
/// entry but never swapped for another one, so every [`DictSource`] built from
/// it keeps seeing the current contents.
///
/// # Examples
///
/// ```rust
/// use settings_collector::sources::SharedSettings;
///
/// let settings = SharedSettings::new();
/// let handle = settings.clone();
/// settings.update("myapp__port", 8080);
/// assert_eq!(handle.get("myapp__port"), Some(8080.into()));
/// ```
#[derive(Clone, Default)]
pub struct SharedSettings {
    inner: Arc<RwLock<HashMap<String, SettingValue>>>,
}

impl SharedSettings {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one key.
    pub fn update(&self, key: impl Into<String>, value: impl Into<SettingValue>) {
        self.inner.write().insert(key.into(), value.into());
    }

    /// Set several keys at once.
    pub fn extend<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SettingValue>,
    {
        let mut inner = self.inner.write();
        for (key, value) in entries {
            inner.insert(key.into(), value.into());
        }
    }

    /// Remove one key, returning its value.
    pub fn remove(&self, key: &str) -> Option<SettingValue> {
        self.inner.write().remove(key)
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Get a copy of one value.
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.inner.read().get(key).cloned()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Source reading from a [`SharedSettings`] mapping.
///
/// Useful when no framework is around, or to override anything a framework
/// provides: its default priority is the highest of the built-in sources.
/// A lookup counts as successful only if at least one value was found.
pub struct DictSource {
    settings: SharedSettings,
    priority: i32,
    name_case: NameCase,
}

impl DictSource {
    /// Default priority of the in-process mapping.
    pub const DEFAULT_PRIORITY: i32 = 171_923;

    /// Create a source over `settings`.
    pub fn new(settings: SharedSettings) -> Self {
        Self {
            settings,
            priority: Self::DEFAULT_PRIORITY,
            name_case: NameCase::Preserve,
        }
    }

    /// Set the priority for this source.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set how keys are spelled in the mapping.
    pub fn with_name_case(mut self, name_case: NameCase) -> Self {
        self.name_case = name_case;
        self
    }
}

impl SettingsSource for DictSource {
    fn load_settings(&self, prefix: &str, names: &[String]) -> Result<Loaded, SourceError> {
        let inner = self.settings.inner.read();
        let values = lookup_names(prefix, names, &self.name_case, |key| inner.get(key).cloned());
        Ok(Loaded::if_any(values))
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn name_case(&self) -> NameCase {
        self.name_case.clone()
    }
}
