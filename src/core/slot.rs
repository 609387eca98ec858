//! Per-scope value cache for one setting.

use crate::core::setting::Setting;
use crate::core::value::{RawValue, SettingValue};
use crate::error::Result;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Holds one setting's cached value within one scope.
///
/// The cached value and its "is cached" flag live in a single `ArcSwapOption`,
/// so a reader sees either nothing or a complete value, never a half-written
/// one.
pub(crate) struct ValueSlot {
    setting: Arc<Setting>,
    cached: ArcSwapOption<SettingValue>,
}

impl ValueSlot {
    pub(crate) fn new(setting: Arc<Setting>) -> Self {
        Self {
            setting,
            cached: ArcSwapOption::empty(),
        }
    }

    /// A slot for the same declaration with an empty cache.
    pub(crate) fn fresh(&self) -> Self {
        Self::new(Arc::clone(&self.setting))
    }

    pub(crate) fn setting(&self) -> &Setting {
        &self.setting
    }

    /// The cached value, if the setting is cacheable and has one.
    pub(crate) fn cached(&self) -> Option<SettingValue> {
        if !self.setting.is_cacheable() {
            return None;
        }
        self.cached.load_full().map(|value| (*value).clone())
    }

    /// Cast `raw` and remember the result unless the setting is not cacheable.
    pub(crate) fn assign(&self, raw: &RawValue) -> Result<SettingValue> {
        let value = self.setting.cast_raw(raw)?;
        self.store(value.clone());
        Ok(value)
    }

    pub(crate) fn store(&self, value: SettingValue) {
        if self.setting.is_cacheable() {
            self.cached.store(Some(Arc::new(value)));
        }
    }

    pub(crate) fn clear(&self) {
        self.cached.store(None);
    }

    #[cfg(test)]
    pub(crate) fn is_cached(&self) -> bool {
        self.cached.load().is_some()
    }
}
