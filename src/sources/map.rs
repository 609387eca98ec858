//! Fixed-mapping settings source.

use super::source::{Loaded, NameCase, RawSettings, SettingsSource, lookup_names};
use crate::core::SettingValue;
use crate::error::SourceError;

/// A named source backed by a fixed mapping.
///
/// Unlike [`DictSource`](super::DictSource), a lookup always counts as
/// successful, even when nothing was found, which makes this source final
/// when loaders are not merged.
///
/// # Examples
///
/// ```rust
/// use settings_collector::sources::{MapSource, SettingsSource};
///
/// let source = MapSource::new("Defaults")
///     .with_priority(-10)
///     .with_value("myapp__port", 8080);
/// assert_eq!(source.name(), "Defaults");
/// ```
pub struct MapSource {
    name: String,
    values: RawSettings,
    priority: i32,
    enabled: bool,
    name_case: NameCase,
}

impl MapSource {
    /// Create an empty source with the given short name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: RawSettings::new(),
            priority: 0,
            enabled: true,
            name_case: NameCase::Preserve,
        }
    }

    /// Add a key.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Add several keys.
    pub fn with_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SettingValue>,
    {
        self.values
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the priority for this source.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Enable or disable the source.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set how keys are spelled in the mapping.
    pub fn with_name_case(mut self, name_case: NameCase) -> Self {
        self.name_case = name_case;
        self
    }
}

impl SettingsSource for MapSource {
    fn load_settings(&self, prefix: &str, names: &[String]) -> Result<Loaded, SourceError> {
        let values = lookup_names(prefix, names, &self.name_case, |key| self.values.get(key).cloned());
        Ok(Loaded::found(values))
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn name_case(&self) -> NameCase {
        self.name_case.clone()
    }
}
