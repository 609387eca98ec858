//! Environment variable settings source.

use super::source::{Loaded, NameCase, SettingsSource, lookup_names};
use crate::core::SettingValue;
use crate::error::SourceError;
use std::collections::HashMap;

/// Environment variable settings source.
///
/// Looks up `PREFIX__SCOPE__NAME` in upper case, so a setting `port` in scope
/// `db` of a collector with prefix `app` is read from `APP__DB__PORT`. Values
/// are always strings; declare a value type to have them coerced.
///
/// The source is disabled by default (it would otherwise answer for every
/// collector in the process) and has a very low priority, so framework
/// configuration wins over it.
///
/// # Examples
///
/// ```rust
/// use settings_collector::sources::{EnvSource, SettingsSource};
///
/// let source = EnvSource::new().with_enabled(true);
/// assert_eq!(source.name(), "Env");
/// assert!(source.priority() < 0);
/// ```
pub struct EnvSource {
    vars: Option<HashMap<String, String>>,
    priority: i32,
    enabled: bool,
}

impl EnvSource {
    /// Default priority of the environment source.
    pub const DEFAULT_PRIORITY: i32 = -171_923;

    /// Create a source reading the process environment.
    pub fn new() -> Self {
        Self {
            vars: None,
            priority: Self::DEFAULT_PRIORITY,
            enabled: false,
        }
    }

    /// Create a source reading a fixed set of variables instead of the
    /// process environment. Keys are used exactly as given.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            ..Self::new()
        }
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

    fn var(&self, key: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        }
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSource for EnvSource {
    fn load_settings(&self, prefix: &str, names: &[String]) -> Result<Loaded, SourceError> {
        let values = lookup_names(prefix, names, &self.name_case(), |key| {
            self.var(key).map(SettingValue::String)
        });
        Ok(Loaded::if_any(values))
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn name_case(&self) -> NameCase {
        NameCase::Upper
    }
}

#[cfg(test)]
#[allow(unsafe_code)] // For env var manipulation in tests
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_env_source_creation() {
        let source = EnvSource::new();
        assert_eq!(source.priority(), -171_923);
        assert!(!source.enabled());
        assert_eq!(source.name(), "Env");
    }

    #[test]
    fn test_with_priority() {
        let source = EnvSource::new().with_priority(400);
        assert_eq!(source.priority(), 400);
    }

    #[test]
    fn test_load_from_vars() {
        let source = EnvSource::from_vars([("TEST__SIMPLE1", "food"), ("simple2", "lower")]);
        let loaded = source
            .load_settings("TEST__", &["simple1".to_string(), "simple3".to_string()])
            .unwrap();
        assert!(loaded.success);
        assert_eq!(loaded.values.len(), 1);
        assert_eq!(loaded.values["simple1"], SettingValue::from("food"));

        // Lower-case variables are never matched.
        let loaded = source.load_settings("", &["simple2".to_string()]).unwrap();
        assert!(!loaded.success);
    }

    #[test]
    fn test_load_from_process_environment() {
        unsafe {
            env::set_var("SC_ENV_SOURCE_TEST__PORT", "8080");
        }

        let source = EnvSource::new();
        let loaded = source
            .load_settings("SC_ENV_SOURCE_TEST__", &["port".to_string()])
            .unwrap();
        assert_eq!(loaded.values["port"], SettingValue::from("8080"));

        unsafe {
            env::remove_var("SC_ENV_SOURCE_TEST__PORT");
        }
    }
}
