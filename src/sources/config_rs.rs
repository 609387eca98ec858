//! Settings source backed by a `config::Config` object.

use super::source::{Loaded, NameCase, RawSettings, SettingsSource};
use crate::core::SettingValue;
use crate::error::SourceError;
use parking_lot::RwLock;

/// Source reading from an application's `config::Config`.
///
/// This plays the part of a framework's configuration object: until a
/// configuration is installed the source reports itself unavailable and is
/// skipped. Once installed, every lookup is successful, whether or not the
/// keys exist. Keys are looked up in lower case, as `config` normalizes them.
///
/// # Examples
///
/// ```rust
/// use settings_collector::sources::{ConfigRsSource, SettingsSource};
///
/// let source = ConfigRsSource::new();
/// assert!(!source.is_installed());
///
/// let config = config::Config::builder()
///     .set_override("myapp__port", 8080)
///     .unwrap()
///     .build()
///     .unwrap();
/// source.install(config);
/// assert!(source.is_installed());
/// assert_eq!(source.name(), "ConfigRs");
/// ```
pub struct ConfigRsSource {
    config: RwLock<Option<config::Config>>,
    priority: i32,
}

impl ConfigRsSource {
    /// Create a source with no configuration installed.
    pub fn new() -> Self {
        Self {
            config: RwLock::new(None),
            priority: 0,
        }
    }

    /// Create a source with `config` already installed.
    pub fn with_config(config: config::Config) -> Self {
        let source = Self::new();
        source.install(config);
        source
    }

    /// Set the priority for this source.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Install (or replace) the configuration object.
    pub fn install(&self, config: config::Config) {
        *self.config.write() = Some(config);
    }

    /// Remove the configuration object.
    pub fn uninstall(&self) {
        *self.config.write() = None;
    }

    /// Whether a configuration object is installed.
    pub fn is_installed(&self) -> bool {
        self.config.read().is_some()
    }
}

impl Default for ConfigRsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsSource for ConfigRsSource {
    fn load_settings(&self, prefix: &str, names: &[String]) -> Result<Loaded, SourceError> {
        let guard = self.config.read();
        let config = guard
            .as_ref()
            .ok_or_else(|| SourceError::unavailable("no configuration installed"))?;

        let case = self.name_case();
        let mut values = RawSettings::new();
        for name in names {
            let key = format!("{}{}", prefix, case.apply(name));
            match config.get::<SettingValue>(&key) {
                Ok(value) => {
                    values.insert(name.clone(), value);
                }
                Err(config::ConfigError::NotFound(_)) => {}
                Err(e) => {
                    return Err(SourceError::failed(format!("failed to read '{}': {}", key, e)));
                }
            }
        }
        Ok(Loaded::found(values))
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn name_case(&self) -> NameCase {
        NameCase::Lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> config::Config {
        config::Config::builder()
            .add_source(config::File::from_str(
                r#"
myapp__port = 8080
myapp__host = "localhost"
myapp__db__hosts = ["a", "b"]
"#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
    }

    #[test]
    fn test_uninstalled_is_unavailable() {
        let source = ConfigRsSource::new();
        let err = source.load_settings("myapp__", &["port".to_string()]).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[test]
    fn test_reads_installed_config() {
        let source = ConfigRsSource::with_config(config());
        let loaded = source
            .load_settings(
                "myapp__",
                &["port".to_string(), "host".to_string(), "missing".to_string()],
            )
            .unwrap();
        assert!(loaded.success);
        assert_eq!(loaded.values.len(), 2);
        assert_eq!(loaded.values["port"], SettingValue::Int(8080));
        assert_eq!(loaded.values["host"], SettingValue::from("localhost"));
    }

    #[test]
    fn test_reads_lists() {
        let source = ConfigRsSource::with_config(config());
        let loaded = source.load_settings("myapp__db__", &["hosts".to_string()]).unwrap();
        assert_eq!(loaded.values["hosts"], SettingValue::from(vec!["a", "b"]));
    }

    #[test]
    fn test_uninstall() {
        let source = ConfigRsSource::with_config(config());
        source.uninstall();
        assert!(!source.is_installed());
    }
}
