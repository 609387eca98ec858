//! Collector-level configuration shared by every scope of one collector.

use crate::error::{Result, SettingsError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Names starting with this prefix are reserved for the collector itself.
pub const RESERVED_PREFIX: &str = "SC_";

/// Default separator between prefix, scope segments and setting names.
pub const DEFAULT_SEPARATOR: &str = "__";

/// Configuration for a settings collector.
///
/// All scopes of one collector share a single instance. It can be built in
/// code or deserialized from any serde source; missing fields take their
/// defaults.
///
/// # Examples
///
/// ```rust
/// use settings_collector::core::CollectorConfig;
///
/// let config = CollectorConfig {
///     prefix: Some("myapp".to_string()),
///     ..CollectorConfig::default()
/// };
/// assert_eq!(config.get_prefix(), "myapp__");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Prefix for every setting name looked up in the sources.
    pub prefix: Option<String>,

    /// Separator used between prefix, scope segments and setting names.
    pub separator: String,

    /// Loader short names to use (`exclude = false`) or skip (`exclude = true`).
    pub loaders: BTreeSet<String>,

    /// What to do with `loaders`.
    pub exclude: bool,

    /// Merge values from every loader instead of stopping at the first one
    /// that answers.
    pub load_all: bool,

    /// Load every declared setting of a scope on its first request.
    pub greedy_load: bool,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            separator: DEFAULT_SEPARATOR.to_string(),
            loaders: BTreeSet::new(),
            exclude: true,
            load_all: false,
            greedy_load: true,
        }
    }
}

impl CollectorConfig {
    /// Return `"{prefix}{separator}"`, or an empty string without a prefix.
    pub fn get_prefix(&self) -> String {
        match &self.prefix {
            Some(prefix) if !prefix.is_empty() => format!("{}{}", prefix, self.separator),
            _ => String::new(),
        }
    }

    /// Check whether `name` may not be used for a setting.
    pub fn is_bad_name(&self, name: &str) -> bool {
        name.is_empty() || name.starts_with(RESERVED_PREFIX) || name.starts_with(&self.separator)
    }

    /// The loader selection part of this configuration.
    pub fn loader_policy(&self) -> LoaderPolicy {
        LoaderPolicy {
            loaders: self.loaders.clone(),
            exclude: self.exclude,
            load_all: self.load_all,
        }
    }

    /// Check the configuration for errors that can be detected up front.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Config`] for an empty separator or an
    /// include-list without any loaders in it.
    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(SettingsError::Config(
                "the separator must not be empty".to_string(),
            ));
        }
        self.loader_policy().validate()
    }
}

/// Which loaders to query and how to combine their answers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoaderPolicy {
    /// Loader short names to use or skip.
    pub loaders: BTreeSet<String>,
    /// `true` = skip `loaders`, `false` = use only `loaders`.
    pub exclude: bool,
    /// Merge all answers (`true`) or take the first successful one (`false`).
    pub load_all: bool,
}

impl LoaderPolicy {
    /// Fail if this policy asks to include loaders but names none.
    pub fn validate(&self) -> Result<()> {
        if !self.exclude && self.loaders.is_empty() {
            return Err(SettingsError::Config(
                "no loaders listed to include (set `loaders` or use `exclude`)".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::default();
        assert_eq!(config.prefix, None);
        assert_eq!(config.separator, "__");
        assert!(config.exclude);
        assert!(!config.load_all);
        assert!(config.greedy_load);
        assert_eq!(config.get_prefix(), "");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_names() {
        let config = CollectorConfig {
            separator: "xxx".to_string(),
            ..CollectorConfig::default()
        };
        assert!(config.is_bad_name("SC_foo"));
        assert!(config.is_bad_name("xxxFoo"));
        assert!(config.is_bad_name(""));
        assert!(!config.is_bad_name("foo"));
        assert!(!config.is_bad_name("sc_foo"));
    }

    #[test]
    fn test_include_nothing_is_rejected() {
        let config = CollectorConfig {
            exclude: false,
            ..CollectorConfig::default()
        };
        assert!(matches!(config.validate(), Err(SettingsError::Config(_))));
    }

    #[test]
    fn test_empty_separator_is_rejected() {
        let config = CollectorConfig {
            separator: String::new(),
            ..CollectorConfig::default()
        };
        assert!(matches!(config.validate(), Err(SettingsError::Config(_))));
    }

    #[test]
    fn test_deserialize_with_config_crate() {
        let source = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
prefix = "myapp"
loaders = ["Env", "Dict"]
exclude = false
load_all = true
"#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let config: CollectorConfig = source.try_deserialize().unwrap();
        assert_eq!(config.prefix.as_deref(), Some("myapp"));
        assert_eq!(config.separator, "__");
        assert!(!config.exclude);
        assert!(config.load_all);
        assert!(config.greedy_load);
        assert_eq!(config.loaders.len(), 2);
        assert_eq!(config.get_prefix(), "myapp__");
    }
}
