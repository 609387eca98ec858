//! Builder for constructing SettingsCollector instances.

use crate::core::collector::{CollectorInner, SettingsCollector};
use crate::core::config::CollectorConfig;
use crate::core::scope::{ScopeNode, ScopeTree};
use crate::core::setting::Setting;
use crate::core::slot::ValueSlot;
use crate::core::value::SettingValue;
use crate::error::{Result, SettingsError};
use crate::sources::SourceRegistry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "metrics")]
use crate::metrics::ResolutionMetrics;

/// Builder for constructing a [`SettingsCollector`].
///
/// Provides a fluent interface for declaring settings and choosing how they
/// are loaded.
///
/// # Examples
///
/// ```rust
/// use settings_collector::prelude::*;
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let settings = SettingsCollector::builder()
///     .with_name("my_settings")
///     .with_prefix("myapp")
///     .with_loaders(["Dict"])
///     .with_setting("port", Setting::new(8080).value_type(ValueType::Int))
///     .with_setting("secret", Setting::required().no_cache())
///     .build(Arc::new(SourceRegistry::new()))?;
///
/// assert_eq!(settings.prefix(), "myapp__");
/// # Ok(())
/// # }
/// ```
pub struct SettingsCollectorBuilder {
    name: String,
    config: CollectorConfig,
    settings: Vec<(String, Setting)>,
    #[cfg(feature = "metrics")]
    metrics: Option<ResolutionMetrics>,
}

impl SettingsCollectorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: "SettingsCollector".to_string(),
            config: CollectorConfig::default(),
            settings: Vec::new(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Name used in logs and `Debug` output.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replace the whole configuration, e.g. one deserialized from a file.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use settings_collector::prelude::*;
    ///
    /// let config = CollectorConfig {
    ///     prefix: Some("myapp".to_string()),
    ///     load_all: false,
    ///     ..CollectorConfig::default()
    /// };
    /// let builder = SettingsCollector::builder().with_config(config);
    /// ```
    pub fn with_config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Global prefix, joined to every key with the separator.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.prefix = Some(prefix.into());
        self
    }

    /// Separator between prefix, scope names and setting names (`"__"` by
    /// default).
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.separator = separator.into();
        self
    }

    /// Only use the named sources.
    pub fn with_loaders<I, S>(mut self, loaders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.loaders = loaders.into_iter().map(Into::into).collect();
        self.config.exclude = false;
        self
    }

    /// Use every source except the named ones.
    pub fn without_loaders<I, S>(mut self, loaders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.loaders = loaders.into_iter().map(Into::into).collect();
        self.config.exclude = true;
        self
    }

    /// Merge the answers of all sources (`true`) or take the first
    /// successful answer by priority (`false`, the default).
    pub fn with_load_all(mut self, load_all: bool) -> Self {
        self.config.load_all = load_all;
        self
    }

    /// Load all settings of a scope on its first read (`true`, the default)
    /// or one setting at a time.
    pub fn with_greedy_load(mut self, greedy_load: bool) -> Self {
        self.config.greedy_load = greedy_load;
        self
    }

    /// Declare a setting. A later declaration of the same name replaces an
    /// earlier one.
    pub fn with_setting(mut self, name: impl Into<String>, setting: Setting) -> Self {
        self.settings.push((name.into(), setting));
        self
    }

    /// Declare several plain settings from `(name, default)` pairs.
    pub fn with_defaults<I, K, V>(mut self, defaults: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<SettingValue>,
    {
        self.settings.extend(
            defaults
                .into_iter()
                .map(|(name, default)| (name.into(), Setting::new(default))),
        );
        self
    }

    /// Enable OpenTelemetry metrics for this collector.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use settings_collector::prelude::*;
    /// use opentelemetry::global;
    ///
    /// let meter = global::meter("my-app");
    /// let builder = SettingsCollector::builder().with_metrics(meter);
    /// ```
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(ResolutionMetrics::new(meter));
        self
    }

    /// Build the collector over `registry`.
    ///
    /// Nothing is loaded yet: values are resolved on first read.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Config`] if:
    /// - The separator is empty, or loaders are included but none are listed
    /// - A setting name is empty, starts with the separator, or starts with
    ///   the reserved prefix
    pub fn build(self, registry: Arc<SourceRegistry>) -> Result<SettingsCollector> {
        self.config.validate()?;

        let mut declarations: BTreeMap<String, Arc<Setting>> = BTreeMap::new();
        for (name, setting) in self.settings {
            let setting = setting.with_name(name.clone());
            declarations.insert(name, Arc::new(setting));
        }

        let bad_names: Vec<&str> = declarations
            .keys()
            .map(String::as_str)
            .filter(|name| self.config.is_bad_name(name))
            .collect();
        if !bad_names.is_empty() {
            return Err(SettingsError::Config(format!(
                "these settings need to be renamed: {}",
                bad_names.join(", ")
            )));
        }

        let slots = declarations
            .iter()
            .map(|(name, setting)| (name.clone(), ValueSlot::new(Arc::clone(setting))))
            .collect();

        debug!(
            collector = %self.name,
            prefix = ?self.config.prefix,
            settings = declarations.len(),
            "settings collector built"
        );

        let policy = self.config.loader_policy();
        let inner = CollectorInner {
            name: self.name,
            config: self.config,
            policy,
            declarations,
            registry,
            tree: ScopeTree::new(ScopeNode::root(slots)),
            #[cfg(feature = "metrics")]
            metrics: self.metrics,
        };
        SettingsCollector::from_inner(Arc::new(inner))
    }
}

impl Default for SettingsCollectorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
