//! The settings collector and its resolution engine.

use crate::core::builder::SettingsCollectorBuilder;
use crate::core::config::{CollectorConfig, LoaderPolicy};
use crate::core::scope::{Scope, ScopeId, ScopeNode, ScopeTree};
use crate::core::setting::Setting;
use crate::core::value::{RawValue, SettingValue};
use crate::error::{Result, SettingsError};
use crate::sources::SourceRegistry;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

#[cfg(feature = "metrics")]
use crate::metrics::ResolutionMetrics;

/// State shared by every scope of a collector.
pub(crate) struct CollectorInner {
    pub(crate) name: String,
    pub(crate) config: CollectorConfig,
    pub(crate) policy: LoaderPolicy,
    pub(crate) declarations: BTreeMap<String, Arc<Setting>>,
    pub(crate) registry: Arc<SourceRegistry>,
    pub(crate) tree: ScopeTree,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: Option<ResolutionMetrics>,
}

impl CollectorInner {
    /// Handle to the scope at `path`, creating it (and its ancestors) if
    /// needed. An empty path is the root.
    pub(crate) fn scope(self: &Arc<Self>, path: &str) -> Result<Scope> {
        let segments: Vec<String> = if path.is_empty() {
            Vec::new()
        } else {
            path.split(self.config.separator.as_str())
                .map(str::to_string)
                .collect()
        };

        let (id, node) = self.tree.resolve(&segments, &self.config.separator)?;
        self.observe_scope_count();
        Ok(Scope {
            collector: Arc::clone(self),
            id,
            node,
        })
    }

    pub(crate) fn scope_prefix(&self, node: &ScopeNode) -> String {
        let prefix = self.config.get_prefix();
        match node.name() {
            Some(name) => format!("{}{}{}", prefix, name, self.config.separator),
            None => prefix,
        }
    }

    /// Load `names` (all declared settings if `None`) for one scope and store
    /// what was found in its slots.
    ///
    /// The first load of a greedy collector's scope always asks for every
    /// setting. At the root, settings no source knows about are filled in from
    /// their defaults, so a required setting without a value fails here.
    pub(crate) fn load(&self, node: &ScopeNode, names: Option<&[String]>) -> Result<BTreeMap<String, SettingValue>> {
        let greedy = self.config.greedy_load && !node.is_greedy_loaded();
        let names: Vec<String> = match names {
            Some(names) if !greedy => names.to_vec(),
            _ => self.declarations.keys().cloned().collect(),
        };

        let mut raw: BTreeMap<String, RawValue> = BTreeMap::new();
        if greedy && node.parent().is_none() {
            raw.extend(names.iter().map(|name| (name.clone(), RawValue::UseDefault)));
        }

        let prefix = self.scope_prefix(node);
        trace!(collector = %self.name, %prefix, greedy, count = names.len(), "loading settings");
        self.observe_source_query();
        let found = self.registry.get_settings(&prefix, &names, &self.policy)?;
        raw.extend(found.into_iter().map(|(name, value)| (name, RawValue::Value(value))));

        let mut values = BTreeMap::new();
        for (name, raw) in raw {
            match node.find_slot(&name) {
                Some(slot) => {
                    let value = slot.assign(&raw)?;
                    values.insert(name, value);
                }
                None => warn!(collector = %self.name, setting = %name, "ignoring value for undeclared setting"),
            }
        }

        if greedy {
            node.mark_greedy_loaded();
            debug!(collector = %self.name, scope = ?node.name(), loaded = values.len(), "greedy load done");
        }
        Ok(values)
    }

    pub(crate) fn get(&self, node: &Arc<ScopeNode>, name: &str) -> Result<SettingValue> {
        let timer = self.observe_lookup();
        let result = self.resolve(node, name);
        self.observe_result(timer, &result);
        result
    }

    /// Cache, then this scope's sources, then the parent scope, then the
    /// declared default.
    fn resolve(&self, node: &Arc<ScopeNode>, name: &str) -> Result<SettingValue> {
        let mut current = Arc::clone(node);
        loop {
            let slot = current.slot(name)?;
            if let Some(value) = slot.cached() {
                trace!(setting = %name, scope = ?current.name(), "cache hit");
                self.observe_cache_hit();
                return Ok(value);
            }

            let lookup = [name.to_string()];
            let mut values = self.load(&current, Some(lookup.as_slice()))?;
            if let Some(value) = values.remove(name) {
                return Ok(value);
            }

            match current.parent() {
                Some(parent) => {
                    trace!(setting = %name, scope = ?current.name(), "falling back to parent scope");
                    current = self.tree.node(parent)?;
                }
                None => return slot.setting().default_or_missing(),
            }
        }
    }

    pub(crate) fn set(&self, node: &ScopeNode, name: &str, value: SettingValue) -> Result<()> {
        let slot = node.slot(name)?;
        slot.assign(&RawValue::Value(value))?;
        debug!(collector = %self.name, setting = %name, scope = ?node.name(), "setting assigned");
        Ok(())
    }

    pub(crate) fn clear_cache(&self, id: ScopeId) {
        let nodes = self.tree.subtree(id);
        for node in &nodes {
            for slot in node.slots() {
                slot.clear();
            }
        }
        debug!(collector = %self.name, scopes = nodes.len(), "cache cleared");
    }

    #[cfg(feature = "metrics")]
    fn observe_lookup(&self) -> Option<Instant> {
        self.metrics.as_ref().map(ResolutionMetrics::start_lookup)
    }

    #[cfg(not(feature = "metrics"))]
    fn observe_lookup(&self) -> Option<Instant> {
        None
    }

    #[cfg(feature = "metrics")]
    fn observe_result(&self, timer: Option<Instant>, result: &Result<SettingValue>) {
        if let (Some(metrics), Some(timer)) = (&self.metrics, timer) {
            match result {
                Ok(_) => metrics.record_resolved(timer),
                Err(e) => metrics.record_failure(timer, e.is_missing()),
            }
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn observe_result(&self, _timer: Option<Instant>, _result: &Result<SettingValue>) {}

    #[cfg(feature = "metrics")]
    fn observe_cache_hit(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cache_hit();
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn observe_cache_hit(&self) {}

    #[cfg(feature = "metrics")]
    fn observe_source_query(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_source_query();
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn observe_source_query(&self) {}

    #[cfg(feature = "metrics")]
    fn observe_scope_count(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.update_scope_count(self.tree.len());
        }
    }

    #[cfg(not(feature = "metrics"))]
    fn observe_scope_count(&self) {}
}

/// A set of declared settings, resolved on demand from prioritized sources.
///
/// A collector owns a tree of [`Scope`]s. The collector itself behaves like
/// its root scope; every other scope inherits values it cannot find for
/// itself from its parent.
///
/// # Examples
///
/// ```rust
/// use settings_collector::prelude::*;
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let registry = Arc::new(SourceRegistry::new());
/// registry.register(
///     MapSource::new("Framework")
///         .with_value("myapp__port", "8080")
///         .with_value("myapp__db__port", "5432"),
/// );
///
/// let settings = SettingsCollector::builder()
///     .with_prefix("myapp")
///     .with_setting("port", Setting::new(80).value_type(ValueType::Int))
///     .with_setting("host", Setting::new("localhost"))
///     .build(registry)?;
///
/// assert_eq!(settings.get_as::<i64>("port")?, 8080);
/// assert_eq!(settings.scope("db")?.get_as::<i64>("port")?, 5432);
/// assert_eq!(settings.scope("db")?.get("host")?, "localhost".into());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct SettingsCollector {
    root: Scope,
}

impl SettingsCollector {
    /// Create a new builder for a collector.
    pub fn builder() -> SettingsCollectorBuilder {
        SettingsCollectorBuilder::new()
    }

    pub(crate) fn from_inner(inner: Arc<CollectorInner>) -> Result<Self> {
        let root = inner.scope("")?;
        Ok(Self { root })
    }

    /// The root scope.
    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// The scope at `path` (segments joined by the separator). The same path
    /// always yields the same scope; an empty path yields the root.
    pub fn scope(&self, path: &str) -> Result<Scope> {
        self.root.collector.scope(path)
    }

    /// Read a setting at the root scope. See [`Scope::get`].
    pub fn get(&self, name: &str) -> Result<SettingValue> {
        self.root.get(name)
    }

    /// Read a setting at the root scope and convert it. See [`Scope::get_as`].
    pub fn get_as<T>(&self, name: &str) -> Result<T>
    where
        T: TryFrom<SettingValue, Error = SettingValue>,
    {
        self.root.get_as(name)
    }

    /// Override a setting at the root scope. See [`Scope::set`].
    pub fn set(&self, name: &str, value: impl Into<SettingValue>) -> Result<()> {
        self.root.set(name, value)
    }

    /// Batch-load settings at the root scope. See [`Scope::load`].
    pub fn load(&self, names: &[&str]) -> Result<BTreeMap<String, SettingValue>> {
        self.root.load(names)
    }

    /// Forget every cached value, in every scope.
    pub fn clear_cache(&self) {
        self.root.clear_cache();
    }

    /// The global prefix: `"{prefix}{separator}"` or an empty string.
    pub fn prefix(&self) -> String {
        self.root.prefix()
    }

    /// The collector's name, as given to the builder.
    pub fn name(&self) -> &str {
        &self.root.collector.name
    }

    /// The effective configuration.
    pub fn config(&self) -> &CollectorConfig {
        &self.root.collector.config
    }

    /// The registry this collector loads from.
    pub fn registry(&self) -> &Arc<SourceRegistry> {
        &self.root.collector.registry
    }

    /// The declaration of `name`.
    pub fn setting(&self, name: &str) -> Result<&Setting> {
        self.root
            .collector
            .declarations
            .get(name)
            .map(Arc::as_ref)
            .ok_or_else(|| SettingsError::UnknownSetting(name.to_string()))
    }

    /// Names of all declared settings, sorted.
    pub fn settings_names(&self) -> Vec<String> {
        self.root.collector.declarations.keys().cloned().collect()
    }

    /// Number of scopes created so far, the root included.
    pub fn scope_count(&self) -> usize {
        self.root.collector.tree.len()
    }
}

impl fmt::Debug for SettingsCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsCollector")
            .field("name", &self.name())
            .field("prefix", &self.config().prefix)
            .field("settings", &self.settings_names())
            .field("scopes", &self.scope_count())
            .finish()
    }
}
