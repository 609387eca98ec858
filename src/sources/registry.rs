//! Registry of known sources and the priority-based aggregation over them.

use super::dict::{DictSource, SharedSettings};
use super::env::EnvSource;
use super::source::{RawSettings, SettingsSource};
use crate::core::LoaderPolicy;
use crate::error::{Result, SettingsError, SourceError};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// A source together with its registration data.
pub struct RegisteredSource {
    name: String,
    priority: i32,
    enabled: AtomicBool,
    source: Arc<dyn SettingsSource>,
}

impl fmt::Debug for RegisteredSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredSource")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl RegisteredSource {
    fn new(source: Arc<dyn SettingsSource>) -> Self {
        Self {
            name: source.name(),
            priority: source.priority(),
            enabled: AtomicBool::new(source.enabled()),
            source,
        }
    }

    /// Short name of the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Priority captured at registration.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether the source currently takes part in resolution.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Ask the source for `names` under `prefix`.
    ///
    /// Returns `Ok(None)` when the source is disabled, reports no success, or
    /// signals that it is unavailable.
    ///
    /// # Errors
    ///
    /// Any other source failure is returned as [`SettingsError::Source`].
    pub fn get_settings(&self, prefix: &str, names: &[String]) -> Result<Option<RawSettings>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let prefix = self.source.name_case().apply(prefix);
        trace!(source = %self.name, %prefix, ?names, "querying source");

        match self.source.load_settings(&prefix, names) {
            Ok(loaded) if loaded.success => Ok(Some(loaded.values)),
            Ok(_) => Ok(None),
            Err(SourceError::Unavailable(reason)) => {
                trace!(source = %self.name, %reason, "source unavailable");
                Ok(None)
            }
            Err(SourceError::Failed(message)) => Err(SettingsError::Source {
                loader: self.name.clone(),
                message,
            }),
        }
    }
}

/// Registry of all sources known to one or more collectors.
///
/// Meant to be created once and shared (`Arc<SourceRegistry>`) for the life of
/// the process. Sources are keyed by their short name; registering a second
/// source with the same name replaces the first.
///
/// # Examples
///
/// ```rust
/// use settings_collector::sources::{MapSource, SourceRegistry};
///
/// let registry = SourceRegistry::new();
/// registry.register(MapSource::new("Defaults").with_value("port", 8080));
/// assert_eq!(registry.names(), vec!["Defaults".to_string()]);
/// ```
pub struct SourceRegistry {
    sources: RwLock<Vec<Arc<RegisteredSource>>>,
    last_successful: Mutex<Option<String>>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            last_successful: Mutex::new(None),
        }
    }

    /// Create a registry with the built-in sources: the environment (disabled
    /// until enabled explicitly) and the in-process `settings` mapping.
    pub fn builtin(settings: &SharedSettings) -> Self {
        let registry = Self::new();
        registry.register(EnvSource::new());
        registry.register(DictSource::new(settings.clone()));
        registry
    }

    /// Register a source and return its short name.
    pub fn register<S: SettingsSource + 'static>(&self, source: S) -> String {
        self.register_arc(Arc::new(source))
    }

    /// Register a shared source and return its short name.
    pub fn register_arc(&self, source: Arc<dyn SettingsSource>) -> String {
        let entry = Arc::new(RegisteredSource::new(source));
        let name = entry.name.clone();

        let mut sources = self.sources.write();
        match sources.iter_mut().find(|existing| existing.name == name) {
            Some(existing) => *existing = entry,
            None => sources.push(entry),
        }
        debug!(source = %name, "registered settings source");
        name
    }

    /// Enable or disable a source. Returns `false` if no such source exists.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.get(name) {
            Some(entry) => {
                entry.enabled.store(enabled, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Look up a source by short name.
    pub fn get(&self, name: &str) -> Option<Arc<RegisteredSource>> {
        self.sources
            .read()
            .iter()
            .find(|entry| entry.name == name)
            .cloned()
    }

    /// Short names of all registered sources, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.sources
            .read()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Short name of the source that most recently produced an answer.
    pub fn last_successful(&self) -> Option<String> {
        self.last_successful.lock().clone()
    }

    /// Select the enabled sources allowed by `policy`, ordered by priority.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Config`] when the policy includes no loaders at
    /// all, or only loaders that are not registered.
    pub fn select(&self, policy: &LoaderPolicy, descending: bool) -> Result<Vec<Arc<RegisteredSource>>> {
        policy.validate()?;

        let mut selected: Vec<Arc<RegisteredSource>> = {
            let sources = self.sources.read();
            let known: BTreeSet<&str> = sources.iter().map(|entry| entry.name.as_str()).collect();

            if !policy.exclude {
                let unknown: Vec<&str> = policy
                    .loaders
                    .iter()
                    .map(String::as_str)
                    .filter(|name| !known.contains(name))
                    .collect();
                if unknown.len() == policy.loaders.len() {
                    return Err(SettingsError::Config(format!(
                        "attempting to use only unknown loaders: {}",
                        unknown.join(", ")
                    )));
                }
            }

            sources
                .iter()
                .filter(|entry| policy.loaders.contains(&entry.name) != policy.exclude)
                .filter(|entry| entry.is_enabled())
                .cloned()
                .collect()
        };

        // Stable sorts keep registration order among equal priorities.
        if descending {
            selected.sort_by(|a, b| b.priority.cmp(&a.priority));
        } else {
            selected.sort_by_key(|entry| entry.priority);
        }
        Ok(selected)
    }

    /// Load `names` under `prefix` from the sources selected by `policy`.
    ///
    /// With `load_all`, every source is asked in ascending priority order and
    /// the answers are merged (later, higher-priority answers win). Otherwise
    /// sources are asked in descending priority order and the first
    /// successful answer is returned as is.
    ///
    /// # Errors
    ///
    /// Returns configuration errors from [`select`](Self::select) and any
    /// source failure that is not an unavailability signal.
    pub fn get_settings(&self, prefix: &str, names: &[String], policy: &LoaderPolicy) -> Result<RawSettings> {
        let mut result = RawSettings::new();
        for entry in self.select(policy, !policy.load_all)? {
            let Some(values) = entry.get_settings(prefix, names)? else {
                continue;
            };
            *self.last_successful.lock() = Some(entry.name.clone());
            debug!(source = %entry.name, %prefix, found = values.len(), "source answered");
            if policy.load_all {
                result.extend(values);
            } else {
                return Ok(values);
            }
        }
        Ok(result)
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
