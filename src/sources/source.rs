//! Settings source trait.

use crate::core::SettingValue;
use crate::error::SourceError;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Values found by a source, keyed by setting name (without any prefix).
pub type RawSettings = HashMap<String, SettingValue>;

/// The answer of [`SettingsSource::load_settings`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loaded {
    /// Values that were found.
    pub values: RawSettings,
    /// Whether the source considers this a successful load. When loaders are
    /// not merged, the first successful answer wins.
    pub success: bool,
}

impl Loaded {
    /// A successful answer, whatever it contains.
    pub fn found(values: RawSettings) -> Self {
        Self {
            values,
            success: true,
        }
    }

    /// An answer that is successful only if it found something.
    pub fn if_any(values: RawSettings) -> Self {
        let success = !values.is_empty();
        Self { values, success }
    }
}

/// How a source spells names in its own key space.
///
/// Applied to the prefix and to every setting name before lookup.
#[derive(Clone, Default)]
pub enum NameCase {
    /// Use names as they are
    #[default]
    Preserve,
    /// `FOO__BAR`
    Upper,
    /// `foo__bar`
    Lower,
    /// Flip the case of every letter
    SwapCase,
    /// Any other transformation
    Custom(Arc<dyn Fn(&str) -> String + Send + Sync>),
}

impl NameCase {
    /// Transform `name` into the source's spelling.
    pub fn apply(&self, name: &str) -> String {
        match self {
            NameCase::Preserve => name.to_string(),
            NameCase::Upper => name.to_uppercase(),
            NameCase::Lower => name.to_lowercase(),
            NameCase::SwapCase => name
                .chars()
                .flat_map(|c| {
                    if c.is_uppercase() {
                        c.to_lowercase().collect::<Vec<_>>()
                    } else {
                        c.to_uppercase().collect::<Vec<_>>()
                    }
                })
                .collect(),
            NameCase::Custom(f) => f(name),
        }
    }
}

impl fmt::Debug for NameCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameCase::Preserve => write!(f, "Preserve"),
            NameCase::Upper => write!(f, "Upper"),
            NameCase::Lower => write!(f, "Lower"),
            NameCase::SwapCase => write!(f, "SwapCase"),
            NameCase::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Trait for settings sources.
///
/// Implement this to let the collector read settings from some external
/// system: a framework's configuration object, the environment, a remote store.
/// A source only has to answer "given this prefix and these names, what do you
/// have?"; the registry takes care of ordering, filtering and merging.
///
/// # Examples
///
/// ```rust
/// use settings_collector::error::SourceError;
/// use settings_collector::sources::{Loaded, RawSettings, SettingsSource};
///
/// struct ConstantSource;
///
/// impl SettingsSource for ConstantSource {
///     fn load_settings(&self, prefix: &str, names: &[String]) -> Result<Loaded, SourceError> {
///         let values: RawSettings = names
///             .iter()
///             .filter(|name| prefix.is_empty() && name.as_str() == "answer")
///             .map(|name| (name.clone(), 42.into()))
///             .collect();
///         Ok(Loaded::if_any(values))
///     }
/// }
///
/// assert_eq!(ConstantSource.name(), "Constant");
/// ```
pub trait SettingsSource: Send + Sync {
    /// Look up `prefix + name` for every name in `names`.
    ///
    /// `prefix` already has [`name_case`](Self::name_case) applied; names do
    /// not, as only the source knows how its keys are spelled.
    ///
    /// # Errors
    ///
    /// Return [`SourceError::Unavailable`] when the backing system is simply
    /// not there (the engine treats that as "nothing found"). Any other error is
    /// passed on to whoever asked for the setting.
    fn load_settings(&self, prefix: &str, names: &[String]) -> Result<Loaded, SourceError>;

    /// Short name used to include or exclude this source.
    ///
    /// Defaults to the type name without its module path and without a
    /// trailing `Source` (`EnvSource` becomes `Env`).
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Higher priority answers override lower ones when merging, and are
    /// asked first otherwise.
    fn priority(&self) -> i32 {
        0
    }

    /// Whether the source takes part in resolution when registered.
    fn enabled(&self) -> bool {
        true
    }

    /// How this source spells names.
    fn name_case(&self) -> NameCase {
        NameCase::Preserve
    }
}

/// Strip the module path, generic arguments and a trailing `Source` from a
/// type name.
pub fn short_type_name(type_name: &str) -> String {
    let without_generics = type_name.split('<').next().unwrap_or(type_name);
    let last = without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics);
    match last.strip_suffix("Source") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => last.to_string(),
    }
}

/// Collect `prefix + case(name)` lookups into a map keyed by the plain names.
///
/// Shared by the built-in sources whose backing store is a key-value lookup.
pub fn lookup_names<F>(prefix: &str, names: &[String], case: &NameCase, mut lookup: F) -> RawSettings
where
    F: FnMut(&str) -> Option<SettingValue>,
{
    names
        .iter()
        .filter_map(|name| {
            let key = format!("{}{}", prefix, case.apply(name));
            lookup(&key).map(|value| (name.clone(), value))
        })
        .collect()
}
