//! Self-check for a deployed set of sources.
//!
//! [`SelfCheck`] declares a small fixed collector (prefix `SCTest`) whose
//! values an operator configures in whatever sources the application uses.
//! Running it reads every value back and reports which source answered and
//! what went wrong, if anything.
//!
//! # Examples
//!
//! ```rust
//! use settings_collector::diagnostics::SelfCheck;
//! use settings_collector::sources::{MapSource, SourceRegistry};
//! use std::sync::Arc;
//!
//! # fn main() -> settings_collector::error::Result<()> {
//! let registry = Arc::new(SourceRegistry::new());
//! registry.register(
//!     MapSource::new("Framework")
//!         .with_values(SelfCheck::expected().into_iter().map(|e| (e.key, e.value))),
//! );
//!
//! let report = SelfCheck::new(registry)?.run(false);
//! assert!(report.passed());
//! assert_eq!(report.to_string(), "Success: all tests have passed.");
//! # Ok(())
//! # }
//! ```

use crate::core::{Setting, SettingValue, SettingsCollector, ValueType};
use crate::error::{Result, SettingsError};
use crate::sources::SourceRegistry;
use std::fmt;
use std::sync::Arc;

const NO_LOADER: &str = "<NO LOADER>";

/// One value the self-check expects to find.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedValue {
    /// Scope path, empty for the root.
    pub scope: String,
    /// Setting name.
    pub name: String,
    /// Full key the sources should provide.
    pub key: String,
    /// The value to configure.
    pub value: SettingValue,
}

impl ExpectedValue {
    fn test_name(&self, separator: &str) -> String {
        if self.scope.is_empty() {
            self.name.clone()
        } else {
            format!("{}{}{}", self.scope, separator, self.name)
        }
    }
}

impl fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value.repr())
    }
}

/// Result of [`SelfCheck::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelfCheckReport {
    lines: Vec<String>,
    failures: usize,
}

impl SelfCheckReport {
    /// Whether every value was read back correctly.
    pub fn passed(&self) -> bool {
        self.failures == 0
    }

    /// Number of entries that failed.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Report lines, one per entry (or a single success line).
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl fmt::Display for SelfCheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// The self-check collector.
pub struct SelfCheck {
    collector: SettingsCollector,
}

impl SelfCheck {
    /// Prefix of every self-check key.
    pub const PREFIX: &'static str = "SCTest";

    const SCOPE: &'static str = "scope1__scope2";

    /// Build the self-check collector over `registry`.
    ///
    /// Every entry is read on its own (no greedy load) so that one missing
    /// value does not hide the others.
    pub fn new(registry: Arc<SourceRegistry>) -> Result<Self> {
        let collector = SettingsCollector::builder()
            .with_name(Self::PREFIX)
            .with_prefix(Self::PREFIX)
            .with_greedy_load(false)
            .with_setting("JustAString", Setting::required().default_on_cast_error(false))
            .with_setting(
                "AnInteger",
                Setting::required()
                    .value_type(ValueType::Int)
                    .default_on_cast_error(false),
            )
            .build(registry)?;
        Ok(Self { collector })
    }

    /// The values to configure, in check order.
    pub fn expected() -> Vec<ExpectedValue> {
        let separator = crate::core::DEFAULT_SEPARATOR;
        [
            ("", "JustAString", SettingValue::from("covfefe")),
            ("", "AnInteger", SettingValue::Int(17)),
            (Self::SCOPE, "JustAString", SettingValue::from("covfefe, but scoped")),
            (Self::SCOPE, "AnInteger", SettingValue::Int(1719)),
        ]
        .into_iter()
        .map(|(scope, name, value)| {
            let key = if scope.is_empty() {
                format!("{}{}{}", Self::PREFIX, separator, name)
            } else {
                format!("{}{}{}{}{}", Self::PREFIX, separator, scope, separator, name)
            };
            ExpectedValue {
                scope: scope.to_string(),
                name: name.to_string(),
                key,
                value,
            }
        })
        .collect()
    }

    /// The underlying collector.
    pub fn collector(&self) -> &SettingsCollector {
        &self.collector
    }

    /// Read every expected value and report the outcome.
    ///
    /// With `verbose`, passing entries are reported too; otherwise only
    /// failures are, or a single success line if there are none.
    pub fn run(&self, verbose: bool) -> SelfCheckReport {
        let separator = self.collector.config().separator.clone();
        let mut lines = Vec::new();
        let mut failures = 0;

        for entry in Self::expected() {
            let result = self
                .collector
                .scope(&entry.scope)
                .and_then(|scope| scope.get(&entry.name));
            let loader = self
                .collector
                .registry()
                .last_successful()
                .unwrap_or_else(|| NO_LOADER.to_string());
            let context = format!("for {} loaded from {}", entry.key, loader);

            match result {
                Ok(value) if value == entry.value => {
                    if verbose {
                        lines.push(format!(
                            "Test for '{}' passed using {}.",
                            entry.test_name(&separator),
                            loader
                        ));
                    }
                }
                Ok(value) => {
                    failures += 1;
                    lines.push(format!(
                        "Invalid value received {}: {} != {}",
                        context,
                        value.repr(),
                        entry.value.repr()
                    ));
                }
                Err(e @ SettingsError::Cast { .. }) => {
                    failures += 1;
                    lines.push(format!("Error casting value {}: {}", context, e));
                }
                Err(e) => {
                    failures += 1;
                    lines.push(format!("Error getting value {}: {}", context, e));
                }
            }
        }

        if lines.is_empty() {
            lines.push("Success: all tests have passed.".to_string());
        }
        SelfCheckReport { lines, failures }
    }
}
