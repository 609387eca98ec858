//! # settings-collector
//!
//! Declared settings resolved on demand from prioritized, pluggable sources,
//! with scopes that inherit from their parents.
//!
//! ## Overview
//!
//! Application code declares named settings with defaults and coercion
//! rules. When a setting is read, `settings-collector`:
//! - Returns the value cached in the scope, if any
//! - Otherwise asks the registered sources (environment, an in-process map,
//!   a `config::Config` object, your own) in priority order
//! - Coerces the raw value to the declared type and caches it
//! - Falls back to the parent scope, and finally to the declared default
//!
//! ## Quick Start
//!
//! ```rust
//! use settings_collector::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> settings_collector::error::Result<()> {
//! // One registry per process, shared by every collector
//! let shared = SharedSettings::new();
//! let registry = Arc::new(SourceRegistry::builtin(&shared));
//!
//! let settings = SettingsCollector::builder()
//!     .with_prefix("myapp")
//!     .with_setting("port", Setting::new(8080).value_type(ValueType::Int))
//!     .with_setting("host", Setting::new("localhost"))
//!     .build(registry)?;
//!
//! shared.update("myapp__port", "9000");
//! shared.update("myapp__tenant1__host", "tenant1.example.com");
//!
//! assert_eq!(settings.get_as::<i64>("port")?, 9000);
//!
//! let tenant = settings.scope("tenant1")?;
//! assert_eq!(tenant.get_as::<String>("host")?, "tenant1.example.com");
//! assert_eq!(tenant.get_as::<i64>("port")?, 9000);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Scopes**: per-tenant or per-module overrides addressed by path
//! - **Priorities**: merge all sources or take the first that answers
//! - **Caching**: per scope and per setting, with explicit invalidation
//! - **Greedy loading**: one batched query per scope on first access
//! - **Self-check**: verify a deployment's sources with [`diagnostics`]
//!
//! ## Feature Flags
//!
//! ```toml
//! [dependencies]
//! settings-collector = { version = "0.1", features = ["metrics"] }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod diagnostics;
pub mod error;
pub mod sources;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        CollectorConfig, Scope, Setting, SettingValue, SettingsCollector, SettingsCollectorBuilder,
        ValueType,
    };
    pub use crate::error::{Result, SettingsError, SourceError};
    pub use crate::sources::{
        DictSource, EnvSource, Loaded, MapSource, NameCase, SettingsSource, SharedSettings,
        SourceRegistry,
    };
}
