//! Built-in metrics for setting resolution.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Lookups and cache hits
//! - Source queries
//! - Missing values and failed resolutions
//! - Resolution duration
//! - Number of scopes
//!
//! # Examples
//!
//! ```rust,no_run
//! use settings_collector::prelude::*;
//! use opentelemetry::global;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<()> {
//! let meter = global::meter("my-app");
//!
//! let settings = SettingsCollector::builder()
//!     .with_prefix("myapp")
//!     .with_setting("port", Setting::new(8080))
//!     .with_metrics(meter)
//!     .build(Arc::new(SourceRegistry::new()))?;
//! # Ok(())
//! # }
//! ```

mod resolution_metrics;

pub use resolution_metrics::ResolutionMetrics;
