//! Core settings management types.

mod builder;
mod collector;
mod config;
mod scope;
mod setting;
mod slot;
mod value;

pub use builder::SettingsCollectorBuilder;
pub use collector::SettingsCollector;
pub use config::{CollectorConfig, DEFAULT_SEPARATOR, LoaderPolicy, RESERVED_PREFIX};
pub use scope::Scope;
pub use setting::{Setting, ValueType};
pub use value::SettingValue;
