//! Settings source implementations and the registry that aggregates them.

mod config_rs;
mod dict;
mod env;
mod map;
mod registry;
mod source;

pub use config_rs::ConfigRsSource;
pub use dict::{DictSource, SharedSettings};
pub use env::EnvSource;
pub use map::MapSource;
pub use registry::{RegisteredSource, SourceRegistry};
pub use source::{Loaded, NameCase, RawSettings, SettingsSource, lookup_names, short_type_name};
