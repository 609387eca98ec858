//! Error types for settings-collector.

/// Result type alias for settings-collector operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

/// Errors that can occur while declaring or resolving settings.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SettingsError {
    /// The collector or its loader selection is misconfigured.
    #[error("Configuration error: {0}")]
    Config(String),

    /// No source provided a value and the setting has no default.
    #[error("setting '{setting}' must be defined")]
    Missing {
        /// Name of the setting
        setting: String,
    },

    /// A raw value could not be coerced into the declared type.
    #[error("invalid value {value} for setting {setting} (it should be of type {expected})")]
    Cast {
        /// Printable form of the offending value
        value: String,
        /// Name of the setting
        setting: String,
        /// Name of the target type
        expected: String,
    },

    /// The setting was never declared on this collector.
    #[error("no setting named '{0}'")]
    UnknownSetting(String),

    /// A source failed with something other than "nothing available here".
    #[error("Source '{loader}' failed: {message}")]
    Source {
        /// Short name of the failing source
        loader: String,
        /// The source's error message
        message: String,
    },

    /// Scope bookkeeping was found in a state that should be impossible.
    #[error("Internal invariant violated: {0} (this shouldn't happen)")]
    Internal(String),
}

impl SettingsError {
    /// Create a missing-value error for the given setting.
    pub fn missing(setting: impl Into<String>) -> Self {
        Self::Missing {
            setting: setting.into(),
        }
    }

    /// Check whether this is a missing-value error.
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    /// Check whether this is a type coercion error.
    pub fn is_cast(&self) -> bool {
        matches!(self, Self::Cast { .. })
    }
}

/// Errors returned by a [`SettingsSource`](crate::sources::SettingsSource).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source has nothing to offer right now (e.g. its backing object is
    /// not installed). The engine treats this as "no values" and moves on.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source misbehaved. This is propagated to the caller.
    #[error("{0}")]
    Failed(String),
}

impl SourceError {
    /// Create an unavailability signal.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable(reason.into())
    }

    /// Create a failure.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }
}
