//! Setting declarations and type coercion.

use crate::core::value::{RawValue, SettingValue};
use crate::error::{Result, SettingsError};
use std::fmt;
use std::sync::Arc;

/// Type alias for custom coercion functions.
type CoerceFn = Arc<dyn Fn(&SettingValue) -> std::result::Result<SettingValue, String> + Send + Sync>;

/// The type a setting's raw value is coerced into.
#[derive(Clone)]
pub enum ValueType {
    /// `true`/`false`; also accepts integers and common textual spellings
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// Text; any scalar is rendered into a string
    String,
    /// A list of values (no conversion from other kinds)
    List,
    /// A string-keyed table (no conversion from other kinds)
    Map,
    /// A user-supplied conversion with a name used in error messages
    Custom {
        /// Name of the target type
        name: String,
        /// The conversion function
        coerce: CoerceFn,
    },
}

impl ValueType {
    /// Create a custom coercion rule.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use settings_collector::core::{SettingValue, ValueType};
    ///
    /// let port = ValueType::custom("port", |value| match value {
    ///     SettingValue::Int(i) if (1..=65535).contains(i) => Ok(value.clone()),
    ///     _ => Err("not a port number".to_string()),
    /// });
    /// assert_eq!(port.name(), "port");
    /// ```
    pub fn custom<F>(name: impl Into<String>, coerce: F) -> Self
    where
        F: Fn(&SettingValue) -> std::result::Result<SettingValue, String> + Send + Sync + 'static,
    {
        Self::Custom {
            name: name.into(),
            coerce: Arc::new(coerce),
        }
    }

    /// Get the name of the target type.
    pub fn name(&self) -> &str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::String => "string",
            ValueType::List => "list",
            ValueType::Map => "map",
            ValueType::Custom { name, .. } => name,
        }
    }

    /// Check whether `value` already has this type and needs no conversion.
    pub fn matches(&self, value: &SettingValue) -> bool {
        matches!(
            (self, value),
            (ValueType::Bool, SettingValue::Bool(_))
                | (ValueType::Int, SettingValue::Int(_))
                | (ValueType::Float, SettingValue::Float(_))
                | (ValueType::String, SettingValue::String(_))
                | (ValueType::List, SettingValue::List(_))
                | (ValueType::Map, SettingValue::Map(_))
        )
    }

    /// Convert `value` into this type.
    ///
    /// The error string describes why the conversion failed; callers wrap it
    /// into a [`SettingsError::Cast`].
    pub fn coerce(&self, value: &SettingValue) -> std::result::Result<SettingValue, String> {
        if self.matches(value) {
            return Ok(value.clone());
        }
        match (self, value) {
            (ValueType::Custom { coerce, .. }, _) => coerce(value),

            (ValueType::Int, SettingValue::Bool(b)) => Ok(SettingValue::Int(i64::from(*b))),
            (ValueType::Int, SettingValue::Float(x)) => {
                if x.is_finite() && x.trunc() >= i64::MIN as f64 && x.trunc() < i64::MAX as f64 {
                    Ok(SettingValue::Int(x.trunc() as i64))
                } else {
                    Err(format!("{} does not fit an integer", x))
                }
            }
            (ValueType::Int, SettingValue::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(SettingValue::Int)
                .map_err(|e| e.to_string()),

            (ValueType::Float, SettingValue::Bool(b)) => {
                Ok(SettingValue::Float(if *b { 1.0 } else { 0.0 }))
            }
            (ValueType::Float, SettingValue::Int(i)) => Ok(SettingValue::Float(*i as f64)),
            (ValueType::Float, SettingValue::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(SettingValue::Float)
                .map_err(|e| e.to_string()),

            (ValueType::Bool, SettingValue::Int(i)) => Ok(SettingValue::Bool(*i != 0)),
            (ValueType::Bool, SettingValue::String(s)) => {
                match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => Ok(SettingValue::Bool(true)),
                    "false" | "no" | "off" | "0" => Ok(SettingValue::Bool(false)),
                    _ => Err(format!("'{}' is not a boolean", s)),
                }
            }

            (ValueType::String, SettingValue::Null) => Err("null is not a string".to_string()),
            (ValueType::String, other) => Ok(SettingValue::String(other.to_string())),

            (target, other) => Err(format!(
                "cannot convert {} into {}",
                other.type_name(),
                target.name()
            )),
        }
    }
}

impl fmt::Debug for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueType({})", self.name())
    }
}

/// Declaration of one configurable value.
///
/// A declaration is immutable once it is registered on a collector; every scope
/// shares it and keeps its own cached value next to it.
///
/// # Examples
///
/// ```rust
/// use settings_collector::core::{Setting, ValueType};
///
/// let port = Setting::new(8080).value_type(ValueType::Int);
/// let token = Setting::required().no_cache();
/// assert!(port.is_cacheable());
/// assert!(!token.is_cacheable());
/// ```
#[derive(Debug, Clone)]
pub struct Setting {
    name: String,
    default: Option<SettingValue>,
    value_type: Option<ValueType>,
    cache: bool,
    default_on_cast_error: bool,
}

impl Setting {
    /// Declare a setting with a default value.
    pub fn new(default: impl Into<SettingValue>) -> Self {
        Self {
            name: String::new(),
            default: Some(default.into()),
            value_type: None,
            cache: true,
            default_on_cast_error: true,
        }
    }

    /// Declare a setting that has no default and must be provided by a source.
    pub fn required() -> Self {
        Self {
            default: None,
            ..Self::new(SettingValue::Null)
        }
    }

    /// Coerce raw values into `value_type`.
    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = Some(value_type);
        self
    }

    /// Never cache this setting; every read goes back to the sources.
    pub fn no_cache(mut self) -> Self {
        self.cache = false;
        self
    }

    /// Whether a failed coercion silently resolves to the default
    /// (`true` unless changed).
    pub fn default_on_cast_error(mut self, enabled: bool) -> Self {
        self.default_on_cast_error = enabled;
        self
    }

    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name under which the setting was declared.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared default, if any.
    pub fn default_value(&self) -> Option<&SettingValue> {
        self.default.as_ref()
    }

    /// The declared coercion rule, if any.
    pub fn declared_type(&self) -> Option<&ValueType> {
        self.value_type.as_ref()
    }

    /// Whether resolved values are kept in the scope's cache.
    pub fn is_cacheable(&self) -> bool {
        self.cache
    }

    /// Return the default or fail with a missing-value error.
    pub fn default_or_missing(&self) -> Result<SettingValue> {
        self.default
            .clone()
            .ok_or_else(|| SettingsError::missing(&self.name))
    }

    /// Coerce a raw value according to this declaration.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Cast`] when coercion fails and
    /// `default_on_cast_error` is off, and [`SettingsError::Missing`] when the
    /// fallback default is needed but was never declared.
    pub fn cast(&self, value: &SettingValue) -> Result<SettingValue> {
        let Some(value_type) = &self.value_type else {
            return Ok(value.clone());
        };

        match value_type.coerce(value) {
            Ok(cast) => Ok(cast),
            Err(reason) if self.default_on_cast_error => {
                tracing::debug!(
                    setting = %self.name,
                    %reason,
                    "coercion failed, using default"
                );
                self.default_or_missing()
            }
            Err(_) => Err(SettingsError::Cast {
                value: value.repr(),
                setting: self.name.clone(),
                expected: value_type.name().to_string(),
            }),
        }
    }

    pub(crate) fn cast_raw(&self, raw: &RawValue) -> Result<SettingValue> {
        match raw {
            RawValue::UseDefault => self.default_or_missing(),
            RawValue::Value(value) => self.cast(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_setting(default: impl Into<SettingValue>) -> Setting {
        Setting::new(default)
            .value_type(ValueType::Int)
            .with_name("int1")
    }

    #[test]
    fn test_no_type_passes_through() {
        let setting = Setting::new("foo").with_name("simple");
        let value = SettingValue::from(vec![1, 2]);
        assert_eq!(setting.cast(&value).unwrap(), value);
    }

    #[test]
    fn test_int_from_string() {
        let setting = int_setting(17);
        assert_eq!(
            setting.cast(&SettingValue::from("13")).unwrap(),
            SettingValue::Int(13)
        );
        assert_eq!(
            setting.cast(&SettingValue::from(" 13 ")).unwrap(),
            SettingValue::Int(13)
        );
    }

    #[test]
    fn test_int_truncates_floats() {
        let setting = int_setting(17);
        assert_eq!(
            setting.cast(&SettingValue::from(37.41)).unwrap(),
            SettingValue::Int(37)
        );
        assert_eq!(
            setting.cast(&SettingValue::from(-2.9)).unwrap(),
            SettingValue::Int(-2)
        );
    }

    #[test]
    fn test_int_rejects_floats_past_i64_range() {
        // 2^63 is the first float above i64::MAX.
        let edge = SettingValue::Float(9_223_372_036_854_775_808.0);
        let strict = int_setting(17).default_on_cast_error(false);
        assert!(strict.cast(&edge).unwrap_err().is_cast());

        let lenient = int_setting(17);
        assert_eq!(lenient.cast(&edge).unwrap(), SettingValue::Int(17));

        let lowest = SettingValue::Float(-9_223_372_036_854_775_808.0);
        assert_eq!(strict.cast(&lowest).unwrap(), SettingValue::Int(i64::MIN));
    }

    #[test]
    fn test_default_on_cast_error() {
        // The default itself is never coerced.
        let setting = int_setting(23.29);
        assert_eq!(
            setting.cast(&SettingValue::from("37.41")).unwrap(),
            SettingValue::Float(23.29)
        );
    }

    #[test]
    fn test_cast_error_without_fallback() {
        let setting = int_setting(17).default_on_cast_error(false);
        let err = setting.cast(&SettingValue::from("seventeen")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid value 'seventeen' for setting int1 (it should be of type int)"
        );
    }

    #[test]
    fn test_cast_error_falls_back_to_missing_default() {
        let setting = Setting::required()
            .value_type(ValueType::Int)
            .with_name("int1");
        let err = setting.cast(&SettingValue::from("x")).unwrap_err();
        assert!(err.is_missing());
    }

    #[test]
    fn test_use_default_marker() {
        let with_default = Setting::new("bar").with_name("simple");
        assert_eq!(
            with_default.cast_raw(&RawValue::UseDefault).unwrap(),
            SettingValue::from("bar")
        );

        let required = Setting::required().with_name("simple");
        assert_eq!(
            required.cast_raw(&RawValue::UseDefault).unwrap_err(),
            SettingsError::missing("simple")
        );
    }

    #[test]
    fn test_bool_spellings() {
        let setting = Setting::new(false)
            .value_type(ValueType::Bool)
            .default_on_cast_error(false)
            .with_name("flag");
        for (raw, expected) in [("yes", true), ("Off", false), ("1", true), ("false", false)] {
            assert_eq!(
                setting.cast(&SettingValue::from(raw)).unwrap(),
                SettingValue::Bool(expected)
            );
        }
        assert!(setting.cast(&SettingValue::from("maybe")).unwrap_err().is_cast());
    }

    #[test]
    fn test_string_renders_scalars() {
        let setting = Setting::new("").value_type(ValueType::String).with_name("s");
        assert_eq!(
            setting.cast(&SettingValue::from(17)).unwrap(),
            SettingValue::from("17")
        );
    }

    #[test]
    fn test_custom_type() {
        let setting = Setting::new(80)
            .value_type(ValueType::custom("port", |value| match value {
                SettingValue::Int(i) if (1..=65535).contains(i) => Ok(value.clone()),
                SettingValue::String(s) => s
                    .parse::<u16>()
                    .map(|p| SettingValue::Int(i64::from(p)))
                    .map_err(|e| e.to_string()),
                _ => Err("out of range".to_string()),
            }))
            .default_on_cast_error(false)
            .with_name("port");

        assert_eq!(
            setting.cast(&SettingValue::from("8080")).unwrap(),
            SettingValue::Int(8080)
        );
        let err = setting.cast(&SettingValue::from(70000)).unwrap_err();
        assert!(err.to_string().contains("of type port"));
    }

    #[test]
    fn test_clone_is_independent_declaration() {
        let original = Setting::new(vec!["a"]).with_name("list");
        let copy = original.clone();
        assert_eq!(copy.name(), original.name());
        assert_eq!(copy.default_value(), original.default_value());
    }
}
