//! Dynamic setting values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A raw or resolved setting value.
///
/// Sources hand these to the collector, and coercion turns one variant into
/// another according to the setting's [`ValueType`](crate::core::ValueType).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    /// Explicit "no value" (distinct from an undefined default)
    #[default]
    Null,
    /// Boolean
    Bool(bool), // Must be before Int to avoid bool -> int coercion
    /// Signed integer
    Int(i64),
    /// Floating point number
    Float(f64),
    /// Text
    String(String),
    /// Sequence of values
    List(Vec<SettingValue>),
    /// String-keyed table of values
    Map(BTreeMap<String, SettingValue>),
}

impl SettingValue {
    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Null => "null",
            SettingValue::Bool(_) => "bool",
            SettingValue::Int(_) => "int",
            SettingValue::Float(_) => "float",
            SettingValue::String(_) => "string",
            SettingValue::List(_) => "list",
            SettingValue::Map(_) => "map",
        }
    }

    /// Borrow the string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way it appears in reports, with strings quoted.
    pub fn repr(&self) -> String {
        match self {
            SettingValue::String(s) => format!("'{}'", s.replace('\'', "\\'")),
            SettingValue::List(items) => {
                let items: Vec<String> = items.iter().map(SettingValue::repr).collect();
                format!("[{}]", items.join(", "))
            }
            SettingValue::Map(map) => {
                let items: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.repr()))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Null => write!(f, "null"),
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Float(x) => write!(f, "{:?}", x),
            SettingValue::String(s) => write!(f, "{}", s),
            SettingValue::List(_) | SettingValue::Map(_) => write!(f, "{}", self.repr()),
        }
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        SettingValue::Bool(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        SettingValue::Int(value)
    }
}

impl From<i32> for SettingValue {
    fn from(value: i32) -> Self {
        SettingValue::Int(i64::from(value))
    }
}

impl From<u32> for SettingValue {
    fn from(value: u32) -> Self {
        SettingValue::Int(i64::from(value))
    }
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Float(value)
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        SettingValue::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        SettingValue::String(value)
    }
}

impl<T: Into<SettingValue>> From<Vec<T>> for SettingValue {
    fn from(values: Vec<T>) -> Self {
        SettingValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SettingValue>> From<BTreeMap<String, T>> for SettingValue {
    fn from(values: BTreeMap<String, T>) -> Self {
        SettingValue::Map(values.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<SettingValue>> From<Option<T>> for SettingValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SettingValue::Null, Into::into)
    }
}

impl TryFrom<SettingValue> for i64 {
    type Error = SettingValue;

    fn try_from(value: SettingValue) -> std::result::Result<Self, Self::Error> {
        match value {
            SettingValue::Int(i) => Ok(i),
            other => Err(other),
        }
    }
}

impl TryFrom<SettingValue> for f64 {
    type Error = SettingValue;

    fn try_from(value: SettingValue) -> std::result::Result<Self, Self::Error> {
        match value {
            SettingValue::Float(x) => Ok(x),
            SettingValue::Int(i) => Ok(i as f64),
            other => Err(other),
        }
    }
}

impl TryFrom<SettingValue> for bool {
    type Error = SettingValue;

    fn try_from(value: SettingValue) -> std::result::Result<Self, Self::Error> {
        match value {
            SettingValue::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl TryFrom<SettingValue> for String {
    type Error = SettingValue;

    fn try_from(value: SettingValue) -> std::result::Result<Self, Self::Error> {
        match value {
            SettingValue::String(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl TryFrom<SettingValue> for Vec<SettingValue> {
    type Error = SettingValue;

    fn try_from(value: SettingValue) -> std::result::Result<Self, Self::Error> {
        match value {
            SettingValue::List(items) => Ok(items),
            other => Err(other),
        }
    }
}

impl TryFrom<SettingValue> for BTreeMap<String, SettingValue> {
    type Error = SettingValue;

    fn try_from(value: SettingValue) -> std::result::Result<Self, Self::Error> {
        match value {
            SettingValue::Map(map) => Ok(map),
            other => Err(other),
        }
    }
}

/// A value handed to a value slot: either a concrete value or the marker
/// meaning "fall back to the declared default".
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawValue {
    Value(SettingValue),
    UseDefault,
}
