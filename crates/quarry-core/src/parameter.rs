//! User parameter declarations and value coercion.
//!
//! Entries declare the parameters a caller may supply when opening them.
//! Each declaration carries a type name, an optional default and optional
//! constraints. Defaults given as strings are templates (see
//! [`TemplateOptions`]) and are coerced to the declared type after expansion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::template::TemplateOptions;

/// Declared type of a user parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    /// Boolean flag.
    Bool,
    /// Timestamp, carried as an RFC 3339 string.
    Datetime,
    /// Floating point number.
    Float,
    /// Signed integer.
    Int,
    /// List of arbitrary values.
    List,
    /// Text.
    Str,
    /// Text (legacy alias of `str`).
    Unicode,
    /// Multi-select list whose items must be in `allowed`.
    Mlist,
    /// Mapping of string keys to values.
    Dict,
}

impl ParameterType {
    /// Name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Datetime => "datetime",
            Self::Float => "float",
            Self::Int => "int",
            Self::List => "list",
            Self::Str => "str",
            Self::Unicode => "unicode",
            Self::Mlist => "mlist",
            Self::Dict => "dict",
        }
    }

    /// Value used when a parameter has no default at all.
    #[must_use]
    pub fn zero(self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::Datetime => Value::String(format_datetime(DateTime::<Utc>::UNIX_EPOCH)),
            Self::Float => Value::from(0.0),
            Self::Int => Value::from(0),
            Self::List | Self::Mlist => Value::Array(Vec::new()),
            Self::Str | Self::Unicode => Value::String(String::new()),
            Self::Dict => Value::Object(Map::new()),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(Value::String(s.to_string())).map_err(|_| CoreError::UnknownType {
            name: s.to_string(),
        })
    }
}

/// Converts `value` to the representation of `ty`.
///
/// `null` becomes the type's zero value.
///
/// # Errors
///
/// Returns [`CoreError::Coercion`] if the value has no sensible reading as `ty`.
///
/// # Examples
///
/// ```
/// use quarry_core::{coerce, ParameterType};
/// use serde_json::json;
///
/// assert_eq!(coerce(ParameterType::Int, json!("42")).unwrap(), json!(42));
/// assert_eq!(coerce(ParameterType::Bool, json!("false")).unwrap(), json!(false));
/// ```
pub fn coerce(ty: ParameterType, value: Value) -> Result<Value> {
    if value.is_null() {
        return Ok(ty.zero());
    }

    match ty {
        ParameterType::Bool => coerce_bool(value),
        ParameterType::Int => coerce_int(value),
        ParameterType::Float => coerce_float(value),
        ParameterType::Str | ParameterType::Unicode => Ok(match value {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }),
        ParameterType::List | ParameterType::Mlist => match value {
            Value::Array(_) => Ok(value),
            Value::String(ref s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Array(_)) => Ok(parsed),
                _ => Err(CoreError::coercion(ty.as_str(), &value, "not a JSON array")),
            },
            _ => Err(CoreError::coercion(ty.as_str(), &value, "not a list")),
        },
        ParameterType::Dict => match value {
            Value::Object(_) => Ok(value),
            Value::String(ref s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => Ok(parsed),
                _ => Err(CoreError::coercion(ty.as_str(), &value, "not a JSON object")),
            },
            _ => Err(CoreError::coercion(ty.as_str(), &value, "not a mapping")),
        },
        ParameterType::Datetime => coerce_datetime(value),
    }
}

fn coerce_bool(value: Value) -> Result<Value> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::Number(ref n) => Ok(Value::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
        Value::String(ref s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "off" | "0" | "" => Ok(Value::Bool(false)),
            _ => Err(CoreError::coercion("bool", &value, "not a boolean literal")),
        },
        _ => Err(CoreError::coercion("bool", &value, "not a scalar")),
    }
}

fn coerce_int(value: Value) -> Result<Value> {
    match value {
        Value::Number(ref n) if n.is_i64() || n.is_u64() => Ok(value),
        Value::Number(ref n) => {
            let f = n.as_f64().unwrap_or_default();
            #[allow(clippy::cast_possible_truncation)]
            Ok(Value::from(f.trunc() as i64))
        }
        Value::Bool(b) => Ok(Value::from(i64::from(b))),
        Value::String(ref s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| CoreError::coercion("int", &value, e.to_string())),
        _ => Err(CoreError::coercion("int", &value, "not a scalar")),
    }
}

fn coerce_float(value: Value) -> Result<Value> {
    match value {
        Value::Number(ref n) => Ok(Value::from(n.as_f64().unwrap_or_default())),
        Value::Bool(b) => Ok(Value::from(f64::from(u8::from(b)))),
        Value::String(ref s) => s
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .map_err(|e| CoreError::coercion("float", &value, e.to_string())),
        _ => Err(CoreError::coercion("float", &value, "not a scalar")),
    }
}

fn coerce_datetime(value: Value) -> Result<Value> {
    let parsed = match value {
        Value::String(ref s) if s.trim().is_empty() => Some(DateTime::<Utc>::UNIX_EPOCH),
        Value::String(ref s) => parse_datetime(s.trim()),
        // Integers are nanoseconds since the epoch.
        Value::Number(ref n) => n.as_i64().and_then(|nanos| {
            let secs = nanos.div_euclid(1_000_000_000);
            let sub = u32::try_from(nanos.rem_euclid(1_000_000_000)).ok()?;
            DateTime::<Utc>::from_timestamp(secs, sub)
        }),
        _ => None,
    };

    parsed
        .map(|dt| Value::String(format_datetime(dt)))
        .ok_or_else(|| CoreError::coercion("datetime", &value, "unrecognised timestamp"))
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Deserializes a field, treating an explicit `null` like a missing one.
///
/// Use together with `#[serde(default)]`.
///
/// # Errors
///
/// Returns the deserializer's error if the value has the wrong shape.
pub fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A parameter an entry accepts when it is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserParameter {
    /// Parameter name.
    pub name: String,

    /// Human readable description.
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Declared type.
    #[serde(rename = "type")]
    pub ty: ParameterType,

    /// Default value; strings are templates.
    #[serde(default)]
    pub default: Value,

    /// Permitted values, if restricted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,

    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Value>,

    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Value>,
}

impl UserParameter {
    /// Creates a parameter with no default and no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ParameterType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            ty,
            default: Value::Null,
            allowed: None,
            min: None,
            max: None,
        }
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }

    /// Restricts the parameter to the given values.
    #[must_use]
    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Sets inclusive numeric bounds.
    #[must_use]
    pub fn with_range(mut self, min: Option<Value>, max: Option<Value>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Resolves the value used when the caller does not supply one.
    ///
    /// Literal defaults are returned as they are. String defaults are
    /// expanded with `options` and then coerced to the declared type.
    ///
    /// # Errors
    ///
    /// Returns an error if the expanded string cannot be coerced.
    pub fn resolve_default(&self, options: &TemplateOptions) -> Result<Value> {
        match &self.default {
            Value::String(template) => coerce(self.ty, Value::String(options.expand(template))),
            other => Ok(other.clone()),
        }
    }

    /// Coerces `value` and checks it against `allowed`, `min` and `max`.
    ///
    /// # Errors
    ///
    /// Returns an error on failed coercion or a violated constraint.
    pub fn validate(&self, value: Value) -> Result<Value> {
        let value = coerce(self.ty, value)?;

        if let Some(allowed) = &self.allowed {
            let members: Vec<&Value> = match (&value, self.ty) {
                (Value::Array(items), ParameterType::Mlist) => items.iter().collect(),
                _ => vec![&value],
            };
            if let Some(bad) = members.into_iter().find(|v| !allowed.contains(v)) {
                return Err(self.constraint(format!("{bad} is not an allowed value")));
            }
        }

        if let Some(min) = &self.min {
            if compare(&value, min).is_some_and(std::cmp::Ordering::is_lt) {
                return Err(self.constraint(format!("{value} is below the minimum {min}")));
            }
        }
        if let Some(max) = &self.max {
            if compare(&value, max).is_some_and(std::cmp::Ordering::is_gt) {
                return Err(self.constraint(format!("{value} is above the maximum {max}")));
            }
        }

        Ok(value)
    }

    fn constraint(&self, message: String) -> CoreError {
        CoreError::Constraint {
            parameter: self.name.clone(),
            message,
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_type_names() {
        assert_eq!("int".parse::<ParameterType>().unwrap(), ParameterType::Int);
        assert_eq!("unicode".parse::<ParameterType>().unwrap(), ParameterType::Unicode);
        assert!(matches!(
            "tensor".parse::<ParameterType>(),
            Err(CoreError::UnknownType { name }) if name == "tensor"
        ));
    }

    #[test]
    fn test_coerce_null_gives_zero() {
        assert_eq!(coerce(ParameterType::Int, Value::Null).unwrap(), json!(0));
        assert_eq!(coerce(ParameterType::Str, Value::Null).unwrap(), json!(""));
        assert_eq!(coerce(ParameterType::List, Value::Null).unwrap(), json!([]));
        assert_eq!(
            coerce(ParameterType::Datetime, Value::Null).unwrap(),
            json!("1970-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_coerce_strings() {
        assert_eq!(coerce(ParameterType::Float, json!(" 1.5 ")).unwrap(), json!(1.5));
        assert_eq!(coerce(ParameterType::Bool, json!("Yes")).unwrap(), json!(true));
        assert_eq!(coerce(ParameterType::List, json!("[1, 2]")).unwrap(), json!([1, 2]));
        assert_eq!(
            coerce(ParameterType::Dict, json!("{\"a\": 1}")).unwrap(),
            json!({"a": 1})
        );
        assert!(coerce(ParameterType::Int, json!("1.5")).is_err());
        assert!(coerce(ParameterType::Bool, json!("maybe")).is_err());
    }

    #[test]
    fn test_coerce_numbers() {
        assert_eq!(coerce(ParameterType::Int, json!(3.9)).unwrap(), json!(3));
        assert_eq!(coerce(ParameterType::Str, json!(7)).unwrap(), json!("7"));
        assert_eq!(coerce(ParameterType::Bool, json!(0)).unwrap(), json!(false));
    }

    #[test]
    fn test_coerce_datetime_forms() {
        assert_eq!(
            coerce(ParameterType::Datetime, json!("2024-03-01")).unwrap(),
            json!("2024-03-01T00:00:00Z")
        );
        assert_eq!(
            coerce(ParameterType::Datetime, json!("2024-03-01 12:30:00")).unwrap(),
            json!("2024-03-01T12:30:00Z")
        );
        assert_eq!(
            coerce(ParameterType::Datetime, json!(1_000_000_000)).unwrap(),
            json!("1970-01-01T00:00:01Z")
        );
        assert!(coerce(ParameterType::Datetime, json!("yesterday")).is_err());
    }

    #[test]
    fn test_deserialize_wire_parameter() {
        let param: UserParameter = serde_json::from_value(json!({
            "name": "year",
            "description": "Year to load",
            "type": "int",
            "default": 2020,
            "min": 2000,
            "max": 2030,
            "cls": "ignored"
        }))
        .unwrap();
        assert_eq!(param.name, "year");
        assert_eq!(param.ty, ParameterType::Int);
        assert_eq!(param.default, json!(2020));
        assert!(param.allowed.is_none());
    }

    #[test]
    fn test_null_description_reads_as_empty() {
        let param: UserParameter = serde_json::from_value(json!({
            "name": "year",
            "description": null,
            "type": "int"
        }))
        .unwrap();
        assert_eq!(param.description, "");
    }

    #[test]
    fn test_resolve_literal_default_untouched() {
        let param = UserParameter::new("n", ParameterType::Int).with_default(5);
        let opts = TemplateOptions::client(true, true);
        assert_eq!(param.resolve_default(&opts).unwrap(), json!(5));
    }

    #[test]
    fn test_resolve_string_default_coerced() {
        let param = UserParameter::new("n", ParameterType::Int).with_default("12");
        let opts = TemplateOptions::client(false, false);
        assert_eq!(param.resolve_default(&opts).unwrap(), json!(12));
    }

    #[test]
    fn test_resolve_disabled_template_kept_literally() {
        let param =
            UserParameter::new("root", ParameterType::Str).with_default("client_env(HOME)");
        let opts = TemplateOptions::client(false, false);
        assert_eq!(param.resolve_default(&opts).unwrap(), json!("client_env(HOME)"));
    }

    #[test]
    fn test_validate_allowed() {
        let param = UserParameter::new("color", ParameterType::Str)
            .with_allowed(vec![json!("red"), json!("blue")]);
        assert!(param.validate(json!("red")).is_ok());
        assert!(matches!(
            param.validate(json!("green")),
            Err(CoreError::Constraint { parameter, .. }) if parameter == "color"
        ));
    }

    #[test]
    fn test_validate_mlist_members() {
        let param = UserParameter::new("cols", ParameterType::Mlist)
            .with_allowed(vec![json!("a"), json!("b")]);
        assert!(param.validate(json!(["a", "b"])).is_ok());
        assert!(param.validate(json!(["a", "z"])).is_err());
    }

    #[test]
    fn test_validate_range() {
        let param = UserParameter::new("n", ParameterType::Int)
            .with_range(Some(json!(1)), Some(json!(10)));
        assert_eq!(param.validate(json!("7")).unwrap(), json!(7));
        assert!(param.validate(json!(0)).is_err());
        assert!(param.validate(json!(11)).is_err());
    }
}
