//! Resolved values and materialized instances.

use std::net::IpAddr;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::AccessError;

/// Compiled regular expression compared by its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles `source`.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self)
    }

    /// Source text of the expression.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The underlying regex.
    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// A typed value produced by the Type Resolver.
///
/// # Examples
///
/// ```
/// use argschema_core::Value;
///
/// let v = Value::from(vec![1_i64, 2, 3]);
/// assert_eq!(v, Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
/// assert_eq!(v.to_json(), serde_json::json!([1, 2, 3]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value (unset optional, unselected subcommand).
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Uuid(Uuid),
    Path(PathBuf),
    Ip(IpAddr),
    Pattern(Pattern),
    /// Name of the matched enum member.
    Enum(String),
    List(Vec<Value>),
    /// Distinct elements in first-occurrence order.
    Set(Vec<Value>),
    Tuple(Vec<Value>),
    /// Entries in insertion order; a repeated key replaces the earlier value.
    Map(Vec<(Value, Value)>),
    /// A materialized subcommand.
    Instance(Box<Instance>),
}

impl Value {
    /// Returns `true` for [`Value::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Short name of the variant, used in access errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Uuid(_) => "uuid",
            Value::Path(_) => "path",
            Value::Ip(_) => "ip",
            Value::Pattern(_) => "pattern",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Instance(_) => "instance",
        }
    }

    /// Converts to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn key_string(&self) -> String {
        match self {
            Value::Str(s) | Value::Enum(s) => s.clone(),
            other => match other.to_json() {
                serde_json::Value::String(s) => s,
                json => json.to_string(),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Str(s) | Value::Enum(s) => serializer.serialize_str(s),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::Time(t) => serializer.collect_str(&t.format("%H:%M:%S%.f")),
            Value::DateTime(dt) => serializer.collect_str(&dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::Uuid(u) => serializer.collect_str(u),
            Value::Path(p) => serializer.serialize_str(&p.to_string_lossy()),
            Value::Ip(ip) => serializer.collect_str(ip),
            Value::Pattern(p) => serializer.serialize_str(p.as_str()),
            Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(&key.key_string(), value)?;
                }
                map.end()
            }
            Value::Instance(instance) => instance.serialize(serializer),
        }
    }
}

/// Declaration files carry defaults as plain JSON/YAML data; strings are
/// resolved against the field's annotation at compile time.
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from(raw))
    }
}

impl From<serde_json::Value> for Value {
    fn from(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (Value::Str(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<PathBuf> for Value {
    fn from(value: PathBuf) -> Self {
        Value::Path(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

/// Conversion out of a resolved [`Value`], used by [`Instance::get_as`].
pub trait FromValue: Sized {
    /// Type name reported when the conversion does not apply.
    fn expected() -> &'static str;

    /// Converts `value`, or returns `None` when the variant does not match.
    fn from_value(value: &Value) -> Option<Self>;
}

macro_rules! from_value {
    ($ty:ty, $name:literal, $pat:pat => $out:expr) => {
        impl FromValue for $ty {
            fn expected() -> &'static str {
                $name
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    $pat => Some($out),
                    _ => None,
                }
            }
        }
    };
}

from_value!(bool, "bool", Value::Bool(b) => *b);
from_value!(i64, "int", Value::Int(i) => *i);
from_value!(String, "str", Value::Str(s) | Value::Enum(s) => s.clone());
from_value!(PathBuf, "path", Value::Path(p) => p.clone());
from_value!(NaiveDate, "date", Value::Date(d) => *d);
from_value!(NaiveTime, "time", Value::Time(t) => *t);
from_value!(NaiveDateTime, "datetime", Value::DateTime(dt) => *dt);
from_value!(Uuid, "uuid", Value::Uuid(u) => *u);
from_value!(IpAddr, "ip", Value::Ip(ip) => *ip);
from_value!(Pattern, "pattern", Value::Pattern(p) => p.clone());
from_value!(Instance, "instance", Value::Instance(i) => (**i).clone());

impl FromValue for f64 {
    fn expected() -> &'static str {
        "float"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn expected() -> &'static str {
        "list"
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::List(items) | Value::Set(items) | Value::Tuple(items) => {
                items.iter().map(T::from_value).collect()
            }
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn expected() -> &'static str {
        T::expected()
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::None => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Materialized result of one compiled schema.
///
/// Fields keep declaration order. Subcommand fields hold either a nested
/// [`Value::Instance`] or [`Value::None`]. An instance is never mutated after
/// materialization.
///
/// # Examples
///
/// ```
/// use argschema_core::*;
///
/// let mut registry = Registry::new();
/// registry
///     .register(Declaration::app("greet").field("name", TypeDescriptor::Str))
///     .unwrap();
/// let schema = registry.compile("greet").unwrap();
///
/// let raw = RawParseResult::new().with_token("name", "world");
/// let instance = materialize(&schema, &raw).unwrap();
/// assert_eq!(instance.get_as::<String>("name").unwrap(), "world");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    command: String,
    fields: Vec<(String, Value)>,
}

impl Instance {
    pub(crate) fn new(command: String, fields: Vec<(String, Value)>) -> Self {
        Self { command, fields }
    }

    /// Name of the declaration this instance was materialized from.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Looks up a field value by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Looks up a field and converts it to `T`.
    pub fn get_as<T: FromValue>(&self, field: &str) -> Result<T, AccessError> {
        let value = self
            .get(field)
            .ok_or_else(|| AccessError::UnknownField(field.to_string()))?;
        T::from_value(value).ok_or_else(|| AccessError::TypeMismatch {
            field: field.to_string(),
            expected: T::expected(),
            found: value.kind(),
        })
    }

    /// Iterates over fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Returns the nested instance of a selected subcommand field.
    pub fn subcommand(&self, field: &str) -> Option<&Instance> {
        match self.get(field) {
            Some(Value::Instance(instance)) => Some(instance),
            _ => None,
        }
    }

    /// Returns the selected subcommand at this level, if any.
    pub fn selected(&self) -> Option<(&str, &Instance)> {
        self.fields.iter().find_map(|(name, value)| match value {
            Value::Instance(instance) => Some((name.as_str(), instance.as_ref())),
            _ => None,
        })
    }

    /// Converts to a JSON object keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Decodes the instance into a user-defined type.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] raised when the instance's shape does
    /// not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(self)?)
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Instance {
        let nested = Instance::new("add".into(), vec![("numbers".into(), Value::from(vec![1.5]))]);
        Instance::new(
            "calc".into(),
            vec![
                ("verbose".into(), Value::Bool(true)),
                ("add".into(), Value::Instance(Box::new(nested))),
                ("remove".into(), Value::None),
            ],
        )
    }

    #[test]
    fn test_get_as_reports_type_mismatch() {
        let instance = sample();
        assert!(instance.get_as::<bool>("verbose").unwrap());
        assert_eq!(
            instance.get_as::<i64>("verbose"),
            Err(AccessError::TypeMismatch {
                field: "verbose".into(),
                expected: "int",
                found: "bool",
            })
        );
        assert_eq!(
            instance.get_as::<bool>("missing"),
            Err(AccessError::UnknownField("missing".into()))
        );
    }

    #[test]
    fn test_selected_subcommand() {
        let instance = sample();
        let (name, add) = instance.selected().unwrap();
        assert_eq!(name, "add");
        assert_eq!(add.get_as::<Vec<f64>>("numbers").unwrap(), vec![1.5]);
        assert!(instance.subcommand("remove").is_none());
        assert_eq!(instance.get_as::<Option<Instance>>("remove").unwrap(), None);
    }

    #[test]
    fn test_instance_serializes_as_object() {
        let json = sample().to_json();
        assert_eq!(
            json,
            serde_json::json!({
                "verbose": true,
                "add": { "numbers": [1.5] },
                "remove": null,
            })
        );
    }

    #[test]
    fn test_map_keys_serialize_as_strings() {
        let value = Value::Map(vec![(Value::Int(1), Value::Str("one".into()))]);
        assert_eq!(value.to_json(), serde_json::json!({ "1": "one" }));
    }

    #[test]
    fn test_deserialize_from_plain_data() {
        let value: Value = serde_json::from_str(r#"[1, "two", null, 2.5]"#).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Int(1),
                Value::Str("two".into()),
                Value::None,
                Value::Float(2.5),
            ])
        );
    }

    #[test]
    fn test_decode_into_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Add {
            numbers: Vec<f64>,
        }

        #[derive(Debug, Deserialize, PartialEq)]
        struct Calc {
            verbose: bool,
            add: Option<Add>,
            remove: Option<Add>,
        }

        let calc: Calc = sample().decode().unwrap();
        assert_eq!(
            calc,
            Calc {
                verbose: true,
                add: Some(Add { numbers: vec![1.5] }),
                remove: None,
            }
        );
    }
}
