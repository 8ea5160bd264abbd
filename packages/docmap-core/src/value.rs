//! Attribute values and comparison bounds.

use std::collections::BTreeMap;
use std::fmt;

use crate::record::Record;

/// Live attribute mapping of a record, keyed by attribute name.
pub type Attributes = BTreeMap<String, Value>;

/// Value held by a record attribute.
///
/// Values own their whole tree, so `clone()` is a deep copy. Embedded
/// documents carry their own [`Record`] and therefore their own change set.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent or explicitly empty value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point number
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered collection
    Array(Vec<Value>),
    /// Free-form nested mapping
    Map(BTreeMap<String, Value>),
    /// Embedded child record
    Document(Box<Record>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Record> {
        match self {
            Value::Document(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_document_mut(&mut self) -> Option<&mut Record> {
        match self {
            Value::Document(record) => Some(record),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Document(_) => "document",
        }
    }

    /// Converts to a JSON value. Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Document(record) => record.to_json(false),
        }
    }

    /// Converts from a JSON value without schema information.
    ///
    /// Objects become [`Value::Map`]; embedded documents are only produced
    /// by schema-aware hydration (see `Schema::hydrate_value`).
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Short name of a JSON value's type, used in error messages.
pub(crate) fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Document(Box::new(record))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Optional `from`/`to` bound for change queries.
///
/// `Any` places no constraint on the compared value. It is a separate
/// type from [`Value`], so it can never be stored in an attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Expect {
    /// No constraint
    #[default]
    Any,
    /// Compared value must equal this one
    Is(Value),
}

impl Expect {
    /// Bound requiring equality with `value`.
    pub fn is(value: impl Into<Value>) -> Self {
        Expect::Is(value.into())
    }

    /// Returns `true` if `value` satisfies the bound.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Expect::Any => true,
            Expect::Is(expected) => expected == value,
        }
    }
}
