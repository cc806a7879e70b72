//! Runtime value types for records and criteria.
//!
//! The [`Value`] enum is the owned value held by a [`Record`] field and by
//! the expected side of a criterion. Records are shared between tables
//! through [`Row`] handles so that lazily resolved fields are written once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::Result;

/// Owned runtime value of a record field.
///
/// # Example
///
/// ```
/// use rowsift::{Record, Value};
///
/// let mut record = Record::new();
/// record.insert("name", "ubuntu");
/// record.insert("size", 3);
///
/// assert_eq!(record.get("name"), Some(&Value::from("ubuntu")));
/// assert_eq!(record.get("size").unwrap().to_string(), "3");
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// Explicit null. Distinct from a missing field.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// String value.
    String(String),
    /// Compiled regular expression.
    Regex(Pattern),
    /// Ordered list of values.
    List(Vec<Value>),
    /// Nested record.
    Record(Record),
}

impl Value {
    /// Returns `true` if this is a `Null` value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this is an `Int` or `Float` value.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the integer value, if present.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts a numeric value as `f64`, if present.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the list items, if present.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Extracts the nested record, if present.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Null and `false` are falsy; every other value is truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Null | Value::Bool(false))
    }

    /// Returns the plain text form used for pattern matching.
    ///
    /// Unlike [`Display`](fmt::Display), strings are not quoted and
    /// null renders as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Regex(p) => p.as_str().to_string(),
            other => other.to_string(),
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Regex(_) => "regex",
            Value::List(_) => "list",
            Value::Record(_) => "record",
        }
    }

    /// Equality without integer/float coercion: `2` and `2.0` differ.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) => false,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            (Value::Record(a), Value::Record(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.same_as(w)))
            }
            _ => self == other,
        }
    }

    /// Builds a regex value, failing on an invalid pattern.
    pub fn regex(pattern: &str) -> Result<Value> {
        Ok(Value::Regex(Pattern::new(pattern)?))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            // Mixed numeric types compare by value
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Regex(p) => write!(f, "/{}/", p.as_str()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Record(r) => write!(f, "{}", r),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Regex(p) => serializer.serialize_str(p.as_str()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Record(r) => r.serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Record(Record::from_json(map)),
        }
    }
}

// Conversions from common types to Value

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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<Pattern> for Value {
    fn from(p: Pattern) -> Self {
        Value::Regex(p)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A compiled regular expression that compares by its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    /// Compiles a new pattern.
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Pattern(Regex::new(pattern)?))
    }

    /// Returns the pattern source text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns `true` if the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl From<Regex> for Pattern {
    fn from(r: Regex) -> Self {
        Pattern(r)
    }
}

/// A mapping from field name to value, kept in insertion order.
///
/// Absent fields are distinct from fields present with [`Value::Null`].
/// Two records are equal when they hold the same fields, whatever their
/// order.
#[derive(Debug, Clone, Default)]
pub struct Record(Vec<(String, Value)>);

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Record::default()
    }

    /// Returns the value of a field, or `None` if the field is absent.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    /// Returns `true` if the field is present (even when null).
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|(k, _)| k == field)
    }

    /// Sets a field. A replaced field keeps its original position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == field) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((field, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_json(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl TryFrom<serde_json::Value> for Record {
    type Error = crate::error::SiftError;

    fn try_from(json: serde_json::Value) -> Result<Self> {
        match json {
            serde_json::Value::Object(map) => Ok(Record::from_json(map)),
            other => Err(crate::error::SiftError::InvalidRecord(other.to_string())),
        }
    }
}

/// Shared handle to a record.
///
/// Tables built over the same rows see each other's lazily populated
/// fields.
pub type Row = Rc<RefCell<Record>>;

/// Wraps records into rows.
pub fn rows<I>(records: I) -> Vec<Row>
where
    I: IntoIterator<Item = Record>,
{
    records
        .into_iter()
        .map(|r| Rc::new(RefCell::new(r)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn literal_display() {
        assert_eq!(Value::from("ubuntu").to_string(), "\"ubuntu\"");
        assert_eq!(Value::Int(5).to_string(), "5");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::regex("^ubu").unwrap().to_string(), "/^ubu/");
        assert_eq!(Value::Null.to_string(), "null");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn plain_text() {
        assert_eq!(Value::from("ubuntu").to_text(), "ubuntu");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Int(42).to_text(), "42");
    }

    #[test]
    fn mixed_numeric_equality() {
        assert_eq!(Value::Int(2), Value::Float(2.0));
        assert_ne!(Value::Int(2), Value::Float(2.5));
        assert_ne!(Value::Int(2), Value::from("2"));
    }

    #[test]
    fn strict_equality_keeps_numeric_types_apart() {
        assert!(Value::Int(2).same_as(&Value::Int(2)));
        assert!(!Value::Int(2).same_as(&Value::Float(2.0)));
        assert!(!Value::from(vec![2]).same_as(&Value::from(vec![2.0])));
        assert!(Value::from("a").same_as(&Value::from("a")));
    }

    #[test]
    fn patterns_compare_by_source() {
        assert_eq!(Value::regex("a+").unwrap(), Value::regex("a+").unwrap());
        assert_ne!(Value::regex("a+").unwrap(), Value::regex("a*").unwrap());
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::from("").is_truthy());
    }

    #[test]
    fn from_json() {
        let record = Record::try_from(json!({"name": "a", "size": 1, "ratio": 0.5, "tags": ["x"], "gone": null}))
            .unwrap();
        assert_eq!(record.get("name"), Some(&Value::from("a")));
        assert_eq!(record.get("size"), Some(&Value::Int(1)));
        assert_eq!(record.get("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(record.get("tags"), Some(&Value::from(vec!["x"])));
        assert_eq!(record.get("gone"), Some(&Value::Null));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn record_keeps_insertion_order() {
        let mut record = Record::new().with("size", 2).with("name", "b");
        record.insert("size", 3);
        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["size", "name"]);
        assert_eq!(record.to_string(), "{size: 3, name: \"b\"}");
        assert_eq!(record, Record::new().with("name", "b").with("size", 3));
    }

    #[test]
    fn non_object_is_not_a_record() {
        assert!(Record::try_from(json!([1, 2])).is_err());
    }

    #[test]
    fn serializes_as_json() {
        let record = Record::new().with("name", "a").with("re", Value::regex("^a").unwrap());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, json!({"name": "a", "re": "^a"}));
    }
}
