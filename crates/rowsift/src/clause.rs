//! Criteria for `where` filtering and the typed matching rule.
//!
//! [`Criteria`] is an ordered list of `(field, expected)` pairs. Each pair
//! keeps a record when [`matches_expected`] accepts the record's value.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::value::Value;

static DECIMAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?(\d+\.?\d*|\.\d+)$").expect("valid decimal pattern"));

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?\d+$").expect("valid integer pattern"));

/// Tests a record value against an expected value.
///
/// `actual` is `None` when the record does not have the field at all, which
/// never matches. Otherwise the rule depends on the type of `expected`:
///
/// | Expected | Matches when |
/// |----------|--------------|
/// | `Float`  | value is a float, or a decimal string, numerically equal |
/// | `Int`    | value is an integer, or an integer string, numerically equal |
/// | `Regex`  | value is the same pattern, or its text matches the pattern |
/// | `List`   | value equals the list or one of its items |
/// | other    | value equals `expected` |
///
/// # Example
///
/// ```
/// use rowsift::{matches_expected, Value};
///
/// assert!(matches_expected(Some(&Value::from("3.0")), &Value::Float(3.0)));
/// assert!(!matches_expected(Some(&Value::Float(5.5)), &Value::Int(5)));
/// assert!(!matches_expected(None, &Value::Null));
/// ```
pub fn matches_expected(actual: Option<&Value>, expected: &Value) -> bool {
    let Some(actual) = actual else {
        return false;
    };

    match expected {
        Value::Float(want) => match actual {
            Value::Float(got) => got == want,
            Value::String(s) if DECIMAL.is_match(s) => s.parse::<f64>().is_ok_and(|got| got == *want),
            _ => false,
        },
        Value::Int(want) => match actual {
            Value::Int(got) => got == want,
            Value::String(s) if INTEGER.is_match(s) => s.parse::<i64>().is_ok_and(|got| got == *want),
            _ => false,
        },
        Value::Regex(pattern) => match actual {
            Value::Regex(got) => got == pattern,
            other => pattern.is_match(&other.to_text()),
        },
        Value::List(accepted) => actual == expected || accepted.iter().any(|v| v == actual),
        other => actual == other,
    }
}

/// An ordered set of `(field, expected)` pairs.
///
/// Converting from a [`Value`] that is not a record yields empty criteria,
/// which makes `where` a no-op.
///
/// # Example
///
/// ```
/// use rowsift::Criteria;
///
/// let criteria = Criteria::new().field("kind", "ubuntu").field("size", 2);
/// assert_eq!(criteria.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pairs: Vec<(String, Value)>,
}

impl Criteria {
    /// Creates empty criteria.
    pub fn new() -> Self {
        Criteria::default()
    }

    /// Adds a `(field, expected)` pair.
    pub fn field(mut self, field: impl Into<String>, expected: impl Into<Value>) -> Self {
        self.pairs.push((field.into(), expected.into()));
        self
    }

    /// Iterates over pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(f, v)| (f.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl From<Value> for Criteria {
    fn from(value: Value) -> Self {
        match value {
            Value::Record(record) => Criteria {
                pairs: record
                    .iter()
                    .map(|(f, v)| (f.to_string(), v.clone()))
                    .collect(),
            },
            _ => Criteria::default(),
        }
    }
}

impl From<Option<Criteria>> for Criteria {
    fn from(criteria: Option<Criteria>) -> Self {
        criteria.unwrap_or_default()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Criteria {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;

    fn check(actual: impl Into<Value>, expected: impl Into<Value>) -> bool {
        matches_expected(Some(&actual.into()), &expected.into())
    }

    #[test]
    fn float_matching() {
        assert!(check(3.0, 3.0));
        assert!(check("3.0", 3.0));
        assert!(check("+3", 3.0));
        assert!(check(".5", 0.5));
        assert!(!check("3.0a", 3.0));
        assert!(!check(3, 3.0)); // integer is not a float
        assert!(!check(Value::Null, 3.0));
    }

    #[test]
    fn integer_matching() {
        assert!(check(5, 5));
        assert!(check("5", 5));
        assert!(check("-5", -5));
        assert!(!check(5.5, 5));
        assert!(!check("5.0", 5));
        assert!(!check("99999999999999999999", 5));
    }

    #[test]
    fn regex_matching() {
        let re = Value::regex("^ubu").unwrap();
        assert!(check("ubuntu", re.clone()));
        assert!(!check("kubuntu", re.clone()));
        assert!(check(re.clone(), re.clone()));
        assert!(!check(Value::regex("^deb").unwrap(), re.clone()));
        // non-strings are matched through their text
        assert!(check(123, Value::regex(r"^\d+$").unwrap()));
        // null stringifies to the empty string
        assert!(check(Value::Null, Value::regex("^$").unwrap()));
    }

    #[test]
    fn list_membership() {
        let accepted = Value::from(vec!["ubuntu", "debian"]);
        assert!(check("ubuntu", accepted.clone()));
        assert!(check("debian", accepted.clone()));
        assert!(!check("centos", accepted.clone()));
        assert!(check(vec!["ubuntu", "debian"], accepted));
    }

    #[test]
    fn equality_fallback() {
        assert!(check("ubuntu", "ubuntu"));
        assert!(!check("Ubuntu", "ubuntu"));
        assert!(check(true, true));
        assert!(check(Value::Null, Value::Null));
        assert!(!check("5", "5.0"));
    }

    #[test]
    fn missing_field_never_matches() {
        assert!(!matches_expected(None, &Value::Null));
        assert!(!matches_expected(None, &Value::regex(".*").unwrap()));
        assert!(!matches_expected(None, &Value::from(vec![Value::Null])));
    }

    #[test]
    fn criteria_from_values() {
        let record = Record::new().with("size", 2);
        assert_eq!(Criteria::from(Value::Record(record)).len(), 1);
        assert!(Criteria::from(Value::Null).is_empty());
        assert!(Criteria::from(Value::from("size")).is_empty());
        assert!(Criteria::from(None::<Criteria>).is_empty());
    }

    #[test]
    fn criteria_keep_insertion_order() {
        let criteria = Criteria::new().field("b", 1).field("a", 2);
        let fields: Vec<&str> = criteria.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["b", "a"]);
    }
}
