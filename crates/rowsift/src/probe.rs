//! The capability surface predicate expressions are written against.
//!
//! A predicate expression is a closure `Fn(Probe) -> Probe`. The table runs
//! it twice over two different probes:
//!
//! - once per entry with a live probe, keeping the entries whose result is
//!   truthy;
//! - once with a [`Trace`] probe, whose recording is rendered into the
//!   table's filter description.
//!
//! Both passes see exactly the same operations, so the description is a
//! transcript of the expression that did the filtering.

use crate::error::{Result, SiftError};
use crate::op::Op;
use crate::table::Entry;
use crate::trace::Trace;
use crate::value::Value;

/// Reference to a predicate expression.
pub type PredicateRef<'f> = &'f dyn Fn(Probe<'_>) -> Probe<'_>;

/// A value under test, a recorder, or the fault that stopped evaluation.
///
/// # Example
///
/// ```
/// use rowsift::{Probe, Record, Trace};
///
/// let trace = Trace::new();
/// Probe::Trace(trace.clone()).field("size").gte(5);
/// assert_eq!(trace.render(), " size >= 5");
///
/// let live = Probe::Value(Record::new().with("size", 7).into());
/// assert!(live.field("size").gte(5).truthy().unwrap());
/// ```
#[derive(Debug, Clone)]
pub enum Probe<'a> {
    /// A live entry; field access resolves lazy fields.
    Entry(&'a Entry<'a>),
    /// A live value.
    Value(Value),
    /// A recorder.
    Trace(Trace),
    /// Evaluation failed; every further operation keeps the fault.
    Fault(String),
}

impl<'a> Probe<'a> {
    /// Accesses a field by name.
    ///
    /// Missing fields read as [`Value::Null`]. On an entry, a name that is
    /// neither in the schema nor a key of the record is a fault.
    pub fn field(&self, name: &str) -> Probe<'a> {
        match self {
            Probe::Entry(entry) if !entry.knows(name) => {
                Probe::fault(SiftError::UnknownField(name.to_string()))
            }
            Probe::Entry(entry) => Probe::Value(entry.get(name).unwrap_or(Value::Null)),
            Probe::Value(Value::Record(record)) => {
                Probe::Value(record.get(name).cloned().unwrap_or(Value::Null))
            }
            Probe::Value(other) => Probe::fault(SiftError::unsupported(
                format!("field '{}'", name),
                other.type_name(),
            )),
            Probe::Trace(trace) => Probe::Trace(trace.record(name, Vec::new())),
            Probe::Fault(_) => self.clone(),
        }
    }

    /// Applies a comparison operator.
    pub fn compare(&self, op: Op, rhs: impl Into<Value>) -> Probe<'a> {
        let rhs = rhs.into();
        match self {
            Probe::Value(lhs) => match op.apply(lhs, &rhs) {
                Ok(b) => Probe::Value(Value::Bool(b)),
                Err(err) => Probe::fault(err),
            },
            Probe::Entry(_) => Probe::fault(SiftError::unsupported(op.as_str(), "entry")),
            Probe::Trace(trace) => Probe::Trace(trace.record(op.as_str(), vec![rhs])),
            Probe::Fault(_) => self.clone(),
        }
    }

    pub fn eq(&self, rhs: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::Eq, rhs)
    }

    pub fn ne(&self, rhs: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::Ne, rhs)
    }

    pub fn gt(&self, rhs: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::Gt, rhs)
    }

    pub fn gte(&self, rhs: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::Gte, rhs)
    }

    pub fn lt(&self, rhs: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::Lt, rhs)
    }

    pub fn lte(&self, rhs: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::Lte, rhs)
    }

    /// Pattern match (`=~`). Accepts a regex value or a pattern string.
    pub fn matches(&self, pattern: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::Matches, pattern)
    }

    /// Negated pattern match (`!~`).
    pub fn not_matches(&self, pattern: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::NotMatches, pattern)
    }

    /// Typed criterion match (`===`), the rule `where` criteria use.
    pub fn satisfies(&self, expected: impl Into<Value>) -> Probe<'a> {
        self.compare(Op::Satisfies, expected)
    }

    /// Calls a named method.
    ///
    /// Live values support `contains`, `starts_with`, `ends_with`, `len` and
    /// `is_empty`; anything else is a fault.
    pub fn call(&self, method: &str, args: Vec<Value>) -> Probe<'a> {
        match self {
            Probe::Value(value) => match call_method(value, method, &args) {
                Ok(v) => Probe::Value(v),
                Err(err) => Probe::fault(err),
            },
            Probe::Entry(_) => Probe::fault(SiftError::unsupported(method, "entry")),
            Probe::Trace(trace) => Probe::Trace(trace.record(method, args)),
            Probe::Fault(_) => self.clone(),
        }
    }

    /// Returns the live value, if this probe holds one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Probe::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Truthiness of the final result of an expression.
    ///
    /// An entry and a recorder are truthy; a fault is an error.
    pub fn truthy(&self) -> Result<bool> {
        match self {
            Probe::Value(v) => Ok(v.is_truthy()),
            Probe::Entry(_) | Probe::Trace(_) => Ok(true),
            Probe::Fault(msg) => Err(SiftError::Predicate(msg.clone())),
        }
    }

    fn fault(err: SiftError) -> Probe<'a> {
        Probe::Fault(err.to_string())
    }
}

fn call_method(value: &Value, method: &str, args: &[Value]) -> Result<Value> {
    let unsupported = || SiftError::unsupported(method, value.type_name());

    match (method, args) {
        ("len", []) => match value {
            Value::String(s) => Ok(Value::from(s.chars().count())),
            Value::List(items) => Ok(Value::from(items.len())),
            Value::Record(r) => Ok(Value::from(r.len())),
            _ => Err(unsupported()),
        },
        ("is_empty", []) => match value {
            Value::String(s) => Ok(Value::Bool(s.is_empty())),
            Value::List(items) => Ok(Value::Bool(items.is_empty())),
            Value::Record(r) => Ok(Value::Bool(r.is_empty())),
            _ => Err(unsupported()),
        },
        ("contains", [needle]) => match value {
            Value::String(s) => Ok(Value::Bool(s.contains(&needle.to_text()))),
            Value::List(items) => Ok(Value::Bool(items.contains(needle))),
            Value::Record(r) => Ok(Value::Bool(r.contains(&needle.to_text()))),
            _ => Err(unsupported()),
        },
        ("starts_with", [prefix]) => match value {
            Value::String(s) => Ok(Value::Bool(s.starts_with(&prefix.to_text()))),
            _ => Err(unsupported()),
        },
        ("ends_with", [suffix]) => match value {
            Value::String(s) => Ok(Value::Bool(s.ends_with(&suffix.to_text()))),
            _ => Err(unsupported()),
        },
        _ => Err(unsupported()),
    }
}
