//! Deferred-failure proxy.
//!
//! When a resource cannot produce its records, the accessor returns a
//! [`Deferred`] instead of an error. It accepts every query operation and
//! answers each with itself, so an arbitrarily long chain built against a
//! failed resource never raises. The failure is only reported when the
//! caller asks for it with [`is_skipped`](Deferred::is_skipped),
//! [`is_failed`](Deferred::is_failed) or
//! [`failure_message`](Deferred::failure_message).

use std::fmt;

use crate::accessor::{Outcome, View};
use crate::clause::Criteria;
use crate::error::Result;
use crate::op::Op;
use crate::probe::{PredicateRef, Probe};
use crate::value::Value;

/// Classification of a captured failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The resource cannot be evaluated in this environment.
    Skipped,
    /// Evaluation was attempted and errored.
    Failed,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Skipped => "skipped",
            FailureKind::Failed => "failed",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Placeholder standing in for a table or entry of a failed resource.
///
/// # Example
///
/// ```
/// use rowsift::{Criteria, Deferred, FailureKind};
///
/// let proxy = Deferred::new("package nginx", FailureKind::Skipped, "not on this platform");
/// let chained = proxy.filter(Criteria::new().field("x", 1)).entries().field("version");
///
/// assert!(chained.is_skipped());
/// assert!(!chained.is_failed());
/// assert_eq!(chained.failure_message(), "not on this platform");
/// assert_eq!(chained.to_string(), "package nginx");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred {
    resource: String,
    kind: FailureKind,
    message: String,
}

impl Deferred {
    /// Captures a failure of the resource displayed as `resource`.
    pub fn new(resource: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Deferred {
            resource: resource.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.kind == FailureKind::Skipped
    }

    pub fn is_failed(&self) -> bool {
        self.kind == FailureKind::Failed
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    /// The captured failure's message.
    pub fn failure_message(&self) -> &str {
        &self.message
    }

    // Absorbed operations. Each answers with the same proxy.

    pub fn filter(&self, _criteria: impl Into<Criteria>) -> Deferred {
        self.clone()
    }

    pub fn filter_with<F>(&self, _criteria: impl Into<Criteria>, _predicate: F) -> Deferred
    where
        F: Fn(Probe<'_>) -> Probe<'_>,
    {
        self.clone()
    }

    pub fn entries(&self) -> Deferred {
        self.clone()
    }

    pub fn field(&self, _name: &str) -> Deferred {
        self.clone()
    }

    pub fn get_field(&self, _name: &str) -> Deferred {
        self.clone()
    }

    pub fn compare(&self, _op: Op, _rhs: impl Into<Value>) -> Deferred {
        self.clone()
    }

    pub fn call(&self, _name: &str, _args: Vec<Value>) -> Deferred {
        self.clone()
    }
}

impl fmt::Display for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource)
    }
}

impl View for Deferred {
    fn invoke(
        &self,
        _name: &str,
        _argument: Option<Value>,
        _predicate: Option<PredicateRef<'_>>,
    ) -> Result<Outcome> {
        Ok(Outcome::Deferred(self.clone()))
    }

    fn is_skipped(&self) -> bool {
        Deferred::is_skipped(self)
    }

    fn is_failed(&self) -> bool {
        Deferred::is_failed(self)
    }

    fn failure_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}
