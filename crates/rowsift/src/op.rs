//! Comparison operators usable inside predicate expressions.
//!
//! The [`Op`] enum names every operator a [`Probe`](crate::Probe) can
//! record or evaluate. Its textual form is what appears in rendered filter
//! descriptions.

use std::cmp::Ordering;

use crate::clause::matches_expected;
use crate::error::{Result, SiftError};
use crate::value::{Pattern, Value};

/// Comparison operator applied to a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Structural equality (integers and floats compare by value).
    Eq,
    /// Structural inequality.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Pattern matches the value's text.
    Matches,
    /// Pattern does not match the value's text.
    NotMatches,
    /// Typed criterion match, the same rule `where` criteria use.
    Satisfies,
}

impl Op {
    /// Returns `true` for the four ordering operators.
    pub fn is_ordering(self) -> bool {
        matches!(self, Op::Gt | Op::Gte | Op::Lt | Op::Lte)
    }

    /// Evaluates a comparison given an ordering result.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            Op::Eq => ordering == Ordering::Equal,
            Op::Ne => ordering != Ordering::Equal,
            Op::Gt => ordering == Ordering::Greater,
            Op::Gte => ordering != Ordering::Less,
            Op::Lt => ordering == Ordering::Less,
            Op::Lte => ordering != Ordering::Greater,
            _ => false,
        }
    }

    /// Applies the operator with `lhs` taken from the record.
    ///
    /// Ordering operators on values that cannot be ordered yield `false`.
    /// Pattern operators accept a regex or a string holding a pattern.
    pub fn apply(self, lhs: &Value, rhs: &Value) -> Result<bool> {
        match self {
            Op::Eq => Ok(lhs == rhs),
            Op::Ne => Ok(lhs != rhs),
            Op::Gt | Op::Gte | Op::Lt | Op::Lte => {
                Ok(compare(lhs, rhs).is_some_and(|ord| self.eval_ordering(ord)))
            }
            Op::Matches => Ok(pattern_of(self, rhs)?.is_match(&lhs.to_text())),
            Op::NotMatches => Ok(!pattern_of(self, rhs)?.is_match(&lhs.to_text())),
            Op::Satisfies => Ok(matches_expected(Some(lhs), rhs)),
        }
    }

    /// Returns the operator token.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Matches => "=~",
            Op::NotMatches => "!~",
            Op::Satisfies => "===",
        }
    }
}

impl std::fmt::Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Orders numbers numerically and strings lexically.
pub fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => lhs.as_f64()?.partial_cmp(&rhs.as_f64()?),
    }
}

fn pattern_of(op: Op, rhs: &Value) -> Result<Pattern> {
    match rhs {
        Value::Regex(p) => Ok(p.clone()),
        Value::String(s) => Pattern::new(s),
        other => Err(SiftError::unsupported(op.as_str(), other.type_name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_eval_ordering() {
        assert!(Op::Eq.eval_ordering(Ordering::Equal));
        assert!(!Op::Eq.eval_ordering(Ordering::Less));

        assert!(Op::Ne.eval_ordering(Ordering::Less));
        assert!(!Op::Ne.eval_ordering(Ordering::Equal));

        assert!(Op::Gt.eval_ordering(Ordering::Greater));
        assert!(!Op::Gt.eval_ordering(Ordering::Equal));

        assert!(Op::Gte.eval_ordering(Ordering::Equal));
        assert!(!Op::Gte.eval_ordering(Ordering::Less));

        assert!(Op::Lt.eval_ordering(Ordering::Less));
        assert!(!Op::Lt.eval_ordering(Ordering::Greater));

        assert!(Op::Lte.eval_ordering(Ordering::Equal));
        assert!(!Op::Lte.eval_ordering(Ordering::Greater));
    }

    #[test]
    fn numeric_ordering_across_types() {
        assert!(Op::Gte.apply(&Value::Int(5), &Value::Int(5)).unwrap());
        assert!(Op::Gt.apply(&Value::Float(5.5), &Value::Int(5)).unwrap());
        assert!(Op::Lt.apply(&Value::Int(1), &Value::Float(1.5)).unwrap());
    }

    #[test]
    fn unorderable_values_never_compare() {
        assert!(!Op::Gt.apply(&Value::from("b"), &Value::Int(1)).unwrap());
        assert!(!Op::Lt.apply(&Value::Null, &Value::Int(1)).unwrap());
        assert!(!Op::Gt.apply(&Value::Float(f64::NAN), &Value::Int(1)).unwrap());
    }

    #[test]
    fn string_ordering() {
        assert!(Op::Lt.apply(&Value::from("apple"), &Value::from("banana")).unwrap());
    }

    #[test]
    fn pattern_operators() {
        let re = Value::regex("^ubu").unwrap();
        assert!(Op::Matches.apply(&Value::from("ubuntu"), &re).unwrap());
        assert!(Op::NotMatches.apply(&Value::from("debian"), &re).unwrap());
        assert!(Op::Matches.apply(&Value::from("debian"), &Value::from("bi")).unwrap());
    }

    #[test]
    fn pattern_operator_rejects_non_patterns() {
        assert!(Op::Matches.apply(&Value::from("x"), &Value::Int(1)).is_err());
        assert!(Op::Matches.apply(&Value::from("x"), &Value::from("(")).is_err());
    }

    #[test]
    fn op_display() {
        assert_eq!(Op::Eq.to_string(), "==");
        assert_eq!(Op::Gte.to_string(), ">=");
        assert_eq!(Op::NotMatches.to_string(), "!~");
    }
}
