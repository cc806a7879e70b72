//! Predicate chain recorder.
//!
//! A [`Trace`] is a placeholder that records every operation applied to it.
//! Each recorded step owns a fresh child trace, so chained calls build a
//! tree that [`Trace::render`] turns back into text.
//!
//! ```text
//! root ── kind ──▶ t1 ── == "ubuntu" ──▶ t2
//!
//! root.render() == " kind == \"ubuntu\""
//! t1.render()   == " == \"ubuntu\""
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

/// One recorded step: the operation name, its arguments and the trace
/// returned to the caller.
#[derive(Debug, Clone)]
struct Step {
    name: String,
    args: Vec<Value>,
    next: Trace,
}

/// Records an operation sequence for later rendering.
///
/// Cloning a trace yields another handle to the same recording.
///
/// # Example
///
/// ```
/// use rowsift::{Trace, Value};
///
/// let root = Trace::new();
/// root.record("name", vec![]).record(">=", vec![Value::Int(5)]);
/// assert_eq!(root.render(), " name >= 5");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Trace {
    chain: Rc<RefCell<Vec<Step>>>,
}

impl Trace {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Trace::default()
    }

    /// Records an operation and returns the child trace for chaining.
    pub fn record(&self, name: impl Into<String>, args: Vec<Value>) -> Trace {
        let next = Trace::new();
        self.chain.borrow_mut().push(Step {
            name: name.into(),
            args,
            next: next.clone(),
        });
        next
    }

    /// Returns `true` if nothing has been recorded on this trace.
    pub fn is_empty(&self) -> bool {
        self.chain.borrow().is_empty()
    }

    /// Renders the recorded tree depth-first.
    ///
    /// Each step renders as `name`, `name arg` or `name(arg1, arg2)`
    /// followed by its child's rendering. Steps are joined with a space and
    /// the whole rendering is prefixed by one; an empty trace renders as
    /// the empty string.
    pub fn render(&self) -> String {
        let chain = self.chain.borrow();
        if chain.is_empty() {
            return String::new();
        }

        let steps: Vec<String> = chain
            .iter()
            .map(|step| {
                let next = step.next.render();
                match step.args.as_slice() {
                    [] => format!("{}{}", step.name, next),
                    [arg] => format!("{} {}{}", step.name, arg, next),
                    args => {
                        let args: Vec<String> = args.iter().map(Value::to_string).collect();
                        format!("{}({}){}", step.name, args.join(", "), next)
                    }
                }
            })
            .collect();

        format!(" {}", steps.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chain_renders_nothing() {
        assert_eq!(Trace::new().render(), "");
    }

    #[test]
    fn field_then_comparison() {
        let root = Trace::new();
        let field = root.record("kind", vec![]);
        field.record("==", vec![Value::from("ubuntu")]);

        assert_eq!(root.render(), " kind == \"ubuntu\"");
        assert_eq!(field.render(), " == \"ubuntu\"");
    }

    #[test]
    fn numeric_argument() {
        let root = Trace::new();
        let field = root.record("name", vec![]);
        field.record(">=", vec![Value::Int(5)]);
        assert_eq!(field.render(), " >= 5");
    }

    #[test]
    fn multiple_arguments_use_call_syntax() {
        let root = Trace::new();
        root.record("between", vec![Value::Int(1), Value::Int(9)]);
        assert_eq!(root.render(), " between(1, 9)");
    }

    #[test]
    fn sibling_steps_are_joined() {
        let root = Trace::new();
        root.record("a", vec![]);
        root.record("b", vec![Value::Bool(true)]);
        assert_eq!(root.render(), " a b true");
    }

    #[test]
    fn clones_share_the_recording() {
        let root = Trace::new();
        let handle = root.clone();
        handle.record("size", vec![]);
        assert!(!root.is_empty());
    }
}
