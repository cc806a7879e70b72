//! Generated accessors and their results.
//!
//! [`Accessors`] binds a [`Schema`] to a [`Resource`] type. Every
//! registered field and passthrough name becomes an accessor reachable
//! through [`Accessors::invoke`]. Invoking one fetches the resource's
//! current records, builds a fresh [`RecordTable`] over them and dispatches
//! into it. A skipped or failed fetch yields a [`Deferred`] instead.
//!
//! ```text
//! invoke(resource, "sizes")
//!   └─ resource.raw_records()
//!        ├─ Ok(rows)            → RecordTable::new(..).invoke("sizes")
//!        ├─ Err(Skipped|Failed) → Outcome::Deferred
//!        └─ Err(Other)          → Err(SiftError::Resource)
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::debug;

use crate::clause::Criteria;
use crate::deferred::{Deferred, FailureKind};
use crate::error::{FetchError, Result, SiftError};
use crate::probe::{PredicateRef, Probe};
use crate::schema::Schema;
use crate::table::{Entry, RecordTable};
use crate::traits::Resource;
use crate::value::{Record, Value};

/// The query surface shared by record tables and deferred failures.
pub trait View: fmt::Display {
    /// Runs a named accessor or table method.
    fn invoke(
        &self,
        name: &str,
        argument: Option<Value>,
        predicate: Option<PredicateRef<'_>>,
    ) -> Result<Outcome>;

    fn is_skipped(&self) -> bool;

    fn is_failed(&self) -> bool;

    /// The captured failure's message, if this view stands in for one.
    fn failure_message(&self) -> Option<&str>;
}

/// The result of running an accessor.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A filtered table, ready for further chaining.
    Table(RecordTable),
    /// A field projection.
    Values(Vec<Value>),
    /// Records returned by `entries` or `raw_data`.
    Records(Vec<Record>),
    /// Result of `count`.
    Count(usize),
    /// Result of `exists`.
    Flag(bool),
    /// The resource failed; every further operation is absorbed.
    Deferred(Deferred),
}

impl Outcome {
    /// Chains another accessor onto a table or deferred failure.
    pub fn invoke(
        &self,
        name: &str,
        argument: Option<Value>,
        predicate: Option<PredicateRef<'_>>,
    ) -> Result<Outcome> {
        match self.as_view() {
            Some(view) => view.invoke(name, argument, predicate),
            None => Err(SiftError::unsupported(name, self.kind())),
        }
    }

    /// Shorthand for [`invoke`](Self::invoke) without argument or predicate.
    pub fn call(&self, name: &str) -> Result<Outcome> {
        self.invoke(name, None, None)
    }

    /// Filters a table by criteria.
    pub fn filter(&self, criteria: impl Into<Criteria>) -> Result<Outcome> {
        match self {
            Outcome::Table(table) => Ok(Outcome::Table(table.filter(criteria))),
            Outcome::Deferred(deferred) => Ok(Outcome::Deferred(deferred.filter(criteria))),
            other => Err(SiftError::unsupported("where", other.kind())),
        }
    }

    /// Filters a table by criteria and a predicate expression.
    pub fn filter_with<F>(&self, criteria: impl Into<Criteria>, predicate: F) -> Result<Outcome>
    where
        F: Fn(Probe<'_>) -> Probe<'_>,
    {
        match self {
            Outcome::Table(table) => Ok(Outcome::Table(table.filter_with(criteria, predicate)?)),
            Outcome::Deferred(deferred) => Ok(Outcome::Deferred(deferred.clone())),
            other => Err(SiftError::unsupported("where", other.kind())),
        }
    }

    /// Entries of a table, or the deferred failure.
    pub fn entries(&self) -> Result<Entries<'_>> {
        match self {
            Outcome::Table(table) => Ok(Entries::Rows(table.entries())),
            Outcome::Deferred(deferred) => Ok(Entries::Deferred(deferred.clone())),
            other => Err(SiftError::unsupported("entries", other.kind())),
        }
    }

    /// The shared query surface, for tables and deferred failures.
    pub fn as_view(&self) -> Option<&dyn View> {
        match self {
            Outcome::Table(table) => Some(table),
            Outcome::Deferred(deferred) => Some(deferred),
            _ => None,
        }
    }

    pub fn table(&self) -> Option<&RecordTable> {
        match self {
            Outcome::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn into_table(self) -> Option<RecordTable> {
        match self {
            Outcome::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn values(&self) -> Option<&[Value]> {
        match self {
            Outcome::Values(values) => Some(values),
            _ => None,
        }
    }

    pub fn records(&self) -> Option<&[Record]> {
        match self {
            Outcome::Records(records) => Some(records),
            _ => None,
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            Outcome::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn flag(&self) -> Option<bool> {
        match self {
            Outcome::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn deferred(&self) -> Option<&Deferred> {
        match self {
            Outcome::Deferred(deferred) => Some(deferred),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.deferred().is_some_and(Deferred::is_skipped)
    }

    pub fn is_failed(&self) -> bool {
        self.deferred().is_some_and(Deferred::is_failed)
    }

    pub fn failure_message(&self) -> Option<&str> {
        self.deferred().map(Deferred::failure_message)
    }

    fn kind(&self) -> &'static str {
        match self {
            Outcome::Table(_) => "table",
            Outcome::Values(_) => "values",
            Outcome::Records(_) => "records",
            Outcome::Count(_) => "count",
            Outcome::Flag(_) => "flag",
            Outcome::Deferred(_) => "deferred",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Table(table) => write!(f, "{}", table),
            Outcome::Values(values) => write!(f, "{}", Value::List(values.clone())),
            Outcome::Records(records) => {
                let records = records.iter().cloned().map(Value::Record).collect();
                write!(f, "{}", Value::List(records))
            }
            Outcome::Count(n) => write!(f, "{}", n),
            Outcome::Flag(b) => write!(f, "{}", b),
            Outcome::Deferred(deferred) => write!(f, "{}", deferred),
        }
    }
}

/// Entries of a table, or the failure standing in for them.
#[derive(Debug, Clone)]
pub enum Entries<'t> {
    Rows(Vec<Entry<'t>>),
    Deferred(Deferred),
}

impl<'t> Entries<'t> {
    /// The entries; empty for a deferred failure.
    pub fn rows(&self) -> &[Entry<'t>] {
        match self {
            Entries::Rows(rows) => rows,
            Entries::Deferred(_) => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Entries::Deferred(d) if d.is_skipped())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Entries::Deferred(d) if d.is_failed())
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Entries::Deferred(d) => Some(d.failure_message()),
            Entries::Rows(_) => None,
        }
    }
}

/// Accessors generated from a schema for resources of type `R`.
///
/// # Example
///
/// ```
/// use std::fmt;
/// use rowsift::{rows, Accessors, Criteria, FetchError, FieldOptions, Record, Resource, Row,
///     SchemaBuilder, Value};
///
/// struct Files(Vec<Row>);
///
/// impl fmt::Display for Files {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "Files")
///     }
/// }
///
/// impl Resource for Files {
///     fn raw_records(&self) -> Result<Vec<Row>, FetchError> {
///         Ok(self.0.clone())
///     }
/// }
///
/// let accessors: Accessors<Files> = SchemaBuilder::new()
///     .register_field("paths", FieldOptions::new().field("path"))
///     .register_field("modes", FieldOptions::new().field("mode"))
///     .register_passthrough("where")
///     .build_accessors()
///     .unwrap();
///
/// let files = Files(rows(vec![
///     Record::new().with("path", "/etc/hosts").with("mode", 644),
///     Record::new().with("path", "/etc/shadow").with("mode", 600),
/// ]));
///
/// let modes = accessors.call(&files, "modes").unwrap();
/// assert_eq!(modes.values(), Some(&[Value::Int(644), Value::Int(600)][..]));
///
/// let private = accessors
///     .invoke(&files, "modes", Some(Value::Int(600)), None)
///     .unwrap()
///     .call("paths")
///     .unwrap();
/// assert_eq!(private.values(), Some(&[Value::from("/etc/shadow")][..]));
/// ```
pub struct Accessors<R> {
    schema: Rc<Schema>,
    resource: PhantomData<fn(&R)>,
}

impl<R> Clone for Accessors<R> {
    fn clone(&self) -> Self {
        Accessors {
            schema: self.schema.clone(),
            resource: PhantomData,
        }
    }
}

impl<R> fmt::Debug for Accessors<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessors")
            .field("schema", &self.schema)
            .finish()
    }
}

impl<R: Resource> Accessors<R> {
    pub fn new(schema: Schema) -> Self {
        Accessors {
            schema: Rc::new(schema),
            resource: PhantomData,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Names of every generated accessor, fields first.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.schema
            .fields()
            .iter()
            .map(|f| f.name())
            .chain(self.schema.passthrough().iter().map(String::as_str))
    }

    /// Returns `true` if `name` is a generated accessor.
    pub fn has_method(&self, name: &str) -> bool {
        self.schema.field(name).is_some() || self.schema.is_passthrough(name)
    }

    /// Builds a fresh table over the resource's current records.
    ///
    /// A skipped or failed fetch becomes [`Outcome::Deferred`]; any other
    /// fetch error is returned as [`SiftError::Resource`].
    pub fn root(&self, resource: &R) -> Result<Outcome> {
        let label = resource.to_string();
        let (kind, message) = match resource.raw_records() {
            Ok(rows) => {
                debug!(resource = %label, rows = rows.len(), "built record table");
                let table = RecordTable::new(self.schema.clone(), rows, label);
                return Ok(Outcome::Table(table));
            }
            Err(FetchError::Skipped(message)) => (FailureKind::Skipped, message),
            Err(FetchError::Failed(message)) => (FailureKind::Failed, message),
            Err(FetchError::Other(err)) => return Err(SiftError::Resource(err)),
        };

        debug!(resource = %label, %kind, %message, "deferring resource failure");
        Ok(Outcome::Deferred(Deferred::new(label, kind, message)))
    }

    /// Runs the accessor `name` against a fresh table of the resource.
    ///
    /// Field accessors project without `argument` and `predicate`, and
    /// filter otherwise. Passthrough accessors forward to the table method
    /// of the same name.
    pub fn invoke(
        &self,
        resource: &R,
        name: &str,
        argument: Option<Value>,
        predicate: Option<PredicateRef<'_>>,
    ) -> Result<Outcome> {
        if !self.has_method(name) {
            return Err(SiftError::UnknownAccessor(name.to_string()));
        }
        match self.root(resource)? {
            Outcome::Table(table) => table.invoke(name, argument, predicate),
            deferred => Ok(deferred),
        }
    }

    /// Shorthand for [`invoke`](Self::invoke) without argument or predicate.
    pub fn call(&self, resource: &R, name: &str) -> Result<Outcome> {
        self.invoke(resource, name, None, None)
    }
}

impl crate::schema::SchemaBuilder {
    /// Builds the schema and binds it to resources of type `R`.
    pub fn build_accessors<R: Resource>(self) -> Result<Accessors<R>> {
        Ok(Accessors::new(self.build()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldOptions, SchemaBuilder};
    use crate::value::{rows, Row};
    use std::cell::Cell;

    struct Inventory {
        rows: Vec<Row>,
        fail: Option<fn() -> FetchError>,
        fetches: Cell<usize>,
    }

    impl Inventory {
        fn new(records: Vec<Record>) -> Self {
            Inventory {
                rows: rows(records),
                fail: None,
                fetches: Cell::new(0),
            }
        }

        fn failing(fail: fn() -> FetchError) -> Self {
            Inventory {
                rows: Vec::new(),
                fail: Some(fail),
                fetches: Cell::new(0),
            }
        }
    }

    impl fmt::Display for Inventory {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Inventory")
        }
    }

    impl Resource for Inventory {
        fn raw_records(&self) -> std::result::Result<Vec<Row>, FetchError> {
            self.fetches.set(self.fetches.get() + 1);
            match self.fail {
                Some(fail) => Err(fail()),
                None => Ok(self.rows.clone()),
            }
        }
    }

    fn accessors() -> Accessors<Inventory> {
        SchemaBuilder::new()
            .register_field("names", FieldOptions::new().field("name"))
            .register_field("sizes", FieldOptions::new().field("size"))
            .register_passthrough("where")
            .register_passthrough("count")
            .build_accessors()
            .unwrap()
    }

    fn inventory() -> Inventory {
        Inventory::new(vec![
            Record::new().with("name", "a").with("size", 1),
            Record::new().with("name", "b").with("size", 2),
        ])
    }

    #[test]
    fn projection_without_arguments() {
        let sizes = accessors().call(&inventory(), "sizes").unwrap();
        assert_eq!(sizes.values(), Some(&[Value::Int(1), Value::Int(2)][..]));
    }

    #[test]
    fn filter_then_project() {
        let criteria = Value::Record(Record::new().with("size", 2));
        let names = accessors()
            .invoke(&inventory(), "where", Some(criteria), None)
            .unwrap()
            .call("names")
            .unwrap();
        assert_eq!(names.values(), Some(&[Value::from("b")][..]));
    }

    #[test]
    fn field_accessor_with_predicate_filters() {
        let predicate: PredicateRef<'_> = &|x| x.field("name").ne("a");
        let outcome = accessors()
            .invoke(&inventory(), "sizes", None, Some(predicate))
            .unwrap();
        let table = outcome.table().unwrap();
        assert_eq!(table.get_field("size"), vec![Value::Int(2)]);
        assert_eq!(table.to_string(), "Inventory with name != \"a\"");
    }

    #[test]
    fn each_access_fetches_fresh_records() {
        let accessors = accessors();
        let resource = inventory();
        accessors.call(&resource, "names").unwrap();
        accessors.call(&resource, "count").unwrap();
        assert_eq!(resource.fetches.get(), 2);
    }

    #[test]
    fn unknown_accessor_fails_before_fetching() {
        let resource = inventory();
        let err = accessors().call(&resource, "entries").unwrap_err();
        assert!(matches!(err, SiftError::UnknownAccessor(_)));
        assert_eq!(resource.fetches.get(), 0);
    }

    #[test]
    fn skipped_fetch_is_deferred() {
        let resource = Inventory::failing(|| FetchError::skipped("not supported here"));
        let outcome = accessors().call(&resource, "names").unwrap();
        assert!(outcome.is_skipped());
        assert!(!outcome.is_failed());
        assert_eq!(outcome.failure_message(), Some("not supported here"));
        assert_eq!(outcome.to_string(), "Inventory");
    }

    #[test]
    fn deferred_absorbs_chaining() {
        let resource = Inventory::failing(|| FetchError::skipped("offline"));
        let root = accessors().root(&resource).unwrap();
        let entries = root
            .filter(Criteria::new().field("x", 1))
            .unwrap()
            .entries()
            .unwrap()
            .is_skipped();
        assert!(entries);

        let chained = root
            .invoke("where", Some(Value::Null), None)
            .unwrap()
            .call("names")
            .unwrap()
            .call("anything at all")
            .unwrap();
        assert!(chained.is_skipped());
        assert!(!chained.is_failed());
    }

    #[test]
    fn failed_fetch_is_deferred() {
        let resource = Inventory::failing(|| FetchError::failed("permission denied"));
        let outcome = accessors().call(&resource, "sizes").unwrap();
        assert!(outcome.is_failed());
        assert!(!outcome.is_skipped());
    }

    #[test]
    fn other_fetch_errors_propagate() {
        let resource = Inventory::failing(|| FetchError::other("disk on fire"));
        let err = accessors().call(&resource, "sizes").unwrap_err();
        assert!(matches!(err, SiftError::Resource(_)));
        assert_eq!(err.to_string(), "resource failed: disk on fire");
    }

    #[test]
    fn chaining_on_terminal_results_is_an_error() {
        let sizes = accessors().call(&inventory(), "sizes").unwrap();
        assert!(matches!(
            sizes.call("names"),
            Err(SiftError::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn methods_are_listed() {
        let accessors = accessors();
        let methods: Vec<&str> = accessors.methods().collect();
        assert_eq!(methods, vec!["names", "sizes", "where", "count"]);
    }

    #[test]
    fn custom_handler_replaces_generated_body() {
        let accessors: Accessors<Inventory> = SchemaBuilder::new()
            .register_field(
                "largest",
                FieldOptions::new().field("size").handler(|table, _| {
                    let max = table
                        .get_field("size")
                        .into_iter()
                        .filter_map(|v| v.as_int())
                        .max();
                    Ok(Outcome::Values(vec![Value::from(max)]))
                }),
            )
            .build_accessors()
            .unwrap();
        let largest = accessors.call(&inventory(), "largest").unwrap();
        assert_eq!(largest.values(), Some(&[Value::Int(2)][..]));
    }
}
