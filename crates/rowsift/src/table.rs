//! Record tables and entries.
//!
//! A [`RecordTable`] is a chainable view over a set of rows plus a running
//! description of the filters applied since the table was built. Filtering
//! never mutates a table; it returns a new one. Lazy fields are written
//! through the shared rows, so every table over the same rows sees them.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::accessor::{Outcome, View};
use crate::clause::{matches_expected, Criteria};
use crate::error::{Result, SiftError};
use crate::probe::{PredicateRef, Probe};
use crate::schema::{Criterion, FieldDescriptor, Schema, Style};
use crate::trace::Trace;
use crate::value::{Record, Row, Value};

/// An ordered set of rows with the description of how it was filtered.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use rowsift::{rows, Criteria, FieldOptions, Record, RecordTable, SchemaBuilder, Value};
///
/// let schema = SchemaBuilder::new()
///     .register_field("names", FieldOptions::new().field("name"))
///     .register_field("sizes", FieldOptions::new().field("size"))
///     .build()
///     .unwrap();
///
/// let table = RecordTable::new(
///     Rc::new(schema),
///     rows(vec![
///         Record::new().with("name", "a").with("size", 1),
///         Record::new().with("name", "b").with("size", 2),
///     ]),
///     "packages",
/// );
///
/// let big = table.filter(Criteria::new().field("size", 2));
/// assert_eq!(big.get_field("name"), vec![Value::from("b")]);
/// assert_eq!(big.to_string(), "packages with size == 2");
/// ```
#[derive(Debug, Clone)]
pub struct RecordTable {
    schema: Rc<Schema>,
    rows: Vec<Row>,
    label: String,
    filters: String,
    populated: RefCell<HashSet<String>>,
}

impl RecordTable {
    /// Creates a table over `rows`, labelled with the resource's display text.
    pub fn new(schema: Rc<Schema>, rows: Vec<Row>, label: impl Into<String>) -> Self {
        RecordTable {
            schema,
            rows,
            label: label.into(),
            filters: String::new(),
            populated: RefCell::new(HashSet::new()),
        }
    }

    /// Keeps the rows matching every `(field, expected)` pair.
    ///
    /// Empty criteria (including criteria built from a non-record value)
    /// return an identical table.
    pub fn filter(&self, criteria: impl Into<Criteria>) -> RecordTable {
        let criteria = criteria.into();
        if criteria.is_empty() {
            return self.clone();
        }
        let (rows, filters) = self.select(&criteria);
        self.derive(rows, filters)
    }

    /// Like [`filter`](Self::filter), then keeps the rows for which
    /// `predicate` is truthy and appends its rendering to the description.
    pub fn filter_with<F>(&self, criteria: impl Into<Criteria>, predicate: F) -> Result<RecordTable>
    where
        F: Fn(Probe<'_>) -> Probe<'_>,
    {
        self.apply(criteria.into(), Some(&predicate))
    }

    pub(crate) fn apply(&self, criteria: Criteria, predicate: Option<PredicateRef<'_>>) -> Result<RecordTable> {
        let Some(predicate) = predicate else {
            return Ok(self.filter(criteria));
        };

        let (rows, mut filters) = self.select(&criteria);

        let scope = RecordTable::new(self.schema.clone(), rows, self.label.clone());
        let mut kept = Vec::with_capacity(scope.rows.len());
        for entry in scope.entries() {
            if predicate(Probe::Entry(&entry)).truthy()? {
                kept.push(entry.row.clone());
            }
        }

        let recorder = Trace::new();
        predicate(Probe::Trace(recorder.clone()));
        filters.push_str(&recorder.render());

        Ok(self.derive(kept, filters))
    }

    /// Rows matching every criterion, with the description extended by
    /// one fragment per criterion.
    fn select(&self, criteria: &Criteria) -> (Vec<Row>, String) {
        let mut rows = self.rows.clone();
        let mut filters = self.filters.clone();

        for (field, expected) in criteria.iter() {
            self.populate_lazy_field(field, &Criterion::Expected(expected.clone()));
            rows.retain(|row| matches_expected(row.borrow().get(field), expected));
            filters.push_str(&format!(" {} == {}", field, expected));
        }
        (rows, filters)
    }

    fn derive(&self, rows: Vec<Row>, filters: String) -> RecordTable {
        debug!(
            table = %self.label,
            before = self.rows.len(),
            after = rows.len(),
            "filtered record table"
        );

        RecordTable {
            schema: self.schema.clone(),
            rows,
            label: self.label.clone(),
            filters,
            populated: RefCell::new(HashSet::new()),
        }
    }

    /// One entry per row, in table order.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        self.rows
            .iter()
            .map(|row| Entry {
                row: row.clone(),
                table: self,
            })
            .collect()
    }

    /// Projects a record key from every row. Missing keys read as null.
    pub fn get_field(&self, name: &str) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.borrow().get(name).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Computes a lazy field for every row that lacks it.
    ///
    /// A no-op for keys without a resolver and for keys already populated
    /// on this table. `criterion` is forwarded to the resolver unchanged.
    pub fn populate_lazy_field(&self, name: &str, criterion: &Criterion) {
        if self.populated.borrow().contains(name) {
            return;
        }
        let Some(resolver) = self.schema.resolver(name).cloned() else {
            return;
        };

        let mut resolved = 0usize;
        for row in &self.rows {
            if row.borrow().contains(name) {
                continue;
            }
            let snapshot = row.borrow().clone();
            let value = resolver(&snapshot, criterion, self);
            row.borrow_mut().insert(name, value);
            resolved += 1;
        }

        trace!(table = %self.label, field = name, resolved, "populated lazy field");
        self.populated.borrow_mut().insert(name.to_string());
    }

    /// Returns `true` if the lazy key has been populated on this table.
    pub fn is_populated(&self, name: &str) -> bool {
        self.populated.borrow().contains(name)
    }

    /// Runs the accessor `name` against this table.
    ///
    /// A field accessor projects when called without an argument or
    /// predicate, and filters otherwise. The built-in table methods
    /// `where`, `entries`, `raw_data`, `count` and `exists` are always
    /// available.
    pub fn invoke(
        &self,
        name: &str,
        argument: Option<Value>,
        predicate: Option<PredicateRef<'_>>,
    ) -> Result<Outcome> {
        if let Some(field) = self.schema.field(name) {
            if let Some(handler) = field.handler() {
                return handler(self, argument.as_ref());
            }
            return match (argument, predicate) {
                (None, None) => Ok(Outcome::Values(self.project(field))),
                (argument, predicate) => {
                    let criteria = match argument {
                        Some(expected) => Criteria::new().field(field.source(), expected),
                        None => Criteria::new(),
                    };
                    Ok(Outcome::Table(self.apply(criteria, predicate)?))
                }
            };
        }

        match name {
            "where" => match argument {
                None => Ok(Outcome::Table(self.apply(Criteria::new(), predicate)?)),
                Some(Value::Record(record)) => {
                    Ok(Outcome::Table(self.apply(Criteria::from(Value::Record(record)), predicate)?))
                }
                // Criteria that are not a mapping leave the table untouched.
                Some(_) => Ok(Outcome::Table(self.clone())),
            },
            "entries" => Ok(Outcome::Records(
                self.entries().iter().map(Entry::to_record).collect(),
            )),
            "raw_data" => Ok(Outcome::Records(self.raw_data())),
            "count" => Ok(Outcome::Count(self.len())),
            "exists" => Ok(Outcome::Flag(!self.is_empty())),
            _ => Err(SiftError::UnknownAccessor(name.to_string())),
        }
    }

    /// Shorthand for [`invoke`](Self::invoke) without argument or predicate.
    pub fn call(&self, name: &str) -> Result<Outcome> {
        self.invoke(name, None, None)
    }

    fn project(&self, field: &FieldDescriptor) -> Vec<Value> {
        let table = self.filter(Criteria::new());
        table.populate_lazy_field(field.source(), &Criterion::ShowAll);
        let values = table.get_field(field.source());
        match field.style() {
            Style::Default => values,
            Style::Simple => simplify(values),
        }
    }

    /// Copies of the rows, without resolving lazy fields.
    pub fn raw_data(&self) -> Vec<Record> {
        self.rows.iter().map(|row| row.borrow().clone()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The resource display text this table was seeded with.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The accumulated filter description, one fragment per filter.
    pub fn description(&self) -> &str {
        &self.filters
    }
}

impl fmt::Display for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.filters.is_empty() {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{} with{}", self.label, self.filters)
        }
    }
}

impl View for RecordTable {
    fn invoke(
        &self,
        name: &str,
        argument: Option<Value>,
        predicate: Option<PredicateRef<'_>>,
    ) -> Result<Outcome> {
        RecordTable::invoke(self, name, argument, predicate)
    }

    fn is_skipped(&self) -> bool {
        false
    }

    fn is_failed(&self) -> bool {
        false
    }

    fn failure_message(&self) -> Option<&str> {
        None
    }
}

/// Flattens nested lists, drops nulls and duplicates (keeping the first).
/// `2` and `2.0` are distinct.
fn simplify(values: Vec<Value>) -> Vec<Value> {
    fn flatten(value: Value, out: &mut Vec<Value>) {
        match value {
            Value::List(items) => items.into_iter().for_each(|v| flatten(v, out)),
            other => out.push(other),
        }
    }

    let mut flat = Vec::new();
    values.into_iter().for_each(|v| flatten(v, &mut flat));

    let mut unique: Vec<Value> = Vec::with_capacity(flat.len());
    for value in flat {
        if !value.is_null() && !unique.iter().any(|seen| seen.same_as(&value)) {
            unique.push(value);
        }
    }
    unique
}

/// A read-only view of one row through the schema.
///
/// Lazy fields the owning table has not populated yet are resolved on
/// first read.
#[derive(Debug, Clone)]
pub struct Entry<'t> {
    row: Row,
    table: &'t RecordTable,
}

impl<'t> Entry<'t> {
    /// Reads a field by accessor name or record key.
    ///
    /// Returns `None` when the record does not have the field.
    pub fn get(&self, name: &str) -> Option<Value> {
        let source = self
            .table
            .schema
            .resolve(name)
            .map_or(name, FieldDescriptor::source);

        if !self.row.borrow().contains(source) {
            self.table.populate_lazy_field(source, &Criterion::ShowAll);
        }
        self.row.borrow().get(source).cloned()
    }

    /// Returns `true` if `name` is a schema field, a schema record key, or a
    /// key of this record.
    pub fn knows(&self, name: &str) -> bool {
        self.table.schema.resolve(name).is_some() || self.row.borrow().contains(name)
    }

    /// Materializes every schema field present on the record, resolving
    /// lazy ones.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new();
        for field in self.table.schema.fields() {
            if let Some(value) = self.get(field.source()) {
                record.insert(field.source(), value);
            }
        }
        record
    }

    /// The owning table's description at the time the entry was built.
    pub fn description(&self) -> String {
        self.table.to_string()
    }
}

impl fmt::Display for Entry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entry", self.table)
    }
}
