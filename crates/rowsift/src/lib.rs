//! Rowsift - Filterable, chainable views over small in-memory record sets.
//!
//! A host object (a [`Resource`]) produces a sequence of records. Rowsift
//! lets you declare a [`Schema`] of named fields over those records, some
//! of them computed on demand, and then query them:
//!
//! - Typed `where` criteria: numbers, numeric strings, regexes, sets
//! - Predicate expressions, rendered back into the filter description
//! - Field projection, with an optional flattening "simple" style
//! - Lazy fields resolved at most once per row
//! - Deferred failures that absorb whole query chains
//!
//! # Quick Start
//!
//! ```rust
//! use std::fmt;
//! use rowsift::{rows, Accessors, Criteria, FetchError, FieldOptions, Record, Resource, Row,
//!     SchemaBuilder, Value};
//!
//! struct Packages {
//!     rows: Vec<Row>,
//! }
//!
//! impl fmt::Display for Packages {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "Packages")
//!     }
//! }
//!
//! impl Resource for Packages {
//!     fn raw_records(&self) -> Result<Vec<Row>, FetchError> {
//!         Ok(self.rows.clone())
//!     }
//! }
//!
//! let accessors: Accessors<Packages> = SchemaBuilder::new()
//!     .register_field("names", FieldOptions::new().field("name"))
//!     .register_field("versions", FieldOptions::new().field("version"))
//!     .build_accessors()
//!     .unwrap();
//!
//! let packages = Packages {
//!     rows: rows(vec![
//!         Record::new().with("name", "openssl").with("version", "3.0"),
//!         Record::new().with("name", "zlib").with("version", "1.3"),
//!     ]),
//! };
//!
//! // Project a field
//! let names = accessors.call(&packages, "names").unwrap();
//! assert_eq!(names.values().unwrap().len(), 2);
//!
//! // Filter by a float: "3.0" is a decimal string equal to 3.0
//! let table = accessors
//!     .invoke(&packages, "versions", Some(Value::Float(3.0)), None)
//!     .unwrap();
//! assert_eq!(table.call("names").unwrap().values(), Some(&[Value::from("openssl")][..]));
//! assert_eq!(table.to_string(), "Packages with version == 3.0");
//!
//! // Predicate expressions filter and describe themselves
//! let table = table.filter_with(Criteria::new(), |x| x.field("name").matches("^open")).unwrap();
//! assert_eq!(table.to_string(), "Packages with version == 3.0 name =~ \"^open\"");
//! ```
//!
//! # Matching Rules
//!
//! A `(field, expected)` criterion keeps a record when:
//!
//! | Expected | Record value |
//! |----------|--------------|
//! | Float | a float, or a decimal string, numerically equal |
//! | Int | an integer, or an integer string, numerically equal |
//! | Regex | the same pattern, or text the pattern matches |
//! | List | the list itself, or one of its items |
//! | other | equal |
//!
//! A record without the field never matches.
//!
//! # Failures
//!
//! A resource reports [`FetchError::Skipped`] or [`FetchError::Failed`]
//! when it cannot produce records. The accessor then returns a
//! [`Deferred`] that answers every further query with itself and only
//! reports the failure through `is_skipped`, `is_failed` and
//! `failure_message`.

mod accessor;
mod clause;
mod deferred;
mod error;
mod op;
mod probe;
mod schema;
mod table;
mod trace;
mod traits;
mod value;

// Re-export public API
pub use accessor::{Accessors, Entries, Outcome, View};
pub use clause::{matches_expected, Criteria};
pub use deferred::{Deferred, FailureKind};
pub use error::{FetchError, Result, SiftError};
pub use op::{compare, Op};
pub use probe::{PredicateRef, Probe};
pub use schema::{
    Criterion, FieldConfig, FieldDescriptor, FieldOptions, Handler, Resolver, Schema,
    SchemaBuilder, SchemaConfig, Style, TABLE_METHODS,
};
pub use table::{Entry, RecordTable};
pub use trace::Trace;
pub use traits::Resource;
pub use value::{rows, Pattern, Record, Row, Value};
