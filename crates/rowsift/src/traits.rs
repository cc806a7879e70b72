//! The resource collaborator contract.
//!
//! This module provides the [`Resource`] trait which hosts implement to
//! hand their records to the engine.

use std::fmt;

use crate::error::FetchError;
use crate::value::Row;

/// A host object that can produce the records to be queried.
///
/// The `Display` text labels every table built over the resource and is
/// what a deferred failure reports as its own text.
///
/// # Example
///
/// ```
/// use std::fmt;
/// use rowsift::{rows, FetchError, Record, Resource, Row};
///
/// struct Packages {
///     rows: Vec<Row>,
/// }
///
/// impl fmt::Display for Packages {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "Packages")
///     }
/// }
///
/// impl Resource for Packages {
///     fn raw_records(&self) -> Result<Vec<Row>, FetchError> {
///         Ok(self.rows.clone())
///     }
/// }
///
/// let packages = Packages {
///     rows: rows(vec![Record::new().with("name", "curl")]),
/// };
/// assert_eq!(packages.raw_records().unwrap().len(), 1);
/// ```
pub trait Resource: fmt::Display {
    /// Returns the current records.
    ///
    /// Return [`FetchError::Skipped`] when the resource cannot be evaluated
    /// in this environment and [`FetchError::Failed`] when evaluation
    /// errored; both are deferred into a [`Deferred`](crate::Deferred).
    /// [`FetchError::Other`] propagates to the caller.
    ///
    /// Handing out clones of cached rows lets lazily computed fields
    /// persist between accesses.
    fn raw_records(&self) -> Result<Vec<Row>, FetchError>;
}
