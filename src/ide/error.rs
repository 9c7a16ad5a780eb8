//! Errors returned by queries.

use thiserror::Error;

/// A query was called with arguments that cannot refer to anything.
///
/// Querying a file that is not loaded is not an error; those queries return
/// `None` or an empty list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
