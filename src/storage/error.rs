//! Error types for the server record store
//!
//! Decode failures keep the three classes a misformatted record can fall
//! into apart: a failing stream, a field that is not there at all, and a
//! client list that only partially matched.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::hexname::HexNameError;

/// Errors raised while mapping an identifier to a record path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Composed path does not fit in the system path length
    #[error("Path too long: {len} bytes (max {max}): {path}")]
    TooLong { path: String, len: usize, max: usize },
}

/// Errors that can occur while decoding a record
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The underlying stream failed
    #[error("Read failed: {0}")]
    Io(#[source] io::Error),

    /// End of input, or the field did not match at all
    #[error("Can't match '{field}' field")]
    MissingField { field: &'static str },

    /// Only part of a multi-entry field matched
    #[error("Only {matched} over {expected} {field} matched")]
    PartialMatch {
        field: &'static str,
        matched: usize,
        expected: usize,
    },

    /// A client line is present but only some of its fields matched
    #[error("Only {matched} over {expected} fields of client {index} matched: {line}")]
    MalformedClient {
        index: usize,
        matched: usize,
        expected: usize,
        line: String,
    },

    /// Declared client count is above the per-record capacity
    #[error("{count} clients exceed capacity of {capacity}")]
    CapacityExceeded { count: usize, capacity: usize },

    /// Client count is not a non-negative integer
    #[error("Invalid clients number: {value}")]
    InvalidCount { value: String },

    /// Name or clan token is not a valid hexname
    #[error("Invalid {field} in client {index}: {source}")]
    InvalidName {
        field: &'static str,
        index: usize,
        #[source]
        source: HexNameError,
    },

    /// Unexpected content after the last client
    #[error("Unexpected trailing data: {line}")]
    TrailingData { line: String },
}

/// Errors that can occur while encoding a record
#[derive(Error, Debug)]
pub enum EncodeError {
    /// A write to the underlying stream failed
    #[error("Write failed: {0}")]
    Io(#[from] io::Error),

    /// Record holds more clients than the per-record capacity
    #[error("{count} clients exceed capacity of {capacity}")]
    CapacityExceeded { count: usize, capacity: usize },

    /// Name or clan cannot be stored
    #[error("Invalid {field} in client {index}: {source}")]
    InvalidName {
        field: &'static str,
        index: usize,
        #[source]
        source: HexNameError,
    },
}

/// Errors returned by [`super::ServerStore`] operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// No record at the resolved path
    #[error("Server not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Record exists but does not follow the grammar
    #[error("{}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// Open, write, rename or delete failed
    #[error("{operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Record could not be encoded
    #[error("{}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },

    /// Identifier could not be resolved to a path
    #[error(transparent)]
    Path(#[from] PathError),
}

impl StoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Check if the record simply does not exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if the record exists but failed to decode
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }

    /// Check if retrying the operation later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io { .. } => true,
            Self::Encode { source, .. } => matches!(source, EncodeError::Io(_)),
            Self::NotFound { .. } | Self::Corrupt { .. } | Self::Path(_) => false,
        }
    }
}
