//! Unified error handling for the teerank crate
//!
//! Domain modules keep their own error types ([`StoreError`],
//! [`DecodeError`], [`PollError`]); this module folds them into a single
//! [`Error`] for code crossing module boundaries, and classifies them so
//! callers can decide between retrying, skipping and aborting.

use std::io;
use thiserror::Error;

pub use crate::poller::{PollError, ProbeError};
pub use crate::storage::{DecodeError, EncodeError, PathError, StoreError};

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Storage and I/O errors
    Storage,
    /// Record grammar errors
    Parsing,
    /// Configuration and validation errors
    Config,
    /// Poll scheduling errors
    Scheduler,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Parsing => "parsing",
            Self::Config => "config",
            Self::Scheduler => "scheduler",
            Self::Other => "other",
        }
    }

    /// Process exit status for errors of this category (sysexits.h)
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Storage => 74,
            Self::Parsing => 65,
            Self::Config => 78,
            Self::Scheduler => 75,
            Self::Other => 1,
        }
    }
}

/// Unified error type for the teerank crate
#[derive(Error, Debug)]
pub enum Error {
    /// Record store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Record grammar errors outside of a store operation
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Poll cycle errors
    #[error("Poll error: {0}")]
    Poll(#[from] PollError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Store(StoreError::Corrupt { .. }) | Self::Decode(_) => ErrorCategory::Parsing,
            Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Poll(PollError::Store(StoreError::Corrupt { .. })) => ErrorCategory::Parsing,
            Self::Poll(PollError::Store(_)) => ErrorCategory::Storage,
            Self::Poll(PollError::Task(_)) => ErrorCategory::Scheduler,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(e) | Self::Poll(PollError::Store(e)) => e.is_recoverable(),
            Self::Decode(DecodeError::Io(_)) => true,
            Self::Decode(_) => false,
            Self::Poll(PollError::Task(_)) => false,
            Self::Io(_) => true, // I/O errors are often transient
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }
}

// Recover the typed error behind an anyhow chain when there is one
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<StoreError>() {
            Ok(e) => return Self::Store(e),
            Err(err) => err,
        };
        let err = match err.downcast::<PollError>() {
            Ok(e) => return Self::Poll(e),
            Err(err) => err,
        };
        let err = match err.downcast::<DecodeError>() {
            Ok(e) => return Self::Decode(e),
            Err(err) => err,
        };
        let err = match err.downcast::<io::Error>() {
            Ok(e) => return Self::Io(e),
            Err(err) => err,
        };
        Self::Other {
            context: err.to_string(),
            source: Some(err.into()),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
