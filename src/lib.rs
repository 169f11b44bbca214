//! teerank - Game server liveness tracking
//!
//! Tracks the last known state of many independently polled Teeworlds
//! servers, persists one record per server, and decides when each server
//! should be polled next.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Server and client records
//! - [`storage`] - Record paths, text grammar and file-backed store
//! - [`scheduler`] - Backoff and jitter rules deciding when a server is due
//! - [`poller`] - Concurrent poll sweeps over a pluggable transport
//! - [`commands`] - Operator commands used by the `teerank` binary
//! - [`error`] - Crate-wide error type
//!
//! # Example
//!
//! ```no_run
//! use teerank::config::Config;
//! use teerank::scheduler::PollingPolicy;
//! use teerank::storage::ServerStore;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let store = ServerStore::from_config(&config.storage);
//!     let mut policy = PollingPolicy::new(config.polling.clone());
//!
//!     let mut record = store.read("127.0.0.1:8303")?;
//!     policy.on_poll_success(&mut record, 1_700_000_000, false);
//!     store.write("127.0.0.1:8303", &record)?;
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod poller;
pub mod scheduler;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{ClientRecord, GameType, ServerRecord, Timestamp};
    pub use crate::poller::{PollOutcome, PollSummary, Poller, Prober};
    pub use crate::scheduler::{Clock, PollingPolicy, SystemClock};
    pub use crate::storage::{PathResolver, RecordCodec, ServerStore, StoreError};
}

// Direct re-exports for convenience
pub use error::{Error, ErrorCategory};
pub use models::{ClientRecord, GameType, ServerRecord, Timestamp};
