//! Durable per-server records
//!
//! This module maps server identifiers to files, encodes records in their
//! text grammar, and exposes the create/read/write/remove surface consumed
//! by pollers and page generators.
//!
//! - [`path`] - Identifier to path resolution with a length bound
//! - [`hexname`] - Encoding of player names and clans
//! - [`codec`] - Record grammar
//! - [`store`] - File-backed CRUD operations
//! - [`locks`] - Per-server mutual exclusion for concurrent pollers
//!
//! # Example
//!
//! ```no_run
//! use teerank::storage::{PathResolver, RecordCodec, ServerStore};
//!
//! # fn example() -> Result<(), teerank::storage::StoreError> {
//! let store = ServerStore::new(PathResolver::new("/var/lib/teerank"), RecordCodec::default());
//! store.init()?;
//!
//! let record = store.create("127.0.0.1:8303")?;
//! assert_eq!(store.read("127.0.0.1:8303")?, record);
//!
//! store.remove("127.0.0.1:8303")?;
//! store.remove("127.0.0.1:8303")?;
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod hexname;
pub mod locks;
pub mod path;
pub mod store;

pub use codec::RecordCodec;
pub use error::{DecodeError, EncodeError, PathError, StoreError};
pub use hexname::HexNameError;
pub use locks::{ServerGuard, ServerLocks};
pub use path::PathResolver;
pub use store::{ServerStore, StoreResult};
