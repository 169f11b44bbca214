//! Poll scheduling for tracked servers
//!
//! There is no persisted status flag: a server is either due or not, decided
//! purely by comparing the clock with the record's `expire` field.
//!
//! # Modules
//!
//! - [`clock`] - Time sources, including a fallible wall clock
//! - [`policy`] - Backoff and jitter rules producing the next `expire`
//!
//! # Example
//!
//! ```
//! use teerank::config::PollingConfig;
//! use teerank::models::ServerRecord;
//! use teerank::scheduler::PollingPolicy;
//!
//! let mut policy = PollingPolicy::new(PollingConfig::default());
//! let mut record = ServerRecord::new(1_000);
//!
//! // Offline for 60 seconds: retry in 60 seconds
//! policy.on_poll_failure(&mut record, 1_060);
//! assert_eq!(record.expire, 1_120);
//!
//! // Back online: next poll in 30 to 90 minutes
//! policy.on_poll_success(&mut record, 1_200, false);
//! assert!(!policy.is_due(&record, 1_200 + 1_800));
//! ```
//!
//! # Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `failure_backoff_cap_secs` | 7200 | Longest retry interval for an offline server |
//! | `jitter_min_secs` | 1800 | Shortest re-poll delay after a successful poll |
//! | `jitter_max_secs` | 5400 | Re-poll delay upper bound (exclusive) |

pub mod clock;
pub mod policy;

pub use clock::{Clock, FixedClock, SystemClock};
pub use policy::PollingPolicy;
