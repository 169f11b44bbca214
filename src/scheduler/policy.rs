//! Adaptive poll scheduling
//!
//! A record is *due* once the current time passes its `expire` field. After
//! each poll attempt the poller hands the record back here to compute the
//! next due date:
//!
//! - on failure the retry interval grows with the time the server has been
//!   unreachable, capped (2 hours by default): a server seen 5 minutes ago
//!   is retried in 5 minutes, then 10, and so on;
//! - on success the next poll is drawn uniformly from a jitter window
//!   (30 to 90 minutes by default) so servers polled in one batch do not all
//!   come due together.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use super::clock::Clock;
use crate::config::PollingConfig;
use crate::models::{ServerRecord, Timestamp, EPOCH};

/// Computes next poll deadlines from the current time and a record's state
///
/// The jitter source is owned by the policy and seeded once, when the policy
/// is built.
#[derive(Debug, Clone)]
pub struct PollingPolicy {
    config: PollingConfig,
    rng: ChaCha8Rng,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self::new(PollingConfig::default())
    }
}

impl PollingPolicy {
    /// Create a policy with an entropy-seeded jitter source
    pub fn new(config: PollingConfig) -> Self {
        Self {
            config: clamp_jitter_window(config),
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Create a policy with a reproducible jitter source
    pub fn with_seed(config: PollingConfig, seed: u64) -> Self {
        Self {
            config: clamp_jitter_window(config),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Check if a record should be polled at `now`
    pub fn is_due(&self, record: &ServerRecord, now: Timestamp) -> bool {
        now > record.expire
    }

    /// Check if a record should be polled according to `clock`
    ///
    /// An unavailable clock always reports due.
    pub fn is_due_by(&self, record: &ServerRecord, clock: &dyn Clock) -> bool {
        match clock.now() {
            Some(now) => self.is_due(record, now),
            None => {
                warn!("Clock unavailable, treating server as due");
                true
            }
        }
    }

    /// Retry interval after a failed poll at `now`
    pub fn failure_backoff(&self, record: &ServerRecord, now: Timestamp) -> u64 {
        now.saturating_sub(record.last_seen)
            .min(self.config.failure_backoff_cap_secs)
    }

    /// Reschedule a record after a failed poll
    ///
    /// `last_seen` is left untouched.
    pub fn on_poll_failure(&self, record: &mut ServerRecord, now: Timestamp) {
        let backoff = self.failure_backoff(record, now);
        record.expire = now.saturating_add(backoff);
        debug!(
            last_seen = record.last_seen,
            backoff_secs = backoff,
            expire = record.expire,
            "Server offline, backing off"
        );
    }

    /// Reschedule a record after a successful poll
    ///
    /// With `expire_immediately` the record stays due, so the next scheduling
    /// pass polls it again.
    pub fn on_poll_success(
        &mut self,
        record: &mut ServerRecord,
        now: Timestamp,
        expire_immediately: bool,
    ) {
        // last_seen never moves backwards, even if the clock does
        record.last_seen = record.last_seen.max(now);

        record.expire = if expire_immediately {
            EPOCH
        } else {
            now.saturating_add(self.jitter())
        };
        debug!(
            last_seen = record.last_seen,
            expire = record.expire,
            "Server online, rescheduled"
        );
    }

    /// Draw a re-poll delay from the jitter window
    pub fn jitter(&mut self) -> u64 {
        self.rng
            .gen_range(self.config.jitter_min_secs..self.config.jitter_max_secs)
    }
}

/// Widen an empty jitter window to one second
fn clamp_jitter_window(mut config: PollingConfig) -> PollingConfig {
    if config.jitter_max_secs <= config.jitter_min_secs {
        warn!(
            jitter_min_secs = config.jitter_min_secs,
            jitter_max_secs = config.jitter_max_secs,
            "Empty jitter window, using a one second window"
        );
        config.jitter_min_secs = config.jitter_min_secs.min(u64::MAX - 1);
        config.jitter_max_secs = config.jitter_min_secs + 1;
    }
    config
}
