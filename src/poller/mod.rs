//! Poll sweeps over tracked servers
//!
//! The network transport is not part of this crate: it plugs in through the
//! [`Prober`] trait. The poller drives one read, probe, reschedule, write
//! cycle per server while holding that server's lock, and runs cycles for
//! distinct servers concurrently.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{ClientRecord, ServerRecord, EPOCH};
use crate::scheduler::PollingPolicy;
use crate::storage::{ServerLocks, ServerStore, StoreError};

/// Errors a transport reports for a failed poll
#[derive(Error, Debug)]
pub enum ProbeError {
    /// No answer from the server
    #[error("Server unreachable: {0}")]
    Unreachable(String),

    /// Server did not answer in time
    #[error("Probe timed out")]
    Timeout,

    /// Server answered with something we cannot use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Transport used to query a game server
#[async_trait]
pub trait Prober: Send + Sync {
    /// Query a server, returning its connected clients
    async fn probe(&self, id: &str) -> Result<Vec<ClientRecord>, ProbeError>;
}

#[async_trait]
impl<P: Prober + ?Sized> Prober for Arc<P> {
    async fn probe(&self, id: &str) -> Result<Vec<ClientRecord>, ProbeError> {
        (**self).probe(id).await
    }
}

/// Errors that abort a single server's poll cycle
#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result of one server's poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Server answered; record updated with its clients
    Online { clients: usize },
    /// Server did not answer; next attempt backed off
    Offline { retry_in: u64 },
    /// Server was not due
    Skipped,
}

/// Counters for one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    pub polled: usize,
    pub online: usize,
    pub offline: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl PollSummary {
    fn record(&mut self, outcome: &Result<PollOutcome, PollError>) {
        match outcome {
            Ok(PollOutcome::Online { .. }) => {
                self.polled += 1;
                self.online += 1;
            }
            Ok(PollOutcome::Offline { .. }) => {
                self.polled += 1;
                self.offline += 1;
            }
            Ok(PollOutcome::Skipped) => self.skipped += 1,
            Err(_) => self.errors += 1,
        }
    }
}

impl fmt::Display for PollSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "polled {} ({} online, {} offline), skipped {}, errors {}",
            self.polled, self.online, self.offline, self.skipped, self.errors
        )
    }
}

/// Drives polls and persists their outcome
pub struct Poller<P> {
    store: Arc<ServerStore>,
    policy: Mutex<PollingPolicy>,
    locks: ServerLocks,
    prober: P,
    max_concurrent: usize,
}

impl<P: Prober> Poller<P> {
    pub fn new(store: Arc<ServerStore>, policy: PollingPolicy, prober: P) -> Self {
        let max_concurrent = policy.config().max_concurrent_polls.max(1);
        Self {
            store,
            policy: Mutex::new(policy),
            locks: ServerLocks::new(),
            prober,
            max_concurrent,
        }
    }

    /// Build a poller from configuration
    pub fn from_config(config: &Config, prober: P) -> Self {
        Self::new(
            Arc::new(ServerStore::from_config(&config.storage)),
            PollingPolicy::new(config.polling.clone()),
            prober,
        )
    }

    pub fn store(&self) -> &Arc<ServerStore> {
        &self.store
    }

    /// Start tracking a server if it has no record yet
    ///
    /// Returns `true` when a record was created.
    pub async fn register(&self, id: &str) -> Result<bool, PollError> {
        let _guard = self.locks.acquire(id).await;

        let store = Arc::clone(&self.store);
        let id = id.to_string();
        let created = tokio::task::spawn_blocking(move || -> Result<bool, StoreError> {
            if store.try_exists(&id)? {
                return Ok(false);
            }
            store.create(&id)?;
            info!(server = %id, "Tracking new server");
            Ok(true)
        })
        .await??;

        Ok(created)
    }

    /// Poll a server regardless of its due date
    pub async fn poll_server(&self, id: &str) -> Result<PollOutcome, PollError> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load(id).await?;
        self.poll_locked(id, record).await
    }

    /// Poll a server only if it is due
    pub async fn poll_if_due(&self, id: &str) -> Result<PollOutcome, PollError> {
        let _guard = self.locks.acquire(id).await;
        let record = self.load(id).await?;

        let due = self
            .lock_policy()
            .is_due_by(&record, &**self.store.clock());
        if !due {
            debug!(server = %id, expire = record.expire, "Server not due");
            return Ok(PollOutcome::Skipped);
        }

        self.poll_locked(id, record).await
    }

    /// Poll every due server once
    ///
    /// Failures are logged and counted; one bad record never stops the sweep.
    pub async fn run_once(&self) -> Result<PollSummary, PollError> {
        let store = Arc::clone(&self.store);
        let ids = tokio::task::spawn_blocking(move || store.list()).await??;

        info!(servers = ids.len(), "Starting poll sweep");

        let outcomes = stream::iter(ids)
            .map(|id| async move {
                let outcome = self.poll_if_due(&id).await;
                if let Err(e) = &outcome {
                    warn!(server = %id, error = %e, "Poll cycle failed");
                }
                outcome
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;

        let mut summary = PollSummary::default();
        for outcome in &outcomes {
            summary.record(outcome);
        }

        self.locks.prune();
        info!(%summary, "Poll sweep finished");
        Ok(summary)
    }

    async fn poll_locked(
        &self,
        id: &str,
        mut record: ServerRecord,
    ) -> Result<PollOutcome, PollError> {
        let probe = self.prober.probe(id).await.map(|mut clients| {
            let reported = clients.len();
            if self.store.codec().fit_clients(&mut clients) {
                warn!(
                    server = %id,
                    reported,
                    kept = clients.len(),
                    "Client list does not fit the record, truncating"
                );
            }
            clients
        });
        let now = self.store.clock().now();

        let outcome = match (probe, now) {
            (Ok(clients), Some(now)) => {
                let count = clients.len();
                record.clients = clients;
                self.lock_policy().on_poll_success(&mut record, now, false);
                PollOutcome::Online { clients: count }
            }
            (Err(e), Some(now)) => {
                let policy = self.lock_policy();
                let retry_in = policy.failure_backoff(&record, now);
                policy.on_poll_failure(&mut record, now);
                debug!(server = %id, error = %e, retry_in, "Server offline");
                PollOutcome::Offline { retry_in }
            }
            (probe, None) => {
                warn!(server = %id, "Clock unavailable, keeping server due");
                record.expire = EPOCH;
                match probe {
                    Ok(clients) => {
                        let count = clients.len();
                        record.clients = clients;
                        PollOutcome::Online { clients: count }
                    }
                    Err(_) => PollOutcome::Offline { retry_in: 0 },
                }
            }
        };

        self.save(id, record).await?;
        Ok(outcome)
    }

    async fn load(&self, id: &str) -> Result<ServerRecord, PollError> {
        let store = Arc::clone(&self.store);
        let id = id.to_string();
        Ok(tokio::task::spawn_blocking(move || store.read(&id)).await??)
    }

    async fn save(&self, id: &str, record: ServerRecord) -> Result<(), PollError> {
        let store = Arc::clone(&self.store);
        let id = id.to_string();
        Ok(tokio::task::spawn_blocking(move || store.write(&id, &record)).await??)
    }

    fn lock_policy(&self) -> std::sync::MutexGuard<'_, PollingPolicy> {
        self.policy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
