//! Integration tests for poll sweeps
//!
//! A scripted prober stands in for the network transport.

mod common;

use async_trait::async_trait;
use common::{temp_store, T0};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use teerank::config::PollingConfig;
use teerank::models::{ClientRecord, EPOCH};
use teerank::poller::{PollError, PollOutcome, PollSummary, Poller, ProbeError, Prober};
use teerank::scheduler::{FixedClock, PollingPolicy};
use teerank::storage::StoreError;

/// Prober answering from a fixed table; unknown servers are unreachable
#[derive(Default)]
struct ScriptedProber {
    online: Mutex<HashMap<String, Vec<ClientRecord>>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProber {
    fn set_online(&self, id: &str, clients: Vec<ClientRecord>) {
        self.online.lock().unwrap().insert(id.to_string(), clients);
    }

    fn set_offline(&self, id: &str) {
        self.online.lock().unwrap().remove(id);
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, id: &str) -> Result<Vec<ClientRecord>, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(5)).await;

        let answer = self.online.lock().unwrap().get(id).cloned();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        answer.ok_or_else(|| ProbeError::Unreachable(id.to_string()))
    }
}

fn poller(
    clock: Arc<FixedClock>,
    max_concurrent_polls: usize,
) -> (tempfile::TempDir, Arc<ScriptedProber>, Poller<Arc<ScriptedProber>>) {
    let (dir, store) = temp_store(clock);
    let prober = Arc::new(ScriptedProber::default());
    let config = PollingConfig {
        max_concurrent_polls,
        ..PollingConfig::default()
    };
    let poller = Poller::new(
        Arc::new(store),
        PollingPolicy::with_seed(config, 11),
        Arc::clone(&prober),
    );
    (dir, prober, poller)
}

#[tokio::test]
async fn test_register_creates_once() {
    let clock = Arc::new(FixedClock::new(T0));
    let (_dir, _prober, poller) = poller(clock, 4);

    assert!(poller.register("srv").await.unwrap());
    assert!(!poller.register("srv").await.unwrap());

    let record = poller.store().read("srv").unwrap();
    assert_eq!(record.expire, EPOCH);
}

#[tokio::test]
async fn test_online_server_is_rescheduled() {
    let clock = Arc::new(FixedClock::new(T0));
    let (_dir, prober, poller) = poller(Arc::clone(&clock), 4);
    poller.register("srv").await.unwrap();
    prober.set_online("srv", vec![ClientRecord::new("tee", "clan", 5)]);

    clock.set(T0 + 10);
    let outcome = poller.poll_if_due("srv").await.unwrap();
    assert_eq!(outcome, PollOutcome::Online { clients: 1 });

    let record = poller.store().read("srv").unwrap();
    assert_eq!(record.last_seen, T0 + 10);
    assert!(record.expire >= T0 + 1810 && record.expire < T0 + 5410);
    assert_eq!(record.clients, vec![ClientRecord::new("tee", "clan", 5)]);

    // Not due again right away
    assert_eq!(
        poller.poll_if_due("srv").await.unwrap(),
        PollOutcome::Skipped
    );
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_offline_server_backs_off() {
    let clock = Arc::new(FixedClock::new(T0));
    let (_dir, prober, poller) = poller(Arc::clone(&clock), 4);
    poller.register("srv").await.unwrap();
    prober.set_online("srv", Vec::new());

    clock.set(T0 + 10);
    poller.poll_server("srv").await.unwrap();
    prober.set_offline("srv");

    clock.set(T0 + 70);
    let outcome = poller.poll_server("srv").await.unwrap();
    assert_eq!(outcome, PollOutcome::Offline { retry_in: 60 });

    let record = poller.store().read("srv").unwrap();
    assert_eq!(record.expire, T0 + 130);
    assert_eq!(record.last_seen, T0 + 10);
}

#[tokio::test]
async fn test_unavailable_clock_keeps_server_due() {
    let clock = Arc::new(FixedClock::new(T0));
    let (_dir, prober, poller) = poller(Arc::clone(&clock), 4);
    poller.register("srv").await.unwrap();
    prober.set_online("srv", Vec::new());

    let unavailable = Arc::new(FixedClock::unavailable());
    let store = Arc::new(poller.store().as_ref().clone().with_clock(unavailable));
    let blind = Poller::new(store, PollingPolicy::default(), Arc::clone(&prober));

    let outcome = blind.poll_if_due("srv").await.unwrap();
    assert_eq!(outcome, PollOutcome::Online { clients: 0 });
    let record = blind.store().read("srv").unwrap();
    assert_eq!(record.expire, EPOCH);
    assert_eq!(record.last_seen, T0);
}

#[tokio::test]
async fn test_missing_record_is_an_error() {
    let clock = Arc::new(FixedClock::new(T0));
    let (_dir, _prober, poller) = poller(clock, 4);

    let err = poller.poll_server("ghost").await.unwrap_err();
    assert!(matches!(err, PollError::Store(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn test_sweep_polls_only_due_servers() {
    let clock = Arc::new(FixedClock::new(T0));
    let (_dir, prober, poller) = poller(Arc::clone(&clock), 2);

    for id in ["a", "b", "c", "d", "e", "f"] {
        poller.register(id).await.unwrap();
    }
    prober.set_online("a", vec![ClientRecord::new("p1", "", 1)]);
    prober.set_online("b", Vec::new());
    prober.set_online("c", Vec::new());

    // Corrupt record must not stop the sweep
    let broken = poller.store().resolver().resolve("f").unwrap();
    std::fs::write(broken, "garbage\n").unwrap();

    clock.set(T0 + 100);
    let summary = poller.run_once().await.unwrap();
    assert_eq!(
        summary,
        PollSummary {
            polled: 5,
            online: 3,
            offline: 2,
            skipped: 0,
            errors: 1,
        }
    );
    assert!(prober.max_in_flight.load(Ordering::SeqCst) <= 2);

    // Online servers wait at least 30 minutes; offline ones come back after 100s
    clock.set(T0 + 300);
    let summary = poller.run_once().await.unwrap();
    assert_eq!(summary.polled, 2);
    assert_eq!(summary.offline, 2);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.errors, 1);
}

#[tokio::test]
async fn test_oversized_client_list_is_truncated_and_rescheduled() {
    let clock = Arc::new(FixedClock::new(T0));
    let (_dir, prober, poller) = poller(Arc::clone(&clock), 4);
    poller.register("crowded").await.unwrap();

    let mut clients: Vec<ClientRecord> = (0..20)
        .map(|i| ClientRecord::new(format!("tee{i}"), "", i))
        .collect();
    clients[0].name = "a name far longer than sixteen bytes".to_string();
    prober.set_online("crowded", clients);

    clock.set(T0 + 60);
    let summary = poller.run_once().await.unwrap();
    assert_eq!(summary.online, 1);
    assert_eq!(summary.errors, 0);

    let record = poller.store().read("crowded").unwrap();
    assert_eq!(record.last_seen, T0 + 60);
    assert!(record.expire >= T0 + 60 + 1800);
    assert_eq!(record.clients.len(), 16);
    assert_eq!(record.clients[0].name, "a name far longe");

    // Rescheduled, so the next sweeps leave it alone
    clock.set(T0 + 120);
    let summary = poller.run_once().await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(prober.calls.load(Ordering::SeqCst), 1);
}
