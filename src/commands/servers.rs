//! Operator commands over server records

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::models::{ClientRecord, ServerRecord, Timestamp, EPOCH};
use crate::scheduler::PollingPolicy;
use crate::storage::{ServerStore, StoreError};

fn open_store(config: &Config) -> ServerStore {
    ServerStore::from_config(&config.storage)
}

fn now(store: &ServerStore) -> Result<Timestamp> {
    store
        .clock()
        .now()
        .context("System clock is unavailable")
}

/// Render a timestamp for humans
pub fn format_timestamp(ts: Timestamp) -> String {
    if ts == EPOCH {
        return String::from("epoch");
    }

    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

/// Parse a `NAME,CLAN,SCORE` client argument
pub fn parse_client(arg: &str) -> Result<ClientRecord, String> {
    let (rest, score) = arg
        .rsplit_once(',')
        .ok_or_else(|| format!("expected NAME,CLAN,SCORE, got '{arg}'"))?;
    let (name, clan) = rest
        .split_once(',')
        .ok_or_else(|| format!("expected NAME,CLAN,SCORE, got '{arg}'"))?;
    let score = score
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid score '{score}': {e}"))?;

    Ok(ClientRecord::new(name, clan, score))
}

/// Create the servers directory
pub fn init(config: &Config) -> Result<()> {
    let dir = open_store(config).init()?;
    println!("Initialized {}", dir.display());
    Ok(())
}

/// Start tracking a server
pub fn create(config: &Config, id: &str, force: bool) -> Result<()> {
    let store = open_store(config);
    store.init()?;

    if !force && store.try_exists(id)? {
        bail!("Server '{id}' already exists (use --force to reset it)");
    }

    let record = store.create(id)?;
    tracing::info!(server = %id, last_seen = record.last_seen, "Server created");
    println!("Created {id}");
    Ok(())
}

/// Print a server record
pub fn show(config: &Config, id: &str, json: bool) -> Result<()> {
    let store = open_store(config);
    let record = match store.read(id) {
        Ok(record) => record,
        Err(StoreError::NotFound { .. }) => bail!("Server '{id}' not found"),
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let policy = PollingPolicy::new(config.polling.clone());
    let due = policy.is_due_by(&record, &**store.clock());

    println!("Server:    {id}");
    println!("Game type: {}", record.game_type);
    println!("Last seen: {}", format_timestamp(record.last_seen));
    println!(
        "Expire:    {}{}",
        format_timestamp(record.expire),
        if due { " (due)" } else { "" }
    );
    println!("Clients:   {}", record.num_clients());
    for client in &record.clients {
        println!("  {:<16} {:<16} {:>6}", client.name, client.clan, client.score);
    }
    Ok(())
}

/// Report whether a server is tracked
pub fn exists(config: &Config, id: &str) -> Result<bool> {
    let found = open_store(config).try_exists(id)?;
    println!("{}", if found { "yes" } else { "no" });
    Ok(found)
}

/// Stop tracking a server
pub fn remove(config: &Config, id: &str) -> Result<()> {
    open_store(config).remove(id)?;
    tracing::info!(server = %id, "Server removed");
    println!("Removed {id}");
    Ok(())
}

/// List tracked servers
pub fn list(config: &Config) -> Result<()> {
    for id in open_store(config).list()? {
        println!("{id}");
    }
    Ok(())
}

/// List servers due for a poll
///
/// Unreadable records are reported and skipped.
pub fn due(config: &Config) -> Result<Vec<String>> {
    let store = open_store(config);
    let policy = PollingPolicy::new(config.polling.clone());

    let mut due = Vec::new();
    for id in store.list()? {
        match store.read(&id) {
            Ok(record) if policy.is_due_by(&record, &**store.clock()) => {
                println!("{id}");
                due.push(id);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(server = %id, error = %e, "Skipping unreadable server"),
        }
    }
    Ok(due)
}

/// Record a successful poll
pub fn online(
    config: &Config,
    id: &str,
    clients: Vec<ClientRecord>,
    expire_now: bool,
) -> Result<ServerRecord> {
    let store = open_store(config);
    let mut record = store.read(id)?;
    let now = now(&store)?;

    let mut policy = PollingPolicy::new(config.polling.clone());
    record.clients = clients;
    policy.on_poll_success(&mut record, now, expire_now);
    store.write(id, &record)?;

    println!(
        "{id}: online, {} clients, next poll {}",
        record.num_clients(),
        format_timestamp(record.expire)
    );
    Ok(record)
}

/// Record a failed poll
pub fn offline(config: &Config, id: &str) -> Result<ServerRecord> {
    let store = open_store(config);
    let mut record = store.read(id)?;
    let now = now(&store)?;

    let policy = PollingPolicy::new(config.polling.clone());
    policy.on_poll_failure(&mut record, now);
    store.write(id, &record)?;

    println!("{id}: offline, next poll {}", format_timestamp(record.expire));
    Ok(record)
}
