//! File-backed store of server records
//!
//! One file per server at `<root>/servers/<id>`. Writes are staged into a
//! hidden sibling file, synced, then renamed over the record, so a crash
//! mid-write leaves the previous record intact.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::codec::RecordCodec;
use super::error::StoreError;
use super::path::PathResolver;
use crate::config::StorageConfig;
use crate::models::{ServerRecord, EPOCH};
use crate::scheduler::{Clock, SystemClock};

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD surface over server records
#[derive(Debug, Clone)]
pub struct ServerStore {
    resolver: PathResolver,
    codec: RecordCodec,
    clock: Arc<dyn Clock>,
}

impl ServerStore {
    /// Create a store using the wall clock
    pub fn new(resolver: PathResolver, codec: RecordCodec) -> Self {
        Self {
            resolver,
            codec,
            clock: Arc::new(SystemClock),
        }
    }

    /// Create a store from storage configuration
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            PathResolver::with_max_len(&config.root, config.max_path_len),
            RecordCodec::new(config.max_clients),
        )
    }

    /// Replace the clock used to stamp new records
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn codec(&self) -> &RecordCodec {
        &self.codec
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Create the servers directory if it does not exist
    pub fn init(&self) -> StoreResult<PathBuf> {
        let dir = self.resolver.servers_dir();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("create directory", &dir, e))?;
        Ok(dir)
    }

    /// Check if a record is present
    ///
    /// A path that cannot be resolved reports `true`. Use [`Self::try_exists`]
    /// to see the failure instead.
    pub fn exists(&self, id: &str) -> bool {
        match self.resolver.resolve(id) {
            Ok(path) => path.exists(),
            Err(e) => {
                warn!(server = %id, error = %e, "Cannot resolve server path, assuming it exists");
                true
            }
        }
    }

    /// Check if a record is present, reporting resolution and stat failures
    pub fn try_exists(&self, id: &str) -> StoreResult<bool> {
        let path = self.resolver.resolve(id)?;
        path.try_exists()
            .map_err(|e| StoreError::io("stat", &path, e))
    }

    /// Read a record
    pub fn read(&self, id: &str) -> StoreResult<ServerRecord> {
        let path = self.resolver.resolve(id)?;

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { path });
            }
            Err(e) => return Err(StoreError::io("open", path, e)),
        };

        match self.codec.decode(BufReader::new(file)) {
            Ok(record) => {
                debug!(path = %path.display(), clients = record.num_clients(), "Server record loaded");
                Ok(record)
            }
            Err(source) => Err(StoreError::Corrupt { path, source }),
        }
    }

    /// Write a record, replacing any previous content
    pub fn write(&self, id: &str, record: &ServerRecord) -> StoreResult<()> {
        let path = self.resolver.resolve(id)?;
        let staging = self.resolver.staging(id)?;

        if let Err(e) = self.write_staged(&staging, record) {
            discard(&staging);
            return Err(e);
        }

        if let Err(e) = fs::rename(&staging, &path) {
            discard(&staging);
            return Err(StoreError::io("rename", path, e));
        }

        debug!(path = %path.display(), expire = record.expire, "Server record saved");
        Ok(())
    }

    /// Write a fresh record: no clients, seen now, immediately due
    pub fn create(&self, id: &str) -> StoreResult<ServerRecord> {
        let now = self.clock.now().unwrap_or_else(|| {
            warn!(server = %id, "Clock unavailable, stamping new server with epoch");
            EPOCH
        });

        let record = ServerRecord::new(now);
        self.write(id, &record)?;
        Ok(record)
    }

    /// Delete a record; a record that is already gone is not an error
    pub fn remove(&self, id: &str) -> StoreResult<()> {
        let path = self.resolver.resolve(id)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Server record removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("remove", path, e)),
        }
    }

    /// Identifiers of every stored record, sorted
    ///
    /// A missing servers directory means no records.
    pub fn list(&self) -> StoreResult<Vec<String>> {
        let dir = self.resolver.servers_dir();

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("read directory", dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("read directory", &dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StoreError::io("stat", entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }

            match entry.file_name().into_string() {
                Ok(name) if name.starts_with('.') => continue,
                Ok(name) => ids.push(name),
                Err(name) => {
                    warn!(name = ?name, "Skipping server file with non UTF-8 name");
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    fn write_staged(&self, staging: &Path, record: &ServerRecord) -> StoreResult<()> {
        let file = File::create(staging).map_err(|e| StoreError::io("create", staging, e))?;

        let mut writer = BufWriter::new(file);
        self.codec
            .encode(record, &mut writer)
            .map_err(|source| StoreError::Encode {
                path: staging.to_path_buf(),
                source,
            })?;

        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io("flush", staging, e.into_error()))?;
        file.sync_all()
            .map_err(|e| StoreError::io("sync", staging, e))?;

        Ok(())
    }
}

fn discard(staging: &Path) {
    if let Err(e) = fs::remove_file(staging) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %staging.display(), error = %e, "Failed to remove staging file");
        }
    }
}
