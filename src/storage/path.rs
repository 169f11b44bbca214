//! Mapping from server identifiers to record paths

use std::path::{Path, PathBuf};

use super::error::PathError;

/// Maximum path length, including the terminating NUL, on the platforms we run on
pub const DEFAULT_MAX_PATH_LEN: usize = 4096;

/// Directory under the root holding one file per server
pub const SERVERS_DIR: &str = "servers";

/// Resolves server identifiers to `<root>/servers/<id>`
///
/// The identifier is used verbatim as a path segment. Legality of the
/// identifier is the caller's business; the only check performed is the
/// total length.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
    max_len: usize,
}

impl PathResolver {
    /// Create a resolver with the default maximum path length
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_max_len(root, DEFAULT_MAX_PATH_LEN)
    }

    /// Create a resolver with a custom maximum path length
    pub fn with_max_len(root: impl Into<PathBuf>, max_len: usize) -> Self {
        Self {
            root: root.into(),
            max_len,
        }
    }

    /// Record path for a server
    pub fn resolve(&self, id: &str) -> Result<PathBuf, PathError> {
        self.bounded(self.servers_dir().join(id))
    }

    /// Staging path used while a record is being rewritten
    pub fn staging(&self, id: &str) -> Result<PathBuf, PathError> {
        self.bounded(self.servers_dir().join(format!(".{id}.tmp")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn servers_dir(&self) -> PathBuf {
        self.root.join(SERVERS_DIR)
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    // One byte is kept for the NUL terminator the OS needs.
    fn bounded(&self, path: PathBuf) -> Result<PathBuf, PathError> {
        let len = path.as_os_str().len();
        if len >= self.max_len {
            return Err(PathError::TooLong {
                path: self.root.display().to_string(),
                len,
                max: self.max_len.saturating_sub(1),
            });
        }
        Ok(path)
    }
}
