//! Credential file I/O.
//!
//! Two files are involved:
//! - the record file, `TokenCache` in the working directory by default
//! - the token cache slot, `~/.IdentityService/<name>.json`
//!
//! A missing or undecodable file is a cache miss. Any other I/O failure
//! (permission denied, path is a directory, ...) is reported to the caller.

use copilot_core::{AuthenticationRecord, RecordError, TokenCacheSlot};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cannot access credential file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode credential data: {0}")]
    Encode(#[from] RecordError),
}

// =============================================================================
// RECORD FILE
// =============================================================================

/// Outcome of reading the record file.
#[derive(Debug)]
pub enum RecordLoad {
    Found(AuthenticationRecord),
    Absent,
    /// The file exists but does not hold a usable record. It is left on disk.
    Corrupt(String),
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<RecordLoad, CacheError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(RecordLoad::Absent),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        Ok(match AuthenticationRecord::from_bytes(&bytes) {
            Ok(record) => RecordLoad::Found(record),
            Err(e) => RecordLoad::Corrupt(e.to_string()),
        })
    }

    /// Overwrite the record file.
    pub fn save(&self, record: &AuthenticationRecord) -> Result<(), CacheError> {
        write_replacing(&self.path, &record.to_bytes()?)
    }
}

// =============================================================================
// TOKEN CACHE SLOT
// =============================================================================

#[derive(Debug, Clone)]
pub struct TokenCacheStore {
    path: PathBuf,
}

impl TokenCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for a named slot under the user's home directory, or the
    /// working directory when there is none.
    pub fn named(name: &str) -> Self {
        let file = format!("{name}.json");
        let path = dirs::home_dir()
            .map(|home| home.join(".IdentityService").join(&file))
            .unwrap_or_else(|| PathBuf::from(file));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the slot. Missing or undecodable content yields an empty slot.
    pub fn load(&self) -> Result<TokenCacheSlot, CacheError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(TokenCacheSlot::from_bytes(&bytes).unwrap_or_else(|e| {
                tracing::warn!(
                    event = "token_cache_reset",
                    path = %self.path.display(),
                    "Ignoring unreadable token cache: {}",
                    e
                );
                TokenCacheSlot::default()
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(TokenCacheSlot::default()),
            Err(source) => Err(CacheError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    pub fn save(&self, slot: &TokenCacheSlot) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write_replacing(&self.path, &slot.to_bytes()?)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Write through a sibling temp file and rename over the target, so readers
/// never observe a half-written file. Owner-only permissions on Unix.
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    {
        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }

    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        io_err(source)
    })
}

// =============================================================================
// TESTS
// =============================================================================
