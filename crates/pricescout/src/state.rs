//! Persisted browser session state, one JSON file per region.
//!
//! The state is a snapshot of cookies and local storage taken when a session
//! closes and fed back into the next session for the same region, so consent
//! banners and location prompts do not reappear on every run. Files are read
//! once and overwritten whole; nothing is merged.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionStoreError;

/// A browser cookie as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// Seconds since the epoch; negative for session cookies.
    pub expires: f64,
    pub http_only: bool,
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub name: String,
    pub value: String,
}

/// Local storage for one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginStorage {
    pub origin: String,
    pub local_storage: Vec<StorageEntry>,
}

/// Cookies and local storage captured from a browser context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageState {
    pub cookies: Vec<StoredCookie>,
    pub origins: Vec<OriginStorage>,
}

impl StorageState {
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty() && self.origins.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct SessionFile {
    region: String,
    saved_at: DateTime<Utc>,
    state: StorageState,
}

/// Directory of per-region session files.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding the state for `region_code`.
    pub fn path_for(&self, region_code: &str) -> PathBuf {
        self.dir
            .join(format!("{}_session.json", region_code.to_ascii_lowercase()))
    }

    /// Load saved state. A missing file is a fresh session, not an error.
    pub fn load(&self, region_code: &str) -> Result<Option<StorageState>, SessionStoreError> {
        let path = self.path_for(region_code);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionStoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let file: SessionFile =
            serde_json::from_slice(&bytes).map_err(|source| SessionStoreError::Format {
                path: path.display().to_string(),
                source,
            })?;

        tracing::debug!(
            "Loaded session for {} saved at {} ({} cookies)",
            file.region,
            file.saved_at,
            file.state.cookies.len()
        );
        Ok(Some(file.state))
    }

    /// Overwrite the saved state for `region_code`.
    pub fn save(&self, region_code: &str, state: &StorageState) -> Result<PathBuf, SessionStoreError> {
        let path = self.path_for(region_code);
        let io_err = |source| SessionStoreError::Io {
            path: path.display().to_string(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        let file = SessionFile {
            region: region_code.to_ascii_uppercase(),
            saved_at: Utc::now(),
            state: state.clone(),
        };
        let payload =
            serde_json::to_vec_pretty(&file).map_err(|source| SessionStoreError::Format {
                path: path.display().to_string(),
                source,
            })?;

        // Write then rename so a crash never leaves a half-written file.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, payload).map_err(io_err)?;
        std::fs::rename(&tmp, &path).map_err(io_err)?;

        Ok(path)
    }
}
