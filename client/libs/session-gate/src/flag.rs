//! Persistent session flag
//!
//! A single value survives restarts: whether the last known state was
//! signed in. It lets startup redirect to sign-in before the network check
//! finishes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SessionError, SessionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionFlag {
    SignedIn,
    LoggedOut,
}

pub trait SessionFlagStore: Send + Sync {
    /// `None` when no flag was ever stored
    fn load(&self) -> SessionResult<Option<SessionFlag>>;

    fn store(&self, flag: SessionFlag) -> SessionResult<()>;
}

#[derive(Default)]
pub struct MemorySessionFlagStore {
    flag: Mutex<Option<SessionFlag>>,
}

impl MemorySessionFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(flag: SessionFlag) -> Self {
        Self {
            flag: Mutex::new(Some(flag)),
        }
    }
}

impl SessionFlagStore for MemorySessionFlagStore {
    fn load(&self) -> SessionResult<Option<SessionFlag>> {
        Ok(*self.flag.lock())
    }

    fn store(&self, flag: SessionFlag) -> SessionResult<()> {
        *self.flag.lock() = Some(flag);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FlagFile {
    flag: SessionFlag,
}

/// Flag kept as a small JSON document on disk
pub struct FileSessionFlagStore {
    path: PathBuf,
}

impl FileSessionFlagStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionFlagStore for FileSessionFlagStore {
    fn load(&self) -> SessionResult<Option<SessionFlag>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::FlagStore(e.to_string())),
        };

        let file: FlagFile =
            serde_json::from_str(&raw).map_err(|e| SessionError::FlagStore(e.to_string()))?;
        Ok(Some(file.flag))
    }

    fn store(&self, flag: SessionFlag) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| SessionError::FlagStore(e.to_string()))?;
            }
        }

        let raw = serde_json::to_string(&FlagFile { flag })
            .map_err(|e| SessionError::FlagStore(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| SessionError::FlagStore(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemorySessionFlagStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.store(SessionFlag::SignedIn).unwrap();
        assert_eq!(store.load().unwrap(), Some(SessionFlag::SignedIn));
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionFlagStore::new(dir.path().join("state/session.json"));

        assert_eq!(store.load().unwrap(), None);
        store.store(SessionFlag::LoggedOut).unwrap();
        assert_eq!(store.load().unwrap(), Some(SessionFlag::LoggedOut));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"flag":"logged_out"}"#);
    }

    #[test]
    fn test_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "[]").unwrap();

        let store = FileSessionFlagStore::new(path);
        assert!(matches!(store.load(), Err(SessionError::FlagStore(_))));
    }
}
