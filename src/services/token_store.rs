// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence of the opaque session token across process restarts.

use crate::error::AppError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fixed key the session token is stored under.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Storage for the session token.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, AppError>;
    fn save(&self, token: &str) -> Result<(), AppError>;
    fn clear(&self) -> Result<(), AppError>;
}

/// In-memory token store, for tests and ephemeral sessions.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    entries: Arc<DashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing token.
    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        store
            .entries
            .insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        store
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(AUTH_TOKEN_KEY).map(|v| v.value().clone()))
    }

    fn save(&self, token: &str) -> Result<(), AppError> {
        self.entries
            .insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), AppError> {
        self.entries.remove(AUTH_TOKEN_KEY);
        Ok(())
    }
}

/// Token store backed by a small JSON file of key/value pairs.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(AppError::Storage(e.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .map_err(|e| AppError::Storage(format!("Corrupt token file: {}", e)))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| AppError::Storage(e.to_string()))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, AppError> {
        Ok(self.read_entries()?.remove(AUTH_TOKEN_KEY))
    }

    fn save(&self, token: &str) -> Result<(), AppError> {
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(AUTH_TOKEN_KEY.to_string(), token.to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), AppError> {
        // An unreadable file is discarded along with the token.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.remove(AUTH_TOKEN_KEY);
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AppError::Storage(e.to_string())),
            };
        }
        self.write_entries(&entries)
    }
}
