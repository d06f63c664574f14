//! Durable client-side credential store.
//!
//! Plain files under a root directory (default `~/.halo`), one entry per
//! fixed file name:
//!
//! - `token` — session bearer token
//! - `user.json` — cached user object
//! - `api-keys.json` — cached API key collection
//! - `active-key` — the API key attached to metric submissions
//!
//! Reads are tolerant: a missing or unreadable entry is simply absent, never
//! an error. Writes create the root directory on demand and do report
//! failures. The store is a value handed to the adapter at construction, so
//! tests point it at a temp directory instead of the user's home.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::api::types::{ApiKeyRecord, User};

const TOKEN_FILE: &str = "token";
const USER_FILE: &str = "user.json";
const KEYS_FILE: &str = "api-keys.json";
const ACTIVE_KEY_FILE: &str = "active-key";

/// File-backed credential store rooted at a single directory.
#[derive(Debug, Clone)]
pub struct CredStore {
    root: PathBuf,
}

impl CredStore {
    /// Open a store rooted at the given directory. Nothing is created until
    /// the first write.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Open the default store at `~/.halo`. `None` when no home directory
    /// can be determined.
    pub fn open_default() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(".halo")))
    }

    /// The store's root directory.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn write_entry(&self, name: &str, contents: &str) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;
        fs::write(self.path(name), contents)
            .with_context(|| format!("failed to write {name}"))
    }

    fn read_entry(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.path(name)).ok()
    }

    fn remove_entry(&self, name: &str) {
        let _ = fs::remove_file(self.path(name));
    }

    // -----------------------------------------------------------------------
    // Session token
    // -----------------------------------------------------------------------

    /// The persisted bearer token, if any.
    pub fn token(&self) -> Option<String> {
        let token = self.read_entry(TOKEN_FILE)?;
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.write_entry(TOKEN_FILE, token)
    }

    pub fn clear_token(&self) {
        self.remove_entry(TOKEN_FILE);
    }

    // -----------------------------------------------------------------------
    // Cached user
    // -----------------------------------------------------------------------

    /// The cached user object. Absent when never logged in, or when the
    /// cache file is unreadable or malformed.
    pub fn user(&self) -> Option<User> {
        let raw = self.read_entry(USER_FILE)?;
        serde_json::from_str(&raw).ok()
    }

    pub fn set_user(&self, user: &User) -> Result<()> {
        let raw = serde_json::to_string_pretty(user).context("failed to serialize user")?;
        self.write_entry(USER_FILE, &raw)
    }

    // -----------------------------------------------------------------------
    // API key collection
    // -----------------------------------------------------------------------

    /// The cached API key collection. Empty when absent or malformed.
    pub fn api_keys(&self) -> Vec<ApiKeyRecord> {
        let Some(raw) = self.read_entry(KEYS_FILE) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    pub fn set_api_keys(&self, keys: &[ApiKeyRecord]) -> Result<()> {
        let raw = serde_json::to_string_pretty(keys).context("failed to serialize API keys")?;
        self.write_entry(KEYS_FILE, &raw)
    }

    /// Append one record to the cached collection.
    pub fn append_api_key(&self, key: &ApiKeyRecord) -> Result<()> {
        let mut keys = self.api_keys();
        keys.push(key.clone());
        self.set_api_keys(&keys)
    }

    /// Remove the record with the given id from the cached collection.
    /// Returns whether a record was actually removed — removing an absent id
    /// is a no-op, not an error.
    pub fn remove_api_key(&self, id: &str) -> Result<bool> {
        let mut keys = self.api_keys();
        let before = keys.len();
        keys.retain(|k| k.id != id);
        if keys.len() == before {
            return Ok(false);
        }
        self.set_api_keys(&keys)?;
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Active submission key
    // -----------------------------------------------------------------------

    /// The API key attached to metric submissions, if one is selected.
    pub fn active_key(&self) -> Option<String> {
        let key = self.read_entry(ACTIVE_KEY_FILE)?;
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(key.to_string())
        }
    }

    pub fn set_active_key(&self, key: &str) -> Result<()> {
        self.write_entry(ACTIVE_KEY_FILE, key)
    }

    pub fn clear_active_key(&self) {
        self.remove_entry(ACTIVE_KEY_FILE);
    }

    // -----------------------------------------------------------------------
    // Logout
    // -----------------------------------------------------------------------

    /// Clear every persisted credential and cache entry. Best-effort: a
    /// missing file or a failed removal is ignored, so this never fails.
    pub fn clear_session(&self) {
        self.remove_entry(TOKEN_FILE);
        self.remove_entry(USER_FILE);
        self.remove_entry(KEYS_FILE);
        self.remove_entry(ACTIVE_KEY_FILE);
    }
}
