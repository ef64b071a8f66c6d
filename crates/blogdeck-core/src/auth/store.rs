//! Durable storage for the session token.
//!
//! One named entry holds the raw token string; absence means "no session".
//! Only the session store writes it.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Credential;

/// Service name for the OS keychain entry
const SERVICE_NAME: &str = "blogdeck";

/// Entry name the token is stored under (file name or keychain account)
pub const TOKEN_ENTRY: &str = "token";

pub trait TokenStore: Send + Sync {
    /// Read the persisted token, if any.
    fn load(&self) -> Result<Option<Credential>>;

    /// Persist `credential`, replacing any previous token.
    fn save(&self, credential: &Credential) -> Result<()>;

    /// Remove the persisted token. Succeeds when nothing is stored.
    fn clear(&self) -> Result<()>;
}

/// Which token store the client uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl StorageBackend {
    pub fn open(self, data_dir: PathBuf) -> Arc<dyn TokenStore> {
        match self {
            StorageBackend::File => Arc::new(FileTokenStore::new(data_dir.join(TOKEN_ENTRY))),
            StorageBackend::Keyring => Arc::new(KeyringTokenStore),
            StorageBackend::Memory => Arc::new(MemoryTokenStore::default()),
        }
    }
}

// ============================================================================
// File
// ============================================================================

/// Token kept as a plain file, e.g. `~/.local/share/blogdeck/token`.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {}", self.path.display()))?;
        Ok(Credential::parse(&contents))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&self.path, credential.as_str())
            .with_context(|| format!("Failed to write token file {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict token file permissions")?;
        }

        debug!(path = %self.path.display(), "Token saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove token file {}", self.path.display()))?;
            debug!(path = %self.path.display(), "Token file removed");
        }
        Ok(())
    }
}

// ============================================================================
// OS keychain
// ============================================================================

pub struct KeyringTokenStore;

impl KeyringTokenStore {
    fn entry() -> Result<Entry> {
        Entry::new(SERVICE_NAME, TOKEN_ENTRY).context("Failed to create keyring entry")
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<Credential>> {
        match Self::entry()?.get_password() {
            Ok(token) => Ok(Credential::parse(&token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        Self::entry()?
            .set_password(credential.as_str())
            .context("Failed to store token in keychain")
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local store. Clones share the same slot, so a second session
/// built over a clone sees what the first one persisted.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    slot: Arc<Mutex<Option<Credential>>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: &str) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Credential::parse(token))),
        }
    }

    pub fn peek(&self) -> Option<Credential> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.peek())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(raw: &str) -> Credential {
        Credential::parse(raw).expect("non-blank token")
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join("nested").join(TOKEN_ENTRY));

        assert!(store.load().expect("load empty").is_none());

        store.save(&token("T1")).expect("save");
        assert_eq!(store.load().expect("load").map(|c| c.as_str().to_string()), Some("T1".into()));

        store.save(&token("T2")).expect("overwrite");
        assert_eq!(store.load().expect("load").map(|c| c.as_str().to_string()), Some("T2".into()));

        store.clear().expect("clear");
        assert!(store.load().expect("load cleared").is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_file_store_clear_when_empty_is_ok() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join(TOKEN_ENTRY));
        store.clear().expect("first clear");
        store.clear().expect("second clear");
    }

    #[test]
    fn test_file_store_blank_file_means_no_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(TOKEN_ENTRY);
        std::fs::write(&path, "  \n").expect("write blank");
        let store = FileTokenStore::new(path);
        assert!(store.load().expect("load").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileTokenStore::new(dir.path().join(TOKEN_ENTRY));
        store.save(&token("T1")).expect("save");
        let mode = std::fs::metadata(store.path()).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store_clones_share_slot() {
        let store = MemoryTokenStore::default();
        let other = store.clone();
        store.save(&token("T1")).expect("save");
        assert_eq!(other.peek(), Some(token("T1")));
        other.clear().expect("clear");
        assert!(store.peek().is_none());
    }

    #[test]
    fn test_storage_backend_serde_names() {
        let backend: StorageBackend = serde_json::from_str("\"keyring\"").expect("parse");
        assert_eq!(backend, StorageBackend::Keyring);
        assert_eq!(serde_json::to_string(&StorageBackend::File).expect("serialize"), "\"file\"");
    }
}
