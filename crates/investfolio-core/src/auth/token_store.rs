use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fixed storage key for the bearer token. Used as the file stem and as
/// the keychain entry name.
pub const TOKEN_KEY: &str = "auth_token";

/// Keychain service name
const SERVICE_NAME: &str = "investfolio";

/// Opaque bearer token. Never inspected or validated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Persistent home of the single live credential.
///
/// `get` never fails: an unreadable backend is reported as "no credential".
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<Credential>;
    fn set(&self, credential: &Credential) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// In-process store. Nothing survives the process.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<Credential> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn set(&self, credential: &Credential) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))?;
        *slot = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("Token store lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct TokenFile {
    token: Credential,
}

/// JSON file in the cache directory, readable by the owner only.
pub struct FileTokenStore {
    token_path: PathBuf,
}

impl FileTokenStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            token_path: cache_dir.join(format!("{}.json", TOKEN_KEY)),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.token_path
    }

    fn read(&self) -> Result<Option<Credential>> {
        if !self.token_path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.token_path).context("Failed to read token file")?;
        let file: TokenFile = serde_json::from_str(&contents).context("Failed to parse token file")?;
        Ok(Some(file.token))
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<Credential> {
        match self.read() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, path = ?self.token_path, "Ignoring unreadable token file");
                None
            }
        }
    }

    fn set(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
        let contents = serde_json::to_string_pretty(&TokenFile {
            token: credential.clone(),
        })?;
        fs::write(&self.token_path, contents).context("Failed to save token")?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.token_path)
                .context("Failed to get token file permissions")?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.token_path, perms)
                .context("Failed to set token file permissions")?;
        }

        debug!(path = ?self.token_path, "Token saved");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path).context("Failed to delete token file")?;
            debug!(path = ?self.token_path, "Token deleted");
        }
        Ok(())
    }
}

/// OS keychain entry.
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, TOKEN_KEY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Option<Credential> {
        let entry = match self.entry() {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Keychain unavailable");
                return None;
            }
        };
        match entry.get_password() {
            Ok(token) => Some(Credential::new(token)),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read token from keychain");
                None
            }
        }
    }

    fn set(&self, credential: &Credential) -> Result<()> {
        self.entry()?
            .set_password(credential.as_str())
            .context("Failed to store token in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "investfolio-token-test-{}-{}",
            std::process::id(),
            name
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = Credential::new("secret-token");
        assert_eq!(format!("{:?}", cred), "Credential(<redacted>)");
        assert_eq!(cred.as_str(), "secret-token");
    }

    #[test]
    fn test_memory_store_set_get_clear() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());

        store.set(&Credential::new("t1")).unwrap();
        assert_eq!(store.get(), Some(Credential::new("t1")));

        store.set(&Credential::new("t2")).unwrap();
        assert_eq!(store.get(), Some(Credential::new("t2")));

        store.clear().unwrap();
        assert!(store.get().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = temp_cache_dir("round-trip");
        let store = FileTokenStore::new(dir.clone());
        assert!(store.get().is_none());

        store.set(&Credential::new("file-token")).unwrap();
        assert!(store.path().ends_with("auth_token.json"));

        // A fresh handle sees the persisted value
        let reopened = FileTokenStore::new(dir.clone());
        assert_eq!(reopened.get(), Some(Credential::new("file-token")));

        reopened.clear().unwrap();
        assert!(store.get().is_none());
        assert!(!store.path().exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_cache_dir("perms");
        let store = FileTokenStore::new(dir.clone());
        store.set(&Credential::new("t")).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_store_corrupt_file_reads_as_absent() {
        let dir = temp_cache_dir("corrupt");
        fs::create_dir_all(&dir).unwrap();
        let store = FileTokenStore::new(dir.clone());
        fs::write(store.path(), "not json").unwrap();

        assert!(store.get().is_none());
        store.clear().unwrap();

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_keyring_store_persists_between_handles() {
        let service = format!("investfolio-test-{}", std::process::id());
        let store = KeyringTokenStore {
            service: service.clone(),
        };
        if let Err(e) = store.set(&Credential::new("kr-token")) {
            // No keychain service reachable on this machine
            eprintln!("skipping keyring test: {:#}", e);
            return;
        }

        let reopened = KeyringTokenStore { service };
        assert_eq!(reopened.get(), Some(Credential::new("kr-token")));

        reopened.clear().unwrap();
        assert!(store.get().is_none());
        reopened.clear().unwrap();
    }
}
