//! Persistent storage for the access and refresh tokens
//!
//! Holds exactly two string keys (`auth_token`, `refresh_token`) in a JSON
//! object. File-backed stores write atomically (temp file + rename) so a crash
//! mid-write never leaves a truncated token file. A tokio Mutex serializes
//! writes from login, refresh and logout.
//!
//! `TokenStore::in_memory()` keeps the same API without touching disk, which is
//! what tests and throwaway sessions use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::constants::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::{Error, Result};

/// The two keys the store knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    /// Key name as written to storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKey::Access => ACCESS_TOKEN_KEY,
            TokenKey::Refresh => REFRESH_TOKEN_KEY,
        }
    }
}

/// Token storage, optionally backed by a file.
pub struct TokenStore {
    path: Option<PathBuf>,
    state: Mutex<HashMap<String, String>>,
}

impl TokenStore {
    /// Load tokens from the given file path.
    ///
    /// If the file doesn't exist, creates it as `{}` (cold start, nobody
    /// logged in). Parent directories are created as needed.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading token file: {e}")))?;
            let tokens: HashMap<String, String> = serde_json::from_str(&contents)
                .map_err(|e| Error::TokenFileParse(format!("parsing token file: {e}")))?;
            info!(path = %path.display(), keys = tokens.len(), "loaded token file");
            tokens
        } else {
            info!(path = %path.display(), "token file not found, starting signed out");
            let tokens = HashMap::new();
            write_atomic(&path, &tokens).await?;
            tokens
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a clone of a stored token.
    pub async fn get(&self, key: TokenKey) -> Option<String> {
        let state = self.state.lock().await;
        state.get(key.as_str()).cloned()
    }

    /// Store a token and persist.
    pub async fn set(&self, key: TokenKey, value: String) -> Result<()> {
        let mut state = self.state.lock().await;
        state.insert(key.as_str().to_string(), value);
        debug!(key = key.as_str(), "stored token");
        self.persist(&state).await
    }

    /// Remove a token and persist. Returns the removed value if it existed.
    pub async fn remove(&self, key: TokenKey) -> Result<Option<String>> {
        let mut state = self.state.lock().await;
        let removed = state.remove(key.as_str());
        if removed.is_some() {
            debug!(key = key.as_str(), "removed token");
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    /// Remove both tokens in a single write.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_empty() {
            return Ok(());
        }
        state.clear();
        debug!("cleared stored tokens");
        self.persist(&state).await
    }

    async fn persist(&self, state: &HashMap<String, String>) -> Result<()> {
        match &self.path {
            Some(path) => write_atomic(path, state).await,
            None => Ok(()),
        }
    }
}

/// Write the token map to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Permissions are 0600 on unix since the file holds bearer tokens.
async fn write_atomic(path: &Path, data: &HashMap<String, String>) -> Result<()> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| Error::TokenFileParse(format!("serializing tokens: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("token path has no parent directory".into()))?;
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::Io(format!("creating token directory: {e}")))?;
    }

    let tmp_path = dir.join(format!(".tokens.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp token file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting token file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp token file: {e}")))?;

    debug!(path = %path.display(), "persisted tokens");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let store = TokenStore::load(path.clone()).await.unwrap();
        store.set(TokenKey::Access, "at_1".into()).await.unwrap();
        store.set(TokenKey::Refresh, "rt_1".into()).await.unwrap();

        let reloaded = TokenStore::load(path.clone()).await.unwrap();
        assert_eq!(reloaded.get(TokenKey::Access).await.as_deref(), Some("at_1"));
        assert_eq!(reloaded.get(TokenKey::Refresh).await.as_deref(), Some("rt_1"));

        // Keys on disk match the names the backend-facing code expects
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["auth_token"], "at_1");
        assert_eq!(parsed["refresh_token"], "rt_1");
    }

    #[tokio::test]
    async fn cold_start_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tokens.json");

        assert!(!path.exists());
        let store = TokenStore::load(path.clone()).await.unwrap();
        assert!(store.get(TokenKey::Access).await.is_none());
        assert!(path.exists());

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: HashMap<String, String> = serde_json::from_str(&contents).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let result = TokenStore::load(path).await;
        assert!(matches!(result, Err(Error::TokenFileParse(_))));
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let store = TokenStore::in_memory();
        store.set(TokenKey::Access, "at".into()).await.unwrap();
        store.set(TokenKey::Refresh, "rt".into()).await.unwrap();

        let removed = store.remove(TokenKey::Access).await.unwrap();
        assert_eq!(removed.as_deref(), Some("at"));
        assert!(store.remove(TokenKey::Access).await.unwrap().is_none());

        store.clear().await.unwrap();
        assert!(store.get(TokenKey::Refresh).await.is_none());
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn clear_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let store = TokenStore::load(path.clone()).await.unwrap();
        store.set(TokenKey::Access, "at".into()).await.unwrap();
        store.set(TokenKey::Refresh, "rt".into()).await.unwrap();
        store.clear().await.unwrap();

        let reloaded = TokenStore::load(path).await.unwrap();
        assert!(reloaded.get(TokenKey::Access).await.is_none());
        assert!(reloaded.get(TokenKey::Refresh).await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_permissions_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let store = TokenStore::load(path.clone()).await.unwrap();
        store.set(TokenKey::Access, "at".into()).await.unwrap();

        let metadata = tokio::fs::metadata(&path).await.unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "token file must be 0600, got {mode:o}");
    }
}
