//! On-disk credential storage.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

use authpipe_core::error::{Error, StoreError};
use authpipe_core::{AccessToken, CredentialPair, CredentialStore, RefreshToken, Result};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Contents of a scope file.
#[derive(Debug, Serialize, Deserialize)]
struct StoredPair {
    access: AccessToken,
    refresh: RefreshToken,
    saved_at: DateTime<Utc>,
}

/// Credential store that keeps each scope in `<dir>/<scope>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    scope: String,
}

impl FileStore {
    /// Store `scope` under `dir`. The directory is created on first write.
    ///
    /// Scopes become file names, so they may only contain ASCII letters,
    /// digits, `-`, `_` and `.`, and must not start with `.`.
    pub fn new(dir: impl Into<PathBuf>, scope: impl Into<String>) -> Result<Self> {
        let scope = scope.into();
        validate_scope(&scope)?;
        Ok(Self {
            dir: dir.into(),
            scope,
        })
    }

    /// Store `scope` in the platform data directory for `app`
    /// (e.g. `~/.local/share/<app>` on Linux).
    pub fn for_app(app: &str, scope: impl Into<String>) -> Result<Self> {
        let dirs = ProjectDirs::from("", "", app).ok_or_else(|| Error::Config {
            message: "could not determine data directory".to_string(),
        })?;
        Self::new(dirs.data_dir(), scope)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing this scope.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.scope))
    }

    /// When the stored pair was last written, if there is one.
    pub async fn saved_at(&self) -> std::result::Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.read().await?.map(|stored| stored.saved_at))
    }

    async fn read(&self) -> std::result::Result<Option<StoredPair>, StoreError> {
        let contents = match fs::read(self.path()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&contents)?))
    }
}

/// Write `contents` to `temp_path` (owner-only on unix) and move it over
/// `path`. The caller removes `temp_path` on failure.
async fn write_then_rename(
    temp_path: &Path,
    path: &Path,
    contents: &[u8],
) -> std::io::Result<()> {
    fs::write(temp_path, contents).await?;
    #[cfg(unix)]
    fs::set_permissions(temp_path, std::fs::Permissions::from_mode(0o600)).await?;
    fs::rename(temp_path, path).await
}

fn validate_scope(scope: &str) -> Result<()> {
    let valid = !scope.is_empty()
        && !scope.starts_with('.')
        && scope
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::Config {
            message: format!("invalid store scope '{}'", scope),
        })
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    fn scope(&self) -> &str {
        &self.scope
    }

    #[instrument(skip(self), fields(scope = %self.scope))]
    async fn get(&self) -> std::result::Result<Option<CredentialPair>, StoreError> {
        let pair = self
            .read()
            .await?
            .map(|stored| CredentialPair {
                access: stored.access,
                refresh: stored.refresh,
            });
        debug!(found = pair.is_some(), "Read credential file");
        Ok(pair)
    }

    #[instrument(skip(self, pair), fields(scope = %self.scope))]
    async fn set(&self, pair: &CredentialPair) -> std::result::Result<(), StoreError> {
        fs::create_dir_all(&self.dir).await?;

        let stored = StoredPair {
            access: pair.access.clone(),
            refresh: pair.refresh.clone(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&stored)?;

        let path = self.path();
        let temp_path = self
            .dir
            .join(format!(".{}.{}.tmp", self.scope, Uuid::new_v4()));

        if let Err(e) = write_then_rename(&temp_path, &path, &json).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), "Wrote credential file");
        Ok(())
    }

    #[instrument(skip(self), fields(scope = %self.scope))]
    async fn clear(&self) -> std::result::Result<(), StoreError> {
        match fs::remove_file(self.path()).await {
            Ok(()) => {
                debug!("Removed credential file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir, scope: &str) -> FileStore {
        FileStore::new(dir.path(), scope).unwrap()
    }

    #[tokio::test]
    async fn missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, "session");

        assert!(store.get().await.unwrap().is_none());
        assert!(store.saved_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, "session");
        let pair = CredentialPair::new("access-1", "refresh-1");

        store.set(&pair).await.unwrap();

        assert_eq!(store.get().await.unwrap(), Some(pair));
        assert!(store.saved_at().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn set_replaces_whole_pair() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, "session");

        store.set(&CredentialPair::new("a1", "r1")).await.unwrap();
        store.set(&CredentialPair::new("a2", "r2")).await.unwrap();

        let pair = store.get().await.unwrap().unwrap();
        assert_eq!(pair.access.as_str(), "a2");
        assert_eq!(pair.refresh.as_str(), "r2");
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, "session");
        store.set(&CredentialPair::new("a", "r")).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["session.json".to_string()]);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, "session");
        // A directory in the target's place makes the rename fail.
        std::fs::create_dir_all(store.path().join("occupied")).unwrap();

        assert!(store.set(&CredentialPair::new("a", "r")).await.is_err());

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["session.json".to_string()]);
    }

    #[tokio::test]
    async fn scopes_are_isolated() {
        let dir = TempDir::new().unwrap();
        let web = store(&dir, "web");
        let admin = store(&dir, "admin");

        web.set(&CredentialPair::new("web-a", "web-r")).await.unwrap();

        assert!(admin.get().await.unwrap().is_none());
        admin.clear().await.unwrap();
        assert!(web.get().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, "session");
        store.set(&CredentialPair::new("a", "r")).await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.get().await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, "session");
        std::fs::write(store.path(), "{not json").unwrap();

        let err = store.get().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn creates_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("nested/data"), "session").unwrap();

        store.set(&CredentialPair::new("a", "r")).await.unwrap();

        assert!(store.path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_is_owner_only() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir, "session");
        store.set(&CredentialPair::new("a", "r")).await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn scope_validation() {
        assert!(FileStore::new("/tmp", "session").is_ok());
        assert!(FileStore::new("/tmp", "web-app_v2.prod").is_ok());
        assert!(FileStore::new("/tmp", "").is_err());
        assert!(FileStore::new("/tmp", ".hidden").is_err());
        assert!(FileStore::new("/tmp", "../escape").is_err());
        assert!(FileStore::new("/tmp", "a/b").is_err());
    }
}
