//! Durable account collection.
//!
//! The whole collection is one JSON document. Every mutation rewrites it
//! through a temp file in the same directory followed by a rename, so readers
//! only ever see a complete snapshot.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::{fs, io::AsyncWriteExt, sync::Mutex};
use tracing::{debug, instrument, Instrument};
use ulid::Ulid;

use super::{
    error::StoreError,
    model::{Account, StoreDocument},
};

#[derive(Debug)]
pub struct AccountRepository {
    path: PathBuf,
    // Serializes read-check-write in `append`
    write_lock: Mutex<()>,
}

impl AccountRepository {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All accounts in registration order. A missing store is empty.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the file exists but cannot be read and
    /// [`StoreError::Format`] if it is not a valid store document.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load_all(&self) -> Result<Vec<Account>, StoreError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Account store does not exist yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let document: StoreDocument =
            serde_json::from_slice(&raw).map_err(|source| StoreError::Format {
                path: self.path.clone(),
                source,
            })?;

        Ok(document.users)
    }

    /// # Errors
    /// Same as [`AccountRepository::load_all`].
    pub async fn exists_by_username(&self, username: &str) -> Result<bool, StoreError> {
        Ok(self
            .load_all()
            .await?
            .iter()
            .any(|account| account.username == username))
    }

    /// # Errors
    /// Same as [`AccountRepository::load_all`].
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .find(|account| account.username == username))
    }

    /// Add a new account, enforcing username uniqueness against the current
    /// contents of the store.
    ///
    /// # Errors
    /// Returns [`StoreError::Conflict`] without writing anything if the username
    /// is taken, or an I/O / format error from reading or writing the store.
    #[instrument(skip(self, account), fields(path = %self.path.display(), username = %account.username))]
    pub async fn append(&self, account: Account) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .instrument(tracing::debug_span!("store.lock"))
            .await;

        let mut users = self.load_all().await?;

        if users.iter().any(|existing| existing.username == account.username) {
            debug!("Username conflict");
            return Err(StoreError::Conflict(account.username));
        }

        users.push(account);
        self.write_all(&StoreDocument { users }).await?;

        debug!("Account appended");

        Ok(())
    }

    async fn write_all(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let contents = encode(document).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "users.json".into(), |name| name.to_string_lossy());
        let tmp_path = dir.join(format!(".{file_name}.{}.tmp", Ulid::new()));

        if let Err(e) = write_synced(&tmp_path, &contents).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::io(&tmp_path, e));
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::io(&self.path, e));
        }

        Ok(())
    }
}

/// Four-space indented JSON, UTF-8 kept as is.
fn encode(document: &StoreDocument) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    document.serialize(&mut serializer)?;
    Ok(buf)
}

async fn write_synced(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}
