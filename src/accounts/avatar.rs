//! Avatar media storage.
//!
//! Only the extension of the declared filename is trusted, and only after it
//! matched the allow-list. The stored name is always `<uuid>.<ext>`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::{
    fs,
    io::{AsyncWrite, AsyncWriteExt},
};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::error::StoreError;

static ALLOWED_EXTENSION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif)$").ok());

/// A file received from the client, as extracted by the HTTP shell.
#[derive(Debug, Clone, Default)]
pub struct AvatarUpload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct AvatarStore {
    media_root: PathBuf,
    url_prefix: String,
    default_avatar: String,
}

/// Lowercased extension of `filename` if it is an allowed image type.
#[must_use]
pub fn allowed_extension(filename: &str) -> Option<String> {
    ALLOWED_EXTENSION
        .as_ref()?
        .captures(filename)
        .and_then(|captures| captures.get(1))
        .map(|ext| ext.as_str().to_ascii_lowercase())
}

impl AvatarStore {
    #[must_use]
    pub fn new(
        media_root: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
        default_avatar: impl Into<String>,
    ) -> Self {
        Self {
            media_root: media_root.into(),
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            default_avatar: default_avatar.into(),
        }
    }

    #[must_use]
    pub fn media_root(&self) -> &Path {
        &self.media_root
    }

    /// URL prefix without a trailing slash, e.g. `/static/avatars`.
    #[must_use]
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Store an upload under a generated name.
    ///
    /// `Ok(None)` means "use the default avatar": no upload, an empty upload or
    /// a filename without an allowed extension. Nothing is written in that case.
    ///
    /// # Errors
    /// Returns [`StoreError::Io`] if the media root cannot be created or the file
    /// cannot be written.
    #[instrument(skip(self, upload), fields(media_root = %self.media_root.display()))]
    pub async fn accept(&self, upload: Option<AvatarUpload>) -> Result<Option<String>, StoreError> {
        let Some(upload) = upload else {
            return Ok(None);
        };

        let filename = upload.filename.as_deref().unwrap_or_default();
        if filename.is_empty() || upload.bytes.is_empty() {
            debug!("Empty avatar upload, using default");
            return Ok(None);
        }

        let Some(ext) = allowed_extension(filename) else {
            warn!("Rejected avatar with disallowed extension");
            return Ok(None);
        };

        fs::create_dir_all(&self.media_root)
            .await
            .map_err(|e| StoreError::io(&self.media_root, e))?;

        let stored_name = format!("{}.{ext}", Uuid::new_v4());
        let path = self.media_root.join(&stored_name);

        // create_new: a name collision fails instead of overwriting
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        write_or_remove(file, &path, &upload.bytes).await?;

        debug!(stored_name = %stored_name, size = upload.bytes.len(), "Stored avatar");

        Ok(Some(stored_name))
    }

    /// Whether the default avatar is present in the media root. Accounts
    /// without an upload link to it.
    pub async fn has_default_avatar(&self) -> bool {
        fs::metadata(self.media_root.join(&self.default_avatar))
            .await
            .is_ok_and(|metadata| metadata.is_file())
    }

    /// Public reference for a stored avatar, or the default one.
    #[must_use]
    pub fn url_for(&self, stored_name: Option<&str>) -> String {
        format!(
            "{}/{}",
            self.url_prefix,
            stored_name.unwrap_or(&self.default_avatar)
        )
    }

    /// Remove an avatar written by [`AvatarStore::accept`]. Failures are logged.
    pub async fn discard(&self, stored_name: &str) {
        // Only names we generated, never a path
        if stored_name.contains(['/', '\\']) || stored_name.starts_with('.') {
            warn!(stored_name, "Refusing to discard suspicious avatar name");
            return;
        }

        let path = self.media_root.join(stored_name);
        if let Err(e) = fs::remove_file(&path).await {
            warn!("Failed to discard avatar {}: {}", path.display(), e);
        }
    }
}

/// Write `bytes` through `writer`; on failure the partial file at `path` is
/// removed before the error is returned.
async fn write_or_remove<W>(mut writer: W, path: &Path, bytes: &[u8]) -> Result<(), StoreError>
where
    W: AsyncWrite + Unpin,
{
    let written: std::io::Result<()> = async {
        writer.write_all(bytes).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(writer);
        if let Err(remove_err) = fs::remove_file(path).await {
            warn!("Failed to remove partial avatar {}: {}", path.display(), remove_err);
        }
        return Err(StoreError::io(path, e));
    }

    Ok(())
}
