use std::path::{Path, PathBuf};

use folio_db::CoreError;
use tokio::fs;
use tracing::{info, warn};

/// On-disk store for uploaded media.
///
/// Every file lives flat under the upload root as `{uuid}.{ext}` and is
/// exposed at `{base_url}/uploads/{name}`, so previously issued URLs stay
/// resolvable across restarts.
pub struct MediaStorage {
    dir: PathBuf,
    base_url: String,
}

impl MediaStorage {
    pub async fn new(dir: PathBuf, base_url: impl Into<String>) -> Result<Self, CoreError> {
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CoreError::Internal(anyhow::anyhow!("Failed to create upload folder: {}", e)))?;
        info!("Media storage directory: {}", dir.display());
        Ok(Self {
            dir,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("{}/uploads/{}", self.base_url, name)
    }

    pub async fn store(&self, name: &str, data: &[u8]) -> Result<(), CoreError> {
        fs::write(self.file_path(name), data)
            .await
            .map_err(|e| CoreError::Internal(anyhow::anyhow!("Failed to save file: {}", e)))
    }

    /// Resolve a stored URL back to a path under the upload root. Returns
    /// None for anything that would escape the root (path-traversal guard)
    /// or that doesn't look like one of our URLs.
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let name = url.rsplit('/').next()?;
        if name.is_empty() || name == "." || name == ".." {
            return None;
        }
        if name.contains('/') || name.contains('\\') {
            return None;
        }
        let path = self.dir.join(name);
        if !path.starts_with(&self.dir) {
            return None;
        }
        Some(path)
    }

    /// Best-effort removal of the file behind a stored URL. A storage leak is
    /// acceptable over blocking the logical delete, so failures are logged
    /// and swallowed.
    pub async fn remove_url(&self, url: &str) {
        let Some(path) = self.path_for_url(url) else {
            warn!("Refusing to delete media outside upload root: {}", url);
            return;
        };
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media file already gone: {}", path.display());
            }
            Err(e) => {
                warn!("Failed to delete media file {}: {}", path.display(), e);
            }
        }
    }

    /// Remove a file written earlier in a failed upload batch.
    pub async fn remove_file(&self, name: &str) {
        let path = self.file_path(name);
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to clean up media file {}: {}", path.display(), e);
            }
        }
    }
}
