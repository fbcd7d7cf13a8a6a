use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::MediaConfig;

/// Route prefix the public media directory is served under
pub const MEDIA_ROUTE: &str = "/media";

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid media URL: {0}")]
    InvalidUrl(String),

    #[error("Media not managed by this storage: {0}")]
    Foreign(String),
}

/// A stored media object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaAsset {
    pub url: String,
    /// Playback length in seconds when the backend can determine it
    pub duration: Option<f64>,
}

/// Remote media storage seam. Uploads take a staged local file; the caller owns its cleanup.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<MediaAsset, MediaError>;

    async fn delete(&self, url: &str) -> Result<(), MediaError>;
}

/// Stores media in a local directory that the router serves statically
pub struct LocalMediaStorage {
    public_dir: PathBuf,
    base_url: Url,
}

impl LocalMediaStorage {
    pub fn new(public_dir: impl Into<PathBuf>, base_url: &str) -> Result<Self, MediaError> {
        let mut base_url = Url::parse(base_url).map_err(|e| MediaError::InvalidUrl(e.to_string()))?;
        // Url::join replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { public_dir: public_dir.into(), base_url })
    }

    pub fn from_config(config: &MediaConfig) -> Result<Self, MediaError> {
        Self::new(&config.public_dir, &config.public_base_url)
    }

    fn url_for(&self, file_name: &str) -> Result<Url, MediaError> {
        let relative = format!("{}/{}", MEDIA_ROUTE.trim_start_matches('/'), file_name);
        self.base_url.join(&relative).map_err(|e| MediaError::InvalidUrl(e.to_string()))
    }

    /// Map a URL produced by [`LocalMediaStorage::upload`] back to its file
    fn file_for(&self, url: &str) -> Result<PathBuf, MediaError> {
        let parsed = Url::parse(url).map_err(|e| MediaError::InvalidUrl(format!("{}: {}", url, e)))?;
        let mut segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let file_name = segments.pop().ok_or_else(|| MediaError::Foreign(url.to_string()))?;
        let parent = segments.pop();

        let managed = parent == Some(MEDIA_ROUTE.trim_start_matches('/'))
            && file_name != ".."
            && !file_name.contains('\\');
        if !managed {
            return Err(MediaError::Foreign(url.to_string()));
        }
        Ok(self.public_dir.join(file_name))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn upload(&self, local_path: &Path) -> Result<MediaAsset, MediaError> {
        tokio::fs::create_dir_all(&self.public_dir).await?;

        let file_name = match local_path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
            None => Uuid::new_v4().to_string(),
        };
        let bytes = tokio::fs::copy(local_path, self.public_dir.join(&file_name)).await?;
        let url = self.url_for(&file_name)?;

        info!("Stored media {} ({} bytes)", file_name, bytes);
        Ok(MediaAsset { url: url.to_string(), duration: None })
    }

    async fn delete(&self, url: &str) -> Result<(), MediaError> {
        let path = self.file_for(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted media {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Media already gone: {}", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
