use std::collections::HashMap;
use std::path::{Path, PathBuf};

use axum::{
    async_trait,
    extract::{
        multipart::{Field, MultipartError},
        FromRequest, Multipart, Request,
    },
};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::app::AppState;
use crate::config::MediaConfig;
use crate::error::ApiError;

/// A multipart form with its file parts staged on local disk.
///
/// Staged files live in the configured upload directory and are removed when
/// the form is dropped, i.e. once the handler has finished with them.
#[derive(Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempPath>,
}

impl UploadForm {
    pub async fn from_multipart(mut multipart: Multipart, config: &MediaConfig) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) if !file_name.is_empty() => {
                    // Only the first file per field is kept
                    if form.files.contains_key(&name) {
                        debug!("Ignoring extra file for field {}", name);
                        continue;
                    }
                    let staged = stage_file(field, &file_name, config).await?;
                    form.files.insert(name, staged);
                }
                Some(_) => {}
                None => {
                    let value = field.text().await.map_err(multipart_error)?;
                    form.fields.entry(name).or_insert(value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Path of the staged file for `name`; valid while the form is alive
    pub fn file(&self, name: &str) -> Option<PathBuf> {
        self.files.get(name).map(|path| path.to_path_buf())
    }
}

#[async_trait]
impl FromRequest<AppState> for UploadForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
        Self::from_multipart(multipart, &state.config.media).await
    }
}

async fn stage_file(mut field: Field<'_>, file_name: &str, config: &MediaConfig) -> Result<TempPath, ApiError> {
    let suffix = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    tokio::fs::create_dir_all(&config.upload_dir).await.map_err(staging_error)?;
    let temp = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(&config.upload_dir)
        .map_err(|e| {
            tracing::error!("Could not create temp file in {}: {}", config.upload_dir.display(), e);
            ApiError::internal_server_error("Could not stage upload")
        })?;
    let (file, path) = temp.into_parts();
    let mut file = tokio::fs::File::from_std(file);

    let mut written = 0usize;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
        written += chunk.len();
        if written > config.max_upload_bytes {
            warn!("Upload {} exceeds {} bytes", file_name, config.max_upload_bytes);
            return Err(ApiError::payload_too_large(format!(
                "File exceeds the maximum upload size of {} bytes",
                config.max_upload_bytes
            )));
        }
        file.write_all(&chunk).await.map_err(staging_error)?;
    }
    file.flush().await.map_err(staging_error)?;

    debug!("Staged upload {} ({} bytes) at {}", file_name, written, path.display());
    Ok(path)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("Request body is too large")
    } else {
        ApiError::bad_request(format!("Invalid multipart form: {}", err.body_text()))
    }
}

fn staging_error(err: std::io::Error) -> ApiError {
    tracing::error!("Failed writing staged upload: {}", err);
    ApiError::internal_server_error("Could not stage upload")
}
