//! File uploads and deletions against blob storage, addressed by download URLs.

use std::sync::Arc;

use uuid::Uuid;

use docbridge::blob::{BlobStorage, FileUrl};

use crate::{
    deadline::Deadline,
    error::{ApiError, ApiResult},
};

/// Folder used when an upload names none.
pub const DEFAULT_FOLDER: &str = "uploads";

/// A file received from a client.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct FileService {
    blobs: Arc<dyn BlobStorage>,
    url_base: String,
    deadline: Deadline,
}

impl FileService {
    pub fn new(blobs: Arc<dyn BlobStorage>, url_base: impl Into<String>, deadline: Deadline) -> Self {
        Self {
            blobs,
            url_base: url_base.into(),
            deadline,
        }
    }

    /// Stores `upload` at `<folder>/<uuid>_<file name>` under a fresh download token.
    pub async fn upload(&self, upload: Option<Upload>, folder: Option<&str>) -> ApiResult<FileUrl> {
        let upload = upload.ok_or_else(|| ApiError::validation("No file uploaded"))?;
        let folder = normalize_folder(folder)?;
        let path = format!(
            "{}/{}_{}",
            folder,
            Uuid::new_v4().simple(),
            sanitize_file_name(&upload.file_name)
        );
        let token = Uuid::new_v4().to_string();

        let object = self
            .deadline
            .run(
                self.blobs
                    .put_object(&path, upload.bytes, upload.content_type, &token),
            )
            .await?;

        tracing::info!(path = %object.path, size = object.size, "file uploaded");

        Ok(FileUrl::new(&self.url_base, self.blobs.bucket(), &object))
    }

    /// Deletes the object a download URL points at.
    ///
    /// Only the object path is taken from the URL; the object is always looked up in the
    /// configured bucket.
    pub async fn delete(&self, file_url: &str) -> ApiResult<()> {
        if file_url.trim().is_empty() {
            return Err(ApiError::validation("File URL is required"));
        }

        let url = FileUrl::parse(file_url.trim())
            .map_err(|e| ApiError::validation(format!("\"fileUrl\" is invalid, {e}")))?;

        self.deadline
            .run(self.blobs.delete_object(&url.path))
            .await?;

        tracing::info!(path = %url.path, "file deleted");

        Ok(())
    }
}

fn normalize_folder(folder: Option<&str>) -> ApiResult<String> {
    let folder = folder.map(|f| f.trim().trim_matches('/')).unwrap_or_default();

    if folder.is_empty() {
        return Ok(DEFAULT_FOLDER.to_string());
    }
    if folder
        .split('/')
        .any(|segment| segment.trim().is_empty() || segment == "." || segment == "..")
    {
        return Err(ApiError::validation("\"folder\" must be a relative path of non-empty segments"));
    }

    Ok(folder.to_string())
}

fn sanitize_file_name(name: &str) -> String {
    let name = name.trim().replace(['/', '\\'], "_");

    if name.is_empty() { "file".to_string() } else { name }
}
