//! In-memory blob storage.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use mea::rwlock::RwLock;

use docbridge_core::blob::{BlobResult, BlobStorage, BlobStoreError, StoredObject};

/// Thread-safe in-memory [`BlobStorage`] for a single bucket.
///
/// Clones share the same objects.
#[derive(Debug, Clone)]
pub struct InMemoryBlobStorage {
    bucket: String,
    objects: Arc<RwLock<HashMap<String, (StoredObject, Vec<u8>)>>>,
}

impl InMemoryBlobStorage {
    /// Creates an empty storage for `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the paths of every stored object, sorted.
    pub async fn paths(&self) -> Vec<String> {
        let mut paths = self
            .objects
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();

        paths.sort();
        paths
    }
}

fn check_path(path: &str) -> BlobResult<()> {
    if path.is_empty() || path.starts_with('/') || path.split('/').any(str::is_empty) {
        return Err(BlobStoreError::InvalidPath(path.to_string()));
    }

    Ok(())
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        download_token: &str,
    ) -> BlobResult<StoredObject> {
        check_path(path)?;

        let object = StoredObject {
            path: path.to_string(),
            content_type,
            download_token: download_token.to_string(),
            size: bytes.len(),
        };

        self.objects
            .write()
            .await
            .insert(path.to_string(), (object.clone(), bytes));

        Ok(object)
    }

    async fn get_object(&self, path: &str) -> BlobResult<Option<(StoredObject, Vec<u8>)>> {
        check_path(path)?;

        Ok(self.objects.read().await.get(path).cloned())
    }

    async fn delete_object(&self, path: &str) -> BlobResult<()> {
        check_path(path)?;

        match self.objects.write().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(BlobStoreError::ObjectNotFound(path.to_string())),
        }
    }
}
