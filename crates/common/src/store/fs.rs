use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use super::{address_for, verified, ContentStore};
use crate::collaborator::CollaboratorError;
use crate::linked_data::ContentAddress;

/// Content store keeping one file per blob, named by cid, under a directory
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, CollaboratorError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            CollaboratorError::Unavailable(format!("failed to create {}: {}", root.display(), e))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn blob_path(&self, address: &ContentAddress) -> PathBuf {
        self.root.join(address.cid().to_string())
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(
        &self,
        data: Bytes,
        filename: Option<&str>,
    ) -> Result<ContentAddress, CollaboratorError> {
        let address = address_for(&data, filename)?;
        let path = self.blob_path(&address);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(address);
        }

        // a blob only appears under its cid once fully written
        let tmp = path.with_extension("partial");
        tokio::fs::write(&tmp, &data)
            .await
            .map_err(|e| CollaboratorError::Unavailable(format!("failed to write blob: {}", e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| CollaboratorError::Unavailable(format!("failed to commit blob: {}", e)))?;

        tracing::debug!("stored {} ({} bytes)", address.cid(), data.len());
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Bytes, CollaboratorError> {
        let path = self.blob_path(address);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CollaboratorError::NotFound(address.cid().to_string()))
            }
            Err(e) => {
                return Err(CollaboratorError::Unavailable(format!(
                    "failed to read blob: {}",
                    e
                )))
            }
        };
        verified(address, Bytes::from(data))
    }
}
