use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use super::{address_for, verified, ContentStore};
use crate::collaborator::CollaboratorError;
use crate::linked_data::{Cid, ContentAddress};

/// In-memory content store
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    inner: Arc<RwLock<MemoryContentStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryContentStoreInner {
    blobs: HashMap<Cid, Bytes>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.inner
            .read()
            .map(|inner| inner.blobs.contains_key(cid))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(
        &self,
        data: Bytes,
        filename: Option<&str>,
    ) -> Result<ContentAddress, CollaboratorError> {
        let address = address_for(&data, filename)?;
        let mut inner = self.inner.write().map_err(|e| {
            CollaboratorError::Unavailable(format!("failed to acquire write lock: {}", e))
        })?;
        inner.blobs.insert(*address.cid(), data);
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Bytes, CollaboratorError> {
        let data = {
            let inner = self.inner.read().map_err(|e| {
                CollaboratorError::Unavailable(format!("failed to acquire read lock: {}", e))
            })?;
            inner
                .blobs
                .get(address.cid())
                .cloned()
                .ok_or_else(|| CollaboratorError::NotFound(address.cid().to_string()))?
        };
        verified(address, data)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryContentStore::new();
        let address = store
            .put(Bytes::from_static(b"hello"), Some("hello.txt"))
            .await
            .unwrap();
        assert_eq!(address.filename(), Some("hello.txt"));
        assert_eq!(store.get(&address).await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_same_bytes_same_cid() {
        let store = MemoryContentStore::new();
        let a = store.put(Bytes::from_static(b"x"), None).await.unwrap();
        let b = store.put(Bytes::from_static(b"x"), Some("x.bin")).await.unwrap();
        assert_eq!(a.cid(), b.cid());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing() {
        let store = MemoryContentStore::new();
        let address = ContentAddress::for_bytes(b"nope", None).unwrap();
        assert!(matches!(
            store.get(&address).await,
            Err(CollaboratorError::NotFound(_))
        ));
    }
}
