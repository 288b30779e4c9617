//! Content-addressed blob storage
//!
//! Blobs are addressed by a CIDv1 (raw codec, BLAKE3 multihash) of their
//!  bytes; the filename only decorates the resulting URI. Stores verify the
//!  hash on every read so a corrupted or substituted blob never makes it back
//!  to the caller.

mod fs;
mod memory;

use async_trait::async_trait;
use bytes::Bytes;

use crate::collaborator::CollaboratorError;
use crate::linked_data::ContentAddress;

pub use fs::FsContentStore;
pub use memory::MemoryContentStore;

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `data` and return its address. Putting the same bytes twice
    ///  yields the same cid.
    async fn put(
        &self,
        data: Bytes,
        filename: Option<&str>,
    ) -> Result<ContentAddress, CollaboratorError>;

    /// Fetch the bytes behind `address`
    async fn get(&self, address: &ContentAddress) -> Result<Bytes, CollaboratorError>;
}

fn address_for(data: &[u8], filename: Option<&str>) -> Result<ContentAddress, CollaboratorError> {
    ContentAddress::for_bytes(data, filename.map(str::to_string))
        .map_err(|e| CollaboratorError::Default(anyhow::anyhow!(e)))
}

fn verified(address: &ContentAddress, data: Bytes) -> Result<Bytes, CollaboratorError> {
    if !address.verify(&data) {
        return Err(CollaboratorError::Rejected(format!(
            "content does not match {}",
            address.cid()
        )));
    }
    Ok(data)
}
