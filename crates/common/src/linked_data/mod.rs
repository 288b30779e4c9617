//! Content addressing and canonical encoding.
//!
//! - [`ContentAddress`]: CIDv1 over the BLAKE3 digest of stored bytes,
//!   optionally qualified by a filename the way directory-wrapping gateways
//!   expose uploads (`ipfs://<cid>/<filename>`)
//! - [`ContentHash`]: the raw 32-byte digest of a document address, the
//!   value the chain contract keys ownership by
//! - [`BlockEncoded`]: DAG-CBOR encoding, which is deterministic for a given
//!   value and therefore safe to hash and encrypt

mod address;

pub use address::{
    ContentAddress, ContentAddressError, ContentHash, BLAKE3_MULTIHASH_CODE, IPFS_SCHEME,
    RAW_CODEC,
};
pub use cid::Cid;

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Types that have a canonical DAG-CBOR byte form
pub trait BlockEncoded: Serialize + DeserializeOwned {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        serde_ipld_dagcbor::to_vec(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(data: &[u8]) -> Result<Self, CodecError> {
        serde_ipld_dagcbor::from_slice(data).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
