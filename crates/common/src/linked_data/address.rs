use std::fmt;
use std::str::FromStr;

use cid::Cid;
use multihash::Multihash;

/// Multicodec code for raw binary blocks
pub const RAW_CODEC: u64 = 0x55;
/// Multihash code for BLAKE3-256
pub const BLAKE3_MULTIHASH_CODE: u64 = 0x1e;
/// URI scheme used for content addresses in metadata
pub const IPFS_SCHEME: &str = "ipfs://";

const CONTENT_HASH_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ContentAddressError {
    #[error("invalid cid: {0}")]
    Cid(#[from] cid::Error),
    #[error("invalid multihash: {0}")]
    Multihash(#[from] multihash::Error),
    #[error("not an ipfs uri: {0}")]
    NotIpfsUri(String),
    #[error("digest is {0} bytes, expected 32")]
    DigestSize(usize),
}

/// A content identifier for a stored blob, plus the filename it was stored under (if any)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentAddress {
    cid: Cid,
    filename: Option<String>,
}

impl ContentAddress {
    pub fn new(cid: Cid, filename: Option<String>) -> Self {
        Self { cid, filename }
    }

    /// Compute the address `data` is stored under
    pub fn for_bytes(data: &[u8], filename: Option<String>) -> Result<Self, ContentAddressError> {
        let digest = blake3::hash(data);
        let hash = Multihash::<64>::wrap(BLAKE3_MULTIHASH_CODE, digest.as_bytes())?;
        Ok(Self {
            cid: Cid::new_v1(RAW_CODEC, hash),
            filename,
        })
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Render as `ipfs://<cid>` or `ipfs://<cid>/<filename>`
    pub fn uri(&self) -> String {
        match &self.filename {
            Some(name) => format!("{}{}/{}", IPFS_SCHEME, self.cid, name),
            None => format!("{}{}", IPFS_SCHEME, self.cid),
        }
    }

    /// Parse an `ipfs://` URI as produced by [`ContentAddress::uri`]
    pub fn parse_uri(uri: &str) -> Result<Self, ContentAddressError> {
        let rest = uri
            .strip_prefix(IPFS_SCHEME)
            .ok_or_else(|| ContentAddressError::NotIpfsUri(uri.to_string()))?;
        let (cid, filename) = match rest.split_once('/') {
            Some((cid, name)) if !name.is_empty() => (cid, Some(name.to_string())),
            Some((cid, _)) => (cid, None),
            None => (rest, None),
        };
        Ok(Self {
            cid: Cid::from_str(cid)?,
            filename,
        })
    }

    /// The 32-byte digest of the address
    ///
    /// Fails when the underlying multihash is not 32 bytes long.
    pub fn content_hash(&self) -> Result<ContentHash, ContentAddressError> {
        let digest = self.cid.hash().digest();
        if digest.len() != CONTENT_HASH_SIZE {
            return Err(ContentAddressError::DigestSize(digest.len()));
        }
        let mut buff = [0u8; CONTENT_HASH_SIZE];
        buff.copy_from_slice(digest);
        Ok(ContentHash(buff))
    }

    /// Check that `data` is what this address points at
    pub fn verify(&self, data: &[u8]) -> bool {
        self.cid.hash().code() == BLAKE3_MULTIHASH_CODE
            && self.cid.hash().digest() == blake3::hash(data).as_bytes()
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

/// Raw 32-byte content digest, rendered as `0x`-prefixed hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash([u8; CONTENT_HASH_SIZE]);

impl ContentHash {
    pub fn bytes(&self) -> &[u8; CONTENT_HASH_SIZE] {
        &self.0
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; CONTENT_HASH_SIZE]> for ContentHash {
    fn from(bytes: [u8; CONTENT_HASH_SIZE]) -> Self {
        ContentHash(bytes)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_bytes_same_address() {
        let a = ContentAddress::for_bytes(b"encrypted block", None).unwrap();
        let b = ContentAddress::for_bytes(b"encrypted block", None).unwrap();
        let c = ContentAddress::for_bytes(b"encrypted blocks", None).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.cid(), c.cid());
    }

    #[test]
    fn test_uri_round_trip() {
        let plain = ContentAddress::for_bytes(b"data", None).unwrap();
        assert!(plain.uri().starts_with("ipfs://b"));
        assert_eq!(ContentAddress::parse_uri(&plain.uri()).unwrap(), plain);

        let named = ContentAddress::for_bytes(b"data", Some("metadata.json".into())).unwrap();
        assert!(named.uri().ends_with("/metadata.json"));
        assert_eq!(ContentAddress::parse_uri(&named.uri()).unwrap(), named);
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(matches!(
            ContentAddress::parse_uri("https://ipfs.io/ipfs/abc"),
            Err(ContentAddressError::NotIpfsUri(_))
        ));
        assert!(ContentAddress::parse_uri("ipfs://not-a-cid").is_err());
    }

    #[test]
    fn test_content_hash_is_blake3_digest() {
        let address = ContentAddress::for_bytes(b"block", None).unwrap();
        let hash = address.content_hash().unwrap();
        assert_eq!(hash.bytes(), blake3::hash(b"block").as_bytes());
        assert_eq!(hash.to_hex().len(), 2 + 64);
    }

    #[test]
    fn test_content_hash_rejects_short_digest() {
        let hash = Multihash::<64>::wrap(BLAKE3_MULTIHASH_CODE, &[1u8; 20]).unwrap();
        let address = ContentAddress::new(Cid::new_v1(RAW_CODEC, hash), None);
        assert!(matches!(
            address.content_hash(),
            Err(ContentAddressError::DigestSize(20))
        ));
    }

    #[test]
    fn test_verify() {
        let address = ContentAddress::for_bytes(b"block", None).unwrap();
        assert!(address.verify(b"block"));
        assert!(!address.verify(b"blocks"));
    }
}
