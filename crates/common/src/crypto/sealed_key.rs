//! Document keys sealed under a key-encryption key
//!
//! A [`SealedKey`] is a document [`Secret`] wrapped with AES Key Wrap
//! (RFC 3394). The key-encryption key is derived from a master secret and a
//! context string (the canonical encoding of the access conditions), so the
//! sealed key can only be opened by whoever holds the master secret and can
//! reproduce the exact same conditions.
//!
//! # Wire Format
//!
//! ```text
//! [ wrapped_secret: 40 bytes ]
//! ```
//!
//! In published metadata the sealed key is rendered as lowercase hex.

use aes_kw::KekAes256 as Kek;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use super::secret::{Secret, SecretError, SECRET_SIZE};

/// Size of AES Key Wrap integrity block in bytes
pub const KW_BLOCK_SIZE: usize = 8;
/// Total size of a sealed key in bytes
pub const SEALED_KEY_SIZE: usize = SECRET_SIZE + KW_BLOCK_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum KeyWrapError {
    #[error("key wrap error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
}

/// A [`Secret`] wrapped under a key-encryption key derived from `master` and `context`
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SealedKey([u8; SEALED_KEY_SIZE]);

fn derive_kek(master: &Secret, context: &[u8]) -> Kek {
    let mut key = [0u8; SECRET_SIZE];
    key.copy_from_slice(master.bytes());
    let derived = blake3::keyed_hash(&key, context);
    key.zeroize();
    Kek::from(*derived.as_bytes())
}

impl SealedKey {
    /// Wrap `secret` under the key derived from `master` and `context`
    pub fn seal(secret: &Secret, master: &Secret, context: &[u8]) -> Result<Self, KeyWrapError> {
        let kek = derive_kek(master, context);
        let wrapped = kek
            .wrap_vec(secret.bytes())
            .map_err(|_| anyhow::anyhow!("AES-KW wrap error"))?;

        if wrapped.len() != SEALED_KEY_SIZE {
            return Err(anyhow::anyhow!("expected sealed key size is incorrect").into());
        }

        let mut sealed = [0u8; SEALED_KEY_SIZE];
        sealed.copy_from_slice(&wrapped);
        Ok(Self(sealed))
    }

    /// Recover the wrapped secret
    ///
    /// Fails if `master` or `context` differ from the ones used to seal.
    pub fn unseal(&self, master: &Secret, context: &[u8]) -> Result<Secret, KeyWrapError> {
        let kek = derive_kek(master, context);
        let mut unwrapped = kek
            .unwrap_vec(&self.0)
            .map_err(|_| anyhow::anyhow!("AES-KW unwrap error"))?;

        let secret = Secret::from_slice(&unwrapped);
        unwrapped.zeroize();
        Ok(secret?)
    }

    /// Parse a sealed key from a hexadecimal string
    ///
    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyWrapError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut buff = [0; SEALED_KEY_SIZE];
        hex::decode_to_slice(hex, &mut buff).map_err(|_| anyhow::anyhow!("hex decode error"))?;
        Ok(Self(buff))
    }

    pub fn from_slice(data: &[u8]) -> Result<Self, KeyWrapError> {
        if data.len() != SEALED_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid sealed key size, expected {}, got {}",
                SEALED_KEY_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SEALED_KEY_SIZE];
        buff.copy_from_slice(data);
        Ok(Self(buff))
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for SealedKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SealedKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SealedKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
