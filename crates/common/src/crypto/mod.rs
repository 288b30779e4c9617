//! Cryptographic primitives for block publishing
//!
//! - **Document encryption**: every published document gets its own
//!   ChaCha20-Poly1305 [`Secret`], produced by an [`Encryptor`]
//! - **Key sealing**: the document secret is wrapped with AES-KW under a key
//!   derived from the access conditions ([`SealedKey`]), which is what ends up
//!   in the token metadata as `encryptedKey`
//!
//! Secrets zero their memory on drop and never implement `Serialize`; the only
//! form of a document key that leaves the process is a [`SealedKey`].

mod encryptor;
mod sealed_key;
mod secret;

pub use encryptor::{Encrypted, Encryptor, LocalEncryptor};
pub use sealed_key::{KeyWrapError, SealedKey, SEALED_KEY_SIZE};
pub use secret::{Secret, SecretError, BLAKE3_HASH_SIZE, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
