use async_trait::async_trait;
use bytes::Bytes;

use crate::collaborator::CollaboratorError;

use super::secret::Secret;

/// Output of [`Encryptor::encrypt`]: the ciphertext and the freshly generated key it was sealed with
#[derive(Debug)]
pub struct Encrypted {
    pub ciphertext: Bytes,
    pub key: Secret,
}

/// Symmetric encryption collaborator
#[async_trait]
pub trait Encryptor: Send + Sync {
    async fn encrypt(&self, data: &[u8]) -> Result<Encrypted, CollaboratorError>;
}

/// Encrypts in-process with a fresh ChaCha20-Poly1305 [`Secret`] per call
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalEncryptor;

#[async_trait]
impl Encryptor for LocalEncryptor {
    async fn encrypt(&self, data: &[u8]) -> Result<Encrypted, CollaboratorError> {
        let key = Secret::generate();
        let ciphertext = key
            .encrypt(data)
            .map_err(|e| CollaboratorError::Default(anyhow::anyhow!(e)))?;
        Ok(Encrypted {
            ciphertext: Bytes::from(ciphertext),
            key,
        })
    }
}
