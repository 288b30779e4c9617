//! Access conditions and key encryption under them
//!
//! An access condition is a contract call that must return `true` for the
//!  caller before an encrypted key may be released. Published blocks carry a
//!  single `ownerOfBlock(contentHash, :userAddress)` clause.

mod sealed;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::collaborator::CollaboratorError;
use crate::crypto::Secret;

pub use sealed::SealedKeyPolicy;

/// What the contract call must return for a clause to hold
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnValueTest {
    pub key: String,
    pub comparator: String,
    pub value: String,
}

impl Default for ReturnValueTest {
    fn default() -> Self {
        Self {
            key: String::new(),
            comparator: "=".to_string(),
            value: "true".to_string(),
        }
    }
}

/// A single evaluable access condition
///
/// `function_params` may contain placeholders (e.g. `:userAddress`) that are
///  substituted by the evaluator at decryption time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionClause {
    pub contract_address: String,
    pub chain: String,
    pub function_name: String,
    pub function_params: Vec<String>,
    pub return_value_test: ReturnValueTest,
}

/// Canonical byte encoding of an ordered list of clauses
///
/// Field order is fixed by the struct definitions, so the same clauses always
///  encode to the same bytes.
pub fn canonical_conditions(conditions: &[ConditionClause]) -> Result<Vec<u8>, CollaboratorError> {
    serde_json::to_vec(conditions)
        .map_err(|e| CollaboratorError::Default(anyhow::anyhow!("condition encoding: {}", e)))
}

/// Opaque key material produced by an [`AccessPolicy`]
///
/// Rendered as lowercase hex wherever it is serialized. Zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptedKey(Vec<u8>);

impl EncryptedKey {
    pub fn from_hex(hex: &str) -> Result<Self, CollaboratorError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)
            .map_err(|e| CollaboratorError::Rejected(format!("invalid encrypted key: {}", e)))?;
        Ok(Self(bytes))
    }

    #[allow(clippy::wrong_self_convention)]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for EncryptedKey {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for EncryptedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedKey({} bytes)", self.0.len())
    }
}

impl Serialize for EncryptedKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for EncryptedKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EncryptedKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Builds access conditions and encrypts keys so they are only released when
///  those conditions hold
#[async_trait]
pub trait AccessPolicy: Send + Sync {
    /// Describe a contract call predicate. Pure; never fails.
    fn build_condition(
        &self,
        contract: &str,
        predicate: &str,
        args: Vec<String>,
    ) -> ConditionClause;

    /// Encrypt `key` so it can only be recovered when all `conditions` hold
    async fn encrypt_key_under_conditions(
        &self,
        key: &Secret,
        conditions: &[ConditionClause],
    ) -> Result<EncryptedKey, CollaboratorError>;
}
