use std::sync::Arc;

use async_trait::async_trait;

use super::{canonical_conditions, AccessPolicy, ConditionClause, EncryptedKey, ReturnValueTest};
use crate::collaborator::CollaboratorError;
use crate::crypto::{SealedKey, Secret};

/// Access policy backed by a local master secret
///
/// Keys are sealed with AES-KW under `blake3::keyed_hash(master, canonical(conditions))`,
///  so recovering a key requires both the master secret and byte-identical
///  conditions. Condition *evaluation* (is the caller actually the owner?) is
///  left to whoever holds the master; this policy only binds the key to the
///  conditions it was issued under.
#[derive(Clone)]
pub struct SealedKeyPolicy {
    master: Arc<Secret>,
    chain: String,
}

impl std::fmt::Debug for SealedKeyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealedKeyPolicy")
            .field("chain", &self.chain)
            .finish()
    }
}

impl SealedKeyPolicy {
    pub fn new(master: Secret, chain: &str) -> Self {
        Self {
            master: Arc::new(master),
            chain: chain.to_string(),
        }
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Recover a key sealed by [`AccessPolicy::encrypt_key_under_conditions`]
    pub fn unseal(
        &self,
        encrypted_key: &EncryptedKey,
        conditions: &[ConditionClause],
    ) -> Result<Secret, CollaboratorError> {
        let context = canonical_conditions(conditions)?;
        let sealed = SealedKey::from_slice(encrypted_key.bytes())
            .map_err(|e| CollaboratorError::Rejected(e.to_string()))?;
        sealed
            .unseal(&self.master, &context)
            .map_err(|_| CollaboratorError::Rejected("conditions do not match sealed key".into()))
    }
}

#[async_trait]
impl AccessPolicy for SealedKeyPolicy {
    fn build_condition(
        &self,
        contract: &str,
        predicate: &str,
        args: Vec<String>,
    ) -> ConditionClause {
        ConditionClause {
            contract_address: contract.to_string(),
            chain: self.chain.clone(),
            function_name: predicate.to_string(),
            function_params: args,
            return_value_test: ReturnValueTest::default(),
        }
    }

    async fn encrypt_key_under_conditions(
        &self,
        key: &Secret,
        conditions: &[ConditionClause],
    ) -> Result<EncryptedKey, CollaboratorError> {
        if conditions.is_empty() {
            return Err(CollaboratorError::Rejected(
                "at least one access condition is required".into(),
            ));
        }
        let context = canonical_conditions(conditions)?;
        let sealed = SealedKey::seal(key, &self.master, &context)
            .map_err(|e| CollaboratorError::Default(anyhow::anyhow!(e)))?;
        Ok(EncryptedKey::from(sealed.bytes().to_vec()))
    }
}
