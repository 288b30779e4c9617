use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;

use crate::chain::{Chain, Receipt, TransactionStatus};
use crate::collaborator::CollaboratorError;
use crate::crypto::Encryptor;
use crate::policy::AccessPolicy;
use crate::store::ContentStore;

use super::context::PublishContext;
use super::error::PublishError;
use super::metadata::{normalize_name, BuiProperties, NftMetadata, METADATA_FILENAME};
use super::stage::Stage;

pub const DEFAULT_CONTRACT_NAME: &str = "BUIBlockNFT";
pub const DEFAULT_OWNERSHIP_METHOD: &str = "ownerOfBlock";
pub const USER_ADDRESS_PLACEHOLDER: &str = ":userAddress";
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Contract the access condition is evaluated against
    pub contract_name: String,
    /// Contract method answering "does this address own this block?"
    pub ownership_method: String,
    /// Substituted with the caller's address by the condition evaluator
    pub user_address_placeholder: String,
    /// How long to wait for a submitted transaction to be mined
    pub confirmation_timeout: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            contract_name: DEFAULT_CONTRACT_NAME.to_string(),
            ownership_method: DEFAULT_OWNERSHIP_METHOD.to_string(),
            user_address_placeholder: USER_ADDRESS_PLACEHOLDER.to_string(),
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }
}

/// Runs publish stages against a set of collaborators
///
/// The publisher holds no per-publish state; everything lives in the
///  [`PublishContext`] passed to each call, so one publisher can drive many
///  contexts one after another.
#[derive(Debug, Clone)]
pub struct Publisher<E, P, S, C> {
    encryptor: E,
    policy: P,
    store: S,
    chain: C,
    config: PublishConfig,
}

impl<E, P, S, C> Publisher<E, P, S, C>
where
    E: Encryptor,
    P: AccessPolicy,
    S: ContentStore,
    C: Chain,
{
    pub fn new(encryptor: E, policy: P, store: S, chain: C, config: PublishConfig) -> Self {
        Self {
            encryptor,
            policy,
            store,
            chain,
            config,
        }
    }

    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn chain(&self) -> &C {
        &self.chain
    }

    /// Run every remaining stage, returning the confirmation receipt
    pub async fn run(&self, ctx: &mut PublishContext) -> Result<Receipt, PublishError> {
        let never = AtomicBool::new(false);
        match self.run_until(ctx, &never).await? {
            Some(receipt) => Ok(receipt),
            None => Err(PublishError::InvariantViolation(
                "publish stopped before confirmation".into(),
            )),
        }
    }

    /// Run remaining stages, checking `abandon` before each one
    ///
    /// Returns `Ok(None)` when abandoned. A stage that has started always
    ///  runs to completion or failure.
    pub async fn run_until(
        &self,
        ctx: &mut PublishContext,
        abandon: &AtomicBool,
    ) -> Result<Option<Receipt>, PublishError> {
        while !ctx.is_complete() {
            if abandon.load(Ordering::SeqCst) {
                tracing::info!(step = ctx.step_index(), "publish abandoned between stages");
                return Ok(None);
            }
            self.step(ctx).await?;
        }
        Ok(ctx.receipt().cloned())
    }

    /// Run the next stage, returning it, or `None` if the publish is complete
    pub async fn step(&self, ctx: &mut PublishContext) -> Result<Option<Stage>, PublishError> {
        let Some(stage) = ctx.next_stage() else {
            return Ok(None);
        };
        tracing::debug!(%stage, "running stage");

        let result = match stage {
            Stage::EncryptDocument => self.encrypt_document(ctx).await,
            Stage::StoreDocument => self.store_document(ctx).await,
            Stage::DeriveAccessCondition => self.derive_access_condition(ctx),
            Stage::EncryptKey => self.encrypt_key(ctx).await,
            Stage::StoreImage => self.store_image(ctx).await,
            Stage::BuildMetadata => self.build_metadata(ctx),
            Stage::StoreMetadata => self.store_metadata(ctx).await,
            Stage::SubmitTransaction => self.submit_transaction(ctx).await,
            Stage::AwaitConfirmation => self.await_confirmation(ctx).await,
        };

        match result {
            Ok(()) => {
                tracing::info!(%stage, step = ctx.step_index(), "stage committed");
                Ok(Some(stage))
            }
            Err(e) => {
                tracing::warn!(%stage, retryable = e.is_retryable(), "stage failed: {}", e);
                Err(e)
            }
        }
    }

    async fn encrypt_document(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let encrypted = self
            .encryptor
            .encrypt(ctx.serialized_document())
            .await
            .map_err(PublishError::EncryptionFailed)?;
        ctx.commit_encryption(encrypted.ciphertext, encrypted.key)
    }

    async fn store_document(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let ciphertext = required(ctx.ciphertext(), "ciphertext")?.clone();
        let address = self
            .store
            .put(ciphertext, None)
            .await
            .map_err(|source| PublishError::StorageUploadFailed {
                stage: Stage::StoreDocument,
                source,
            })?;
        tracing::debug!(cid = %address.cid(), "document stored");
        ctx.commit_document_cid(address)
    }

    fn derive_access_condition(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let document_cid = required(ctx.document_cid(), "document_cid")?;
        let content_hash = document_cid
            .content_hash()
            .map_err(|e| PublishError::InvariantViolation(format!("malformed document cid: {}", e)))?;
        let condition = self.policy.build_condition(
            &self.config.contract_name,
            &self.config.ownership_method,
            vec![
                content_hash.to_hex(),
                self.config.user_address_placeholder.clone(),
            ],
        );
        ctx.commit_access_conditions(vec![condition])
    }

    async fn encrypt_key(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let key = required(ctx.symmetric_key(), "symmetric_key")?;
        let conditions = required(ctx.access_conditions(), "access_conditions")?;
        let encrypted_key = self
            .policy
            .encrypt_key_under_conditions(key, conditions)
            .await
            .map_err(PublishError::KeyEncryptionFailed)?;
        ctx.commit_encrypted_key(encrypted_key)
    }

    async fn store_image(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let Some(image) = ctx.form().image.clone().filter(|i| !i.is_empty()) else {
            tracing::debug!("no image supplied, skipping upload");
            return ctx.commit_image(None);
        };

        let mime: mime::Mime = image
            .content_type
            .parse()
            .map_err(|_| PublishError::InvalidImageType(image.content_type.clone()))?;
        if mime.type_() != mime::IMAGE {
            return Err(PublishError::InvalidImageType(image.content_type.clone()));
        }

        let filename = format!(
            "{}.{}",
            normalize_name(&ctx.form().name),
            mime.subtype().as_str()
        );
        let address = self
            .store
            .put(image.data, Some(&filename))
            .await
            .map_err(|source| PublishError::StorageUploadFailed {
                stage: Stage::StoreImage,
                source,
            })?;
        tracing::debug!(cid = %address.cid(), "image stored");
        ctx.commit_image(Some(address))
    }

    fn build_metadata(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let document_cid = required(ctx.document_cid(), "document_cid")?;
        let encrypted_key = required(ctx.encrypted_key(), "encrypted_key")?;
        let conditions = required(ctx.access_conditions(), "access_conditions")?;
        let form = ctx.form();

        let metadata = NftMetadata {
            description: form.description.clone(),
            image: ctx.image_cid().map(|a| a.uri()).unwrap_or_default(),
            name: form.name.clone(),
            bui_properties: BuiProperties {
                cid: document_cid.cid().to_string(),
                encrypted_key: encrypted_key.clone(),
                auth_conditions: conditions.to_vec(),
                tags: form.tags.clone(),
            },
        };
        ctx.commit_metadata(metadata)
    }

    async fn store_metadata(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let metadata = required(ctx.metadata(), "metadata")?;
        let json = metadata
            .to_json()
            .map_err(|e| PublishError::unexpected(Stage::StoreMetadata, e))?;
        let address = self
            .store
            .put(Bytes::from(json), Some(METADATA_FILENAME))
            .await
            .map_err(|source| PublishError::StorageUploadFailed {
                stage: Stage::StoreMetadata,
                source,
            })?;
        tracing::debug!(cid = %address.cid(), "metadata stored");
        ctx.commit_metadata_cid(address)
    }

    async fn submit_transaction(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let document_cid = required(ctx.document_cid(), "document_cid")?;
        let metadata_uri = required(ctx.metadata_cid(), "metadata_cid")?.uri();
        let content_hash = document_cid
            .content_hash()
            .map_err(|e| PublishError::InvariantViolation(format!("malformed document cid: {}", e)))?;

        let existing = self
            .chain
            .lookup(&content_hash)
            .await
            .map_err(|source| PublishError::UnexpectedFailure {
                stage: Stage::SubmitTransaction,
                source,
            })?;
        if let Some(handle) = existing {
            tracing::warn!(tx = %handle, "transaction already submitted for this block, adopting it");
            return ctx.commit_transaction(handle);
        }

        // the price can change between calls, never reuse an earlier quote
        let price = self
            .chain
            .price()
            .await
            .map_err(|source| PublishError::UnexpectedFailure {
                stage: Stage::SubmitTransaction,
                source,
            })?;
        let handle = self
            .chain
            .submit(&content_hash, &metadata_uri, price)
            .await
            .map_err(|e| PublishError::TransactionRejected(collaborator_reason(e)))?;
        tracing::info!(tx = %handle, %price, "transaction submitted");
        ctx.commit_transaction(handle)
    }

    async fn await_confirmation(&self, ctx: &mut PublishContext) -> Result<(), PublishError> {
        let handle = required(ctx.transaction_handle(), "transaction_handle")?.clone();

        match self.chain.status(&handle).await {
            Ok(TransactionStatus::Confirmed(receipt)) => return ctx.commit_receipt(receipt),
            Ok(TransactionStatus::Reverted(reason)) => {
                return Err(PublishError::TransactionRejected(reason))
            }
            Ok(TransactionStatus::Pending) | Ok(TransactionStatus::Unknown) => {}
            Err(source) => {
                return Err(PublishError::UnexpectedFailure {
                    stage: Stage::AwaitConfirmation,
                    source,
                })
            }
        }

        let receipt = match tokio::time::timeout(
            self.config.confirmation_timeout,
            self.chain.await_confirmation(&handle),
        )
        .await
        {
            Err(_) | Ok(Err(CollaboratorError::Timeout)) => {
                return Err(PublishError::ConfirmationTimeout(handle))
            }
            Ok(Err(CollaboratorError::Rejected(reason))) => {
                return Err(PublishError::TransactionRejected(reason))
            }
            Ok(Err(source)) => {
                return Err(PublishError::UnexpectedFailure {
                    stage: Stage::AwaitConfirmation,
                    source,
                })
            }
            Ok(Ok(receipt)) => receipt,
        };
        tracing::info!(tx = %receipt.tx_id, gas_used = receipt.gas_used, "transaction confirmed");
        ctx.commit_receipt(receipt)
    }
}

fn required<'a, T: ?Sized>(value: Option<&'a T>, field: &str) -> Result<&'a T, PublishError> {
    value.ok_or_else(|| PublishError::InvariantViolation(format!("{} has not been committed", field)))
}

fn collaborator_reason(error: CollaboratorError) -> String {
    match error {
        CollaboratorError::Rejected(reason) => reason,
        other => other.to_string(),
    }
}
