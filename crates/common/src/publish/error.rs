use crate::chain::TransactionHandle;
use crate::collaborator::CollaboratorError;

use super::stage::Stage;

/// Why a publish stage did not commit
///
/// The context is left exactly as it was before the failing stage started,
///  so the same context can be handed back to the pipeline once the cause is
///  dealt with.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to encrypt document: {0}")]
    EncryptionFailed(CollaboratorError),
    #[error("upload failed at {stage}: {source}")]
    StorageUploadFailed {
        stage: Stage,
        source: CollaboratorError,
    },
    #[error("failed to encrypt key under access conditions: {0}")]
    KeyEncryptionFailed(CollaboratorError),
    #[error("unsupported image type: {0}")]
    InvalidImageType(String),
    #[error("transaction rejected: {0}")]
    TransactionRejected(String),
    #[error("timed out waiting for transaction {0}")]
    ConfirmationTimeout(TransactionHandle),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("unexpected failure at {stage}: {source}")]
    UnexpectedFailure {
        stage: Stage,
        source: CollaboratorError,
    },
}

impl PublishError {
    /// Whether re-running the same context can succeed without the user
    ///  changing anything
    pub fn is_retryable(&self) -> bool {
        match self {
            PublishError::EncryptionFailed(_)
            | PublishError::StorageUploadFailed { .. }
            | PublishError::KeyEncryptionFailed(_)
            | PublishError::ConfirmationTimeout(_)
            | PublishError::UnexpectedFailure { .. } => true,
            PublishError::InvalidImageType(_)
            | PublishError::TransactionRejected(_)
            | PublishError::InvariantViolation(_) => false,
        }
    }

    /// The stage that failed, when it is known from the error alone
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PublishError::EncryptionFailed(_) => Some(Stage::EncryptDocument),
            PublishError::StorageUploadFailed { stage, .. }
            | PublishError::UnexpectedFailure { stage, .. } => Some(*stage),
            PublishError::KeyEncryptionFailed(_) => Some(Stage::EncryptKey),
            PublishError::InvalidImageType(_) => Some(Stage::StoreImage),
            PublishError::TransactionRejected(_) => None,
            PublishError::ConfirmationTimeout(_) => Some(Stage::AwaitConfirmation),
            PublishError::InvariantViolation(_) => None,
        }
    }

    pub(crate) fn unexpected(stage: Stage, error: impl Into<anyhow::Error>) -> Self {
        PublishError::UnexpectedFailure {
            stage,
            source: CollaboratorError::Default(error.into()),
        }
    }
}
