use std::fmt;

use serde::{Deserialize, Serialize};

/// The ordered stages of a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    EncryptDocument,
    StoreDocument,
    DeriveAccessCondition,
    EncryptKey,
    StoreImage,
    BuildMetadata,
    StoreMetadata,
    SubmitTransaction,
    AwaitConfirmation,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::EncryptDocument,
        Stage::StoreDocument,
        Stage::DeriveAccessCondition,
        Stage::EncryptKey,
        Stage::StoreImage,
        Stage::BuildMetadata,
        Stage::StoreMetadata,
        Stage::SubmitTransaction,
        Stage::AwaitConfirmation,
    ];

    /// Zero-based position in [`Stage::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// What the user sees while this stage runs
    pub fn progress_message(&self) -> &'static str {
        match self {
            Stage::EncryptDocument => "Encrypting your block",
            Stage::StoreDocument => "Uploading your block",
            Stage::DeriveAccessCondition => "Preparing access conditions",
            Stage::EncryptKey => "Securing the decryption key",
            Stage::StoreImage => "Uploading image",
            Stage::BuildMetadata => "Building metadata",
            Stage::StoreMetadata => "Uploading metadata",
            Stage::SubmitTransaction => "Minting your BlockNFT",
            Stage::AwaitConfirmation => "Confirming the transaction",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::EncryptDocument => "encrypt-document",
            Stage::StoreDocument => "store-document",
            Stage::DeriveAccessCondition => "derive-access-condition",
            Stage::EncryptKey => "encrypt-key",
            Stage::StoreImage => "store-image",
            Stage::BuildMetadata => "build-metadata",
            Stage::StoreMetadata => "store-metadata",
            Stage::SubmitTransaction => "submit-transaction",
            Stage::AwaitConfirmation => "await-confirmation",
        };
        f.write_str(name)
    }
}
