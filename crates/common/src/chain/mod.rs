//! The token contract, seen from the publisher's side
//!
//! Publishing mints a token keyed by the document's content hash and pointing
//!  at its metadata. The contract charges a price that may change between
//!  calls, so callers read it right before submitting.

mod dev;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborator::CollaboratorError;
use crate::linked_data::ContentHash;

pub use dev::{DevLedger, DEV_GAS_USED};

/// A payment amount in the chain's smallest unit (wei)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u128);

impl Amount {
    pub const fn new(wei: u128) -> Self {
        Self(wei)
    }

    pub fn wei(&self) -> u128 {
        self.0
    }
}

impl From<u128> for Amount {
    fn from(wei: u128) -> Self {
        Self(wei)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

/// Identifies a submitted transaction (its hash)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionHandle(String);

impl TransactionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_id: TransactionHandle,
    pub gas_used: u64,
}

/// Where a submitted transaction currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Confirmed(Receipt),
    Reverted(String),
    /// The chain has no record of the handle
    Unknown,
}

#[async_trait]
pub trait Chain: Send + Sync {
    /// Current publish price
    async fn price(&self) -> Result<Amount, CollaboratorError>;

    /// Submit a publish transaction. Fails with [`CollaboratorError::Rejected`]
    ///  when the wallet or the contract refuses it.
    async fn submit(
        &self,
        content_hash: &ContentHash,
        metadata_uri: &str,
        payment: Amount,
    ) -> Result<TransactionHandle, CollaboratorError>;

    /// Wait for the transaction to be mined. May wait indefinitely; callers
    ///  impose their own timeout.
    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Receipt, CollaboratorError>;

    /// The live transaction already submitted for `content_hash`, if any
    async fn lookup(
        &self,
        content_hash: &ContentHash,
    ) -> Result<Option<TransactionHandle>, CollaboratorError>;

    async fn status(
        &self,
        handle: &TransactionHandle,
    ) -> Result<TransactionStatus, CollaboratorError>;
}
