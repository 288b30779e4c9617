use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{Amount, Chain, Receipt, TransactionHandle, TransactionStatus};
use crate::collaborator::CollaboratorError;
use crate::linked_data::ContentHash;

/// Gas reported for every confirmed dev transaction
pub const DEV_GAS_USED: u64 = 115_000;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// In-process stand-in for the token contract
///
/// Transactions confirm `confirm_after` after submission unless reverted in
///  the meantime. A content hash can only be published once.
#[derive(Debug, Clone)]
pub struct DevLedger {
    inner: Arc<Mutex<DevLedgerInner>>,
}

#[derive(Debug)]
struct DevLedgerInner {
    price: Amount,
    confirm_after: Duration,
    poll_interval: Duration,
    nonce: u64,
    reject_next: Option<String>,
    transactions: HashMap<TransactionHandle, DevTransaction>,
    by_content: HashMap<ContentHash, TransactionHandle>,
}

#[derive(Debug, Clone)]
struct DevTransaction {
    metadata_uri: String,
    payment: Amount,
    submitted_at: Instant,
    reverted: Option<String>,
}

impl DevLedger {
    pub fn new(price: Amount, confirm_after: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(DevLedgerInner {
                price,
                confirm_after,
                poll_interval: DEFAULT_POLL_INTERVAL,
                nonce: 0,
                reject_next: None,
                transactions: HashMap::new(),
                by_content: HashMap::new(),
            })),
        }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        if let Ok(mut inner) = self.inner.lock() {
            inner.poll_interval = poll_interval;
        }
        self
    }

    pub fn set_price(&self, price: Amount) -> Result<(), CollaboratorError> {
        self.lock()?.price = price;
        Ok(())
    }

    /// Make the next `submit` fail as if the wallet refused to sign
    pub fn reject_next_submit(&self, reason: &str) -> Result<(), CollaboratorError> {
        self.lock()?.reject_next = Some(reason.to_string());
        Ok(())
    }

    /// Revert a pending transaction
    pub fn revert(&self, handle: &TransactionHandle, reason: &str) -> Result<(), CollaboratorError> {
        let mut inner = self.lock()?;
        let tx = inner
            .transactions
            .get_mut(handle)
            .ok_or_else(|| CollaboratorError::NotFound(handle.to_string()))?;
        tx.reverted = Some(reason.to_string());
        Ok(())
    }

    /// Number of transactions submitted so far
    pub fn submissions(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.transactions.len())
            .unwrap_or(0)
    }

    /// Metadata URI and payment of the live transaction for `content_hash`
    pub fn published(&self, content_hash: &ContentHash) -> Option<(String, Amount)> {
        let inner = self.inner.lock().ok()?;
        let handle = inner.by_content.get(content_hash)?;
        let tx = inner.transactions.get(handle)?;
        tx.reverted
            .is_none()
            .then(|| (tx.metadata_uri.clone(), tx.payment))
    }

    fn lock(&self) -> Result<MutexGuard<'_, DevLedgerInner>, CollaboratorError> {
        self.inner
            .lock()
            .map_err(|e| CollaboratorError::Unavailable(format!("failed to acquire lock: {}", e)))
    }

    fn status_of(&self, handle: &TransactionHandle) -> Result<TransactionStatus, CollaboratorError> {
        let inner = self.lock()?;
        let Some(tx) = inner.transactions.get(handle) else {
            return Ok(TransactionStatus::Unknown);
        };
        if let Some(reason) = &tx.reverted {
            return Ok(TransactionStatus::Reverted(reason.clone()));
        }
        if tx.submitted_at.elapsed() >= inner.confirm_after {
            return Ok(TransactionStatus::Confirmed(Receipt {
                tx_id: handle.clone(),
                gas_used: DEV_GAS_USED,
            }));
        }
        Ok(TransactionStatus::Pending)
    }
}

#[async_trait]
impl Chain for DevLedger {
    async fn price(&self) -> Result<Amount, CollaboratorError> {
        Ok(self.lock()?.price)
    }

    async fn submit(
        &self,
        content_hash: &ContentHash,
        metadata_uri: &str,
        payment: Amount,
    ) -> Result<TransactionHandle, CollaboratorError> {
        let mut inner = self.lock()?;
        if let Some(reason) = inner.reject_next.take() {
            return Err(CollaboratorError::Rejected(reason));
        }
        if payment < inner.price {
            return Err(CollaboratorError::Rejected(format!(
                "insufficient payment: {} < {}",
                payment, inner.price
            )));
        }
        let live = inner
            .by_content
            .get(content_hash)
            .and_then(|h| inner.transactions.get(h))
            .is_some_and(|tx| tx.reverted.is_none());
        if live {
            return Err(CollaboratorError::Rejected(format!(
                "block {} already published",
                content_hash
            )));
        }

        inner.nonce += 1;
        let mut hasher = blake3::Hasher::new();
        hasher.update(content_hash.bytes());
        hasher.update(metadata_uri.as_bytes());
        hasher.update(&inner.nonce.to_le_bytes());
        let handle = TransactionHandle::new(format!("0x{}", hasher.finalize().to_hex()));

        inner.transactions.insert(
            handle.clone(),
            DevTransaction {
                metadata_uri: metadata_uri.to_string(),
                payment,
                submitted_at: Instant::now(),
                reverted: None,
            },
        );
        inner.by_content.insert(*content_hash, handle.clone());
        tracing::debug!("dev ledger accepted {} for {}", handle, content_hash);
        Ok(handle)
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Receipt, CollaboratorError> {
        loop {
            match self.status_of(handle)? {
                TransactionStatus::Confirmed(receipt) => return Ok(receipt),
                TransactionStatus::Reverted(reason) => {
                    return Err(CollaboratorError::Rejected(reason))
                }
                TransactionStatus::Unknown => {
                    return Err(CollaboratorError::NotFound(handle.to_string()))
                }
                TransactionStatus::Pending => {
                    let poll = self.lock()?.poll_interval;
                    tokio::time::sleep(poll).await;
                }
            }
        }
    }

    async fn lookup(
        &self,
        content_hash: &ContentHash,
    ) -> Result<Option<TransactionHandle>, CollaboratorError> {
        let inner = self.lock()?;
        Ok(inner
            .by_content
            .get(content_hash)
            .filter(|h| {
                inner
                    .transactions
                    .get(*h)
                    .is_some_and(|tx| tx.reverted.is_none())
            })
            .cloned())
    }

    async fn status(
        &self,
        handle: &TransactionHandle,
    ) -> Result<TransactionStatus, CollaboratorError> {
        self.status_of(handle)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PRICE: Amount = Amount::new(330_000_000_000_000_000);

    fn hash(byte: u8) -> ContentHash {
        ContentHash::from([byte; 32])
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_and_confirm() {
        let ledger = DevLedger::new(PRICE, Duration::from_secs(2));
        let handle = ledger
            .submit(&hash(1), "ipfs://meta/metadata.json", PRICE)
            .await
            .unwrap();
        assert!(handle.as_str().starts_with("0x"));
        assert_eq!(ledger.status(&handle).await.unwrap(), TransactionStatus::Pending);

        let receipt = ledger.await_confirmation(&handle).await.unwrap();
        assert_eq!(receipt.tx_id, handle);
        assert_eq!(receipt.gas_used, DEV_GAS_USED);
        assert_eq!(
            ledger.published(&hash(1)),
            Some(("ipfs://meta/metadata.json".to_string(), PRICE))
        );
    }

    #[tokio::test]
    async fn test_underpayment_rejected() {
        let ledger = DevLedger::new(PRICE, Duration::ZERO);
        let result = ledger.submit(&hash(1), "uri", Amount::new(1)).await;
        assert!(matches!(result, Err(CollaboratorError::Rejected(_))));
        assert_eq!(ledger.submissions(), 0);
    }

    #[tokio::test]
    async fn test_price_changes() {
        let ledger = DevLedger::new(PRICE, Duration::ZERO);
        ledger.set_price(Amount::new(5)).unwrap();
        assert_eq!(ledger.price().await.unwrap(), Amount::new(5));
    }

    #[tokio::test]
    async fn test_double_publish_rejected() {
        let ledger = DevLedger::new(PRICE, Duration::ZERO);
        ledger.submit(&hash(1), "a", PRICE).await.unwrap();
        let result = ledger.submit(&hash(1), "b", PRICE).await;
        assert!(matches!(result, Err(CollaboratorError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_lookup_ignores_reverted() {
        let ledger = DevLedger::new(PRICE, Duration::from_secs(60));
        let handle = ledger.submit(&hash(1), "a", PRICE).await.unwrap();
        assert_eq!(ledger.lookup(&hash(1)).await.unwrap(), Some(handle.clone()));

        ledger.revert(&handle, "out of gas").unwrap();
        assert_eq!(ledger.lookup(&hash(1)).await.unwrap(), None);
        assert!(matches!(
            ledger.await_confirmation(&handle).await,
            Err(CollaboratorError::Rejected(reason)) if reason == "out of gas"
        ));

        // a reverted publish can be retried
        ledger.submit(&hash(1), "a", PRICE).await.unwrap();
    }

    #[tokio::test]
    async fn test_reject_next_submit() {
        let ledger = DevLedger::new(PRICE, Duration::ZERO);
        ledger.reject_next_submit("user denied").unwrap();
        assert!(ledger.submit(&hash(1), "a", PRICE).await.is_err());
        assert!(ledger.submit(&hash(1), "a", PRICE).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let ledger = DevLedger::new(PRICE, Duration::ZERO);
        let handle = TransactionHandle::new("0xnope");
        assert_eq!(ledger.status(&handle).await.unwrap(), TransactionStatus::Unknown);
    }
}
