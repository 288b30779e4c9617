//! Shared fixtures for publish integration tests: a sample document and
//!  collaborator doubles that count calls and fail on request.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use common::chain::{Amount, Chain, DevLedger, Receipt, TransactionHandle, TransactionStatus};
use common::collaborator::CollaboratorError;
use common::crypto::{Encrypted, Encryptor, LocalEncryptor, Secret};
use common::document::{BlockKind, BlockNode, Document, DocumentCommand, ROOT_ID};
use common::linked_data::{ContentAddress, ContentHash};
use common::policy::{AccessPolicy, ConditionClause, EncryptedKey, SealedKeyPolicy};
use common::publish::{PublishConfig, Publisher};
use common::store::{ContentStore, MemoryContentStore};

pub const PRICE: Amount = Amount::new(330_000_000_000_000_000);

pub type TestPublisher = Publisher<ScriptedEncryptor, ScriptedPolicy, ScriptedStore, ScriptedChain>;

/// `Container[Heading("Hello!"), Paragraph, Link(https://crcls.xyz)]`
pub fn hello_document() -> Document {
    let mut document = Document::new();
    document
        .apply(DocumentCommand::InsertNode {
            target: ROOT_ID.into(),
            node: BlockNode::new("main", BlockKind::Container)
                .with_child(
                    BlockNode::new("title", BlockKind::Heading)
                        .with_prop("level", 1i64)
                        .with_prop("text", "Hello!"),
                )
                .with_child(
                    BlockNode::new("body", BlockKind::Paragraph).with_prop(
                        "text",
                        "Lorem ipsum dolor sit amet, consectetur adipiscing elit.",
                    ),
                )
                .with_child(
                    BlockNode::new("cta", BlockKind::Link)
                        .with_prop("href", "https://crcls.xyz")
                        .with_prop("text", "Let's go!"),
                ),
        })
        .unwrap();
    document
}

/// Consume one scheduled failure, if any are left
fn take_failure(pending: &AtomicUsize) -> bool {
    pending
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Local encryptor that can be told to fail the next few calls
#[derive(Debug, Clone, Default)]
pub struct ScriptedEncryptor {
    fail_encryptions: Arc<AtomicUsize>,
    encryptions: Arc<AtomicUsize>,
}

impl ScriptedEncryptor {
    pub fn fail_next_encryptions(&self, n: usize) {
        self.fail_encryptions.store(n, Ordering::SeqCst);
    }

    pub fn encryptions(&self) -> usize {
        self.encryptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Encryptor for ScriptedEncryptor {
    async fn encrypt(&self, data: &[u8]) -> Result<Encrypted, CollaboratorError> {
        if take_failure(&self.fail_encryptions) {
            return Err(CollaboratorError::Unavailable("encryption service offline".into()));
        }
        self.encryptions.fetch_add(1, Ordering::SeqCst);
        LocalEncryptor.encrypt(data).await
    }
}

/// Content store that records every put and can be told to fail the next few
#[derive(Debug, Clone, Default)]
pub struct ScriptedStore {
    pub inner: MemoryContentStore,
    puts: Arc<Mutex<Vec<Option<String>>>>,
    fail_puts: Arc<AtomicUsize>,
}

impl ScriptedStore {
    pub fn fail_next_puts(&self, n: usize) {
        self.fail_puts.store(n, Ordering::SeqCst);
    }

    /// Filenames of successful puts, in order (`None` for unnamed blobs)
    pub fn puts(&self) -> Vec<Option<String>> {
        self.puts.lock().unwrap().clone()
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentStore for ScriptedStore {
    async fn put(
        &self,
        data: Bytes,
        filename: Option<&str>,
    ) -> Result<ContentAddress, CollaboratorError> {
        let pending = self.fail_puts.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_puts.store(pending - 1, Ordering::SeqCst);
            return Err(CollaboratorError::Unavailable("gateway unreachable".into()));
        }
        let address = self.inner.put(data, filename).await?;
        self.puts.lock().unwrap().push(filename.map(str::to_string));
        Ok(address)
    }

    async fn get(&self, address: &ContentAddress) -> Result<Bytes, CollaboratorError> {
        self.inner.get(address).await
    }
}

/// Sealed key policy that can be told to fail the next few key encryptions
#[derive(Debug, Clone)]
pub struct ScriptedPolicy {
    pub inner: SealedKeyPolicy,
    fail_encryptions: Arc<AtomicUsize>,
    encryptions: Arc<AtomicUsize>,
}

impl ScriptedPolicy {
    pub fn new() -> Self {
        Self {
            inner: SealedKeyPolicy::new(Secret::generate(), "mumbai"),
            fail_encryptions: Arc::new(AtomicUsize::new(0)),
            encryptions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_next_encryptions(&self, n: usize) {
        self.fail_encryptions.store(n, Ordering::SeqCst);
    }

    pub fn encryptions(&self) -> usize {
        self.encryptions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccessPolicy for ScriptedPolicy {
    fn build_condition(
        &self,
        contract: &str,
        predicate: &str,
        args: Vec<String>,
    ) -> ConditionClause {
        self.inner.build_condition(contract, predicate, args)
    }

    async fn encrypt_key_under_conditions(
        &self,
        key: &Secret,
        conditions: &[ConditionClause],
    ) -> Result<EncryptedKey, CollaboratorError> {
        let pending = self.fail_encryptions.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_encryptions.store(pending - 1, Ordering::SeqCst);
            return Err(CollaboratorError::Unavailable("policy node offline".into()));
        }
        self.encryptions.fetch_add(1, Ordering::SeqCst);
        self.inner.encrypt_key_under_conditions(key, conditions).await
    }
}

/// Dev ledger that counts calls per method and can be told to fail the
///  next few reads
#[derive(Debug, Clone)]
pub struct ScriptedChain {
    pub ledger: DevLedger,
    submits: Arc<AtomicUsize>,
    lookups: Arc<AtomicUsize>,
    statuses: Arc<AtomicUsize>,
    fail_prices: Arc<AtomicUsize>,
    fail_lookups: Arc<AtomicUsize>,
    fail_statuses: Arc<AtomicUsize>,
    lose_confirmations: Arc<AtomicUsize>,
}

impl ScriptedChain {
    pub fn new(confirm_after: Duration) -> Self {
        Self {
            ledger: DevLedger::new(PRICE, confirm_after).with_poll_interval(Duration::from_millis(100)),
            submits: Arc::new(AtomicUsize::new(0)),
            lookups: Arc::new(AtomicUsize::new(0)),
            statuses: Arc::new(AtomicUsize::new(0)),
            fail_prices: Arc::new(AtomicUsize::new(0)),
            fail_lookups: Arc::new(AtomicUsize::new(0)),
            fail_statuses: Arc::new(AtomicUsize::new(0)),
            lose_confirmations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_next_prices(&self, n: usize) {
        self.fail_prices.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_lookups(&self, n: usize) {
        self.fail_lookups.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_statuses(&self, n: usize) {
        self.fail_statuses.store(n, Ordering::SeqCst);
    }

    /// The next `n` confirmation waits report the transaction as unknown
    pub fn lose_next_confirmations(&self, n: usize) {
        self.lose_confirmations.store(n, Ordering::SeqCst);
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn statuses(&self) -> usize {
        self.statuses.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Chain for ScriptedChain {
    async fn price(&self) -> Result<Amount, CollaboratorError> {
        if take_failure(&self.fail_prices) {
            return Err(CollaboratorError::Unavailable("rpc down".into()));
        }
        self.ledger.price().await
    }

    async fn submit(
        &self,
        content_hash: &ContentHash,
        metadata_uri: &str,
        payment: Amount,
    ) -> Result<TransactionHandle, CollaboratorError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.ledger.submit(content_hash, metadata_uri, payment).await
    }

    async fn await_confirmation(
        &self,
        handle: &TransactionHandle,
    ) -> Result<Receipt, CollaboratorError> {
        if take_failure(&self.lose_confirmations) {
            return Err(CollaboratorError::NotFound(handle.to_string()));
        }
        self.ledger.await_confirmation(handle).await
    }

    async fn lookup(
        &self,
        content_hash: &ContentHash,
    ) -> Result<Option<TransactionHandle>, CollaboratorError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_lookups) {
            return Err(CollaboratorError::Unavailable("rpc down".into()));
        }
        self.ledger.lookup(content_hash).await
    }

    async fn status(
        &self,
        handle: &TransactionHandle,
    ) -> Result<TransactionStatus, CollaboratorError> {
        self.statuses.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_statuses) {
            return Err(CollaboratorError::Unavailable("rpc down".into()));
        }
        self.ledger.status(handle).await
    }
}

pub struct TestEnv {
    pub publisher: TestPublisher,
    pub encryptor: ScriptedEncryptor,
    pub store: ScriptedStore,
    pub policy: ScriptedPolicy,
    pub chain: ScriptedChain,
}

/// Publisher over scripted doubles; transactions confirm after `confirm_after`
pub fn setup_test_env(confirm_after: Duration, confirmation_timeout: Duration) -> TestEnv {
    let encryptor = ScriptedEncryptor::default();
    let store = ScriptedStore::default();
    let policy = ScriptedPolicy::new();
    let chain = ScriptedChain::new(confirm_after);
    let config = PublishConfig {
        confirmation_timeout,
        ..Default::default()
    };
    let publisher = Publisher::new(
        encryptor.clone(),
        policy.clone(),
        store.clone(),
        chain.clone(),
        config,
    );
    TestEnv {
        publisher,
        encryptor,
        store,
        policy,
        chain,
    }
}

/// Publisher whose transactions confirm immediately
pub fn instant_env() -> TestEnv {
    setup_test_env(Duration::ZERO, Duration::from_secs(5))
}
