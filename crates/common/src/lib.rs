/**
 * Error type shared by every external collaborator
 *  (encryption, access policy, storage, chain).
 */
pub mod collaborator;
/**
 * Cryptographic types and operations.
 *  - Symmetric document keys
 *  - Keys sealed under access conditions
 */
pub mod crypto;
/**
 * The block document: a tree of typed UI blocks
 *  and the commands that edit it.
 */
pub mod document;
/**
 * Content addresses (CIDv1 over BLAKE3) and
 *  canonical DAG-CBOR encoding.
 */
pub mod linked_data;
/**
 * Access conditions and key encryption under them.
 */
pub mod policy;
/**
 * Token contract interface and an in-process
 *  dev ledger.
 */
pub mod chain;
/**
 * Content-addressed blob storage, in memory
 *  or on disk.
 */
pub mod store;
/**
 * Wizard step bookkeeping (Build / Metadata / Mint).
 */
pub mod steps;
/**
 * The staged publish pipeline and its
 *  write-once working state.
 */
pub mod publish;
/**
 * Ties a document, its wizard steps and a
 *  publish attempt together.
 */
pub mod session;

pub mod prelude {
    pub use crate::chain::{Amount, Chain, DevLedger, Receipt, TransactionHandle};
    pub use crate::collaborator::CollaboratorError;
    pub use crate::crypto::{Encryptor, LocalEncryptor, Secret};
    pub use crate::document::{BlockId, BlockKind, BlockNode, Document, DocumentCommand, DocumentError};
    pub use crate::linked_data::{Cid, ContentAddress, ContentHash};
    pub use crate::policy::{AccessPolicy, ConditionClause, EncryptedKey, SealedKeyPolicy};
    pub use crate::publish::{
        ImageUpload, NftMetadata, PublishConfig, PublishContext, PublishError, PublishForm,
        Publisher, Stage,
    };
    pub use crate::session::{PublishSession, SessionError, SessionStatus};
    pub use crate::store::{ContentStore, FsContentStore, MemoryContentStore};
}
