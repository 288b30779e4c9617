//! The publish pipeline
//!
//! Publishing a block is a fixed sequence of [`Stage`]s:
//!
//! ```text
//! encrypt -> store document -> derive access condition -> encrypt key
//!   -> store image (optional) -> build metadata -> store metadata
//!   -> submit transaction -> await confirmation
//! ```
//!
//! A [`PublishContext`] holds the outputs of the stages that have committed.
//!  Each output is write-once, and a failed stage leaves the context as it
//!  found it, so a publish that failed halfway resumes from the failed stage
//!  without redoing uploads that already happened.
//!
//! Before submitting, the pipeline asks the chain whether a transaction for
//!  the same document already exists and adopts it instead of paying twice.
//!  A resumed confirmation checks the transaction's status first.

mod context;
mod error;
mod metadata;
mod pipeline;
mod stage;

pub use context::{parse_tags, ImageUpload, PublishContext, PublishForm, WriteOnce};
pub use error::PublishError;
pub use metadata::{normalize_name, BuiProperties, NftMetadata, METADATA_FILENAME};
pub use pipeline::{
    PublishConfig, Publisher, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_CONTRACT_NAME,
    DEFAULT_OWNERSHIP_METHOD, USER_ADDRESS_PLACEHOLDER,
};
pub use stage::Stage;
