//! Block documents
//!
//! A document is a tree of typed [`BlockNode`]s rooted at a container. The
//! editor mutates it only by applying [`DocumentCommand`]s, which either
//! insert a whole subtree under a target node or add a connection. The tree
//! is what gets encrypted and published, so its canonical byte form
//! ([`Document::serialize`]) must be deterministic.
//!
//! ```text
//! root (Container)
//!  ├── Heading { level: 1, text: "Hello!" }
//!  ├── Paragraph { text: ... }
//!  └── Form
//!       ├── Button { label: "Send" }
//!       └── ExternalConnector { provider: ... }   <- connection: Node(form)
//! ```

mod block;
mod template;
mod tree;

pub use block::{BlockId, BlockKind, BlockNode, Connection, Iter, PropType, PropValue};
pub use template::BlockTemplate;
pub use tree::{Document, DocumentCommand, ROOT_ID};

use crate::linked_data::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("node not found: {0}")]
    NodeNotFound(BlockId),
    #[error("duplicate block id: {0}")]
    DuplicateId(BlockId),
    #[error("{parent} blocks cannot contain {child} blocks")]
    UnsupportedNesting { parent: BlockKind, child: BlockKind },
    #[error("unknown block type: {0:?}")]
    UnknownBlockType(String),
    #[error("invalid prop '{key}' on {kind}: {reason}")]
    InvalidProp {
        kind: BlockKind,
        key: String,
        reason: String,
    },
    #[error("document root must be a container")]
    InvalidRoot,
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}
