use std::collections::HashSet;

use crate::linked_data::BlockEncoded;

use super::block::{BlockId, BlockKind, BlockNode, Connection, Iter};
use super::DocumentError;

/// Id of the root container every document starts with
pub const ROOT_ID: &str = "root";

impl BlockEncoded for BlockNode {}

/// A single edit to a document
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentCommand {
    /// Insert a fully described subtree under `target`
    InsertNode { target: BlockId, node: BlockNode },
    /// Insert a fresh, empty block from a drag source's raw type label
    InsertRaw { target: BlockId, label: String },
    /// Add a connection to an existing block
    Connect {
        source: BlockId,
        connection: Connection,
    },
}

/// The block document owned by an editing session
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: BlockNode,
    // every id in the tree, kept in step with `root`
    ids: HashSet<BlockId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document: a single root container
    pub fn new() -> Self {
        let root = BlockNode::new(ROOT_ID, BlockKind::Container);
        let ids = HashSet::from([root.id().clone()]);
        Self { root, ids }
    }

    pub fn root(&self) -> &BlockNode {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children().is_empty()
    }

    pub fn contains(&self, id: &BlockId) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &BlockId) -> Option<&BlockNode> {
        self.root.iter().find(|node| node.id() == id)
    }

    pub fn iter(&self) -> Iter<'_> {
        self.root.iter()
    }

    /// Apply an editor command. Returns the id of the block that was inserted
    ///  or connected from.
    ///
    /// A failed command leaves the document unchanged.
    pub fn apply(&mut self, command: DocumentCommand) -> Result<BlockId, DocumentError> {
        match command {
            DocumentCommand::InsertNode { target, node } => self.insert(&target, node),
            DocumentCommand::InsertRaw { target, label } => {
                let kind = BlockKind::from_raw_label(&label)?;
                self.insert(&target, BlockNode::new(BlockId::generate(), kind))
            }
            DocumentCommand::Connect { source, connection } => {
                self.connect(&source, connection)?;
                Ok(source)
            }
        }
    }

    /// Append `node` (and its whole subtree) to the children of `target`.
    pub fn insert(&mut self, target: &BlockId, node: BlockNode) -> Result<BlockId, DocumentError> {
        let parent_kind = self
            .get(target)
            .map(|parent| parent.kind())
            .ok_or_else(|| DocumentError::NodeNotFound(target.clone()))?;

        if !parent_kind.accepts(node.kind()) {
            return Err(DocumentError::UnsupportedNesting {
                parent: parent_kind,
                child: node.kind(),
            });
        }

        let new_ids = validate_subtree(&node, &self.ids)?;

        let parent = find_mut(&mut self.root, target)
            .ok_or_else(|| DocumentError::NodeNotFound(target.clone()))?;
        let id = node.id().clone();
        parent.push_child(node);
        self.ids.extend(new_ids);

        tracing::debug!(target = %target, id = %id, "inserted block");
        Ok(id)
    }

    /// Add `connection` to the block `source`. Node connections must point at
    ///  a block that exists in this document.
    pub fn connect(&mut self, source: &BlockId, connection: Connection) -> Result<(), DocumentError> {
        if let Connection::Node(other) = &connection {
            if !self.ids.contains(other) {
                return Err(DocumentError::NodeNotFound(other.clone()));
            }
        }
        let node = find_mut(&mut self.root, source)
            .ok_or_else(|| DocumentError::NodeNotFound(source.clone()))?;
        node.push_connection(connection);
        Ok(())
    }

    /// Canonical byte form of the whole tree.
    ///
    /// Props are kept in sorted maps and children in insertion order, so equal
    ///  trees always produce identical bytes.
    pub fn serialize(&self) -> Result<Vec<u8>, DocumentError> {
        Ok(self.root.encode()?)
    }

    /// Rebuild a document from [`Document::serialize`] output, re-checking
    ///  every structural rule.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DocumentError> {
        let root = BlockNode::decode(data)?;
        if root.kind() != BlockKind::Container {
            return Err(DocumentError::InvalidRoot);
        }
        let ids = validate_subtree(&root, &HashSet::new())?;
        Ok(Self { root, ids })
    }
}

fn find_mut<'a>(node: &'a mut BlockNode, id: &BlockId) -> Option<&'a mut BlockNode> {
    if node.id() == id {
        return Some(node);
    }
    node.children_mut().iter_mut().find_map(|child| find_mut(child, id))
}

/// Check a subtree about to join a tree that already holds `existing` ids.
///  Returns the ids the subtree introduces.
fn validate_subtree(
    node: &BlockNode,
    existing: &HashSet<BlockId>,
) -> Result<HashSet<BlockId>, DocumentError> {
    let mut seen = HashSet::new();
    for n in node.iter() {
        n.kind().validate_props(n.props())?;
        for child in n.children() {
            if !n.kind().accepts(child.kind()) {
                return Err(DocumentError::UnsupportedNesting {
                    parent: n.kind(),
                    child: child.kind(),
                });
            }
        }
        if existing.contains(n.id()) || !seen.insert(n.id().clone()) {
            return Err(DocumentError::DuplicateId(n.id().clone()));
        }
    }

    for n in node.iter() {
        for connection in n.connections() {
            if let Connection::Node(other) = connection {
                if !existing.contains(other) && !seen.contains(other) {
                    return Err(DocumentError::NodeNotFound(other.clone()));
                }
            }
        }
    }

    Ok(seen)
}

#[cfg(test)]
mod test {
    use super::*;

    fn hello_document() -> Document {
        let mut doc = Document::new();
        let container = BlockNode::new("container", BlockKind::Container)
            .with_child(
                BlockNode::new("heading", BlockKind::Heading)
                    .with_prop("level", 1i64)
                    .with_prop("text", "Hello!"),
            )
            .with_child(
                BlockNode::new("paragraph", BlockKind::Paragraph)
                    .with_prop("text", "Aenean sodales nunc augue, quis mollis dolor tempor at."),
            )
            .with_child(
                BlockNode::new("link", BlockKind::Link)
                    .with_prop("href", "https://crcls.xyz")
                    .with_prop("text", "Let's go!"),
            );
        doc.insert(&ROOT_ID.into(), container).unwrap();
        doc
    }

    #[test]
    fn test_new_document() {
        let doc = Document::new();
        assert_eq!(doc.len(), 1);
        assert!(doc.is_empty());
        assert_eq!(doc.root().kind(), BlockKind::Container);
        assert!(doc.contains(&ROOT_ID.into()));
    }

    #[test]
    fn test_insert_subtree() {
        let doc = hello_document();
        assert_eq!(doc.len(), 5);
        let link = doc.get(&"link".into()).unwrap();
        assert_eq!(link.prop("href").and_then(|v| v.as_text()), Some("https://crcls.xyz"));
        let ids: Vec<&str> = doc.iter().map(|n| n.id().as_str()).collect();
        assert_eq!(ids, vec!["root", "container", "heading", "paragraph", "link"]);
    }

    #[test]
    fn test_insert_missing_target() {
        let mut doc = hello_document();
        let before = doc.clone();
        let result = doc.insert(&"nope".into(), BlockNode::new("b", BlockKind::Button));
        assert!(matches!(result, Err(DocumentError::NodeNotFound(id)) if id.as_str() == "nope"));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_insert_under_leaf_fails_and_leaves_tree_unchanged() {
        let mut doc = hello_document();
        let before = doc.serialize().unwrap();
        for kind in BlockKind::ALL {
            let result = doc.insert(&"link".into(), BlockNode::new(BlockId::generate(), kind));
            assert!(matches!(
                result,
                Err(DocumentError::UnsupportedNesting { parent: BlockKind::Link, .. })
            ));
        }
        assert_eq!(doc.serialize().unwrap(), before);
    }

    #[test]
    fn test_insert_duplicate_id() {
        let mut doc = hello_document();
        let result = doc.insert(&"container".into(), BlockNode::new("heading", BlockKind::Heading));
        assert!(matches!(result, Err(DocumentError::DuplicateId(id)) if id.as_str() == "heading"));

        // duplicates inside the inserted subtree are caught too
        let form = BlockNode::new("form", BlockKind::Form)
            .with_child(BlockNode::new("btn", BlockKind::Button))
            .with_child(BlockNode::new("btn", BlockKind::Button));
        assert!(matches!(
            doc.insert(&"container".into(), form),
            Err(DocumentError::DuplicateId(_))
        ));
        assert!(!doc.contains(&"form".into()));
    }

    #[test]
    fn test_insert_invalid_nested_subtree() {
        let mut doc = Document::new();
        let form = BlockNode::new("form", BlockKind::Form)
            .with_child(BlockNode::new("inner", BlockKind::Form));
        assert!(matches!(
            doc.insert(&ROOT_ID.into(), form),
            Err(DocumentError::UnsupportedNesting {
                parent: BlockKind::Form,
                child: BlockKind::Form
            })
        ));
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_insert_invalid_props() {
        let mut doc = Document::new();
        let heading = BlockNode::new("h", BlockKind::Heading).with_prop("href", "x");
        assert!(matches!(
            doc.insert(&ROOT_ID.into(), heading),
            Err(DocumentError::InvalidProp { .. })
        ));
    }

    #[test]
    fn test_apply_raw_insert() {
        let mut doc = Document::new();
        let form = doc
            .apply(DocumentCommand::InsertRaw {
                target: ROOT_ID.into(),
                label: "PRIMITIVE_FORM".to_string(),
            })
            .unwrap();
        let button = doc
            .apply(DocumentCommand::InsertRaw {
                target: form.clone(),
                label: "PRIMITIVE_BUTTON".to_string(),
            })
            .unwrap();
        assert_ne!(form, button);
        assert_eq!(doc.get(&button).unwrap().kind(), BlockKind::Button);
        assert_eq!(doc.get(&form).unwrap().children().len(), 1);

        let unknown = doc.apply(DocumentCommand::InsertRaw {
            target: ROOT_ID.into(),
            label: "PRIMITIVE_CAROUSEL".to_string(),
        });
        assert!(matches!(unknown, Err(DocumentError::UnknownBlockType(_))));
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn test_connect() {
        let mut doc = Document::new();
        let form = BlockNode::new("form", BlockKind::Form).with_child(
            BlockNode::new("mail", BlockKind::ExternalConnector)
                .with_prop("provider", "moonmail")
                .with_connection(Connection::Node("form".into())),
        );
        doc.insert(&ROOT_ID.into(), form).unwrap();

        doc.apply(DocumentCommand::Connect {
            source: "form".into(),
            connection: Connection::External("https://api.moonmail.io/lists/1".to_string()),
        })
        .unwrap();
        assert_eq!(doc.get(&"form".into()).unwrap().connections().len(), 1);

        assert!(matches!(
            doc.connect(&"form".into(), Connection::Node("ghost".into())),
            Err(DocumentError::NodeNotFound(_))
        ));
        assert!(matches!(
            doc.connect(&"ghost".into(), Connection::External("x".into())),
            Err(DocumentError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_dangling_connection_in_subtree() {
        let mut doc = Document::new();
        let button = BlockNode::new("b", BlockKind::Button)
            .with_connection(Connection::Node("missing".into()));
        assert!(matches!(
            doc.insert(&ROOT_ID.into(), button),
            Err(DocumentError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_serialize_is_deterministic() {
        let a = hello_document();
        let b = hello_document();
        assert_eq!(a.serialize().unwrap(), a.serialize().unwrap());
        assert_eq!(a.serialize().unwrap(), b.serialize().unwrap());
    }

    #[test]
    fn test_serialize_prop_order_does_not_matter() {
        let mut a = Document::new();
        let mut b = Document::new();
        a.insert(
            &ROOT_ID.into(),
            BlockNode::new("l", BlockKind::Link)
                .with_prop("href", "https://crcls.xyz")
                .with_prop("text", "go"),
        )
        .unwrap();
        b.insert(
            &ROOT_ID.into(),
            BlockNode::new("l", BlockKind::Link)
                .with_prop("text", "go")
                .with_prop("href", "https://crcls.xyz"),
        )
        .unwrap();
        assert_eq!(a.serialize().unwrap(), b.serialize().unwrap());
    }

    #[test]
    fn test_serialize_child_order_matters() {
        let mut a = Document::new();
        let mut b = Document::new();
        for (doc, order) in [(&mut a, ["x", "y"]), (&mut b, ["y", "x"])] {
            for id in order {
                doc.insert(&ROOT_ID.into(), BlockNode::new(id, BlockKind::Paragraph))
                    .unwrap();
            }
        }
        assert_ne!(a.serialize().unwrap(), b.serialize().unwrap());
    }

    #[test]
    fn test_from_bytes() {
        let doc = hello_document();
        let bytes = doc.serialize().unwrap();
        let decoded = Document::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, doc);
        assert_eq!(decoded.serialize().unwrap(), bytes);
    }

    #[test]
    fn test_from_bytes_rejects_non_container_root() {
        let bytes = BlockNode::new("root", BlockKind::Link).encode().unwrap();
        assert!(matches!(
            Document::from_bytes(&bytes),
            Err(DocumentError::InvalidRoot)
        ));
    }
}
