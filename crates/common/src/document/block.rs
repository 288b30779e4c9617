use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DocumentError;

/// Identifier of a block, unique within its document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random id, used for blocks created from drag sources
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of block kinds the editor can place
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    Container,
    Heading,
    Paragraph,
    Link,
    Form,
    ExternalConnector,
    Button,
}

/// Value type a prop key accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropType {
    Int,
    Bool,
    Text,
}

impl fmt::Display for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropType::Int => f.write_str("int"),
            PropType::Bool => f.write_str("bool"),
            PropType::Text => f.write_str("text"),
        }
    }
}

const CONTAINER_PROPS: &[(&str, PropType)] = &[];
const HEADING_PROPS: &[(&str, PropType)] = &[("level", PropType::Int), ("text", PropType::Text)];
const PARAGRAPH_PROPS: &[(&str, PropType)] = &[("text", PropType::Text)];
const LINK_PROPS: &[(&str, PropType)] = &[("href", PropType::Text), ("text", PropType::Text)];
const FORM_PROPS: &[(&str, PropType)] = &[("action", PropType::Text)];
const CONNECTOR_PROPS: &[(&str, PropType)] =
    &[("provider", PropType::Text), ("endpoint", PropType::Text)];
const BUTTON_PROPS: &[(&str, PropType)] = &[("label", PropType::Text), ("disabled", PropType::Bool)];

const HEADING_LEVELS: std::ops::RangeInclusive<i64> = 1..=6;

impl BlockKind {
    pub const ALL: [BlockKind; 7] = [
        BlockKind::Container,
        BlockKind::Heading,
        BlockKind::Paragraph,
        BlockKind::Link,
        BlockKind::Form,
        BlockKind::ExternalConnector,
        BlockKind::Button,
    ];

    /// Normalize a drag source's type label into a block kind.
    ///
    /// Case, `_`, `-`, `.` and whitespace are ignored, and a leading
    /// `primitive` qualifier is dropped, so `PRIMITIVE_CONTAINER`,
    /// `external-connector` and `Heading` all resolve.
    pub fn from_raw_label(label: &str) -> Result<Self, DocumentError> {
        let normalized: String = label
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | '.') && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        let normalized = normalized
            .strip_prefix("primitive")
            .unwrap_or(&normalized);

        match normalized {
            "container" => Ok(BlockKind::Container),
            "heading" => Ok(BlockKind::Heading),
            "paragraph" => Ok(BlockKind::Paragraph),
            "link" => Ok(BlockKind::Link),
            "form" => Ok(BlockKind::Form),
            "button" => Ok(BlockKind::Button),
            "externalconnector" | "connector" | "moonmailconnector" => {
                Ok(BlockKind::ExternalConnector)
            }
            _ => Err(DocumentError::UnknownBlockType(label.to_string())),
        }
    }

    /// Whether a block of this kind may own a child of kind `child`
    pub fn accepts(&self, child: BlockKind) -> bool {
        match self {
            BlockKind::Container => true,
            // no nested forms
            BlockKind::Form => child != BlockKind::Form,
            _ => false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        !matches!(self, BlockKind::Container | BlockKind::Form)
    }

    /// Prop keys this kind accepts and their value types
    pub fn schema(&self) -> &'static [(&'static str, PropType)] {
        match self {
            BlockKind::Container => CONTAINER_PROPS,
            BlockKind::Heading => HEADING_PROPS,
            BlockKind::Paragraph => PARAGRAPH_PROPS,
            BlockKind::Link => LINK_PROPS,
            BlockKind::Form => FORM_PROPS,
            BlockKind::ExternalConnector => CONNECTOR_PROPS,
            BlockKind::Button => BUTTON_PROPS,
        }
    }

    /// Check a prop map against this kind's schema
    pub fn validate_props(&self, props: &BTreeMap<String, PropValue>) -> Result<(), DocumentError> {
        for (key, value) in props {
            let expected = self
                .schema()
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, ty)| *ty)
                .ok_or_else(|| DocumentError::InvalidProp {
                    kind: *self,
                    key: key.clone(),
                    reason: "unknown prop".to_string(),
                })?;

            if value.prop_type() != expected {
                return Err(DocumentError::InvalidProp {
                    kind: *self,
                    key: key.clone(),
                    reason: format!("expected {}, got {}", expected, value.prop_type()),
                });
            }

            if let (BlockKind::Heading, "level", PropValue::Int(level)) =
                (self, key.as_str(), value)
            {
                if !HEADING_LEVELS.contains(level) {
                    return Err(DocumentError::InvalidProp {
                        kind: *self,
                        key: key.clone(),
                        reason: format!("heading level {} out of range", level),
                    });
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl PropValue {
    pub fn prop_type(&self) -> PropType {
        match self {
            PropValue::Int(_) => PropType::Int,
            PropValue::Bool(_) => PropType::Bool,
            PropValue::Text(_) => PropType::Text,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Text(s.to_string())
    }
}

impl From<String> for PropValue {
    fn from(s: String) -> Self {
        PropValue::Text(s)
    }
}

impl From<i64> for PropValue {
    fn from(n: i64) -> Self {
        PropValue::Int(n)
    }
}

impl From<bool> for PropValue {
    fn from(b: bool) -> Self {
        PropValue::Bool(b)
    }
}

/// A reference from one block to another block or to an external integration.
///  Never implies ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connection {
    Node(BlockId),
    External(String),
}

/// A node in the block document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockNode {
    id: BlockId,
    #[serde(rename = "type")]
    kind: BlockKind,
    #[serde(default)]
    props: BTreeMap<String, PropValue>,
    #[serde(default)]
    connections: Vec<Connection>,
    #[serde(default)]
    children: Vec<BlockNode>,
}

impl BlockNode {
    pub fn new(id: impl Into<BlockId>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
            props: BTreeMap::new(),
            connections: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_prop(mut self, key: &str, value: impl Into<PropValue>) -> Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    pub fn with_child(mut self, child: BlockNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn id(&self) -> &BlockId {
        &self.id
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn props(&self) -> &BTreeMap<String, PropValue> {
        &self.props
    }

    pub fn prop(&self, key: &str) -> Option<&PropValue> {
        self.props.get(key)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn children(&self) -> &[BlockNode] {
        &self.children
    }

    pub(super) fn children_mut(&mut self) -> &mut Vec<BlockNode> {
        &mut self.children
    }

    pub(super) fn push_child(&mut self, child: BlockNode) {
        self.children.push(child);
    }

    pub(super) fn push_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// Depth-first, pre-order walk over this node and its descendants
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

pub struct Iter<'a> {
    stack: Vec<&'a BlockNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a BlockNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
