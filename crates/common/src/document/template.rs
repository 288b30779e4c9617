use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::block::{BlockId, BlockKind, BlockNode, PropValue};
use super::tree::{Document, DocumentCommand, ROOT_ID};
use super::DocumentError;

/// A hand-written description of a block subtree, e.g. loaded from JSON:
///
/// ```json
/// [{ "type": "Container", "children": [
///     { "type": "Heading", "props": { "level": 1, "text": "Hello!" } },
///     { "type": "Link", "props": { "href": "https://crcls.xyz" } }
/// ]}]
/// ```
///
/// `type` is a raw label, normalized the same way drag sources are.
///  Blocks without an `id` get a generated one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTemplate {
    #[serde(rename = "type")]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub props: BTreeMap<String, PropValue>,
    #[serde(default)]
    pub children: Vec<BlockTemplate>,
}

impl BlockTemplate {
    pub fn into_node(self) -> Result<BlockNode, DocumentError> {
        let kind = BlockKind::from_raw_label(&self.label)?;
        let id = self.id.map(BlockId::new).unwrap_or_else(BlockId::generate);
        let mut node = BlockNode::new(id, kind);
        for (key, value) in self.props {
            node = node.with_prop(&key, value);
        }
        for child in self.children {
            node = node.with_child(child.into_node()?);
        }
        Ok(node)
    }
}

impl Document {
    /// Build a document by inserting each template under the root, in order
    pub fn from_templates(templates: Vec<BlockTemplate>) -> Result<Self, DocumentError> {
        let mut document = Document::new();
        for template in templates {
            document.apply(DocumentCommand::InsertNode {
                target: ROOT_ID.into(),
                node: template.into_node()?,
            })?;
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = r#"[{
        "type": "Container",
        "id": "main",
        "children": [
            { "type": "Heading", "id": "h", "props": { "level": 1, "text": "Hello!" } },
            { "type": "Paragraph", "props": { "text": "Lorem ipsum" } },
            { "type": "Link", "props": { "href": "https://crcls.xyz", "text": "Let's go!" } }
        ]
    }]"#;

    #[test]
    fn test_from_json_templates() {
        let templates: Vec<BlockTemplate> = serde_json::from_str(HELLO).unwrap();
        let doc = Document::from_templates(templates).unwrap();
        assert_eq!(doc.len(), 5);
        let heading = doc.get(&"h".into()).unwrap();
        assert_eq!(heading.kind(), BlockKind::Heading);
        assert_eq!(heading.prop("level"), Some(&PropValue::Int(1)));
        assert_eq!(doc.get(&"main".into()).unwrap().children().len(), 3);
    }

    #[test]
    fn test_template_errors_surface() {
        let bad_label: Vec<BlockTemplate> =
            serde_json::from_str(r#"[{ "type": "Carousel" }]"#).unwrap();
        assert!(matches!(
            Document::from_templates(bad_label),
            Err(DocumentError::UnknownBlockType(_))
        ));

        let bad_nesting: Vec<BlockTemplate> = serde_json::from_str(
            r#"[{ "type": "Link", "children": [{ "type": "Button" }] }]"#,
        )
        .unwrap();
        assert!(matches!(
            Document::from_templates(bad_nesting),
            Err(DocumentError::UnsupportedNesting { .. })
        ));
    }
}
