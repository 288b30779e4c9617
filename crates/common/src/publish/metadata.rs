use serde::{Deserialize, Serialize};

use crate::policy::{ConditionClause, EncryptedKey};

/// Filename the metadata document is stored under
pub const METADATA_FILENAME: &str = "metadata.json";

/// Token metadata, in the shape marketplaces read
///
/// ```json
/// {
///   "description": "...",
///   "image": "ipfs://<cid>/my_block.png",
///   "name": "My Block",
///   "buiProperties": {
///     "cid": "<document cid>",
///     "encryptedKey": "<hex>",
///     "authConditions": [ ... ],
///     "tags": ["hero", "landing"]
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftMetadata {
    pub description: String,
    /// Image URI, or empty when no image was published
    pub image: String,
    pub name: String,
    pub bui_properties: BuiProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuiProperties {
    pub cid: String,
    pub encrypted_key: EncryptedKey,
    pub auth_conditions: Vec<ConditionClause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NftMetadata {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

/// Lowercase `name`, replacing anything that isn't ASCII alphanumeric with `_`
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("My Block!"), "my_block_");
        assert_eq!(normalize_name("Hero-v2"), "hero_v2");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_json_shape() {
        let metadata = NftMetadata {
            description: "A hero section".into(),
            image: String::new(),
            name: "Hero".into(),
            bui_properties: BuiProperties {
                cid: "bafk".into(),
                encrypted_key: EncryptedKey::from(vec![1, 2]),
                auth_conditions: vec![],
                tags: vec![],
            },
        };
        let json: serde_json::Value =
            serde_json::from_slice(&metadata.to_json().unwrap()).unwrap();
        assert_eq!(json["image"], "");
        assert_eq!(json["buiProperties"]["encryptedKey"], "0102");
        assert!(json["buiProperties"].get("tags").is_none());

        let decoded = NftMetadata::from_json(&metadata.to_json().unwrap()).unwrap();
        assert_eq!(decoded, metadata);
    }
}
