use std::fmt::Write;
use std::str::FromStr;

use clap::Args;

use common::collaborator::CollaboratorError;
use common::document::{BlockNode, Document, DocumentError};
use common::linked_data::{Cid, ContentAddress, ContentAddressError};
use common::policy::SealedKeyPolicy;
use common::publish::NftMetadata;
use common::store::{ContentStore, FsContentStore};

use crate::state::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Inspect {
    /// Metadata URI printed by `bui publish` (ipfs://<cid>/metadata.json)
    pub uri: String,

    /// Unseal the document key with the local policy key and print the block tree
    #[arg(long)]
    pub decrypt: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("invalid address: {0}")]
    Address(#[from] ContentAddressError),
    #[error("invalid document cid: {0}")]
    Cid(String),
    #[error("failed to fetch {address}: {source}")]
    Fetch {
        address: String,
        source: CollaboratorError,
    },
    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
    #[error("unseal failed: {0}")]
    Unseal(CollaboratorError),
    #[error("decrypt failed: {0}")]
    Decrypt(#[from] common::crypto::SecretError),
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),
}

impl Inspect {
    /// Read from the local store when there is one, then the gateway
    async fn fetch(
        &self,
        ctx: &crate::op::OpContext,
        local: Option<&FsContentStore>,
        address: &ContentAddress,
    ) -> Result<bytes::Bytes, InspectError> {
        if let Some(store) = local {
            match store.get(address).await {
                Ok(data) => return Ok(data),
                Err(CollaboratorError::NotFound(_)) => {}
                Err(e) => tracing::warn!(%address, "local store read failed: {}", e),
            }
        }
        tracing::debug!(%address, "falling back to gateway");
        ctx.gateway
            .get(address)
            .await
            .map_err(|source| InspectError::Fetch {
                address: address.to_string(),
                source,
            })
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Inspect {
    type Error = InspectError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone());
        let local = match &state {
            Ok(state) => FsContentStore::open(&state.store_path).await.ok(),
            Err(_) => None,
        };

        let metadata_address = ContentAddress::parse_uri(&self.uri)?;
        let raw = self.fetch(ctx, local.as_ref(), &metadata_address).await?;
        let metadata = NftMetadata::from_json(&raw)?;
        let properties = &metadata.bui_properties;

        let mut output = String::new();
        let _ = writeln!(output, "Name: {}", metadata.name);
        let _ = writeln!(output, "Description: {}", metadata.description);
        if !metadata.image.is_empty() {
            let _ = writeln!(output, "Image: {}", metadata.image);
        }
        if !properties.tags.is_empty() {
            let _ = writeln!(output, "Tags: {}", properties.tags.join(", "));
        }
        let _ = writeln!(output, "Document: {}", properties.cid);
        let _ = writeln!(output, "Encrypted key: {:?}", properties.encrypted_key);
        for clause in &properties.auth_conditions {
            let _ = writeln!(
                output,
                "Condition: {}.{}({}) on {} {} {}",
                clause.contract_address,
                clause.function_name,
                clause.function_params.join(", "),
                clause.chain,
                clause.return_value_test.comparator,
                clause.return_value_test.value,
            );
        }

        if self.decrypt {
            let state = state?;
            let policy = SealedKeyPolicy::new(state.load_key()?, &state.config.chain);
            let key = policy
                .unseal(&properties.encrypted_key, &properties.auth_conditions)
                .map_err(InspectError::Unseal)?;

            let cid = Cid::from_str(&properties.cid).map_err(|e| InspectError::Cid(e.to_string()))?;
            let ciphertext = self
                .fetch(ctx, local.as_ref(), &ContentAddress::new(cid, None))
                .await?;
            let document = Document::from_bytes(&key.decrypt(&ciphertext)?)?;

            let _ = writeln!(output, "Blocks ({}):", document.len());
            render(&mut output, document.root(), 1);
        }

        Ok(output.trim_end().to_string())
    }
}

fn render(output: &mut String, node: &BlockNode, depth: usize) {
    let props = serde_json::to_string(node.props()).unwrap_or_default();
    let _ = writeln!(
        output,
        "{:indent$}{} {} {}",
        "",
        node.kind(),
        node.id(),
        props,
        indent = depth * 2
    );
    for child in node.children() {
        render(output, child, depth + 1);
    }
}
