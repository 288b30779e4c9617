use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;

use common::chain::DevLedger;
use common::crypto::LocalEncryptor;
use common::document::{BlockTemplate, Document, DocumentError};
use common::policy::SealedKeyPolicy;
use common::publish::{ImageUpload, PublishForm, Publisher};
use common::session::{PublishSession, SessionError};
use common::store::FsContentStore;

use crate::state::{AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Publish {
    /// JSON file holding a list of block templates
    #[arg(long)]
    pub document: PathBuf,

    /// Name of the published block
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Comma separated tags
    #[arg(long, default_value = "")]
    pub tags: String,

    /// Preview image; content type is guessed from the extension
    #[arg(long)]
    pub image: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum PublishOpError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid document json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),
    #[error("store error: {0}")]
    Store(#[from] common::collaborator::CollaboratorError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("publish abandoned")]
    Abandoned,
}

impl Publish {
    async fn read(path: &Path) -> Result<Vec<u8>, PublishOpError> {
        tokio::fs::read(path)
            .await
            .map_err(|source| PublishOpError::Read {
                path: path.to_path_buf(),
                source,
            })
    }

    async fn form(&self) -> Result<PublishForm, PublishOpError> {
        let mut form = PublishForm::new(&self.name, &self.description).with_tags(&self.tags);
        if let Some(path) = &self.image {
            let data = Self::read(path).await?;
            let content_type = mime_guess::from_path(path).first_or_octet_stream();
            form = form.with_image(ImageUpload::new(data, content_type.essence_str()));
        }
        Ok(form)
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Publish {
    type Error = PublishOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;
        let config = &state.config;

        let templates: Vec<BlockTemplate> = serde_json::from_slice(&Self::read(&self.document).await?)?;
        let document = Document::from_templates(templates)?;
        tracing::info!(blocks = document.len(), "loaded document");

        let policy = SealedKeyPolicy::new(state.load_key()?, &config.chain);
        let store = FsContentStore::open(&state.store_path).await?;
        let chain = DevLedger::new(
            config.publish_price(),
            Duration::from_millis(config.dev_confirmation_delay_ms),
        )
        .with_poll_interval(Duration::from_millis(config.confirmation_poll_ms));
        let publisher = Publisher::new(
            LocalEncryptor,
            policy,
            store,
            chain,
            config.publish_config(),
        );

        let mut session = PublishSession::new(document);
        session.submit_metadata(self.form().await?)?;
        let receipt = session
            .mint(&publisher)
            .await?
            .ok_or(PublishOpError::Abandoned)?;

        let (document_cid, metadata_uri) = match session.context() {
            Some(published) => (
                published
                    .document_cid()
                    .map(|address| address.cid().to_string())
                    .unwrap_or_default(),
                published
                    .metadata_cid()
                    .map(|address| address.uri())
                    .unwrap_or_default(),
            ),
            None => Default::default(),
        };

        Ok(format!(
            "{}\n\
             - Document: {}\n\
             - Metadata: {}\n\
             - Gas used: {}",
            session.status_message(),
            document_cid,
            metadata_uri,
            receipt.gas_used,
        ))
    }
}
