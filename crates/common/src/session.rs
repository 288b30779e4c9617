//! The publish wizard: one document, its step tracker and at most one
//!  publish attempt in flight.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chain::{Chain, Receipt};
use crate::crypto::Encryptor;
use crate::document::{BlockId, Document, DocumentCommand, DocumentError};
use crate::policy::AccessPolicy;
use crate::publish::{PublishContext, PublishError, PublishForm, Publisher, Stage};
use crate::steps::{self, Step, METADATA_STEP, MINT_STEP};
use crate::store::ContentStore;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid form: {0}")]
    InvalidForm(String),
    #[error("metadata has not been submitted")]
    MetadataMissing,
    #[error("a publish is already in progress")]
    MintInProgress,
    #[error("there is no publish attempt to resubmit")]
    NoAttempt,
    #[error("the block is already published")]
    AlreadyPublished,
    #[error("document error: {0}")]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Editing,
    Minting,
    /// The last attempt stopped; the message is shown in place of progress
    Paused(String),
    Published(Receipt),
}

#[derive(Debug)]
pub struct PublishSession {
    document: Document,
    steps: Vec<Step>,
    form: Option<PublishForm>,
    context: Option<PublishContext>,
    status: SessionStatus,
    progress: String,
    abandon: Arc<AtomicBool>,
}

impl PublishSession {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            steps: steps::initial_steps(),
            form: None,
            context: None,
            status: SessionStatus::Editing,
            progress: String::new(),
            abandon: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Edit the document. An attempt already in progress keeps publishing the
    ///  document as it was when it started.
    pub fn apply(&mut self, command: DocumentCommand) -> Result<BlockId, SessionError> {
        Ok(self.document.apply(command)?)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn context(&self) -> Option<&PublishContext> {
        self.context.as_ref()
    }

    pub fn is_minting(&self) -> bool {
        self.status == SessionStatus::Minting
    }

    /// Progress of the running stage, or the last error in its place
    pub fn status_message(&self) -> &str {
        match &self.status {
            SessionStatus::Paused(message) => message,
            _ => &self.progress,
        }
    }

    /// Flag that stops [`PublishSession::mint`] before its next stage. It is
    ///  cleared once honoured.
    pub fn abandon_handle(&self) -> Arc<AtomicBool> {
        self.abandon.clone()
    }

    /// Accept the metadata form and move the wizard on to Mint
    pub fn submit_metadata(&mut self, form: PublishForm) -> Result<(), SessionError> {
        if self.is_minting() {
            return Err(SessionError::MintInProgress);
        }
        if form.name.trim().is_empty() {
            return Err(SessionError::InvalidForm("name is required".into()));
        }
        if let Some(ctx) = self.context.as_mut() {
            let replacement = form.clone();
            ctx.update_form(move |current| *current = replacement)?;
        }
        self.form = Some(form);
        if steps::current(&self.steps) == Some(METADATA_STEP) {
            self.steps = steps::advance(&self.steps, METADATA_STEP);
        }
        Ok(())
    }

    /// Correct the form of a paused attempt
    pub fn update_form(&mut self, edit: impl FnOnce(&mut PublishForm)) -> Result<(), SessionError> {
        let form = self.form.as_mut().ok_or(SessionError::MetadataMissing)?;
        let mut edited = form.clone();
        edit(&mut edited);
        if let Some(ctx) = self.context.as_mut() {
            let replacement = edited.clone();
            ctx.update_form(move |current| *current = replacement)?;
        }
        *form = edited;
        Ok(())
    }

    /// Run (or resume) the publish. Mint is marked complete only once the
    ///  transaction is confirmed.
    ///
    /// On failure the attempt is kept so a later call resumes from the stage
    ///  that failed. Returns `Ok(None)` when abandoned.
    pub async fn mint<E, P, S, C>(
        &mut self,
        publisher: &Publisher<E, P, S, C>,
    ) -> Result<Option<Receipt>, SessionError>
    where
        E: Encryptor,
        P: AccessPolicy,
        S: ContentStore,
        C: Chain,
    {
        if self.is_minting() {
            return Err(SessionError::MintInProgress);
        }
        let form = self.form.clone().ok_or(SessionError::MetadataMissing)?;
        if self.context.is_none() {
            self.context = Some(PublishContext::new(&self.document, form)?);
        }
        let Some(ctx) = self.context.as_mut() else {
            return Err(SessionError::MetadataMissing);
        };

        self.status = SessionStatus::Minting;

        while let Some(stage) = ctx.next_stage() {
            if self.abandon.swap(false, Ordering::SeqCst) {
                self.status = SessionStatus::Paused("Publish abandoned".into());
                return Ok(None);
            }
            self.progress = stage.progress_message().to_string();
            if let Err(e) = publisher.step(ctx).await {
                self.status = SessionStatus::Paused(e.to_string());
                return Err(e.into());
            }
        }

        let Some(receipt) = ctx.receipt().cloned() else {
            let e = PublishError::InvariantViolation(format!(
                "{} committed without a receipt",
                Stage::AwaitConfirmation
            ));
            self.status = SessionStatus::Paused(e.to_string());
            return Err(e.into());
        };
        self.progress = format!("Transaction Confirmed: {}", receipt.tx_id);
        self.steps = steps::advance(&self.steps, MINT_STEP);
        self.status = SessionStatus::Published(receipt.clone());
        Ok(Some(receipt))
    }

    /// Send a new transaction for the paused attempt, e.g. after the last one
    ///  reverted. The stored document, image and metadata are reused.
    pub fn resubmit(&mut self) -> Result<(), SessionError> {
        if self.is_minting() {
            return Err(SessionError::MintInProgress);
        }
        if matches!(self.status, SessionStatus::Published(_)) {
            return Err(SessionError::AlreadyPublished);
        }
        let ctx = self.context.as_mut().ok_or(SessionError::NoAttempt)?;
        ctx.reset_to(Stage::SubmitTransaction);
        self.progress.clear();
        self.status = SessionStatus::Editing;
        Ok(())
    }

    /// Drop the current attempt. The next `mint` starts from a fresh capture
    ///  of the document.
    pub fn discard_attempt(&mut self) -> Result<(), SessionError> {
        if self.is_minting() {
            return Err(SessionError::MintInProgress);
        }
        self.context = None;
        self.progress.clear();
        self.status = SessionStatus::Editing;
        Ok(())
    }
}
