use bytes::Bytes;

use crate::chain::{Receipt, TransactionHandle};
use crate::crypto::Secret;
use crate::document::{Document, DocumentError};
use crate::linked_data::ContentAddress;
use crate::policy::{ConditionClause, EncryptedKey};

use super::error::PublishError;
use super::metadata::NftMetadata;
use super::stage::Stage;

/// A pipeline output that can be set once
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOnce<T> {
    Unset,
    Set(T),
}

impl<T> Default for WriteOnce<T> {
    fn default() -> Self {
        WriteOnce::Unset
    }
}

impl<T> WriteOnce<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            WriteOnce::Set(value) => Some(value),
            WriteOnce::Unset => None,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self, WriteOnce::Set(_))
    }

    /// Set the value, failing if it was already set
    pub fn set(&mut self, field: &str, value: T) -> Result<(), PublishError> {
        if self.is_set() {
            return Err(PublishError::InvariantViolation(format!(
                "{} is already set",
                field
            )));
        }
        *self = WriteOnce::Set(value);
        Ok(())
    }

    fn clear(&mut self) {
        *self = WriteOnce::Unset;
    }
}

/// A cover image as uploaded by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub data: Bytes,
    /// MIME type as reported by the uploader, e.g. `image/png`
    pub content_type: String,
}

impl ImageUpload {
    pub fn new(data: impl Into<Bytes>, content_type: &str) -> Self {
        Self {
            data: data.into(),
            content_type: content_type.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What the user typed into the metadata form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishForm {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub image: Option<ImageUpload>,
}

impl PublishForm {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// Set tags from a comma separated list, dropping blanks
    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = parse_tags(tags);
        self
    }

    pub fn with_image(mut self, image: ImageUpload) -> Self {
        self.image = Some(image);
        self
    }
}

pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// The working state of one publish attempt
///
/// Stages run in [`Stage::ALL`] order. `step_index` is the index of the next
///  stage to run and only moves forward when a stage has committed all of its
///  outputs; every output is write-once. A failed stage leaves the context
///  untouched, so handing the same context back to the pipeline resumes at
///  the stage that failed.
#[derive(Debug)]
pub struct PublishContext {
    step_index: usize,
    form: PublishForm,
    serialized_document: Bytes,

    ciphertext: WriteOnce<Bytes>,
    symmetric_key: WriteOnce<Secret>,
    document_cid: WriteOnce<ContentAddress>,
    access_conditions: WriteOnce<Vec<ConditionClause>>,
    encrypted_key: WriteOnce<EncryptedKey>,
    image_cid: WriteOnce<ContentAddress>,
    metadata: WriteOnce<NftMetadata>,
    metadata_cid: WriteOnce<ContentAddress>,
    transaction_handle: WriteOnce<TransactionHandle>,
    receipt: WriteOnce<Receipt>,
}

impl PublishContext {
    /// Capture `document` for publishing. Later edits to the document do not
    ///  affect this context.
    pub fn new(document: &Document, form: PublishForm) -> Result<Self, DocumentError> {
        Ok(Self::from_serialized(Bytes::from(document.serialize()?), form))
    }

    pub fn from_serialized(serialized_document: Bytes, form: PublishForm) -> Self {
        Self {
            step_index: 0,
            form,
            serialized_document,
            ciphertext: WriteOnce::Unset,
            symmetric_key: WriteOnce::Unset,
            document_cid: WriteOnce::Unset,
            access_conditions: WriteOnce::Unset,
            encrypted_key: WriteOnce::Unset,
            image_cid: WriteOnce::Unset,
            metadata: WriteOnce::Unset,
            metadata_cid: WriteOnce::Unset,
            transaction_handle: WriteOnce::Unset,
            receipt: WriteOnce::Unset,
        }
    }

    /// Number of committed stages
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// The stage that runs next, `None` once confirmed
    pub fn next_stage(&self) -> Option<Stage> {
        Stage::from_index(self.step_index)
    }

    pub fn is_complete(&self) -> bool {
        self.next_stage().is_none()
    }

    pub fn form(&self) -> &PublishForm {
        &self.form
    }

    pub fn serialized_document(&self) -> &Bytes {
        &self.serialized_document
    }

    pub fn ciphertext(&self) -> Option<&Bytes> {
        self.ciphertext.get()
    }

    pub fn symmetric_key(&self) -> Option<&Secret> {
        self.symmetric_key.get()
    }

    pub fn document_cid(&self) -> Option<&ContentAddress> {
        self.document_cid.get()
    }

    pub fn access_conditions(&self) -> Option<&[ConditionClause]> {
        self.access_conditions.get().map(Vec::as_slice)
    }

    pub fn encrypted_key(&self) -> Option<&EncryptedKey> {
        self.encrypted_key.get()
    }

    pub fn image_cid(&self) -> Option<&ContentAddress> {
        self.image_cid.get()
    }

    pub fn metadata(&self) -> Option<&NftMetadata> {
        self.metadata.get()
    }

    pub fn metadata_cid(&self) -> Option<&ContentAddress> {
        self.metadata_cid.get()
    }

    pub fn transaction_handle(&self) -> Option<&TransactionHandle> {
        self.transaction_handle.get()
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        self.receipt.get()
    }

    /// Edit the form while the stages that read it are still ahead
    ///
    /// Fails once metadata has been built, and refuses image changes once
    ///  the image stage has committed.
    pub fn update_form(&mut self, edit: impl FnOnce(&mut PublishForm)) -> Result<(), PublishError> {
        if self.metadata.is_set() {
            return Err(PublishError::InvariantViolation(
                "metadata is already built from this form".into(),
            ));
        }
        let mut form = self.form.clone();
        edit(&mut form);
        if self.step_index > Stage::StoreImage.index() && form.image != self.form.image {
            return Err(PublishError::InvariantViolation(
                "image stage has already committed".into(),
            ));
        }
        self.form = form;
        Ok(())
    }

    /// Explicitly discard the outputs of `stage` and everything after it, so
    ///  the pipeline redoes that work on the next run
    ///
    /// This is the only way `step_index` moves backwards.
    pub fn reset_to(&mut self, stage: Stage) {
        if stage.index() >= self.step_index {
            return;
        }
        for later in &Stage::ALL[stage.index()..self.step_index] {
            match later {
                Stage::EncryptDocument => {
                    self.ciphertext.clear();
                    self.symmetric_key.clear();
                }
                Stage::StoreDocument => self.document_cid.clear(),
                Stage::DeriveAccessCondition => self.access_conditions.clear(),
                Stage::EncryptKey => self.encrypted_key.clear(),
                Stage::StoreImage => self.image_cid.clear(),
                Stage::BuildMetadata => self.metadata.clear(),
                Stage::StoreMetadata => self.metadata_cid.clear(),
                Stage::SubmitTransaction => self.transaction_handle.clear(),
                Stage::AwaitConfirmation => self.receipt.clear(),
            }
        }
        self.step_index = stage.index();
    }

    fn expect_stage(&self, stage: Stage) -> Result<(), PublishError> {
        match self.next_stage() {
            Some(next) if next == stage => Ok(()),
            Some(next) => Err(PublishError::InvariantViolation(format!(
                "cannot commit {} while {} is next",
                stage, next
            ))),
            None => Err(PublishError::InvariantViolation(format!(
                "cannot commit {} on a completed publish",
                stage
            ))),
        }
    }

    fn expect_unset<T>(field: &WriteOnce<T>, name: &str) -> Result<(), PublishError> {
        if field.is_set() {
            return Err(PublishError::InvariantViolation(format!(
                "{} is already set",
                name
            )));
        }
        Ok(())
    }

    pub(super) fn commit_encryption(&mut self, ciphertext: Bytes, key: Secret) -> Result<(), PublishError> {
        self.expect_stage(Stage::EncryptDocument)?;
        Self::expect_unset(&self.ciphertext, "ciphertext")?;
        Self::expect_unset(&self.symmetric_key, "symmetric_key")?;
        self.ciphertext.set("ciphertext", ciphertext)?;
        self.symmetric_key.set("symmetric_key", key)?;
        self.step_index += 1;
        Ok(())
    }

    pub(super) fn commit_document_cid(&mut self, address: ContentAddress) -> Result<(), PublishError> {
        self.expect_stage(Stage::StoreDocument)?;
        self.document_cid.set("document_cid", address)?;
        self.step_index += 1;
        Ok(())
    }

    pub(super) fn commit_access_conditions(
        &mut self,
        conditions: Vec<ConditionClause>,
    ) -> Result<(), PublishError> {
        self.expect_stage(Stage::DeriveAccessCondition)?;
        self.access_conditions.set("access_conditions", conditions)?;
        self.step_index += 1;
        Ok(())
    }

    pub(super) fn commit_encrypted_key(&mut self, key: EncryptedKey) -> Result<(), PublishError> {
        self.expect_stage(Stage::EncryptKey)?;
        self.encrypted_key.set("encrypted_key", key)?;
        self.step_index += 1;
        Ok(())
    }

    /// `None` records that there was no image to store
    pub(super) fn commit_image(&mut self, address: Option<ContentAddress>) -> Result<(), PublishError> {
        self.expect_stage(Stage::StoreImage)?;
        if let Some(address) = address {
            self.image_cid.set("image_cid", address)?;
        }
        self.step_index += 1;
        Ok(())
    }

    pub(super) fn commit_metadata(&mut self, metadata: NftMetadata) -> Result<(), PublishError> {
        self.expect_stage(Stage::BuildMetadata)?;
        self.metadata.set("metadata", metadata)?;
        self.step_index += 1;
        Ok(())
    }

    pub(super) fn commit_metadata_cid(&mut self, address: ContentAddress) -> Result<(), PublishError> {
        self.expect_stage(Stage::StoreMetadata)?;
        self.metadata_cid.set("metadata_cid", address)?;
        self.step_index += 1;
        Ok(())
    }

    pub(super) fn commit_transaction(&mut self, handle: TransactionHandle) -> Result<(), PublishError> {
        self.expect_stage(Stage::SubmitTransaction)?;
        self.transaction_handle.set("transaction_handle", handle)?;
        self.step_index += 1;
        Ok(())
    }

    pub(super) fn commit_receipt(&mut self, receipt: Receipt) -> Result<(), PublishError> {
        self.expect_stage(Stage::AwaitConfirmation)?;
        self.receipt.set("receipt", receipt)?;
        self.step_index += 1;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::linked_data::ContentAddress;

    fn context() -> PublishContext {
        PublishContext::from_serialized(Bytes::from_static(b"doc"), PublishForm::new("Hero", "A hero"))
    }

    #[test]
    fn test_write_once() {
        let mut field = WriteOnce::default();
        assert_eq!(field.get(), None);
        field.set("answer", 42).unwrap();
        assert!(matches!(
            field.set("answer", 43),
            Err(PublishError::InvariantViolation(_))
        ));
        assert_eq!(field.get(), Some(&42));
    }

    #[test]
    fn test_commits_are_ordered() {
        let mut ctx = context();
        let address = ContentAddress::for_bytes(b"ct", None).unwrap();
        assert!(ctx.commit_document_cid(address.clone()).is_err());
        assert_eq!(ctx.step_index(), 0);
        assert!(ctx.document_cid().is_none());

        ctx.commit_encryption(Bytes::from_static(b"ct"), Secret::generate())
            .unwrap();
        ctx.commit_document_cid(address.clone()).unwrap();
        assert_eq!(ctx.next_stage(), Some(Stage::DeriveAccessCondition));
        assert_eq!(ctx.document_cid(), Some(&address));
    }

    #[test]
    fn test_reset_clears_later_outputs() {
        let mut ctx = context();
        ctx.commit_encryption(Bytes::from_static(b"ct"), Secret::generate())
            .unwrap();
        ctx.commit_document_cid(ContentAddress::for_bytes(b"ct", None).unwrap())
            .unwrap();

        ctx.reset_to(Stage::StoreDocument);
        assert_eq!(ctx.next_stage(), Some(Stage::StoreDocument));
        assert!(ctx.document_cid().is_none());
        assert!(ctx.symmetric_key().is_some());

        // resetting forward is a no-op
        ctx.reset_to(Stage::AwaitConfirmation);
        assert_eq!(ctx.next_stage(), Some(Stage::StoreDocument));
    }

    #[test]
    fn test_update_form() {
        let mut ctx = context();
        ctx.update_form(|form| {
            form.image = Some(ImageUpload::new(b"png".to_vec(), "image/png"))
        })
        .unwrap();
        assert_eq!(ctx.form().image.as_ref().unwrap().content_type, "image/png");
    }

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(" hero, landing,,  "), vec!["hero", "landing"]);
        assert!(parse_tags("").is_empty());
    }
}
