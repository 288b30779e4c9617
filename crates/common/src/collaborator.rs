/// Error returned by every external collaborator call (encryption, access
///  policy, content storage, chain).
///
/// Collaborators report failures through `Result<T, CollaboratorError>`;
///  the publish pipeline maps each variant onto its own failure kinds.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator refused the request (wallet rejection, revert, bad input)
    #[error("rejected: {0}")]
    Rejected(String),
    /// The collaborator could not be reached or is not able to serve the request
    #[error("unavailable: {0}")]
    Unavailable(String),
    /// The collaborator gave up waiting
    #[error("timed out")]
    Timeout,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("collaborator error: {0}")]
    Default(#[from] anyhow::Error),
}
