use super::domain::SessionId;
use super::session::Session;

/// Storage abstraction so the service can be exercised in isolation.
pub trait SessionRepository: Send + Sync {
    fn insert(&self, session: Session) -> Result<Session, RepositoryError>;
    /// Replaces the stored session. Implementations must refuse a session
    /// read before the latest write, see [`Session::supersede`].
    fn update(&self, session: Session) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError>;
    /// Atomically flips the stored session's `export_sent` flag. Returns
    /// `true` only for the caller that performed the flip.
    fn claim_export(&self, id: &SessionId) -> Result<bool, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("session already exists")]
    Conflict,
    #[error("session was changed by another request, reload and try again")]
    Stale,
    #[error("session not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
