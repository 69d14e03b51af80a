use thiserror::Error;

/// Failures reported by any storage backend.
///
/// `NotFound`, `Duplicate` and `Inactive` are answers the caller acts on;
/// the rest mean the backend itself misbehaved.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such record: {0}")]
    NotFound(String),

    /// A unique key was already taken.
    #[error("record already exists: {0}")]
    Duplicate(String),

    #[error("proposal {0} is closed or past its deadline")]
    Inactive(String),

    #[error("tally bucket would overflow on proposal {0}")]
    Overflow(String),

    #[error("backend failure: {0}")]
    Backend(String),

    #[error("cannot encode or decode record: {0}")]
    Serialization(String),

    #[error("stored data is malformed: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Whether this is a verdict on the request rather than a backend fault.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            StoreError::NotFound(_) | StoreError::Duplicate(_) | StoreError::Inactive(_)
        )
    }
}
