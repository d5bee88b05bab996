use crate::store::StoreError;
use thiserror::Error;

use super::codec::CodecError;

/// Order repository errors
///
/// Every variant is surfaced to the caller as-is; the repository never
/// retries or substitutes defaults.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Order absent where presence is required
    #[error("Order does not exist: {0}")]
    NotExist(u64),

    /// Order present where absence is required
    #[error("Order already exists: {0}")]
    AlreadyExists(u64),

    /// Stored order no longer matches the version the caller read
    #[error("Order {0} was modified concurrently")]
    Conflict(u64),

    /// Payload present but malformed
    #[error("Corrupt order record {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: CodecError,
    },

    /// Order could not be encoded for storage
    #[error(transparent)]
    Encode(CodecError),

    /// Backend or transport failure
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Caller cancelled or the deadline passed before the unit completed
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<StoreError> for RepoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cancelled => RepoError::Cancelled,
            other => RepoError::Store(other),
        }
    }
}

impl RepoError {
    /// Whether the failure may be transient (backend, not data)
    pub fn is_store_failure(&self) -> bool {
        matches!(self, RepoError::Store(_))
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_store_error_maps_to_cancelled() {
        let err: RepoError = StoreError::Cancelled.into();
        assert!(matches!(err, RepoError::Cancelled));
    }

    #[test]
    fn test_store_failures() {
        let err: RepoError = StoreError::Closed.into();
        assert!(err.is_store_failure());
        assert_eq!(err.to_string(), "Store error: Store is closed");
        assert!(!RepoError::NotExist(1).is_store_failure());
    }
}
