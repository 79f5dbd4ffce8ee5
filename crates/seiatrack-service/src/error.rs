use seiatrack_core::TrackerError;
use seiatrack_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Store(StoreError),
}

/// Storage failures that have a domain meaning are surfaced as the
/// domain error so callers see one taxonomy.
impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ServiceError::Tracker(TrackerError::ProcessNotFound(id)),
            StoreError::StaleRevision { expected, found } => {
                ServiceError::Tracker(TrackerError::StaleProcessState { expected, found })
            }
            other => ServiceError::Store(other),
        }
    }
}
