use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no stored process for project {0}")]
    NotFound(String),

    #[error("a process for project {0} already exists")]
    AlreadyExists(String),

    #[error("stale revision: expected {expected}, found {found}")]
    StaleRevision { expected: u64, found: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json codec error: {0}")]
    Json(#[from] serde_json::Error),
}
