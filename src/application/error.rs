use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Receiver not found: {0}")]
    ReceiverNotFound(String),

    #[error("Operation not found: {0}")]
    OperationNotFound(String),

    #[error("Operation already confirmed: {0}")]
    AlreadyConfirmed(String),

    #[error("Store failure: {0}")]
    Store(#[from] anyhow::Error),
}

impl AppError {
    /// True when the caller can fix the request; false for server-side faults.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, AppError::Store(_))
    }
}
