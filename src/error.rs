// Domain errors for the account model

use thiserror::Error;

/// Raised when a record cannot be addressed or a mapping is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DataValidationError(pub String);

impl DataValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        DataValidationError(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// True when an `anyhow::Error` carries a `DataValidationError` anywhere in its chain.
pub fn is_validation_error(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.downcast_ref::<DataValidationError>().is_some())
}
