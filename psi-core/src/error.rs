//! Error types for the PSI protocol.

use thiserror::Error;

/// Errors that can occur while running either side of the PSI protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PsiError {
    /// The instance was deleted and its key material wiped.
    #[error("Instance has been deleted")]
    InstanceDeleted,

    /// Key bytes handed to `create_from_key` do not encode a usable scalar.
    #[error("Invalid private key: {0}")]
    InvalidKey(String),

    /// A caller-supplied parameter is out of range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A request, response or setup message could not be decoded or is
    /// internally inconsistent.
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// A cryptographic operation failed.
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// The reveal mode carried by a message does not match the client's mode.
    #[error("Reveal mode mismatch: client expects reveal_intersection = {expected}, but the message carries {actual}")]
    RevealModeMismatch { expected: bool, actual: bool },

    /// `get_intersection` was called before any request was created.
    #[error("No request has been created by this client")]
    MissingRequest,
}

impl From<bincode::Error> for PsiError {
    fn from(err: bincode::Error) -> Self {
        PsiError::MalformedMessage(err.to_string())
    }
}

/// Result type for PSI operations.
pub type Result<T> = std::result::Result<T, PsiError>;
