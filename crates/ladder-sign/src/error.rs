//! Signing error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    /// Refuse to sign with an unset or empty credential pair.
    #[error("Account has no API credentials")]
    MissingCredentials,
}

pub type SignResult<T> = Result<T, SignError>;
