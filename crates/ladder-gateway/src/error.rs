//! Gateway error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Gateway is not active")]
    NotActive,

    #[error("No open position")]
    NoOpenPosition,

    #[error(transparent)]
    Sign(#[from] ladder_sign::SignError),

    #[error(transparent)]
    Rest(#[from] ladder_rest::RestError),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;
