//! REST error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    /// Exchange-reported business error (non-zero ret_code).
    #[error("Exchange error {code}: {msg}")]
    Exchange {
        code: i64,
        msg: String,
        /// Server clock as reported in the envelope, for diagnosing
        /// recv-window rejections.
        server_time: Option<String>,
        /// The timestamp this client stamped on the rejected request.
        request_time: Option<String>,
    },

    #[error(transparent)]
    Sign(#[from] ladder_sign::SignError),
}

impl RestError {
    /// ret_code for a request timestamp outside the receive window.
    pub const RET_BAD_TIMESTAMP: i64 = 10002;

    /// Human-readable detail for notifications; expands timestamp
    /// rejections with both clocks.
    pub fn notice_text(&self) -> String {
        match self {
            Self::Exchange {
                code,
                msg,
                server_time,
                request_time,
            } if *code == Self::RET_BAD_TIMESTAMP => format!(
                "{msg} (server_time: {}, request_time: {})",
                server_time.as_deref().unwrap_or("?"),
                request_time.as_deref().unwrap_or("?"),
            ),
            other => other.to_string(),
        }
    }
}

pub type RestResult<T> = Result<T, RestError>;
