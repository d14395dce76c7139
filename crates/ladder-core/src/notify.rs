//! User-facing notification seam.
//!
//! The gateway reports operation outcomes (order placed, exchange
//! rejections, ...) through a sink owned by the host application.

use std::fmt;

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub severity: Severity,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Success,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Error,
        }
    }
}

/// Sink accepting notifications. Implementations must be cheap and
/// non-blocking; they are called from timer and socket tasks.
pub trait NotifySink: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Default sink that forwards notifications to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NotifySink for LogSink {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            Severity::Success => tracing::info!(text = %notice.text, "notice"),
            Severity::Error => tracing::error!(text = %notice.text, "notice"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_constructors() {
        assert_eq!(Notice::success("ok").severity, Severity::Success);
        assert_eq!(Notice::error("bad").severity, Severity::Error);
    }
}
