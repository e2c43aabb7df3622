//! Failure value reported by the external collaborator.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A failed external operation: an HTTP-like status when one is known, plus
/// free-form message text. The classifier only ever looks at these two fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationFailure {
    pub status: Option<u16>,
    pub message: String,
}

impl OperationFailure {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Failure with a status code.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::new(Some(status), message)
    }

    /// Failure with message text only.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {}: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for OperationFailure {}
