//! Error types for eligibility-calculator.

use thiserror::Error;

/// Result type alias using the crate's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading campaign configuration or evaluating
/// eligibility.
///
/// Per the fail-closed/fail-open split, `ConfigInvalid` and `InvalidToken`
/// abort the request. Every other rule-evaluation anomaly (a comparator that
/// fails to parse, an attribute that is absent without an NVL default) is
/// resolved as "rule does not match" deeper in the engine and never reaches
/// this type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A campaign configuration failed validation at load time.
    #[error("invalid campaign configuration: {message}")]
    ConfigInvalid { message: String },

    /// A `[[ ... ]]` token in a description/status-text/action string could
    /// not be rendered.
    #[error("invalid token `{token}`: {reason}")]
    InvalidToken { token: String, reason: String },

    /// Internal invariant violation; should not occur on valid inputs.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a [`Error::ConfigInvalid`] from any displayable message.
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }

    /// Build a [`Error::InvalidToken`].
    pub fn invalid_token(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidToken {
            token: token.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigInvalid {
            message: format!("malformed campaign JSON: {err}"),
        }
    }
}
