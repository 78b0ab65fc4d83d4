//! Shared error types for the services crate.

use thiserror::Error;

/// Coarse classification every service error maps onto, for callers that
/// branch on the failure class rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credentials were rejected.
    Auth,
    /// An operation needed a session that does not exist.
    NotAuthenticated,
    /// The refresh credential was rejected; the session has been cleared.
    Refresh,
    Transport,
    NotFound,
    Validation,
    /// Any other non-success answer from the server.
    Server,
    /// The local study state does not allow the operation.
    State,
}

/// Network-level failures. Payloads are strings so the error can be cloned
/// to every waiter of a shared refresh.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request was cancelled")]
    Cancelled,
    #[error("transport failure: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// Errors emitted by the session coordinator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AuthError {
    #[error("{message}")]
    Rejected { message: String },
    #[error("user is not authenticated")]
    NotAuthenticated,
    #[error("{message}")]
    Refresh { message: String },
    #[error("unexpected auth response: {0}")]
    Malformed(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl AuthError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected { .. } => ErrorKind::Auth,
            Self::NotAuthenticated => ErrorKind::NotAuthenticated,
            Self::Refresh { .. } => ErrorKind::Refresh,
            Self::Malformed(_) => ErrorKind::Server,
            Self::Transport(_) => ErrorKind::Transport,
        }
    }
}

/// Errors emitted by the endpoint services (`DeckService`, `CardService`, ...).
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ApiError {
    #[error("{message}")]
    Unauthorized { message: String },
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    Validation { message: String },
    #[error("{message} (status {status})")]
    Status { status: u16, message: String },
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error(transparent)]
    Invalid(#[from] study_core::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ApiError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Auth,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Validation { .. } | Self::Invalid(_) => ErrorKind::Validation,
            Self::Status { .. } | Self::Decode(_) => ErrorKind::Server,
            Self::Auth(err) => err.kind(),
            Self::Transport(_) => ErrorKind::Transport,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<study_core::model::CardError> for ApiError {
    fn from(err: study_core::model::CardError) -> Self {
        Self::Invalid(err.into())
    }
}

impl From<study_core::model::DeckError> for ApiError {
    fn from(err: study_core::model::DeckError) -> Self {
        Self::Invalid(err.into())
    }
}

/// Errors emitted by the study session state machine and its store.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum StudyError {
    #[error("no deck is loaded")]
    NoDeck,
    #[error("no card at the current position")]
    NoCurrentCard,
    #[error("study session already completed")]
    Completed,
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl StudyError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoDeck | Self::NoCurrentCard | Self::Completed => ErrorKind::State,
            Self::Api(err) => err.kind(),
        }
    }
}

/// Errors emitted while reading client configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid {var}: {source}")]
    InvalidUrl {
        var: &'static str,
        source: url::ParseError,
    },
    #[error("invalid {var} value: {raw}")]
    InvalidNumber { var: &'static str, raw: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_the_wrapped_error() {
        let err = ApiError::from(AuthError::Refresh {
            message: "Token refresh failed".into(),
        });
        assert_eq!(err.kind(), ErrorKind::Refresh);
        assert_eq!(err.to_string(), "Token refresh failed");

        let err = StudyError::from(ApiError::from(TransportError::Timeout));
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(StudyError::NoDeck.kind(), ErrorKind::State);
    }

    #[test]
    fn draft_failures_are_validation_errors() {
        let err = ApiError::from(study_core::model::DeckError::EmptyName);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "deck name cannot be empty");
    }
}
