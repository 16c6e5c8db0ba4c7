//! Error types for the `domain` layer.
use integration_auth::error::{
    ErrorKind as AuthErrorKind, Error as AuthError, OAuthErrorKind,
};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums. The `source` field holds the original error that caused the domain
/// error. `web` depends on `domain` but never on `integration-auth` errors directly;
/// the `error_kind`s are what `web` turns into HTTP status codes and messages.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    Request(RequestErrorKind),
    External(ExternalErrorKind),
}

/// Failures of this service's own infrastructure or configuration.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Config,
    Cache,
    Store,
    Other(String),
}

/// The caller sent something unusable. Messages are safe to show to the caller.
#[derive(Debug, PartialEq)]
pub enum RequestErrorKind {
    BadRequest(String),
    BadPayload(String),
    NotFound(String),
    InvalidCredentials,
    Unauthorized,
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    /// HubSpot redirected back with an error instead of a code.
    Provider(String),
    TokenExchange,
    Fetch,
    Network,
    Other(String),
}

impl Error {
    pub(crate) fn bad_request(message: &str) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Request(RequestErrorKind::BadRequest(
                message.to_string(),
            )),
        }
    }

    pub(crate) fn bad_payload(message: &str) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Request(RequestErrorKind::BadPayload(
                message.to_string(),
            )),
        }
    }

    pub(crate) fn invalid_credentials() -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Request(RequestErrorKind::InvalidCredentials),
        }
    }

    pub(crate) fn config(message: &str) -> Self {
        Error {
            source: Some(message.to_string().into()),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

// This is where we translate errors from the `integration-auth` layer to the `domain` layer.
impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        let error_kind = match &err.error_kind {
            AuthErrorKind::Config(_) => DomainErrorKind::Internal(InternalErrorKind::Config),
            AuthErrorKind::OAuth(OAuthErrorKind::InvalidState) => DomainErrorKind::Request(
                RequestErrorKind::BadRequest("Invalid state".to_string()),
            ),
            AuthErrorKind::OAuth(_) => DomainErrorKind::External(ExternalErrorKind::TokenExchange),
            AuthErrorKind::Cache(_) => DomainErrorKind::Internal(InternalErrorKind::Cache),
            AuthErrorKind::Store(_) => DomainErrorKind::Internal(InternalErrorKind::Store),
            AuthErrorKind::Webhook(_) => DomainErrorKind::Request(RequestErrorKind::Unauthorized),
            AuthErrorKind::Http(_) => DomainErrorKind::External(ExternalErrorKind::Network),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}
