//! Error types for the `integration-auth` crate.
//!
//! Follows the same pattern as domain::error with a root Error struct and error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for integration-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in integration-auth.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    Config(ConfigErrorKind),
    OAuth(OAuthErrorKind),
    Cache(CacheErrorKind),
    Store(StoreErrorKind),
    Webhook(WebhookErrorKind),
    Http(HttpErrorKind),
}

/// Errors from missing or unusable provider configuration.
#[derive(Debug, PartialEq)]
pub enum ConfigErrorKind {
    MissingClientId,
    MissingClientSecret,
}

/// Errors from OAuth operations.
#[derive(Debug, PartialEq)]
pub enum OAuthErrorKind {
    TokenExchangeFailed,
    UserInfoFailed,
    InvalidState,
    InvalidResponse,
}

/// Errors from cache operations.
#[derive(Debug, PartialEq)]
pub enum CacheErrorKind {
    Connection,
    Command,
    Serialization,
}

/// Errors from durable store operations.
#[derive(Debug, PartialEq)]
pub enum StoreErrorKind {
    Io,
    Corrupt,
    Serialization,
}

/// Errors from webhook validation.
#[derive(Debug, PartialEq)]
pub enum WebhookErrorKind {
    InvalidSignature,
    MissingSignature,
    InvalidPayload,
}

/// Errors from HTTP client operations.
#[derive(Debug, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Config(kind) => write!(f, "Configuration error: {:?}", kind),
            ErrorKind::OAuth(kind) => write!(f, "OAuth error: {:?}", kind),
            ErrorKind::Cache(kind) => write!(f, "Cache error: {:?}", kind),
            ErrorKind::Store(kind) => write!(f, "Store error: {:?}", kind),
            ErrorKind::Webhook(kind) => write!(f, "Webhook error: {:?}", kind),
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind),
        }
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
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => e.into(),
            other => Error {
                source: Some(Box::new(other)),
                error_kind: ErrorKind::Http(HttpErrorKind::Network),
            },
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        let error_kind = if err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_io_error()
            || err.is_timeout()
        {
            CacheErrorKind::Connection
        } else {
            CacheErrorKind::Command
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Cache(error_kind),
        }
    }
}

/// Helper function to create configuration errors.
pub fn config_error(kind: ConfigErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Config(kind),
    }
}

/// Helper function to create OAuth errors.
pub fn oauth_error(kind: OAuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::OAuth(kind),
    }
}

/// Helper function to create cache errors.
pub fn cache_error(kind: CacheErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Cache(kind),
    }
}

/// Helper function to create store errors, keeping the underlying cause.
pub fn store_error(
    kind: StoreErrorKind,
    source: impl Into<Box<dyn StdError + Send + Sync>>,
) -> Error {
    Error {
        source: Some(source.into()),
        error_kind: ErrorKind::Store(kind),
    }
}

/// Helper function to create webhook errors.
pub fn webhook_error(kind: WebhookErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Webhook(kind),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category_and_kind() {
        let err = oauth_error(OAuthErrorKind::InvalidState, "nonce mismatch");
        assert_eq!(err.to_string(), "OAuth error: InvalidState");
    }

    #[test]
    fn test_helper_keeps_message_as_source() {
        let err = config_error(ConfigErrorKind::MissingClientId, "client id is not set");
        assert_eq!(err.error_kind, ErrorKind::Config(ConfigErrorKind::MissingClientId));
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("client id is not set".to_string())
        );
    }
}
