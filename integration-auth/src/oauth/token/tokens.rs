//! OAuth token types.

use std::fmt;

use secrecy::SecretString;

use crate::error::{oauth_error, Error, OAuthErrorKind};

/// OAuth tokens issued by a code exchange, with the provider's full response.
#[derive(Clone)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// Refresh token for obtaining new access tokens.
    pub refresh_token: Option<SecretString>,
    /// Access token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Token type (usually "bearer").
    pub token_type: Option<String>,
    /// The token endpoint's response body, unmodified.
    pub raw: serde_json::Value,
}

impl Tokens {
    /// Build tokens from a token endpoint response body.
    pub fn from_response(raw: serde_json::Value) -> Result<Self, Error> {
        let access_token = raw
            .get("access_token")
            .and_then(|v| v.as_str())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                oauth_error(
                    OAuthErrorKind::InvalidResponse,
                    "Token response has no access_token",
                )
            })?
            .to_string();

        let refresh_token = raw
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(|token| SecretString::new(token.to_string()));

        Ok(Self {
            access_token: SecretString::new(access_token),
            refresh_token,
            expires_in: raw.get("expires_in").and_then(|v| v.as_i64()),
            token_type: raw
                .get("token_type")
                .and_then(|v| v.as_str())
                .map(String::from),
            raw,
        })
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokens")
            .field("access_token", &self.access_token)
            .field("refresh_token", &self.refresh_token)
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn test_from_response() {
        let tokens = Tokens::from_response(json!({
            "access_token": "access",
            "refresh_token": "refresh",
            "expires_in": 1800,
            "token_type": "bearer"
        }))
        .unwrap();

        assert_eq!(tokens.access_token.expose_secret(), "access");
        assert_eq!(
            tokens.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("refresh")
        );
        assert_eq!(tokens.expires_in, Some(1800));
        assert_eq!(tokens.token_type.as_deref(), Some("bearer"));
        assert_eq!(tokens.raw["expires_in"], 1800);
    }

    #[test]
    fn test_missing_access_token_is_invalid_response() {
        let err = Tokens::from_response(json!({ "refresh_token": "refresh" })).unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::InvalidResponse)
        );
    }

    #[test]
    fn test_debug_does_not_leak_tokens() {
        let tokens = Tokens::from_response(json!({ "access_token": "super-secret" })).unwrap();
        assert!(!format!("{:?}", tokens).contains("super-secret"));
    }
}
