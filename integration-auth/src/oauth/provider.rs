//! OAuth provider trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::token::Tokens;
use crate::error::Error;

/// User information retrieved from the OAuth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Provider's unique user identifier.
    pub id: String,
    /// Provider account (HubSpot portal) the token belongs to.
    pub account_id: Option<String>,
}

/// Trait for OAuth 2.0 providers.
///
/// Implementations handle platform-specific endpoints for:
/// - Authorization URL generation
/// - Authorization code exchange for tokens
/// - Resolving the provider-side user behind an access token
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the authorization URL carrying `state`.
    ///
    /// Fails with a configuration error if the client id is not set.
    fn authorization_url(&self, state: &str) -> Result<String, Error>;

    /// Exchange an authorization code for access and refresh tokens.
    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error>;

    /// Get user information using an access token.
    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, Error>;
}
