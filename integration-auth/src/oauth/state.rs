//! CSRF state management for OAuth flows.
//!
//! The state sent to the provider is the JSON-serialized [`StateToken`]. The same
//! serialization is kept in the cache under `state:{org_id}:{user_id}`, so only
//! the most recently issued nonce for a (user, org) pair is ever accepted.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Lifetime of an issued state.
pub const STATE_TTL: Duration = Duration::from_secs(600);

/// State data round-tripped through the provider during the OAuth flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateToken {
    pub nonce: String,
    pub user_id: String,
    pub org_id: String,
}

impl StateToken {
    /// Create a state with a fresh random nonce for (user, org).
    pub fn generate(user_id: &str, org_id: &str) -> Self {
        Self {
            nonce: generate_nonce(),
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
        }
    }

    /// Serialize the state for the authorization URL and the cache.
    pub fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(self)
            .map_err(|e| oauth_error(OAuthErrorKind::InvalidState, &e.to_string()))
    }

    /// Parse a state returned by the provider.
    pub fn decode(raw: &str) -> Result<Self, Error> {
        serde_json::from_str(raw)
            .map_err(|_| oauth_error(OAuthErrorKind::InvalidState, "Malformed state parameter"))
    }
}

/// A returned state that matched the stored one and has not been consumed yet.
#[derive(Debug, Clone)]
pub struct VerifiedState {
    pub token: StateToken,
    stored: String,
}

/// Manager for OAuth state parameters backed by the shared cache.
///
/// Generates and validates CSRF state tokens to prevent cross-site request forgery attacks.
#[derive(Clone)]
pub struct StateManager {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl StateManager {
    /// Create a new state manager with the default TTL of 10 minutes.
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self::with_ttl(cache, STATE_TTL)
    }

    /// Create a new state manager with custom TTL.
    pub fn with_ttl(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Cache key holding the current state for (org, user).
    pub fn key(org_id: &str, user_id: &str) -> String {
        format!("state:{}:{}", org_id, user_id)
    }

    /// Generate a new state for (user, org) and store it, replacing any earlier one.
    pub async fn issue(&self, user_id: &str, org_id: &str) -> Result<StateToken, Error> {
        let token = StateToken::generate(user_id, org_id);
        let encoded = token.encode()?;

        self.cache
            .set(&Self::key(org_id, user_id), &encoded, self.ttl)
            .await?;

        debug!("Issued OAuth state for user {} in org {}", user_id, org_id);
        Ok(token)
    }

    /// Check a returned state against the one stored for its (org, user).
    ///
    /// Does not consume the state; call [`StateManager::consume`] once the
    /// callback's side effects have been persisted.
    pub async fn verify(&self, returned: &StateToken) -> Result<VerifiedState, Error> {
        let key = Self::key(&returned.org_id, &returned.user_id);

        let stored = self.cache.get(&key).await?.ok_or_else(|| {
            warn!(
                "No pending OAuth state for user {} in org {}",
                returned.user_id, returned.org_id
            );
            oauth_error(OAuthErrorKind::InvalidState, "No pending state")
        })?;

        let expected = StateToken::decode(&stored)?;
        if !constant_time_eq(expected.nonce.as_bytes(), returned.nonce.as_bytes()) {
            warn!(
                "OAuth state nonce mismatch for user {} in org {}",
                returned.user_id, returned.org_id
            );
            return Err(oauth_error(OAuthErrorKind::InvalidState, "Nonce mismatch"));
        }

        Ok(VerifiedState {
            token: returned.clone(),
            stored,
        })
    }

    /// Delete the verified state if it is still the one stored.
    ///
    /// Returns `false` when a concurrent callback consumed it first or a newer
    /// authorization replaced it.
    pub async fn consume(&self, verified: &VerifiedState) -> Result<bool, Error> {
        let key = Self::key(&verified.token.org_id, &verified.token.user_id);
        self.cache.delete_if_eq(&key, &verified.stored).await
    }
}

/// 32 bytes from the OS RNG, base64url without padding.
fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::ErrorKind;

    fn manager() -> (Arc<MemoryCache>, StateManager) {
        let cache = Arc::new(MemoryCache::new());
        let manager = StateManager::new(cache.clone());
        (cache, manager)
    }

    #[test]
    fn test_nonce_is_url_safe_and_long_enough() {
        let nonce = generate_nonce();
        // 32 bytes base64url without padding
        assert_eq!(nonce.len(), 43);
        assert!(nonce
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(nonce, generate_nonce());
    }

    #[test]
    fn test_decode_rejects_malformed_state() {
        let err = StateToken::decode("{not json").unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::InvalidState));
    }

    #[tokio::test]
    async fn test_issue_stores_single_entry_with_ttl() {
        let (cache, manager) = manager();
        manager.issue("user1", "org1").await.unwrap();

        assert_eq!(cache.count_prefix("state:"), 1);
        assert!(cache.ttl("state:org1:user1").unwrap() <= STATE_TTL);
    }

    #[tokio::test]
    async fn test_verify_accepts_matching_nonce() {
        let (_cache, manager) = manager();
        let token = manager.issue("user1", "org1").await.unwrap();

        let verified = manager.verify(&token).await.unwrap();
        assert_eq!(verified.token, token);
    }

    #[tokio::test]
    async fn test_verify_rejects_forged_nonce() {
        let (_cache, manager) = manager();
        let mut token = manager.issue("user1", "org1").await.unwrap();
        token.nonce = "forged".to_string();

        let err = manager.verify(&token).await.unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::InvalidState));
    }

    #[tokio::test]
    async fn test_only_latest_state_is_valid() {
        let (_cache, manager) = manager();
        let first = manager.issue("user1", "org1").await.unwrap();
        let second = manager.issue("user1", "org1").await.unwrap();

        assert!(manager.verify(&first).await.is_err());
        assert!(manager.verify(&second).await.is_ok());
    }

    #[tokio::test]
    async fn test_state_consumed_once() {
        let (_cache, manager) = manager();
        let token = manager.issue("user1", "org1").await.unwrap();

        let verified = manager.verify(&token).await.unwrap();
        assert!(manager.consume(&verified).await.unwrap());
        assert!(!manager.consume(&verified).await.unwrap());
        assert!(manager.verify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_expired_state() {
        let cache = Arc::new(MemoryCache::new());
        let manager = StateManager::with_ttl(cache, Duration::ZERO);
        let token = manager.issue("user1", "org1").await.unwrap();

        assert!(manager.verify(&token).await.is_err());
    }
}
