use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Tokens from a completed OAuth callback, handed to the caller exactly once.
#[derive(Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub provider_user_id: String,
    pub user_id: String,
    pub org_id: String,
    /// HubSpot's token endpoint response, unmodified.
    #[schema(value_type = Object)]
    pub raw_token_response: serde_json::Value,
}

impl CredentialRecord {
    /// Cache key of the pending record for (org, user).
    pub fn key(org_id: &str, user_id: &str) -> String {
        format!("credentials:{}:{}", org_id, user_id)
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("provider_user_id", &self.provider_user_id)
            .field("user_id", &self.user_id)
            .field("org_id", &self.org_id)
            .finish_non_exhaustive()
    }
}

/// What `fetch_items` needs from the caller-held credentials.
///
/// Everything but the access token is optional so a bare token still works.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ItemCredentials {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub provider_user_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_debug_redacts_access_token() {
        let record = CredentialRecord {
            access_token: "very-secret".to_string(),
            refresh_token: Some("also-secret".to_string()),
            expires_in: Some(1800),
            token_type: Some("bearer".to_string()),
            provider_user_id: "42".to_string(),
            user_id: "user1".to_string(),
            org_id: "org1".to_string(),
            raw_token_response: json!({ "access_token": "very-secret" }),
        };

        let debug = format!("{:?}", record);
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("also-secret"));
    }

    #[test]
    fn test_item_credentials_accept_partial_payload() {
        let parsed: ItemCredentials =
            serde_json::from_value(json!({ "access_token": "abc", "unrelated": 1 })).unwrap();
        assert_eq!(parsed.access_token.as_deref(), Some("abc"));
        assert!(parsed.user_id.is_none());
    }
}
