//! HubSpot OAuth provider implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{config_error, oauth_error, ConfigErrorKind, Error, OAuthErrorKind};
use crate::http::{ProviderClient, ProviderClientBuilder};
use crate::oauth::token::Tokens;
use crate::oauth::UserInfo;

/// HubSpot endpoints, overridable for regional hosts and tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub api_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://app-na2.hubspot.com/oauth/authorize".to_string(),
            api_base_url: "https://api.hubspot.com".to_string(),
        }
    }
}

impl Endpoints {
    fn token_url(&self) -> String {
        format!("{}/oauth/v1/token", self.api_base_url.trim_end_matches('/'))
    }

    fn access_token_info_url(&self, access_token: &str) -> String {
        format!(
            "{}/oauth/v1/access-tokens/{}",
            self.api_base_url.trim_end_matches('/'),
            urlencoding::encode(access_token)
        )
    }
}

#[derive(Debug, Serialize)]
struct TokenExchangeRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    code: &'a str,
}

/// Metadata HubSpot reports for an access token.
#[derive(Debug, Deserialize)]
struct AccessTokenInfo {
    user_id: serde_json::Value,
    #[serde(default)]
    hub_id: Option<serde_json::Value>,
}

/// HubSpot OAuth provider.
///
/// Handles the authorization-code flow against HubSpot and resolves the HubSpot
/// user an access token was issued to.
pub struct Provider {
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    redirect_uri: String,
    scopes: Vec<String>,
    endpoints: Endpoints,
    http_client: ProviderClient,
}

impl Provider {
    /// Create a new HubSpot OAuth provider.
    ///
    /// Client credentials may be absent; the operations that need them fail with
    /// a configuration error instead.
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<SecretString>,
        redirect_uri: impl Into<String>,
        scopes: Vec<String>,
    ) -> Result<Self, Error> {
        Ok(Self {
            client_id: client_id.filter(|id| !id.is_empty()),
            client_secret: client_secret.filter(|secret| !secret.expose_secret().is_empty()),
            redirect_uri: redirect_uri.into(),
            scopes,
            endpoints: Endpoints::default(),
            http_client: ProviderClientBuilder::new().build()?,
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_http_client(mut self, http_client: ProviderClient) -> Self {
        self.http_client = http_client;
        self
    }

    fn client_id(&self) -> Result<&str, Error> {
        self.client_id.as_deref().ok_or_else(|| {
            config_error(
                ConfigErrorKind::MissingClientId,
                "HubSpot client id is not configured",
            )
        })
    }

    fn client_secret(&self) -> Result<&str, Error> {
        self.client_secret
            .as_ref()
            .map(|secret| secret.expose_secret().as_str())
            .ok_or_else(|| {
                config_error(
                    ConfigErrorKind::MissingClientSecret,
                    "HubSpot client secret is not configured",
                )
            })
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn authorization_url(&self, state: &str) -> Result<String, Error> {
        let client_id = self.client_id()?;
        let scopes = self.scopes.join(" ");

        Ok(format!(
            "{}?client_id={}&redirect_uri={}&scope={}&state={}",
            self.endpoints.authorize_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&scopes),
            urlencoding::encode(state)
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<Tokens, Error> {
        let request = TokenExchangeRequest {
            grant_type: "authorization_code",
            client_id: self.client_id()?,
            client_secret: self.client_secret()?,
            redirect_uri: &self.redirect_uri,
            code,
        };

        debug!("Exchanging HubSpot OAuth code for tokens");

        let response = self
            .http_client
            .post(self.endpoints.token_url())
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach HubSpot token endpoint: {:?}", e);
                Error::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("HubSpot token exchange failed with {}: {}", status, body);
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("Token endpoint returned {}", status),
            ));
        }

        let raw: serde_json::Value = response.json().await.map_err(|e| {
            warn!("Failed to parse HubSpot token response: {:?}", e);
            oauth_error(OAuthErrorKind::InvalidResponse, &e.to_string())
        })?;

        let tokens = Tokens::from_response(raw)?;
        info!("Exchanged HubSpot OAuth code for tokens");
        Ok(tokens)
    }

    async fn get_user_info(&self, access_token: &str) -> Result<UserInfo, Error> {
        let response = self
            .http_client
            .get(self.endpoints.access_token_info_url(access_token))
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach HubSpot access token endpoint: {:?}", e);
                Error::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("HubSpot access token lookup failed with {}", status);
            return Err(oauth_error(
                OAuthErrorKind::UserInfoFailed,
                &format!("Access token endpoint returned {}", status),
            ));
        }

        let info: AccessTokenInfo = response.json().await.map_err(|e| {
            warn!("Failed to parse HubSpot access token info: {:?}", e);
            oauth_error(OAuthErrorKind::UserInfoFailed, &e.to_string())
        })?;

        let id = json_id(&info.user_id).ok_or_else(|| {
            oauth_error(
                OAuthErrorKind::UserInfoFailed,
                "Access token info has no user_id",
            )
        })?;

        Ok(UserInfo {
            id,
            account_id: info.hub_id.as_ref().and_then(json_id),
        })
    }
}

/// HubSpot reports numeric ids; accept strings too.
fn json_id(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::Provider as _;
    use crate::ErrorKind;
    use mockito::Matcher;
    use serde_json::json;

    fn provider(server_url: &str) -> Provider {
        Provider::new(
            Some("client-123".to_string()),
            Some(SecretString::new("shh".to_string())),
            "http://localhost:8000/integrations/hubspot/oauth2callback",
            vec!["oauth".to_string(), "crm.objects.contacts.read".to_string()],
        )
        .unwrap()
        .with_endpoints(Endpoints {
            authorize_url: format!("{}/oauth/authorize", server_url),
            api_base_url: server_url.to_string(),
        })
    }

    #[test]
    fn test_authorization_url() {
        let provider = provider("https://app.example.com");
        let url = provider.authorization_url("{\"nonce\":\"n\"}").unwrap();

        assert!(url.starts_with("https://app.example.com/oauth/authorize?client_id=client-123&"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8000%2Fintegrations%2Fhubspot%2Foauth2callback"
        ));
        assert!(url.contains("scope=oauth%20crm.objects.contacts.read"));
        assert!(url.contains("state=%7B%22nonce%22%3A%22n%22%7D"));
    }

    #[test]
    fn test_authorization_url_requires_client_id() {
        let provider = Provider::new(None, None, "http://localhost/cb", vec![]).unwrap();
        let err = provider.authorization_url("state").unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Config(ConfigErrorKind::MissingClientId)
        );
    }

    #[tokio::test]
    async fn test_exchange_code_requires_client_secret() {
        let provider =
            Provider::new(Some("id".to_string()), None, "http://localhost/cb", vec![]).unwrap();
        let err = provider.exchange_code("code").await.unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Config(ConfigErrorKind::MissingClientSecret)
        );
    }

    #[tokio::test]
    async fn test_exchange_code_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/oauth/v1/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("client_id".into(), "client-123".into()),
                Matcher::UrlEncoded("client_secret".into(), "shh".into()),
                Matcher::UrlEncoded("code".into(), "the-code".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "access_token": "access",
                    "refresh_token": "refresh",
                    "expires_in": 1800,
                    "token_type": "bearer"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let tokens = provider(&server.url()).exchange_code("the-code").await.unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token.expose_secret(), "access");
        assert_eq!(tokens.expires_in, Some(1800));
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/oauth/v1/token")
            .with_status(400)
            .with_body(r#"{"status":"BAD_AUTH_CODE"}"#)
            .create_async()
            .await;

        let err = provider(&server.url())
            .exchange_code("stale")
            .await
            .unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
    }

    #[tokio::test]
    async fn test_get_user_info() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/oauth/v1/access-tokens/access")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "token": "access",
                    "user": "ada@example.com",
                    "hub_domain": "example.com",
                    "hub_id": 4242,
                    "user_id": 987654
                })
                .to_string(),
            )
            .create_async()
            .await;

        let info = provider(&server.url()).get_user_info("access").await.unwrap();

        assert_eq!(info.id, "987654");
        assert_eq!(info.account_id.as_deref(), Some("4242"));
    }

    #[tokio::test]
    async fn test_get_user_info_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/oauth/v1/access-tokens/expired")
            .with_status(404)
            .create_async()
            .await;

        let err = provider(&server.url())
            .get_user_info("expired")
            .await
            .unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::UserInfoFailed));
    }
}
