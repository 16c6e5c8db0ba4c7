use integration_auth::cache::set_json;
use integration_auth::oauth::StateToken;
use log::*;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{HubspotIntegration, CACHE_TTL, INTEGRATION_TYPE};
use crate::credentials::CredentialRecord;
use crate::error::{DomainErrorKind, Error, ExternalErrorKind, InternalErrorKind, RequestErrorKind};

/// Returned to the consent popup once the connection is stored.
pub const CLOSE_WINDOW_HTML: &str = r#"<html>
    <script>
        window.close();
    </script>
</html>
"#;

/// Query parameters HubSpot appends to the redirect URI.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl HubspotIntegration {
    /// Start an authorization for (user, org) and return the HubSpot consent URL.
    ///
    /// Replaces any authorization still pending for the same pair.
    pub async fn begin(&self, user_id: &str, org_id: &str) -> Result<String, Error> {
        if user_id.is_empty() || org_id.is_empty() {
            return Err(Error::bad_request("Missing user_id or org_id"));
        }
        if non_empty(&self.settings.client_id).is_none() {
            error!("HubSpot client id is not configured");
            return Err(Error::config("HubSpot client id is not configured"));
        }

        let state = self.states.issue(user_id, org_id).await?;
        let url = self.provider.authorization_url(&state.encode()?)?;

        info!(
            "Redirecting user {} of org {} to HubSpot OAuth",
            user_id, org_id
        );
        Ok(url)
    }

    /// Complete an authorization from HubSpot's redirect.
    ///
    /// The pending state is consumed only after the identity link and the
    /// credentials have been stored, so a failed run can be retried with the same state.
    pub async fn handle_callback(&self, params: &CallbackParams) -> Result<String, Error> {
        if let Some(provider_error) = non_empty(&params.error) {
            let message = match non_empty(&params.error_description) {
                Some(description) => format!("{}: {}", provider_error, description),
                None => provider_error.to_string(),
            };
            warn!("HubSpot OAuth returned an error: {}", message);
            return Err(Error {
                source: None,
                error_kind: DomainErrorKind::External(ExternalErrorKind::Provider(message)),
            });
        }

        let (code, raw_state) = match (non_empty(&params.code), non_empty(&params.state)) {
            (Some(code), Some(state)) => (code, state),
            _ => return Err(Error::bad_request("Missing code or state")),
        };

        let returned = StateToken::decode(raw_state)?;
        let verified = self.states.verify(&returned).await?;
        let (user_id, org_id) = (&returned.user_id, &returned.org_id);

        info!(
            "Processing HubSpot OAuth callback for user {} of org {}",
            user_id, org_id
        );

        let tokens = self.provider.exchange_code(code).await.inspect_err(|e| {
            warn!(
                "Failed to exchange HubSpot OAuth code for user {}: {:?}",
                user_id, e
            )
        })?;

        let user_info = self
            .provider
            .get_user_info(tokens.access_token.expose_secret())
            .await
            .inspect_err(|e| {
                warn!(
                    "Failed to resolve HubSpot user for user {}: {:?}",
                    user_id, e
                )
            })?;

        let record = CredentialRecord {
            access_token: tokens.access_token.expose_secret().clone(),
            refresh_token: tokens
                .refresh_token
                .as_ref()
                .map(|token| token.expose_secret().clone()),
            expires_in: tokens.expires_in,
            token_type: tokens.token_type.clone(),
            provider_user_id: user_info.id.clone(),
            user_id: user_id.clone(),
            org_id: org_id.clone(),
            raw_token_response: tokens.raw.clone(),
        };

        // Credentials are published last so a failed run leaves none behind.
        self.store
            .upsert_identity(INTEGRATION_TYPE, user_id, org_id, &user_info.id)
            .await?;
        set_json(
            self.cache.as_ref(),
            &CredentialRecord::key(org_id, user_id),
            &record,
            CACHE_TTL,
        )
        .await?;

        if !self.states.consume(&verified).await? {
            warn!(
                "OAuth state for user {} of org {} was already consumed or replaced",
                user_id, org_id
            );
        }

        info!(
            "Connected HubSpot user {} (portal {}) to user {} of org {}",
            user_info.id,
            user_info.account_id.as_deref().unwrap_or("unknown"),
            user_id,
            org_id
        );
        Ok(CLOSE_WINDOW_HTML.to_string())
    }

    /// Hand over the credentials stored by the last callback for (user, org).
    ///
    /// The record is deleted as it is read: a second call fails with `NotFound`.
    pub async fn get_credentials(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<CredentialRecord, Error> {
        let key = CredentialRecord::key(org_id, user_id);
        let not_found = || Error {
            source: None,
            error_kind: DomainErrorKind::Request(RequestErrorKind::NotFound(
                "No credentials found".to_string(),
            )),
        };

        let raw = self.cache.get(&key).await?.ok_or_else(not_found)?;
        // Lost the race to a concurrent read.
        if !self.cache.delete_if_eq(&key, &raw).await? {
            return Err(not_found());
        }

        serde_json::from_str(&raw).map_err(|e| {
            error!("Cached HubSpot credentials are unreadable: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Cache),
            }
        })
    }
}
