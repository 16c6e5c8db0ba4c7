//! HubSpot integration: OAuth connection, item loading and cache invalidation.
//!
//! Everything short-lived (anti-forgery state, fresh credentials, item
//! snapshots) lives in the shared [`Cache`]; the only durable record is the
//! identity link between (user, org) and the HubSpot user id.

use std::sync::Arc;
use std::time::Duration;

use integration_auth::cache::Cache;
use integration_auth::http::ProviderClientBuilder;
use integration_auth::oauth::providers::hubspot::{Endpoints, Provider as HubspotProvider};
use integration_auth::oauth::{Provider, StateManager};
use integration_auth::store::IdentityStore;
use integration_auth::webhook::HmacWebhookValidator;
use log::*;
use secrecy::SecretString;
use service::config::Config;

use crate::error::Error;
use crate::gateway::hubspot::{CrmClient, ObjectType};

mod items;
mod oauth;
mod webhook;

pub use items::to_normalized_item;
pub use oauth::{CallbackParams, CLOSE_WINDOW_HTML};

/// Integration type under which identity links are stored.
pub const INTEGRATION_TYPE: &str = "hubspot";

/// Where HubSpot sends the user back after consent.
pub const REDIRECT_URI: &str = "http://localhost:8000/integrations/hubspot/oauth2callback";

/// Scopes requested on every authorization.
pub const REQUIRED_SCOPES: [&str; 5] = [
    "crm.objects.contacts.write",
    "crm.schemas.contacts.write",
    "oauth",
    "crm.schemas.contacts.read",
    "crm.objects.contacts.read",
];

/// Lifetime of cached credentials and item snapshots.
pub const CACHE_TTL: Duration = Duration::from_secs(600);

/// Everything the HubSpot integration needs from configuration.
#[derive(Debug, Clone)]
pub struct HubspotSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub authorize_url: String,
    pub api_base_url: String,
    pub app_base_url: String,
    pub object_types: Vec<ObjectType>,
    pub webhook_secret: Option<SecretString>,
    pub webhook_signature_header: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl HubspotSettings {
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let object_types = config
            .hubspot_object_types
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| {
                name.parse::<ObjectType>().map_err(|e| {
                    Error::config(&format!("Unknown HubSpot object type: {}", e.0))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            client_id: config.hubspot_client_id(),
            client_secret: config.hubspot_client_secret(),
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorize_url: config.hubspot_authorize_url().to_string(),
            api_base_url: config.hubspot_api_base_url().to_string(),
            app_base_url: config.hubspot_app_base_url().to_string(),
            object_types,
            webhook_secret: config.hubspot_webhook_secret(),
            webhook_signature_header: config.hubspot_webhook_signature_header.clone(),
            request_timeout: config.provider_request_timeout(),
            max_retries: config.provider_max_retries,
        })
    }
}

/// The HubSpot integration with its collaborators.
pub struct HubspotIntegration {
    settings: HubspotSettings,
    provider: Box<dyn Provider>,
    states: StateManager,
    cache: Arc<dyn Cache>,
    store: Arc<dyn IdentityStore>,
    crm: CrmClient,
    webhook_validator: Option<HmacWebhookValidator>,
}

impl HubspotIntegration {
    pub fn new(
        settings: HubspotSettings,
        cache: Arc<dyn Cache>,
        store: Arc<dyn IdentityStore>,
    ) -> Result<Self, Error> {
        let http_client = ProviderClientBuilder::new()
            .with_timeout(settings.request_timeout)
            .with_max_retries(settings.max_retries)
            .build()?;

        let provider = HubspotProvider::new(
            settings.client_id.clone(),
            settings.client_secret.clone(),
            settings.redirect_uri.clone(),
            settings.scopes.clone(),
        )?
        .with_endpoints(Endpoints {
            authorize_url: settings.authorize_url.clone(),
            api_base_url: settings.api_base_url.clone(),
        })
        .with_http_client(http_client.clone());

        let webhook_validator = settings.webhook_secret.clone().map(|secret| {
            HmacWebhookValidator::new(INTEGRATION_TYPE, secret, &settings.webhook_signature_header)
        });
        if webhook_validator.is_none() {
            warn!("No HubSpot webhook secret configured; invalidation requests are not authenticated");
        }

        Ok(Self {
            crm: CrmClient::new(http_client, &settings.api_base_url),
            provider: Box::new(provider),
            states: StateManager::new(cache.clone()),
            cache,
            store,
            settings,
            webhook_validator,
        })
    }

    pub fn settings(&self) -> &HubspotSettings {
        &self.settings
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use integration_auth::cache::MemoryCache;
    use integration_auth::store::MemoryStore;

    pub(crate) fn settings(server_url: &str) -> HubspotSettings {
        HubspotSettings {
            client_id: Some("client-123".to_string()),
            client_secret: Some(SecretString::new("secret-456".to_string())),
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorize_url: format!("{}/oauth/authorize", server_url),
            api_base_url: server_url.to_string(),
            app_base_url: "https://app.hubspot.com".to_string(),
            object_types: vec![ObjectType::Contacts],
            webhook_secret: None,
            webhook_signature_header: "x-hubspot-signature".to_string(),
            request_timeout: Duration::from_secs(5),
            max_retries: 0,
        }
    }

    pub(crate) struct Harness {
        pub cache: Arc<MemoryCache>,
        pub store: Arc<MemoryStore>,
        pub integration: HubspotIntegration,
    }

    pub(crate) fn harness_with(settings: HubspotSettings) -> Harness {
        let cache = Arc::new(MemoryCache::new());
        let store = Arc::new(MemoryStore::new());
        let integration =
            HubspotIntegration::new(settings, cache.clone(), store.clone()).unwrap();
        Harness {
            cache,
            store,
            integration,
        }
    }

    pub(crate) fn harness(server_url: &str) -> Harness {
        harness_with(settings(server_url))
    }
}
