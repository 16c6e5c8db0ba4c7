//! HubSpot integration operations on top of `integration-auth`.
//!
//! `web` only talks to this crate: the OAuth connection flow, one-time credential
//! hand-over, item loading and cache invalidation all live on
//! [`hubspot::HubspotIntegration`].

pub mod credentials;
pub mod error;
pub mod gateway;
pub mod hubspot;
pub mod integration_item;

pub use credentials::CredentialRecord;
pub use hubspot::{CallbackParams, HubspotIntegration, HubspotSettings};
pub use integration_item::IntegrationItem;

// Backends are chosen by `service`; re-exported so `web` tests can build an integration.
pub use integration_auth::cache::{Cache, MemoryCache};
pub use integration_auth::store::{IdentityStore, MemoryStore};
