//! OAuth 2.0 authentication infrastructure.
//!
//! Provides the authorization-code flow pieces for CRM integrations: anti-forgery
//! state kept in the cache, the provider trait and its HubSpot implementation.

mod provider;
mod state;

pub mod providers;
pub mod token;

pub use provider::{Provider, UserInfo};
pub use state::{StateManager, StateToken, VerifiedState, STATE_TTL};
