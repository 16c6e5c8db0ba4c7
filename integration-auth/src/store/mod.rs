//! Durable identity store.
//!
//! Links this system's (user, org) pair to the integration's own user id so the
//! link outlives the short-lived credential cache.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One persisted identity link, as stored under its integration type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityLink {
    pub user_id: String,
    pub org_id: String,
    pub integration_user_id: String,
}

/// Trait for storing identity links.
///
/// At most one link exists per (integration_type, user_id, org_id).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert the link, or overwrite the integration user id of an existing one.
    async fn upsert_identity(
        &self,
        integration_type: &str,
        user_id: &str,
        org_id: &str,
        integration_user_id: &str,
    ) -> Result<(), Error>;

    /// Look up the integration user id linked to (user, org).
    async fn get_provider_user_id(
        &self,
        integration_type: &str,
        user_id: &str,
        org_id: &str,
    ) -> Result<Option<String>, Error>;
}
