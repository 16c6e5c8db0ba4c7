use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::IdentityStore;
use crate::error::Error;

type LinkKey = (String, String, String);

/// In-memory identity store, mainly for tests.
#[derive(Default)]
pub struct MemoryStore {
    links: RwLock<HashMap<LinkKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(integration_type: &str, user_id: &str, org_id: &str) -> LinkKey {
        (
            integration_type.to_string(),
            user_id.to_string(),
            org_id.to_string(),
        )
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn upsert_identity(
        &self,
        integration_type: &str,
        user_id: &str,
        org_id: &str,
        integration_user_id: &str,
    ) -> Result<(), Error> {
        let mut links = self.links.write().await;
        links.insert(
            Self::key(integration_type, user_id, org_id),
            integration_user_id.to_string(),
        );
        Ok(())
    }

    async fn get_provider_user_id(
        &self,
        integration_type: &str,
        user_id: &str,
        org_id: &str,
    ) -> Result<Option<String>, Error> {
        let links = self.links.read().await;
        Ok(links
            .get(&Self::key(integration_type, user_id, org_id))
            .cloned())
    }
}
