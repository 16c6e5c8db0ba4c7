//! The provider-agnostic item representation returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A CRM record flattened into the shape every integration returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IntegrationItem {
    /// `{provider_id}_{type}`, unique across object categories.
    pub id: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub name: String,
    pub creation_time: Option<DateTime<Utc>>,
    pub last_modified_time: Option<DateTime<Utc>>,
    pub parent_id: Option<String>,
    pub parent_path_or_name: Option<String>,
    pub url: Option<String>,
}

impl IntegrationItem {
    pub fn new(provider_id: &str, item_type: &str, name: &str) -> Self {
        Self {
            id: format!("{}_{}", provider_id, item_type),
            item_type: item_type.to_string(),
            name: name.to_string(),
            creation_time: None,
            last_modified_time: None,
            parent_id: None,
            parent_path_or_name: None,
            url: None,
        }
    }
}
