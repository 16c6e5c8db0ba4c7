//! HubSpot CRM API client.
//!
//! Lists CRM objects one page at a time through `GET /crm/v3/objects/{type}`.

use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use integration_auth::http::ProviderClient;
use log::*;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Records requested per page; the largest page HubSpot serves.
pub const PAGE_LIMIT: &str = "100";

/// CRM object categories that can be loaded as items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Contacts,
    Companies,
    Deals,
}

impl ObjectType {
    /// Path segment in the CRM objects API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Contacts => "contacts",
            ObjectType::Companies => "companies",
            ObjectType::Deals => "deals",
        }
    }

    /// The `type` of the items built from this category.
    pub fn item_type(&self) -> &'static str {
        match self {
            ObjectType::Contacts => "contact",
            ObjectType::Companies => "company",
            ObjectType::Deals => "deal",
        }
    }

    /// Property holding the display name, for categories without a person name.
    pub fn name_property(&self) -> Option<&'static str> {
        match self {
            ObjectType::Contacts => None,
            ObjectType::Companies => Some("name"),
            ObjectType::Deals => Some("dealname"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ObjectTypeParseError(pub String);

impl FromStr for ObjectType {
    type Err = ObjectTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "contacts" => Ok(ObjectType::Contacts),
            "companies" => Ok(ObjectType::Companies),
            "deals" => Ok(ObjectType::Deals),
            other => Err(ObjectTypeParseError(other.to_string())),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One CRM record as returned by the objects API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmObject {
    pub id: String,
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CrmObject {
    /// A string property, treating null and missing alike.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).and_then(|v| v.as_str())
    }
}

/// One page of a CRM object listing.
#[derive(Debug, Deserialize)]
pub struct ObjectPage {
    #[serde(default)]
    pub results: Vec<CrmObject>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<NextPage>,
}

#[derive(Debug, Deserialize)]
struct NextPage {
    after: Option<String>,
}

impl ObjectPage {
    /// Cursor of the following page, if there is one.
    pub fn next_after(&self) -> Option<&str> {
        self.paging
            .as_ref()
            .and_then(|paging| paging.next.as_ref())
            .and_then(|next| next.after.as_deref())
            .filter(|after| !after.is_empty())
    }
}

/// HubSpot CRM client for reading objects with a user's access token
pub struct CrmClient {
    client: ProviderClient,
    api_base_url: String,
}

impl CrmClient {
    pub fn new(client: ProviderClient, api_base_url: &str) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one page of `object_type`, starting at cursor `after`.
    pub async fn list_objects(
        &self,
        access_token: &str,
        object_type: ObjectType,
        after: Option<&str>,
    ) -> Result<ObjectPage, Error> {
        let url = format!("{}/crm/v3/objects/{}", self.api_base_url, object_type);

        let mut request = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .query(&[("limit", PAGE_LIMIT)]);
        if let Some(after) = after {
            request = request.query(&[("after", after)]);
        }

        debug!("Listing HubSpot {} (after: {:?})", object_type, after);

        let response = request.send().await.map_err(|e| {
            warn!("Failed to reach HubSpot CRM API: {:?}", e);
            Error::from(integration_auth::Error::from(e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "HubSpot CRM API returned {} listing {}: {}",
                status, object_type, body
            );
            return Err(Error {
                source: Some(format!("HubSpot CRM API returned {}", status).into()),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Fetch),
            });
        }

        response.json::<ObjectPage>().await.map_err(|e| {
            warn!("Failed to parse HubSpot {} page: {:?}", object_type, e);
            Error {
                source: Some(Box::new(e)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Fetch),
            }
        })
    }
}
