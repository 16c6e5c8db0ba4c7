use std::collections::HashSet;

use chrono::{DateTime, Utc};
use integration_auth::cache::{get_json, set_json};
use integration_auth::error::{CacheErrorKind, ErrorKind as AuthErrorKind};
use log::*;

use super::{HubspotIntegration, CACHE_TTL, INTEGRATION_TYPE};
use crate::credentials::ItemCredentials;
use crate::error::{DomainErrorKind, Error, ExternalErrorKind};
use crate::gateway::hubspot::{CrmObject, ObjectType};
use crate::integration_item::IntegrationItem;

const UNNAMED: &str = "Unnamed";

/// Cache key of the item snapshot for a HubSpot user.
pub(crate) fn items_key(provider_user_id: &str) -> String {
    format!("items:{}", provider_user_id)
}

/// Build the normalized item for one CRM record.
pub fn to_normalized_item(
    record: &CrmObject,
    object_type: ObjectType,
    app_base_url: &str,
) -> IntegrationItem {
    let mut item = IntegrationItem::new(&record.id, object_type.item_type(), UNNAMED);

    let name = match object_type {
        ObjectType::Contacts => {
            item.creation_time = parse_timestamp(record.created_at.as_deref());
            item.last_modified_time = parse_timestamp(record.updated_at.as_deref());
            item.url = Some(format!(
                "{}/contacts/{}",
                app_base_url.trim_end_matches('/'),
                record.id
            ));

            format!(
                "{} {}",
                record.property("firstname").unwrap_or_default(),
                record.property("lastname").unwrap_or_default()
            )
        }
        _ => object_type
            .name_property()
            .and_then(|property| record.property(property))
            .or(record.name.as_deref())
            .unwrap_or_default()
            .to_string(),
    };

    let name = name.trim();
    if !name.is_empty() {
        item.name = name.to_string();
    }
    item
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|timestamp| timestamp.with_timezone(&Utc))
}

impl HubspotIntegration {
    /// Load the caller's CRM objects as normalized items.
    ///
    /// `credentials` is the JSON the caller got from `get_credentials`. Results are
    /// cached per HubSpot user; a cached snapshot is returned without calling HubSpot.
    pub async fn fetch_items(&self, credentials: &str) -> Result<Vec<IntegrationItem>, Error> {
        let credentials: ItemCredentials = serde_json::from_str(credentials).map_err(|e| {
            warn!("Unparseable HubSpot credentials: {}", e);
            Error::invalid_credentials()
        })?;
        let access_token = credentials
            .access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(Error::invalid_credentials)?;

        let provider_user_id = self.resolve_provider_user_id(&credentials).await?;
        let cache_key = provider_user_id.as_deref().map(items_key);

        if let Some(key) = &cache_key {
            match get_json::<Vec<IntegrationItem>>(self.cache.as_ref(), key).await {
                Ok(Some(items)) => {
                    debug!("Serving {} HubSpot items from cache", items.len());
                    return Ok(items);
                }
                Ok(None) => {}
                Err(e) if e.error_kind == AuthErrorKind::Cache(CacheErrorKind::Serialization) => {
                    warn!("Discarding unreadable item cache entry {}: {:?}", key, e);
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            warn!("No HubSpot user id for these credentials; items will not be cached");
        }

        let mut items = Vec::new();
        for object_type in &self.settings.object_types {
            self.fetch_all_pages(access_token, *object_type, &mut items)
                .await?;
        }

        info!("Retrieved {} HubSpot items", items.len());

        if let Some(key) = &cache_key {
            set_json(self.cache.as_ref(), key, &items, CACHE_TTL).await?;
        }
        Ok(items)
    }

    /// Identity link first, then whatever the credentials carry.
    async fn resolve_provider_user_id(
        &self,
        credentials: &ItemCredentials,
    ) -> Result<Option<String>, Error> {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        if let (Some(user_id), Some(org_id)) =
            (non_empty(&credentials.user_id), non_empty(&credentials.org_id))
        {
            if let Some(linked) = self
                .store
                .get_provider_user_id(INTEGRATION_TYPE, &user_id, &org_id)
                .await?
            {
                return Ok(Some(linked));
            }
        }
        Ok(non_empty(&credentials.provider_user_id))
    }

    async fn fetch_all_pages(
        &self,
        access_token: &str,
        object_type: ObjectType,
        items: &mut Vec<IntegrationItem>,
    ) -> Result<(), Error> {
        let mut after: Option<String> = None;
        let mut seen_cursors = HashSet::new();
        loop {
            let page = self
                .crm
                .list_objects(access_token, object_type, after.as_deref())
                .await?;

            items.extend(
                page.results
                    .iter()
                    .map(|record| to_normalized_item(record, object_type, &self.settings.app_base_url)),
            );

            match page.next_after() {
                Some(next) if !seen_cursors.insert(next.to_string()) => {
                    warn!(
                        "HubSpot returned cursor {} for {} twice; stopping pagination",
                        next, object_type
                    );
                    return Err(Error {
                        source: Some(format!("Repeated paging cursor {}", next).into()),
                        error_kind: DomainErrorKind::External(ExternalErrorKind::Fetch),
                    });
                }
                Some(next) => after = Some(next.to_string()),
                None => return Ok(()),
            }
        }
    }
}
