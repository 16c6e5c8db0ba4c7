use std::collections::HashMap;

use integration_auth::webhook::WebhookValidator;
use log::*;
use serde_json::Value;

use super::items::items_key;
use super::HubspotIntegration;
use crate::error::Error;

/// Provider user id named by an invalidation payload.
///
/// The payload is a non-empty array whose first event carries a `sourceId` of the
/// form `prefix:identifier`.
fn source_user_id(payload: &Value) -> Result<String, Error> {
    let first = payload
        .as_array()
        .and_then(|events| events.first())
        .ok_or_else(|| Error::bad_payload("Payload must be a non-empty array"))?;

    let source_id = first
        .get("sourceId")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::bad_payload("Missing sourceId"))?;

    match source_id.split_once(':') {
        Some((_, identifier)) if !identifier.is_empty() => Ok(identifier.to_string()),
        _ => Err(Error::bad_payload("Invalid sourceId")),
    }
}

impl HubspotIntegration {
    /// Drop the cached items of the HubSpot user a webhook event refers to.
    ///
    /// `headers` must be keyed by lowercase name. When a webhook secret is
    /// configured the raw `body` must carry a valid signature.
    pub async fn invalidate(
        &self,
        headers: &HashMap<String, String>,
        body: &[u8],
    ) -> Result<(), Error> {
        if let Some(validator) = &self.webhook_validator {
            validator.validate(headers, body).inspect_err(|e| {
                warn!("Rejected HubSpot webhook: {:?}", e);
            })?;
        }

        let payload: Value = serde_json::from_slice(body).map_err(|e| {
            warn!("Unparseable HubSpot webhook body: {}", e);
            Error::bad_payload("Payload must be a non-empty array")
        })?;
        let provider_user_id = source_user_id(&payload)?;

        self.cache.delete(&items_key(&provider_user_id)).await?;
        info!("Invalidated cached items for HubSpot user {}", provider_user_id);
        Ok(())
    }
}
