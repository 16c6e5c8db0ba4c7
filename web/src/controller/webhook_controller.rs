//! Controller for HubSpot change notifications.

use std::collections::HashMap;

use crate::{AppState, Error};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

/// Response for webhook acknowledgment
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub status: String,
}

/// POST /integrations/hubspot/invalidate
///
/// Drops the cached items of the HubSpot user named by the first event's `sourceId`.
#[utoipa::path(
    post,
    path = "/integrations/hubspot/invalidate",
    request_body(content = String, description = "JSON array of HubSpot events", content_type = "application/json"),
    responses(
        (status = 200, description = "Cache entry dropped", body = WebhookResponse),
        (status = 400, description = "Malformed payload"),
        (status = 401, description = "Invalid webhook signature"),
    )
)]
pub async fn invalidate(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    // HeaderName is already lowercase
    let headers: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    app_state.hubspot.invalidate(&headers, &body).await?;

    Ok(Json(WebhookResponse {
        status: "ok".to_string(),
    }))
}
