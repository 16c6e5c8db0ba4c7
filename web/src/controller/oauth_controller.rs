//! Controller for the HubSpot OAuth connection flow.
//!
//! The consent page is opened in a popup by the frontend; the callback answers
//! with a page that closes it.

use crate::controller::{form_error, query_error};
use crate::params::integration::UserOrgParams;
use crate::{AppState, Error};

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse};
use axum::{Form, Json};

use domain::CallbackParams;
use log::*;

/// GET /integrations/hubspot/authorize
///
/// Starts an authorization and returns the HubSpot consent URL.
#[utoipa::path(
    get,
    path = "/integrations/hubspot/authorize",
    params(UserOrgParams),
    responses(
        (status = 200, description = "HubSpot consent URL", body = String),
        (status = 400, description = "Missing user_id or org_id"),
        (status = 500, description = "Integration is not configured"),
    )
)]
pub async fn authorize(
    State(app_state): State<AppState>,
    params: Result<Query<UserOrgParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = params.map_err(query_error)?;
    begin(&app_state, params).await
}

/// POST /integrations/hubspot/authorize
///
/// Form-encoded variant used by the frontend.
#[utoipa::path(
    post,
    path = "/integrations/hubspot/authorize",
    request_body(content = UserOrgParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "HubSpot consent URL", body = String),
        (status = 400, description = "Missing user_id or org_id"),
        (status = 500, description = "Integration is not configured"),
    )
)]
pub async fn authorize_form(
    State(app_state): State<AppState>,
    params: Result<Form<UserOrgParams>, FormRejection>,
) -> Result<impl IntoResponse, Error> {
    let Form(params) = params.map_err(form_error)?;
    begin(&app_state, params).await
}

async fn begin(app_state: &AppState, params: UserOrgParams) -> Result<Json<String>, Error> {
    debug!(
        "Authorize HubSpot for user {} of org {}",
        params.user_id, params.org_id
    );
    let url = app_state
        .hubspot
        .begin(&params.user_id, &params.org_id)
        .await?;
    Ok(Json(url))
}

/// GET /integrations/hubspot/oauth2callback
///
/// HubSpot redirects here after consent. Called by the browser, not by API clients.
#[utoipa::path(
    get,
    path = "/integrations/hubspot/oauth2callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code from HubSpot"),
        ("state" = Option<String>, Query, description = "State issued by the authorize endpoint"),
        ("error" = Option<String>, Query, description = "Error reported by HubSpot"),
    ),
    responses(
        (status = 200, description = "Page that closes the consent popup", body = String, content_type = "text/html"),
        (status = 400, description = "Invalid callback or failed token exchange"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    params: Result<Query<CallbackParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = params.map_err(query_error)?;
    let html = app_state.hubspot.handle_callback(&params).await?;
    Ok(Html(html))
}
