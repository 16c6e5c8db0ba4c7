//! Controller for handing out HubSpot credentials and loading items.

use crate::controller::{form_error, query_error};
use crate::params::integration::{ItemsParams, UserOrgParams};
use crate::{AppState, Error};

use axum::extract::rejection::{FormRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::{Form, Json};

use domain::{CredentialRecord, IntegrationItem};

/// GET /integrations/hubspot/credentials
///
/// Returns the credentials of the last completed authorization. Each record can be read once.
#[utoipa::path(
    get,
    path = "/integrations/hubspot/credentials",
    params(UserOrgParams),
    responses(
        (status = 200, description = "Credentials, consumed by this read", body = CredentialRecord),
        (status = 400, description = "No credentials found"),
    )
)]
pub async fn credentials(
    State(app_state): State<AppState>,
    params: Result<Query<UserOrgParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = params.map_err(query_error)?;
    take_credentials(&app_state, params).await
}

/// POST /integrations/hubspot/credentials
#[utoipa::path(
    post,
    path = "/integrations/hubspot/credentials",
    request_body(content = UserOrgParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Credentials, consumed by this read", body = CredentialRecord),
        (status = 400, description = "No credentials found"),
    )
)]
pub async fn credentials_form(
    State(app_state): State<AppState>,
    params: Result<Form<UserOrgParams>, FormRejection>,
) -> Result<impl IntoResponse, Error> {
    let Form(params) = params.map_err(form_error)?;
    take_credentials(&app_state, params).await
}

async fn take_credentials(
    app_state: &AppState,
    params: UserOrgParams,
) -> Result<Json<CredentialRecord>, Error> {
    let record = app_state
        .hubspot
        .get_credentials(&params.user_id, &params.org_id)
        .await?;
    Ok(Json(record))
}

/// GET /integrations/hubspot/items
#[utoipa::path(
    get,
    path = "/integrations/hubspot/items",
    params(ItemsParams),
    responses(
        (status = 200, description = "Normalized HubSpot items", body = [IntegrationItem]),
        (status = 400, description = "Invalid credentials or HubSpot rejected the request"),
    )
)]
pub async fn items(
    State(app_state): State<AppState>,
    params: Result<Query<ItemsParams>, QueryRejection>,
) -> Result<impl IntoResponse, Error> {
    let Query(params) = params.map_err(query_error)?;
    fetch(&app_state, params).await
}

/// POST /integrations/hubspot/load
#[utoipa::path(
    post,
    path = "/integrations/hubspot/load",
    request_body(content = ItemsParams, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Normalized HubSpot items", body = [IntegrationItem]),
        (status = 400, description = "Invalid credentials or HubSpot rejected the request"),
    )
)]
pub async fn load(
    State(app_state): State<AppState>,
    params: Result<Form<ItemsParams>, FormRejection>,
) -> Result<impl IntoResponse, Error> {
    let Form(params) = params.map_err(form_error)?;
    fetch(&app_state, params).await
}

async fn fetch(
    app_state: &AppState,
    params: ItemsParams,
) -> Result<Json<Vec<IntegrationItem>>, Error> {
    let items = app_state.hubspot.fetch_items(&params.credentials).await?;
    Ok(Json(items))
}
