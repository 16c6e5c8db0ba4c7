use crate::controller::{
    health_check_controller, integration_controller, oauth_controller, webhook_controller,
};
use crate::{params, AppState};

use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

// The served OpenAPI document. A path or schema must be listed here to appear in it.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "HubSpot Connector API"
        ),
        paths(
            health_check_controller::health_check,
            oauth_controller::authorize,
            oauth_controller::authorize_form,
            oauth_controller::callback,
            integration_controller::credentials,
            integration_controller::credentials_form,
            integration_controller::items,
            integration_controller::load,
            webhook_controller::invalidate,
        ),
        components(
            schemas(
                domain::CredentialRecord,
                domain::IntegrationItem,
                params::integration::UserOrgParams,
                params::integration::ItemsParams,
                webhook_controller::WebhookResponse,
            )
        ),
        tags(
            (name = "hubspot_connector", description = "HubSpot OAuth connection and CRM item loading")
        )
    )]
pub struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(oauth_routes(app_state.clone()))
        .merge(integration_routes(app_state.clone()))
        .merge(webhook_routes(app_state))
        .merge(api_doc_routes())
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn oauth_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/integrations/hubspot/authorize",
            get(oauth_controller::authorize).post(oauth_controller::authorize_form),
        )
        .route(
            "/integrations/hubspot/oauth2callback",
            get(oauth_controller::callback),
        )
        .with_state(app_state)
}

fn integration_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/integrations/hubspot/credentials",
            get(integration_controller::credentials).post(integration_controller::credentials_form),
        )
        .route(
            "/integrations/hubspot/items",
            get(integration_controller::items),
        )
        .route(
            "/integrations/hubspot/load",
            post(integration_controller::load),
        )
        .with_state(app_state)
}

fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/integrations/hubspot/invalidate",
            post(webhook_controller::invalidate),
        )
        .with_state(app_state)
}

fn api_doc_routes() -> Router {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
