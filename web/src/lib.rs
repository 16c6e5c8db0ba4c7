use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use domain::HubspotIntegration;
use log::*;
use service::config::Config;
use tower_http::cors::CorsLayer;

pub(crate) mod controller;
pub(crate) mod error;
pub(crate) mod params;
mod router;

pub use error::{Error, Result};
pub use router::{define_routes, ApiDoc};

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub hubspot: Arc<HubspotIntegration>,
}

impl AppState {
    pub fn new(hubspot: HubspotIntegration) -> Self {
        Self {
            hubspot: Arc::new(hubspot),
        }
    }
}

pub async fn init_server(config: &Config, app_state: AppState) -> std::io::Result<()> {
    let interface = config.interface.as_deref().unwrap_or("127.0.0.1");
    let host = format!("{}:{}", interface, config.port);

    let cors_layer = cors_layer(&config.allowed_origins);

    let listener = tokio::net::TcpListener::bind(&host).await?;
    info!("Server starting... listening for connections on http://{host}");

    axum::serve(listener, define_routes(app_state).layer(cors_layer)).await
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();
    info!("CORS allowed origins: {:?}", origins);

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .allow_origin(origins)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_skips_invalid_origins() {
        // Building must not panic on a bad entry
        let _layer = cors_layer(&[
            "http://localhost:3000".to_string(),
            "bad\norigin".to_string(),
        ]);
    }
}
