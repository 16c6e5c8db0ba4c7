use domain::{HubspotIntegration, HubspotSettings};
use log::{error, info};
use service::{config::Config, logging::Logger};

#[tokio::main]
async fn main() {
    let config = Config::new();

    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
        std::process::exit(1);
    }

    info!(
        "Starting HubSpot connector in {} mode...",
        config.runtime_env()
    );

    let cache = match service::init_cache(&config).await {
        Ok(cache) => cache,
        Err(e) => {
            error!("Failed to initialize the {} cache: {e}", config.cache_backend);
            std::process::exit(1);
        }
    };

    let store = service::init_identity_store(&config);

    let settings = match HubspotSettings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Invalid HubSpot configuration: {e}");
            std::process::exit(1);
        }
    };

    let hubspot = match HubspotIntegration::new(settings, cache, store) {
        Ok(hubspot) => hubspot,
        Err(e) => {
            error!("Failed to initialize the HubSpot integration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = web::init_server(&config, web::AppState::new(hubspot)).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
