use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HUBSPOT_AUTHORIZE_URL: &str = "https://app-na2.hubspot.com/oauth/authorize";
pub const DEFAULT_HUBSPOT_API_BASE_URL: &str = "https://api.hubspot.com";
pub const DEFAULT_HUBSPOT_APP_BASE_URL: &str = "https://app.hubspot.com";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Where short-lived integration data (state, credentials, items) is kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, PartialEq, Eq)]
pub struct CacheBackendParseError;

impl FromStr for CacheBackend {
    type Err = CacheBackendParseError;
    fn from_str(backend: &str) -> Result<CacheBackend, Self::Err> {
        match backend.to_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            _ => Err(CacheBackendParseError),
        }
    }
}

impl fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CacheBackend::Memory => write!(f, "memory"),
            CacheBackend::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The OAuth client ID of the HubSpot app.
    #[arg(long, env)]
    hubspot_client_id: Option<String>,

    /// The OAuth client secret of the HubSpot app.
    #[arg(long, env, hide_env_values = true)]
    hubspot_client_secret: Option<String>,

    /// HubSpot's OAuth consent page.
    #[arg(long, env, default_value = DEFAULT_HUBSPOT_AUTHORIZE_URL)]
    hubspot_authorize_url: String,

    /// Base URL of the HubSpot API (token exchange and CRM objects).
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_HUBSPOT_API_BASE_URL)]
    hubspot_api_base_url: String,

    /// Base URL of the HubSpot web app, used to build record links.
    #[arg(long, env, default_value = DEFAULT_HUBSPOT_APP_BASE_URL)]
    hubspot_app_base_url: String,

    /// CRM object categories to load as integration items.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "contacts"
    )]
    pub hubspot_object_types: Vec<String>,

    /// Shared secret for signing cache invalidation webhooks. Unset disables the check.
    #[arg(long, env, hide_env_values = true)]
    hubspot_webhook_secret: Option<String>,

    /// Header carrying the webhook signature.
    #[arg(long, env, default_value = "x-hubspot-signature")]
    pub hubspot_webhook_signature_header: String,

    /// Timeout in seconds for each request to HubSpot
    #[arg(long, env, default_value_t = 15)]
    pub provider_request_timeout_secs: u64,

    /// How many times a transient HubSpot failure is retried (0 disables retries)
    #[arg(long, env, default_value_t = 0)]
    pub provider_max_retries: u32,

    /// Cache backend for OAuth state, credentials and items.
    #[arg(
        long,
        env,
        default_value_t = CacheBackend::Memory,
        value_parser = clap::builder::PossibleValuesParser::new(["memory", "redis", "MEMORY", "REDIS"])
            .map(|s| s.parse::<CacheBackend>().unwrap()),
    )]
    pub cache_backend: CacheBackend,

    /// Sets the Redis URL to connect to when the redis cache backend is selected
    #[arg(long, env, default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Namespace prepended to every Redis key
    #[arg(long, env, default_value = "hubspot:")]
    pub cache_key_prefix: String,

    /// JSON file holding the durable identity links
    #[arg(long, env, default_value = "data/db.json")]
    pub identity_store_path: PathBuf,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn hubspot_client_id(&self) -> Option<String> {
        self.hubspot_client_id.clone()
    }

    pub fn set_hubspot_client_id(mut self, client_id: Option<String>) -> Self {
        self.hubspot_client_id = client_id;
        self
    }

    pub fn hubspot_client_secret(&self) -> Option<SecretString> {
        self.hubspot_client_secret
            .clone()
            .map(SecretString::new)
    }

    pub fn set_hubspot_client_secret(mut self, client_secret: Option<String>) -> Self {
        self.hubspot_client_secret = client_secret;
        self
    }

    pub fn hubspot_authorize_url(&self) -> &str {
        &self.hubspot_authorize_url
    }

    pub fn hubspot_api_base_url(&self) -> &str {
        &self.hubspot_api_base_url
    }

    /// Point the HubSpot API at another host, e.g. a mock server.
    pub fn set_hubspot_api_base_url(mut self, api_base_url: String) -> Self {
        self.hubspot_api_base_url = api_base_url;
        self
    }

    pub fn hubspot_app_base_url(&self) -> &str {
        &self.hubspot_app_base_url
    }

    pub fn hubspot_webhook_secret(&self) -> Option<SecretString> {
        self.hubspot_webhook_secret
            .clone()
            .filter(|secret| !secret.is_empty())
            .map(SecretString::new)
    }

    pub fn set_hubspot_webhook_secret(mut self, secret: Option<String>) -> Self {
        self.hubspot_webhook_secret = secret;
        self
    }

    pub fn provider_request_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_request_timeout_secs)
    }

    pub fn redis_url(&self) -> &str {
        &self.redis_url
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["hubspot_connector"]);

        assert_eq!(config.port, 8000);
        assert_eq!(config.interface.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.hubspot_object_types, vec!["contacts"]);
        assert_eq!(config.cache_backend, CacheBackend::Memory);
        assert_eq!(config.cache_key_prefix, "hubspot:");
        assert_eq!(config.identity_store_path, PathBuf::from("data/db.json"));
        assert_eq!(config.provider_request_timeout(), Duration::from_secs(15));
        assert_eq!(config.provider_max_retries, 0);
        assert_eq!(config.hubspot_authorize_url(), DEFAULT_HUBSPOT_AUTHORIZE_URL);
        assert_eq!(config.hubspot_api_base_url(), DEFAULT_HUBSPOT_API_BASE_URL);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::parse_from([
            "hubspot_connector",
            "--cache-backend",
            "redis",
            "--hubspot-object-types",
            "contacts,companies,deals",
            "--port",
            "9000",
        ]);

        assert_eq!(config.cache_backend, CacheBackend::Redis);
        assert_eq!(
            config.hubspot_object_types,
            vec!["contacts", "companies", "deals"]
        );
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_empty_webhook_secret_disables_check() {
        let config = Config::parse_from(["hubspot_connector"])
            .set_hubspot_webhook_secret(Some(String::new()));
        assert!(config.hubspot_webhook_secret().is_none());
    }

    #[test]
    fn test_parse_cache_backend() {
        assert_eq!("Redis".parse::<CacheBackend>(), Ok(CacheBackend::Redis));
        assert_eq!("memory".parse::<CacheBackend>(), Ok(CacheBackend::Memory));
        assert_eq!("sqlite".parse::<CacheBackend>(), Err(CacheBackendParseError));
    }
}
