//! Provider HTTP client builder with middleware.

use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::BackoffPolicy;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum number of retries. Zero disables the retry middleware entirely.
    pub max_retries: u32,
    /// User agent string.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_retries: 0,
            user_agent: format!("integration-auth/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// HTTP client used for every call to an integration provider.
pub type ProviderClient = reqwest_middleware::ClientWithMiddleware;

/// Builder for creating provider HTTP clients with middleware.
///
/// Provider calls are not retried unless `with_max_retries` asks for it.
pub struct ProviderClientBuilder {
    config: HttpClientConfig,
}

impl ProviderClientBuilder {
    /// Create a new client builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.config.user_agent = user_agent;
        self
    }

    /// Build the configured HTTP client.
    pub fn build(self) -> Result<ProviderClient, reqwest::Error> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent)
            .build()?;

        let mut builder = ClientBuilder::new(client);
        if self.config.max_retries > 0 {
            let retry_policy = BackoffPolicy::new(self.config.max_retries);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
        }

        Ok(builder.build())
    }
}

impl Default for ProviderClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_default() {
        let builder = ProviderClientBuilder::new();
        assert_eq!(builder.config.timeout, Duration::from_secs(15));
        assert_eq!(builder.config.max_retries, 0);
    }

    #[test]
    fn test_builder_with_timeout() {
        let builder = ProviderClientBuilder::new().with_timeout(Duration::from_secs(30));
        assert_eq!(builder.config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_with_max_retries() {
        let builder = ProviderClientBuilder::new().with_max_retries(2);
        assert_eq!(builder.config.max_retries, 2);
    }

    #[tokio::test]
    async fn test_build_client() {
        assert!(ProviderClientBuilder::new().build().is_ok());
        assert!(ProviderClientBuilder::new()
            .with_max_retries(2)
            .build()
            .is_ok());
    }

    #[tokio::test]
    async fn test_failed_request_is_not_retried_by_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .expect(1)
            .create_async()
            .await;

        let client = ProviderClientBuilder::new().build().unwrap();
        let response = client
            .get(format!("{}/flaky", server.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 503);
        mock.assert_async().await;
    }
}
