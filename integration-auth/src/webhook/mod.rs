//! Webhook signature validation.

mod hmac;

pub use hmac::HmacWebhookValidator;

use std::collections::HashMap;

use crate::error::Error;

/// Trait for validating webhook signatures.
pub trait WebhookValidator: Send + Sync {
    /// Validate a webhook request.
    ///
    /// `headers` are keyed by lowercase header name; `body` is the raw request body.
    /// Returns an error when the signature is missing, malformed or does not match.
    fn validate(&self, headers: &HashMap<String, String>, body: &[u8]) -> Result<(), Error>;

    /// Get the provider identifier for this validator.
    fn provider_id(&self) -> &str;
}
