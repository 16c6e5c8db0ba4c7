//! HMAC-SHA256 webhook signature validation.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::warn;

use super::WebhookValidator;
use crate::error::{webhook_error, Error, WebhookErrorKind};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 webhook validator.
///
/// Expects the hex digest of the raw body, optionally prefixed with `sha256=`.
pub struct HmacWebhookValidator {
    provider_id: String,
    secret: SecretString,
    signature_header: String,
}

impl HmacWebhookValidator {
    /// Create a new HMAC webhook validator.
    ///
    /// # Arguments
    ///
    /// * `provider_id` - Provider identifier
    /// * `secret` - Webhook signing secret
    /// * `signature_header` - Name of the header containing the signature (case-insensitive)
    pub fn new(provider_id: &str, secret: SecretString, signature_header: &str) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            secret,
            signature_header: signature_header.to_ascii_lowercase(),
        }
    }
}

impl WebhookValidator for HmacWebhookValidator {
    fn validate(&self, headers: &HashMap<String, String>, body: &[u8]) -> Result<(), Error> {
        let signature = headers.get(&self.signature_header).ok_or_else(|| {
            webhook_error(
                WebhookErrorKind::MissingSignature,
                &format!("Missing signature header: {}", self.signature_header),
            )
        })?;

        let expected_sig = hex::decode(signature.trim().trim_start_matches("sha256="))
            .map_err(|_| {
                webhook_error(WebhookErrorKind::InvalidSignature, "Invalid signature format")
            })?;

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| webhook_error(WebhookErrorKind::InvalidPayload, "Invalid HMAC key"))?;
        mac.update(body);

        // verify_slice compares in constant time
        mac.verify_slice(&expected_sig).map_err(|_| {
            warn!("Webhook signature mismatch for {}", self.provider_id);
            webhook_error(WebhookErrorKind::InvalidSignature, "Signature mismatch")
        })
    }

    fn provider_id(&self) -> &str {
        &self.provider_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn validator() -> HmacWebhookValidator {
        HmacWebhookValidator::new(
            "hubspot",
            SecretString::new("test_secret".to_string()),
            "X-HubSpot-Signature",
        )
    }

    #[test]
    fn test_valid_signature() {
        let body = br#"[{"sourceId":"userId:123"}]"#;
        let mut headers = HashMap::new();
        headers.insert("x-hubspot-signature".to_string(), sign("test_secret", body));

        assert!(validator().validate(&headers, body).is_ok());
    }

    #[test]
    fn test_prefixed_signature() {
        let body = b"payload";
        let mut headers = HashMap::new();
        headers.insert(
            "x-hubspot-signature".to_string(),
            format!("sha256={}", sign("test_secret", body)),
        );

        assert!(validator().validate(&headers, body).is_ok());
    }

    #[test]
    fn test_signature_for_other_body() {
        let mut headers = HashMap::new();
        headers.insert(
            "x-hubspot-signature".to_string(),
            sign("test_secret", b"original"),
        );

        let err = validator().validate(&headers, b"tampered").unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Webhook(WebhookErrorKind::InvalidSignature)
        );
    }

    #[test]
    fn test_malformed_signature() {
        let mut headers = HashMap::new();
        headers.insert("x-hubspot-signature".to_string(), "not-hex".to_string());

        let err = validator().validate(&headers, b"payload").unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Webhook(WebhookErrorKind::InvalidSignature)
        );
    }

    #[test]
    fn test_missing_signature() {
        let err = validator().validate(&HashMap::new(), b"payload").unwrap_err();
        assert_eq!(
            err.error_kind,
            ErrorKind::Webhook(WebhookErrorKind::MissingSignature)
        );
    }
}
