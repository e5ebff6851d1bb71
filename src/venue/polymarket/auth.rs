//! CLOB request signing.
//!
//! Authenticated endpoints take an HMAC-SHA256 signature over
//! `timestamp + METHOD + path + body`, base64-encoded, alongside the API key
//! and passphrase headers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::Credentials;
use crate::error::{Error, Result};

/// Complete API credential set for L2 (order) endpoints.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub api_key: String,
    pub api_secret: String,
    pub passphrase: String,
}

impl ApiCredentials {
    /// Build from environment-sourced credentials; `None` when incomplete.
    #[must_use]
    pub fn from_config(credentials: &Credentials) -> Option<Self> {
        Some(Self {
            api_key: credentials.api_key.clone()?,
            api_secret: credentials.api_secret.clone()?,
            passphrase: credentials.passphrase.clone()?,
        })
    }

    /// HMAC-SHA256 signature for one request.
    pub fn sign_request(&self, timestamp: &str, method: &str, path: &str, body: &str) -> String {
        let message = format!("{timestamp}{}{path}{body}", method.to_uppercase());
        let mac = hmac_sha256::HMAC::mac(message.as_bytes(), self.api_secret.as_bytes());
        STANDARD.encode(mac)
    }
}

/// Fetch credentials or fail with a config error, for order endpoints that
/// cannot run unauthenticated.
pub fn require(credentials: Option<&ApiCredentials>) -> Result<&ApiCredentials> {
    credentials.ok_or_else(|| {
        Error::Config(
            "venue credentials missing: set PAIRLOCK_API_KEY, PAIRLOCK_API_SECRET and \
             PAIRLOCK_PASSPHRASE"
                .into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> ApiCredentials {
        ApiCredentials {
            api_key: "key".into(),
            api_secret: "secret".into(),
            passphrase: "phrase".into(),
        }
    }

    #[test]
    fn signature_is_deterministic() {
        let a = creds().sign_request("1750420800", "POST", "/order", "{}");
        let b = creds().sign_request("1750420800", "POST", "/order", "{}");
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn signature_covers_every_component() {
        let base = creds().sign_request("1750420800", "POST", "/order", "{}");
        assert_ne!(base, creds().sign_request("1750420801", "POST", "/order", "{}"));
        assert_ne!(base, creds().sign_request("1750420800", "GET", "/order", "{}"));
        assert_ne!(base, creds().sign_request("1750420800", "POST", "/orders", "{}"));
        assert_ne!(base, creds().sign_request("1750420800", "POST", "/order", "{\"a\":1}"));
    }

    #[test]
    fn from_config_requires_all_three_values() {
        let partial = Credentials {
            api_key: Some("key".into()),
            api_secret: None,
            passphrase: Some("phrase".into()),
        };
        assert!(ApiCredentials::from_config(&partial).is_none());
    }
}
