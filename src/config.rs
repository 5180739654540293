//! Runtime configuration loaded from the environment.
//!
//! Variables:
//!
//! * `SHOP_ADMIN_IDS`: comma-separated admin chat ids
//! * `PAYMENT_PROVIDER_TOKEN`: direct-invoice provider token (optional)
//! * `PAYPAL_WEBHOOK_ID`: shared secret for webhook signatures (optional)
//! * `PAYPAL_MODE`: `live` selects the live endpoint, anything else the sandbox
//! * `SHOP_CURRENCY`: ISO 4217 code for invoices, default `USD`

use crate::application::payments::PaymentSettings;
use crate::domain::admin::Admins;
use crate::domain::ids::ChatId;
use secrecy::SecretString;
use thiserror::Error;

pub const LIVE_BASE_URL: &str = "https://api-m.paypal.com";
pub const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct ShopConfig {
    pub admin_ids: Vec<ChatId>,
    pub provider_token: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
    pub live_mode: bool,
    pub currency: String,
}

impl std::fmt::Debug for ShopConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopConfig")
            .field("admin_ids", &self.admin_ids)
            .field("provider_token", &self.provider_token.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("live_mode", &self.live_mode)
            .field("currency", &self.currency)
            .finish()
    }
}

impl ShopConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source. Blank
    /// values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let admin_ids = match get("SHOP_ADMIN_IDS") {
            Some(raw) => parse_admin_ids(&raw)?,
            None => Vec::new(),
        };
        let currency = get("SHOP_CURRENCY")
            .map(|c| c.trim().to_ascii_uppercase())
            .unwrap_or_else(|| "USD".to_string());
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar(
                "SHOP_CURRENCY".to_string(),
                format!("'{currency}' is not a three-letter currency code"),
            ));
        }

        Ok(Self {
            admin_ids,
            provider_token: get("PAYMENT_PROVIDER_TOKEN").map(SecretString::from),
            webhook_secret: get("PAYPAL_WEBHOOK_ID").map(SecretString::from),
            live_mode: get("PAYPAL_MODE").is_some_and(|m| m.trim().eq_ignore_ascii_case("live")),
            currency,
        })
    }

    pub fn base_url(&self) -> &'static str {
        if self.live_mode {
            LIVE_BASE_URL
        } else {
            SANDBOX_BASE_URL
        }
    }

    pub fn admins(&self) -> Admins {
        Admins::new(self.admin_ids.iter().copied())
    }

    pub fn payment_settings(&self) -> PaymentSettings {
        PaymentSettings {
            currency: self.currency.clone(),
            base_url: self.base_url().to_string(),
            provider_token: self.provider_token.clone(),
            webhook_secret: self.webhook_secret.clone(),
        }
    }
}

fn parse_admin_ids(raw: &str) -> Result<Vec<ChatId>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<ChatId>().map_err(|e| {
                ConfigError::InvalidEnvVar("SHOP_ADMIN_IDS".to_string(), format!("'{s}': {e}"))
            })
        })
        .collect()
}
