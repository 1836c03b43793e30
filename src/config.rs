//! Runtime configuration.
//!
//! The original integration kept these in a flat key-value settings store read
//! on every call; here they are loaded once into a typed struct and handed to
//! components explicitly. The admin settings endpoint may replace the struct
//! at runtime.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::pricing::PriceMode;

/// Fulfillment arbitration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentConfig {
    /// Price resolution strategy for catalog display.
    pub price_mode: PriceMode,
    /// Local stock at or below this level does not justify local fulfillment.
    pub stock_threshold: u32,
    /// Shipping method ids allowed on local packages (`flat_rate`, ...).
    pub local_methods: Vec<String>,
    /// The single method id used for drop-ship packages.
    pub remote_method_id: String,
    /// Percent markup applied to supplier-quoted shipping prices.
    pub markup_percent: f64,
    pub api: Turn14ApiConfig,
}

/// Turn14 API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn14ApiConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Bounded timeout for outbound calls, in seconds.
    pub timeout_secs: u64,
}

impl Default for FulfillmentConfig {
    fn default() -> Self {
        Self {
            price_mode: PriceMode::Auto,
            stock_threshold: 0,
            local_methods: default_local_methods(),
            remote_method_id: "turn14_shipping".to_string(),
            markup_percent: 0.0,
            api: Turn14ApiConfig::default(),
        }
    }
}

impl Default for Turn14ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apitest.turn14.com".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: 20,
        }
    }
}

fn default_local_methods() -> Vec<String> {
    vec!["flat_rate".into(), "free_shipping".into(), "local_pickup".into()]
}

impl FulfillmentConfig {
    /// Loads configuration from environment variables, falling back to the
    /// defaults above for anything unset. An unparseable price mode falls back
    /// to `auto` with a warning rather than refusing to start.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let price_mode = match env::var("T14SF_PRICE_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "unknown T14SF_PRICE_MODE, using auto");
                PriceMode::Auto
            }),
            Err(_) => defaults.price_mode,
        };

        let stock_threshold = env::var("T14SF_STOCK_THRESHOLD")
            .unwrap_or_else(|_| defaults.stock_threshold.to_string())
            .parse()
            .context("Failed to parse T14SF_STOCK_THRESHOLD as a non-negative integer")?;

        let local_methods = env::var("T14SF_LOCAL_METHODS")
            .map(|raw| split_method_list(&raw))
            .unwrap_or_else(|_| defaults.local_methods);

        let remote_method_id = env::var("T14SF_REMOTE_METHOD_ID")
            .unwrap_or(defaults.remote_method_id)
            .trim()
            .to_string();

        let markup_percent = env::var("T14SF_MARKUP_PERCENT")
            .unwrap_or_else(|_| defaults.markup_percent.to_string())
            .parse()
            .context("Failed to parse T14SF_MARKUP_PERCENT as a number")?;

        let api = Turn14ApiConfig {
            base_url: env::var("TURN14_API_BASE_URL").unwrap_or(defaults.api.base_url),
            client_id: env::var("TURN14_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("TURN14_CLIENT_SECRET").unwrap_or_default(),
            timeout_secs: env::var("TURN14_API_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.api.timeout_secs.to_string())
                .parse()
                .context("Failed to parse TURN14_API_TIMEOUT_SECS as seconds")?,
        };

        Ok(Self { price_mode, stock_threshold, local_methods, remote_method_id, markup_percent, api })
    }
}

impl Turn14ApiConfig {
    pub fn has_credentials(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

/// Settings stores have historically handed back scalars where lists were
/// expected; a comma-joined string coerces to a list here for the same reason.
pub fn split_method_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_common_local_methods() {
        let cfg = FulfillmentConfig::default();
        assert_eq!(cfg.local_methods, vec!["flat_rate", "free_shipping", "local_pickup"]);
        assert_eq!(cfg.remote_method_id, "turn14_shipping");
        assert_eq!(cfg.stock_threshold, 0);
    }

    #[test]
    fn method_list_coerces_scalars_and_drops_empties() {
        assert_eq!(split_method_list("flat_rate"), vec!["flat_rate"]);
        assert_eq!(
            split_method_list(" flat_rate, free_shipping ,,local_pickup"),
            vec!["flat_rate", "free_shipping", "local_pickup"]
        );
        assert!(split_method_list("").is_empty());
    }

    #[test]
    fn missing_credentials_are_detected() {
        let mut api = Turn14ApiConfig::default();
        assert!(!api.has_credentials());
        api.client_id = "id".into();
        api.client_secret = "secret".into();
        assert!(api.has_credentials());
    }
}
