//! Live shipping-rate quotes from the Turn14 API.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{FulfillmentConfig, Turn14ApiConfig};
use crate::domain::cart::{Destination, FulfillmentPackage};
use crate::domain::shipping::ShippingRate;
use crate::turn14::auth::{self, TokenCache};

/// One rate as quoted by the supplier, before markup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierRate {
    pub carrier: String,
    pub service: String,
    pub price: Decimal,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct RateQuoteRequest {
    pub items: Vec<QuoteItem>,
    pub destination: Destination,
    pub currency: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct QuoteItem {
    pub product_id: u64,
    pub quantity: u32,
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Deserialize)]
struct RateQuoteResponse {
    #[serde(default)]
    rates: Vec<SupplierRateWire>,
}

#[derive(Debug, Deserialize)]
struct SupplierRateWire {
    #[serde(default)]
    carrier: Option<String>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
}

impl ConnectionTest {
    fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into() }
    }
}

/// Client for the supplier's quote and token endpoints. `get_rates` never
/// returns an error; every failure mode degrades to an empty rate list.
#[derive(Debug, Default)]
pub struct RateClient {
    http: reqwest::Client,
    tokens: TokenCache,
}

impl RateClient {
    pub fn new() -> Self {
        Self::default()
    }

    async fn bearer_token(&self, api: &Turn14ApiConfig) -> Option<String> {
        if let Some(token) = self.tokens.get().await {
            return Some(token);
        }
        let token = auth::fetch_token(&self.http, api).await?;
        self.tokens.store(token.clone()).await;
        Some(token)
    }

    /// Drops the cached token; called when credentials are updated.
    pub async fn invalidate_token(&self) {
        self.tokens.invalidate().await;
    }

    /// Fetches supplier rates for a package. Empty on any failure.
    pub async fn get_rates(&self, api: &Turn14ApiConfig, package: &FulfillmentPackage) -> Vec<SupplierRate> {
        if api.base_url.trim().is_empty() {
            tracing::warn!("turn14 rate quote skipped: no base url configured");
            return Vec::new();
        }
        let Some(token) = self.bearer_token(api).await else {
            return Vec::new();
        };

        let url = format!("{}/shipping/rates", api.base_url.trim_end_matches('/'));
        let payload = quote_payload(package);

        let response = match self
            .http
            .post(&url)
            .bearer_auth(&token)
            .json(&payload)
            .timeout(std::time::Duration::from_secs(api.timeout_secs))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "turn14 rate quote request failed");
                return Vec::new();
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "turn14 rate quote returned an error");
            return Vec::new();
        }

        let body = match response.json::<RateQuoteResponse>().await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "turn14 rate quote response was not valid JSON");
                return Vec::new();
            }
        };

        body.rates
            .into_iter()
            .filter_map(|r| {
                // Entries without a price are unusable.
                let price = r.price?;
                Some(SupplierRate {
                    carrier: r.carrier.unwrap_or_default(),
                    service: r.service.unwrap_or_default(),
                    price,
                })
            })
            .collect()
    }

    /// Quotes a package and converts the result into platform shipping rates
    /// with the configured markup applied.
    pub async fn quote_package_rates(
        &self,
        config: &FulfillmentConfig,
        package: &FulfillmentPackage,
    ) -> Vec<ShippingRate> {
        let quoted = self.get_rates(&config.api, package).await;
        tracing::debug!(count = quoted.len(), package = %package.id, "turn14 rates quoted");
        apply_markup(quoted, &config.remote_method_id, config.markup_percent)
    }

    /// Verifies credentials end to end: token fetch, then the brands listing.
    pub async fn test_connection(&self, api: &Turn14ApiConfig) -> ConnectionTest {
        let Some(token) = self.bearer_token(api).await else {
            return ConnectionTest::failure(
                "Failed to obtain API token. Check the configured credentials.",
            );
        };

        let url = format!("{}/v1/brands", api.base_url.trim_end_matches('/'));
        let response = match self
            .http
            .get(&url)
            .bearer_auth(&token)
            .timeout(std::time::Duration::from_secs(api.timeout_secs))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return ConnectionTest::failure(format!("Connection error: {e}")),
        };

        let status = response.status();
        if !status.is_success() {
            return ConnectionTest::failure(format!(
                "API returned error code {status}. Verify the configured credentials."
            ));
        }

        if response.json::<serde_json::Value>().await.is_err() {
            return ConnectionTest::failure("Invalid API response format.");
        }

        ConnectionTest {
            success: true,
            message: "API connection successful. Authentication verified and the API is responding.".to_string(),
        }
    }
}

/// Builds the quote payload for a package.
pub fn quote_payload(package: &FulfillmentPackage) -> RateQuoteRequest {
    RateQuoteRequest {
        items: package
            .contents
            .iter()
            .map(|line| QuoteItem {
                product_id: line.product_id,
                quantity: line.quantity,
                weight: line.dimensions.weight,
                length: line.dimensions.length,
                width: line.dimensions.width,
                height: line.dimensions.height,
            })
            .collect(),
        destination: package.context.destination.clone(),
        currency: package.context.currency.clone(),
    }
}

/// Converts supplier quotes to platform rates, multiplying each price by
/// `1 + markup_percent/100`. Rate ids are instance-qualified under the
/// configured remote method id so they survive the rate filter.
pub fn apply_markup(rates: Vec<SupplierRate>, remote_method_id: &str, markup_percent: f64) -> Vec<ShippingRate> {
    let multiplier =
        Decimal::from_f64(1.0 + markup_percent / 100.0).filter(|m| *m > Decimal::ZERO).unwrap_or(Decimal::ONE);

    rates
        .into_iter()
        .filter_map(|r| {
            let label = format!("{} - {}", r.carrier, r.service).trim_matches(&[' ', '-'][..]).to_string();
            // A quote with no carrier and no service would render as a
            // nameless option; drop it.
            if label.is_empty() {
                tracing::debug!("skipping unnamed supplier rate");
                return None;
            }
            Some(ShippingRate {
                id: format!("{remote_method_id}:{}", slug(&format!("{}_{}", r.carrier, r.service))),
                label,
                cost: (r.price * multiplier).round_dp(2),
            })
        })
        .collect()
}

fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_sep = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_sep = false;
        } else if !last_sep {
            out.push('_');
            last_sep = true;
        }
    }
    out.trim_end_matches('_').to_string()
}
