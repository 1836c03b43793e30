//! Effective price resolution.
//!
//! `auto` mode intentionally uses the plain stock-vs-threshold comparison
//! rather than the quantity-aware three-way decision: catalog display has no
//! cart quantity, and keeping the simpler comparison matches what shoppers
//! have always seen on the product page.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::product::ProductFulfillment;
use crate::FulfillmentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceMode {
    Auto,
    AlwaysLocal,
    AlwaysRemote,
    Manual,
}

impl FromStr for PriceMode {
    type Err = FulfillmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(Self::Auto),
            "always_local" => Ok(Self::AlwaysLocal),
            "always_remote" => Ok(Self::AlwaysRemote),
            "manual" => Ok(Self::Manual),
            other => Err(FulfillmentError::UnknownPriceMode(other.to_string())),
        }
    }
}

/// Returns the price to display for a product. Falls back to the platform's
/// own price whenever the selected source has no price on file.
pub fn resolve_price(
    mode: PriceMode,
    fields: &ProductFulfillment,
    threshold: u32,
    platform_default: Decimal,
) -> Decimal {
    match mode {
        PriceMode::Manual => platform_default,
        PriceMode::AlwaysLocal => fields.local_price.unwrap_or(platform_default),
        PriceMode::AlwaysRemote => fields.remote_price.unwrap_or(platform_default),
        PriceMode::Auto => {
            if fields.local_stock > threshold {
                fields.local_price.unwrap_or(platform_default)
            } else {
                fields.remote_price.unwrap_or(platform_default)
            }
        }
    }
}
