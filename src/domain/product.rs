//! Per-product fulfillment fields and their boundary normalization.
//!
//! The platform stores these as free-form meta values, so they arrive as
//! strings, numbers or nothing at all. Normalization happens once, here;
//! the decision functions only ever see typed, defaulted values. Missing or
//! malformed stock is zero, never "unknown".

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire form of a product's fulfillment fields, exactly as the platform
/// hands them over.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawProductFields {
    #[serde(default)]
    pub local_stock: Option<Value>,
    #[serde(default)]
    pub local_price: Option<Value>,
    #[serde(default)]
    pub remote_stock: Option<Value>,
    #[serde(default)]
    pub remote_price: Option<Value>,
    #[serde(default)]
    pub remote_sku: Option<String>,
}

impl RawProductFields {
    pub fn normalize(&self) -> ProductFulfillment {
        ProductFulfillment {
            local_stock: coerce_stock(self.local_stock.as_ref()),
            local_price: coerce_price(self.local_price.as_ref()),
            remote_stock: coerce_stock(self.remote_stock.as_ref()),
            remote_price: coerce_price(self.remote_price.as_ref()),
            remote_sku: self
                .remote_sku
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }
}

/// Normalized fulfillment fields. Both stocks are always non-negative.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductFulfillment {
    pub local_stock: u32,
    pub local_price: Option<Decimal>,
    pub remote_stock: u32,
    pub remote_price: Option<Decimal>,
    pub remote_sku: Option<String>,
}

impl ProductFulfillment {
    /// Combined stock across both sources, the quantity shown in the catalog.
    pub fn combined_stock(&self) -> u32 {
        self.local_stock.saturating_add(self.remote_stock)
    }

    /// A product is in stock when either source has units.
    pub fn is_in_stock(&self) -> bool {
        self.combined_stock() > 0
    }

    pub fn stock_status(&self) -> &'static str {
        if self.is_in_stock() {
            "instock"
        } else {
            "outofstock"
        }
    }
}

fn coerce_stock(value: Option<&Value>) -> u32 {
    let n = match value {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    };
    // Negatives zero out; an oversized sync value stays in stock rather than
    // flipping the product out of stock.
    n.clamp(0, u32::MAX as i64) as u32
}

fn coerce_price(value: Option<&Value>) -> Option<Decimal> {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .and_then(Decimal::from_f64)
            .or_else(|| n.as_i64().map(Decimal::from)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse().ok()
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(local_stock: Value, remote_stock: Value) -> RawProductFields {
        RawProductFields {
            local_stock: Some(local_stock),
            remote_stock: Some(remote_stock),
            ..Default::default()
        }
    }

    #[test]
    fn missing_and_malformed_stock_coerces_to_zero() {
        let fields = RawProductFields::default().normalize();
        assert_eq!(fields.local_stock, 0);
        assert_eq!(fields.remote_stock, 0);

        let fields = raw(json!(""), json!("garbage")).normalize();
        assert_eq!(fields.local_stock, 0);
        assert_eq!(fields.remote_stock, 0);

        let fields = raw(json!(-4), json!("-2")).normalize();
        assert_eq!(fields.local_stock, 0);
        assert_eq!(fields.remote_stock, 0);
    }

    #[test]
    fn oversized_stock_saturates_instead_of_zeroing() {
        let fields = raw(json!("5000000000"), json!(9_000_000_000_i64)).normalize();
        assert_eq!(fields.local_stock, u32::MAX);
        assert_eq!(fields.remote_stock, u32::MAX);
        assert!(fields.is_in_stock());
    }

    #[test]
    fn numeric_strings_and_numbers_both_parse() {
        let fields = raw(json!("12"), json!(7)).normalize();
        assert_eq!(fields.local_stock, 12);
        assert_eq!(fields.remote_stock, 7);
    }

    #[test]
    fn prices_parse_or_fall_away() {
        let fields = RawProductFields {
            local_price: Some(json!("19.99")),
            remote_price: Some(json!(24.5)),
            ..Default::default()
        }
        .normalize();
        assert_eq!(fields.local_price, Some("19.99".parse().unwrap()));
        assert_eq!(fields.remote_price, Some("24.5".parse().unwrap()));

        let fields = RawProductFields {
            local_price: Some(json!("")),
            remote_price: Some(json!("not a price")),
            ..Default::default()
        }
        .normalize();
        assert_eq!(fields.local_price, None);
        assert_eq!(fields.remote_price, None);
    }

    #[test]
    fn remote_sku_is_trimmed_and_optional() {
        let fields = RawProductFields {
            remote_sku: Some("  T14-123 ".to_string()),
            ..Default::default()
        }
        .normalize();
        assert_eq!(fields.remote_sku.as_deref(), Some("T14-123"));

        let fields = RawProductFields { remote_sku: Some("  ".into()), ..Default::default() }.normalize();
        assert_eq!(fields.remote_sku, None);
    }

    #[test]
    fn stock_aggregation_combines_sources() {
        let fields = raw(json!(0), json!(8)).normalize();
        assert_eq!(fields.combined_stock(), 8);
        assert!(fields.is_in_stock());
        assert_eq!(fields.stock_status(), "instock");

        let fields = raw(json!(0), json!(0)).normalize();
        assert!(!fields.is_in_stock());
        assert_eq!(fields.stock_status(), "outofstock");
    }
}
