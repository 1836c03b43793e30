//! Cart partitioning into fulfillment packages.
//!
//! Each shipping calculation re-partitions the cart from scratch; packages
//! are never persisted. A cart produces one or two packages: lines the local
//! warehouse can cover, and lines the supplier drop-ships. Backorder lines
//! ride along in the local package so checkout never ends up with zero
//! packages.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::policy::{self, FulfillmentSource};
use crate::domain::product::RawProductFields;
use crate::domain::value_objects::Money;

/// One cart line as submitted by the platform.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartLine {
    /// The platform's cart-item key, opaque here.
    pub key: String,
    pub product_id: u64,
    pub quantity: u32,
    /// Per-unit price captured at add-to-cart time.
    pub unit_price: Money,
    pub product: RawProductFields,
    /// Shipping dimensions, used only for supplier rate quotes.
    #[serde(default)]
    pub dimensions: Dimensions,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub weight: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub postcode: String,
    #[serde(default)]
    pub city: String,
}

/// Context copied from the platform's original package onto every package we
/// produce. Dropping any of these silently breaks downstream rate and
/// discount calculations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageContext {
    pub destination: Destination,
    #[serde(default)]
    pub applied_coupons: Vec<String>,
    #[serde(default)]
    pub customer_id: Option<String>,
    pub currency: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageType {
    Local,
    Remote,
}

impl PackageType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "Local Warehouse Shipping",
            Self::Remote => "Turn14 Drop-Ship",
        }
    }
}

/// A shipping-calculation grouping of cart lines sharing a fulfillment source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FulfillmentPackage {
    pub id: Uuid,
    pub package_type: PackageType,
    pub label: String,
    pub contents: Vec<CartLine>,
    /// Summed line totals, in the context currency.
    pub contents_cost: Decimal,
    pub context: PackageContext,
}

impl FulfillmentPackage {
    fn build(package_type: PackageType, contents: Vec<CartLine>, context: PackageContext) -> Self {
        let contents_cost = contents
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc + line.line_total().amount());
        Self {
            id: Uuid::new_v4(),
            package_type,
            label: package_type.label().to_string(),
            contents,
            contents_cost,
            context,
        }
    }
}

/// Splits cart lines into at most two fulfillment packages.
///
/// Per line the three-way decision runs against normalized stock; backorder
/// lines bucket as local. A cart that lands entirely in one bucket yields a
/// single package tagged with that bucket's type, keeping the platform's
/// one-package flow intact. The split is a pure function of the lines and
/// threshold, so re-running it on the same cart state yields the same result.
pub fn partition(
    lines: Vec<CartLine>,
    context: PackageContext,
    threshold: u32,
) -> Vec<FulfillmentPackage> {
    let mut local_lines = Vec::new();
    let mut remote_lines = Vec::new();

    for line in lines {
        let fields = line.product.normalize();
        match policy::decide(fields.local_stock, fields.remote_stock, threshold, line.quantity) {
            FulfillmentSource::Remote => remote_lines.push(line),
            FulfillmentSource::Local | FulfillmentSource::Backorder => local_lines.push(line),
        }
    }

    match (local_lines.is_empty(), remote_lines.is_empty()) {
        (true, true) => Vec::new(),
        (false, true) => vec![FulfillmentPackage::build(PackageType::Local, local_lines, context)],
        (true, false) => vec![FulfillmentPackage::build(PackageType::Remote, remote_lines, context)],
        (false, false) => vec![
            FulfillmentPackage::build(PackageType::Local, local_lines, context.clone()),
            FulfillmentPackage::build(PackageType::Remote, remote_lines, context),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn line(key: &str, local: i64, remote: i64, qty: u32, unit: i64) -> CartLine {
        CartLine {
            key: key.to_string(),
            product_id: 42,
            quantity: qty,
            unit_price: Money::new(Decimal::new(unit, 0), "USD"),
            product: RawProductFields {
                local_stock: Some(json!(local)),
                remote_stock: Some(json!(remote)),
                ..Default::default()
            },
            dimensions: Dimensions::default(),
        }
    }

    fn context() -> PackageContext {
        PackageContext {
            destination: Destination {
                country: "US".into(),
                state: "MI".into(),
                postcode: "48034".into(),
                city: "Southfield".into(),
            },
            applied_coupons: vec!["WELCOME10".into()],
            customer_id: Some("cust-1".into()),
            currency: "USD".into(),
        }
    }

    #[test]
    fn mixed_cart_splits_into_two_packages() {
        let lines = vec![line("a", 10, 0, 2, 10), line("b", 0, 8, 1, 20)];
        let packages = partition(lines, context(), 0);
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].package_type, PackageType::Local);
        assert_eq!(packages[1].package_type, PackageType::Remote);
        assert_eq!(packages[0].contents_cost, Decimal::new(20, 0));
        assert_eq!(packages[1].contents_cost, Decimal::new(20, 0));
        assert_eq!(packages[0].label, "Local Warehouse Shipping");
        assert_eq!(packages[1].label, "Turn14 Drop-Ship");
    }

    #[test]
    fn all_local_cart_yields_one_local_package() {
        let lines = vec![line("a", 10, 0, 2, 10), line("b", 5, 0, 1, 5)];
        let packages = partition(lines, context(), 0);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].package_type, PackageType::Local);
        assert_eq!(packages[0].contents.len(), 2);
    }

    #[test]
    fn all_remote_cart_yields_one_remote_package() {
        let lines = vec![line("a", 0, 10, 2, 10)];
        let packages = partition(lines, context(), 0);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].package_type, PackageType::Remote);
    }

    #[test]
    fn backorder_lines_fall_back_to_the_local_package() {
        let lines = vec![line("a", 0, 0, 1, 10)];
        let packages = partition(lines, context(), 0);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].package_type, PackageType::Local);
        assert_eq!(packages[0].contents.len(), 1);
    }

    #[test]
    fn empty_cart_yields_no_packages() {
        assert!(partition(Vec::new(), context(), 0).is_empty());
    }

    #[test]
    fn no_line_is_lost_or_duplicated() {
        let lines = vec![
            line("a", 10, 0, 2, 10),
            line("b", 0, 8, 1, 20),
            line("c", 0, 0, 3, 5),
            line("d", 1, 1, 1, 7),
        ];
        let total: usize = lines.len();
        let packages = partition(lines, context(), 0);
        let kept: usize = packages.iter().map(|p| p.contents.len()).sum();
        assert_eq!(kept, total);
    }

    #[test]
    fn context_is_copied_onto_every_package() {
        let lines = vec![line("a", 10, 0, 1, 10), line("b", 0, 8, 1, 20)];
        let packages = partition(lines, context(), 0);
        for p in &packages {
            assert_eq!(p.context.destination.country, "US");
            assert_eq!(p.context.applied_coupons, vec!["WELCOME10"]);
            assert_eq!(p.context.customer_id.as_deref(), Some("cust-1"));
        }
    }

    #[test]
    fn partition_is_idempotent_on_the_same_cart_state() {
        let lines = vec![line("a", 10, 0, 2, 10), line("b", 0, 8, 1, 20)];
        let first = partition(lines.clone(), context(), 0);
        let second = partition(lines, context(), 0);
        let shape = |ps: &[FulfillmentPackage]| {
            ps.iter()
                .map(|p| (p.package_type, p.contents.iter().map(|l| l.key.clone()).collect::<Vec<_>>()))
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first), shape(&second));
    }
}
