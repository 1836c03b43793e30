//! Smart Fulfillment
//!
//! Dual-source fulfillment arbitration for an e-commerce storefront: decides,
//! per order line, whether it ships from the merchant's local warehouse or is
//! drop-shipped through the Turn14 supplier, and keeps price display, stock
//! display, shipping packages and order metadata consistent with that decision.
//!
//! ## Layout
//! - [`domain`] — the pure core: decision policy, price resolution, stock
//!   aggregation, cart partitioning, rate filtering, order tagging.
//! - [`turn14`] — the supplier rate client (OAuth token cache + quote calls).
//! - [`config`] — typed runtime configuration, loaded once from the environment
//!   and passed into the core explicitly.
//!
//! The HTTP surface in `main.rs` is the only integration layer; the hosting
//! platform calls it at its own lifecycle points (catalog render, shipping
//! calculation, checkout). Capability and CSRF checks are expected to happen
//! upstream of this service.

use thiserror::Error;

pub mod config;
pub mod domain;
pub mod turn14;

pub use config::{FulfillmentConfig, Turn14ApiConfig};
pub use domain::cart::{CartLine, FulfillmentPackage, PackageContext, PackageType};
pub use domain::order::OrderLineFulfillment;
pub use domain::policy::FulfillmentSource;
pub use domain::pricing::PriceMode;
pub use domain::product::{ProductFulfillment, RawProductFields};
pub use domain::shipping::ShippingRate;
pub use domain::value_objects::Money;

#[derive(Error, Debug)]
pub enum FulfillmentError {
    #[error("unknown price mode: {0}")]
    UnknownPriceMode(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

pub type Result<T> = std::result::Result<T, FulfillmentError>;
