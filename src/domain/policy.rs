//! Fulfillment source decision.
//!
//! This is the one rule everything else defers to: the cart partitioner, the
//! order tagger and (indirectly, through the stock-vs-threshold comparison)
//! the price resolver all route through it, so the shopper never sees price,
//! stock and shipping disagree about where an item ships from.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentSource {
    Local,
    Remote,
    Backorder,
}

impl FulfillmentSource {
    /// Human-readable label persisted alongside the decision.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "Local Warehouse",
            Self::Remote => "Turn14 Drop-Ship",
            Self::Backorder => "Backorder",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Backorder => "backorder",
        }
    }
}

/// Decides the fulfillment source for one line.
///
/// Local wins when local stock both clears the threshold and covers the
/// requested quantity; otherwise the supplier wins if it can cover the
/// quantity; otherwise the line is a backorder. Backorder is not a hard stop,
/// checkout proceeds and downstream fulfillment deals with it.
///
/// Inputs are already-normalized non-negative integers; there is no error
/// path here.
pub fn decide(local_stock: u32, remote_stock: u32, threshold: u32, quantity: u32) -> FulfillmentSource {
    if local_stock > threshold && local_stock >= quantity {
        FulfillmentSource::Local
    } else if remote_stock >= quantity {
        FulfillmentSource::Remote
    } else {
        FulfillmentSource::Backorder
    }
}
