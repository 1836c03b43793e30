//! Order-line fulfillment tagging.
//!
//! At order creation the decision runs again against stock as it is at that
//! moment, not as it was at add-to-cart time; stock can move in between and
//! the order must record the promise actually made. The platform persists
//! the returned metadata on the order line, write-once.

use serde::{Deserialize, Serialize};

use crate::domain::policy::{self, FulfillmentSource};
use crate::domain::product::ProductFulfillment;

/// System of record for the fulfillment promise made to the customer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLineFulfillment {
    pub fulfillment_source: FulfillmentSource,
    pub fulfillment_label: String,
    pub local_stock_at_purchase: u32,
    pub remote_stock_at_purchase: u32,
}

pub fn tag_line(fields: &ProductFulfillment, threshold: u32, quantity: u32) -> OrderLineFulfillment {
    let source = policy::decide(fields.local_stock, fields.remote_stock, threshold, quantity);
    OrderLineFulfillment {
        fulfillment_source: source,
        fulfillment_label: source.label().to_string(),
        local_stock_at_purchase: fields.local_stock,
        remote_stock_at_purchase: fields.remote_stock,
    }
}
