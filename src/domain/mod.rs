//! Pure fulfillment core. No I/O, no configuration store, no clock: every
//! function takes what it needs and returns a value.

pub mod cart;
pub mod order;
pub mod policy;
pub mod pricing;
pub mod product;
pub mod shipping;
pub mod value_objects;
