//! Turn14 supplier API collaborator.
//!
//! Everything in here fails closed: a transport error, a bad credential or a
//! malformed response means "the supplier has no rates right now", logged and
//! swallowed, never an error that reaches checkout.

pub mod auth;
pub mod client;

pub use client::{ConnectionTest, RateClient, SupplierRate};
