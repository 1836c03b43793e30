//! Carrier rate filtering per package type.
//!
//! The platform offers every zone-configured rate to every package; this
//! module keeps only the rates that match the package's fulfillment source.
//! An empty result is returned as-is: the storefront showing "no shipping
//! options" is a zone configuration problem for the admin to fix, not
//! something to paper over with a synthesized rate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::PackageType;

/// A priced shipping option offered by the platform's carrier layer.
/// Rate ids are either a bare method id (`free_shipping`) or an
/// instance-qualified one (`free_shipping:3`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShippingRate {
    pub id: String,
    pub label: String,
    pub cost: Decimal,
}

/// True when `rate_id` is `method` itself or one of its zone instances.
pub fn matches_method(rate_id: &str, method: &str) -> bool {
    let method = method.trim();
    if method.is_empty() {
        return false;
    }
    rate_id == method
        || rate_id
            .strip_prefix(method)
            .is_some_and(|rest| rest.starts_with(':'))
}

/// Keeps the subset of `rates` appropriate to the package type.
///
/// Local packages keep allow-listed methods, minus the remote method id even
/// if a misconfigured allow-list contains it. Remote packages keep only the
/// remote method. Empty or blank configuration retains nothing.
pub fn filter_rates(
    rates: Vec<ShippingRate>,
    package_type: PackageType,
    local_methods: &[String],
    remote_method_id: &str,
) -> Vec<ShippingRate> {
    match package_type {
        PackageType::Local => rates
            .into_iter()
            .filter(|rate| {
                !matches_method(&rate.id, remote_method_id)
                    && local_methods.iter().any(|m| matches_method(&rate.id, m))
            })
            .collect(),
        PackageType::Remote => rates
            .into_iter()
            .filter(|rate| matches_method(&rate.id, remote_method_id))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(id: &str) -> ShippingRate {
        ShippingRate { id: id.to_string(), label: id.to_string(), cost: Decimal::new(500, 2) }
    }

    fn ids(rates: &[ShippingRate]) -> Vec<&str> {
        rates.iter().map(|r| r.id.as_str()).collect()
    }

    fn allowlist() -> Vec<String> {
        vec!["flat_rate".into(), "free_shipping".into()]
    }

    #[test]
    fn instance_qualified_ids_match_their_method() {
        assert!(matches_method("flat_rate", "flat_rate"));
        assert!(matches_method("flat_rate:1", "flat_rate"));
        assert!(!matches_method("flat_rate_express", "flat_rate"));
        assert!(!matches_method("flat_rate", "free_shipping"));
        assert!(!matches_method("anything", ""));
    }

    #[test]
    fn local_package_keeps_only_allowlisted_methods() {
        let rates = vec![rate("flat_rate:1"), rate("turn14_shipping"), rate("local_pickup")];
        let kept = filter_rates(rates, PackageType::Local, &allowlist(), "turn14_shipping");
        assert_eq!(ids(&kept), vec!["flat_rate:1"]);
    }

    #[test]
    fn local_package_drops_remote_method_even_if_allowlisted() {
        let mut methods = allowlist();
        methods.push("turn14_shipping".into());
        let rates = vec![rate("turn14_shipping"), rate("turn14_shipping:2"), rate("flat_rate")];
        let kept = filter_rates(rates, PackageType::Local, &methods, "turn14_shipping");
        assert_eq!(ids(&kept), vec!["flat_rate"]);
    }

    #[test]
    fn remote_package_keeps_only_the_remote_method() {
        let rates = vec![rate("flat_rate:1"), rate("turn14_shipping:3"), rate("free_shipping")];
        let kept = filter_rates(rates, PackageType::Remote, &allowlist(), "turn14_shipping");
        assert_eq!(ids(&kept), vec!["turn14_shipping:3"]);
    }

    #[test]
    fn blank_configuration_retains_nothing() {
        let rates = vec![rate("flat_rate"), rate("turn14_shipping")];
        let kept = filter_rates(rates.clone(), PackageType::Local, &[], "turn14_shipping");
        assert!(kept.is_empty());
        let kept = filter_rates(rates, PackageType::Remote, &allowlist(), "  ");
        assert!(kept.is_empty());
    }

    #[test]
    fn empty_result_is_a_valid_outcome() {
        let rates = vec![rate("turn14_shipping")];
        let kept = filter_rates(rates, PackageType::Local, &allowlist(), "turn14_shipping");
        assert!(kept.is_empty());
    }
}
