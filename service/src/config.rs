//! Service configuration, loaded from the environment with sane defaults.

use storefront_core::pricing::PricingConfig;
use storefront_core::types::Money;

/// Runtime configuration for the storefront services
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Tax, shipping and threshold knobs for the pricing engine
    pub pricing: PricingConfig,
}

impl ServiceConfig {
    /// Loads configuration from `STOREFRONT_*` environment variables,
    /// falling back to the built-in defaults for anything unset or
    /// unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = PricingConfig::default();
        Self {
            pricing: PricingConfig {
                tax_rate_bps: env_parse("STOREFRONT_TAX_RATE_BPS", defaults.tax_rate_bps),
                free_shipping_threshold: Money::from_cents(env_parse(
                    "STOREFRONT_FREE_SHIPPING_THRESHOLD_CENTS",
                    defaults.free_shipping_threshold.cents(),
                )),
                flat_shipping_fee: Money::from_cents(env_parse(
                    "STOREFRONT_FLAT_SHIPPING_FEE_CENTS",
                    defaults.flat_shipping_fee.cents(),
                )),
            },
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pricing: PricingConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
