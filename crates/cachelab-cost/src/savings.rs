//! Prompt-cache savings across a batch of requests.
//!
//! Cached tokens are compared with a counterfactual in which every input-side
//! token (uncached input, cache writes, and cache reads) is billed at the
//! base input price, since that content would otherwise have been resent as
//! ordinary input. Output tokens are counted but not priced here.

use crate::models::{AggregateResult, TOKENS_PER_MILLION, UsageRecord};
use crate::pricing::ModelPricing;
use serde::{Deserialize, Serialize};

/// Cache write premium for the 5-minute TTL tier.
pub const DEFAULT_CACHE_WRITE_MULTIPLIER: f64 = 1.25;

/// Cache read discount for the 5-minute TTL tier.
pub const DEFAULT_CACHE_READ_MULTIPLIER: f64 = 0.1;

/// Base input price plus cache tier multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheRates {
    /// Base price per million input tokens (USD)
    pub price_per_million_input: f64,
    /// Cache write price as a multiple of the base price
    pub cache_write_multiplier: f64,
    /// Cache read price as a multiple of the base price
    pub cache_read_multiplier: f64,
}

impl CacheRates {
    /// Rates at `price_per_million_input` with the default 5-minute multipliers.
    pub fn new(price_per_million_input: f64) -> Self {
        Self {
            price_per_million_input,
            cache_write_multiplier: DEFAULT_CACHE_WRITE_MULTIPLIER,
            cache_read_multiplier: DEFAULT_CACHE_READ_MULTIPLIER,
        }
    }

    pub fn with_multipliers(mut self, write: f64, read: f64) -> Self {
        self.cache_write_multiplier = write;
        self.cache_read_multiplier = read;
        self
    }

    /// Derive rates from a model's price table entry.
    ///
    /// Falls back to the default multipliers when the input price is zero.
    pub fn from_pricing(pricing: &ModelPricing) -> Self {
        let rates = Self::new(pricing.input);
        if pricing.input == 0.0 {
            return rates;
        }
        rates.with_multipliers(
            pricing.cache_write / pricing.input,
            pricing.cache_read / pricing.input,
        )
    }
}

impl Default for CacheRates {
    /// Claude Sonnet base input price.
    fn default() -> Self {
        Self::new(3.0)
    }
}

/// Aggregate token counts and cache savings over `records`.
///
/// Pure and deterministic. Empty input yields an all-zero result; both
/// percentages are defined as 0 when their denominator is 0.
pub fn aggregate(records: &[UsageRecord], rates: CacheRates) -> AggregateResult {
    let totals: UsageRecord = records.iter().copied().sum();

    let price = rates.price_per_million_input;
    let input = totals.input_tokens as f64;
    let write = totals.cache_write_tokens as f64;
    let read = totals.cache_read_tokens as f64;

    let cost_with_cache = (input * price
        + write * price * rates.cache_write_multiplier
        + read * price * rates.cache_read_multiplier)
        / TOKENS_PER_MILLION;

    let total_tokens = totals.input_tokens + totals.cache_write_tokens + totals.cache_read_tokens;
    let cost_without_cache = total_tokens as f64 * price / TOKENS_PER_MILLION;

    let savings = cost_without_cache - cost_with_cache;
    let savings_pct = if cost_without_cache == 0.0 {
        0.0
    } else {
        savings / cost_without_cache * 100.0
    };

    let cacheable = totals.cache_read_tokens + totals.cache_write_tokens;
    let cache_hit_rate = if cacheable == 0 {
        0.0
    } else {
        read / cacheable as f64 * 100.0
    };

    AggregateResult {
        total_requests: records.len(),
        total_input_tokens: totals.input_tokens,
        total_output_tokens: totals.output_tokens,
        total_cache_write_tokens: totals.cache_write_tokens,
        total_cache_read_tokens: totals.cache_read_tokens,
        total_tokens,
        cost_with_cache,
        cost_without_cache,
        savings,
        savings_pct,
        cache_hit_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_input_is_zero() {
        let result = aggregate(&[], CacheRates::default());

        assert_eq!(result.total_requests, 0);
        assert_eq!(result.total_tokens, 0);
        assert_eq!(result.cost_with_cache, 0.0);
        assert_eq!(result.cost_without_cache, 0.0);
        assert_eq!(result.savings, 0.0);
        assert_eq!(result.savings_pct, 0.0);
        assert_eq!(result.cache_hit_rate, 0.0);
    }

    #[test]
    fn test_all_zero_record() {
        let result = aggregate(&[UsageRecord::default()], CacheRates::default());
        assert_eq!(result.total_requests, 1);
        assert_eq!(result.savings_pct, 0.0);
        assert_eq!(result.cache_hit_rate, 0.0);
    }

    #[test]
    fn test_write_then_read_scenario() {
        let records = [
            UsageRecord::new(0, 0).with_cache(1_000_000, 0),
            UsageRecord::new(0, 0).with_cache(0, 1_000_000),
        ];

        let result = aggregate(&records, CacheRates::new(3.00));

        assert!(approx(result.cost_with_cache, 4.05));
        assert!(approx(result.cost_without_cache, 6.00));
        assert!(approx(result.savings, 1.95));
        assert!(approx(result.savings_pct, 32.5));
        assert!(approx(result.cache_hit_rate, 50.0));
        assert_eq!(result.total_requests, 2);
        assert_eq!(result.total_tokens, 2_000_000);
    }

    #[test]
    fn test_no_cache_activity_means_no_divergence() {
        let records = [
            UsageRecord::new(1_200, 300),
            UsageRecord::new(57, 9_000),
            UsageRecord::new(0, 10),
        ];

        let result = aggregate(&records, CacheRates::new(3.0).with_multipliers(2.0, 0.5));

        assert_eq!(result.cost_with_cache, result.cost_without_cache);
        assert_eq!(result.savings, 0.0);
        assert_eq!(result.cache_hit_rate, 0.0);
        assert_eq!(result.total_output_tokens, 9_310);
    }

    #[test]
    fn test_hit_rate_bounds() {
        let cases = [
            (0, 5_000),
            (5_000, 0),
            (1, 1_000_000),
            (1_000_000, 1),
            (2_048, 2_048),
        ];

        for (write, read) in cases {
            let records = [UsageRecord::new(100, 10).with_cache(write, read)];
            let result = aggregate(&records, CacheRates::default());
            assert!((0.0..=100.0).contains(&result.cache_hit_rate));
        }
    }

    #[test]
    fn test_custom_multipliers() {
        // 1-hour TTL tier: writes at 2x base.
        let records = [UsageRecord::new(0, 0).with_cache(1_000_000, 0)];
        let result = aggregate(&records, CacheRates::new(1.0).with_multipliers(2.0, 0.1));

        assert!(approx(result.cost_with_cache, 2.0));
        assert!(approx(result.savings, -1.0));
        assert!(approx(result.savings_pct, -100.0));
    }

    #[test]
    fn test_negative_counts_propagate() {
        let records = [UsageRecord::new(-1_000_000, 0)];
        let result = aggregate(&records, CacheRates::new(3.0));

        assert!(approx(result.cost_with_cache, -3.0));
        assert!(approx(result.cost_without_cache, -3.0));
        assert_eq!(result.savings_pct, 0.0);
    }

    #[test]
    fn test_rates_from_pricing() {
        let pricing = ModelPricing::new(3.0, 15.0).with_cache(3.75, 0.30);
        let rates = CacheRates::from_pricing(&pricing);

        assert_eq!(rates.price_per_million_input, 3.0);
        assert!(approx(rates.cache_write_multiplier, 1.25));
        assert!(approx(rates.cache_read_multiplier, 0.1));
    }

    #[test]
    fn test_rates_from_free_model() {
        let pricing = ModelPricing::new(0.0, 0.0).with_cache(0.0, 0.0);
        let rates = CacheRates::from_pricing(&pricing);
        assert_eq!(rates.cache_write_multiplier, DEFAULT_CACHE_WRITE_MULTIPLIER);
    }
}
