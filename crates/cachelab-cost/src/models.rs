//! Data models for cost and cache accounting.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Tokens per pricing unit (all rates are quoted per million tokens).
pub const TOKENS_PER_MILLION: f64 = 1_000_000.0;

/// Token accounting for a single request, as reported by the provider.
///
/// Counts are expected to be non-negative but are not validated here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Input tokens billed at the full input price (not served from cache)
    #[serde(default)]
    pub input_tokens: i64,

    /// Tokens generated by the model
    #[serde(default)]
    pub output_tokens: i64,

    /// Tokens newly written to the prompt cache
    #[serde(default)]
    pub cache_write_tokens: i64,

    /// Tokens served from an existing cache entry
    #[serde(default)]
    pub cache_read_tokens: i64,
}

impl UsageRecord {
    /// Create a record without cache activity.
    pub fn new(input_tokens: i64, output_tokens: i64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            cache_write_tokens: 0,
            cache_read_tokens: 0,
        }
    }

    /// Set cache tokens.
    pub fn with_cache(mut self, write: i64, read: i64) -> Self {
        self.cache_write_tokens = write;
        self.cache_read_tokens = read;
        self
    }

    /// Total tokens (input + output + cache).
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens + self.cache_write_tokens + self.cache_read_tokens
    }

    /// True when every counter is zero.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for UsageRecord {
    type Output = UsageRecord;

    fn add(mut self, rhs: UsageRecord) -> UsageRecord {
        self += rhs;
        self
    }
}

impl AddAssign for UsageRecord {
    fn add_assign(&mut self, rhs: UsageRecord) {
        self.input_tokens += rhs.input_tokens;
        self.output_tokens += rhs.output_tokens;
        self.cache_write_tokens += rhs.cache_write_tokens;
        self.cache_read_tokens += rhs.cache_read_tokens;
    }
}

impl std::iter::Sum for UsageRecord {
    fn sum<I: Iterator<Item = UsageRecord>>(iter: I) -> Self {
        iter.fold(UsageRecord::default(), Add::add)
    }
}

/// Dollar cost of one request, split by token category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Model id the rates were taken from
    pub model: String,

    /// Cost of uncached input tokens
    pub input_cost: f64,

    /// Cost of output tokens
    pub output_cost: f64,

    /// Cost of cache write tokens
    pub cache_write_cost: f64,

    /// Cost of cache read tokens
    pub cache_read_cost: f64,

    /// Sum of the four components
    pub total_cost: f64,
}

impl CostBreakdown {
    /// Sum of the component costs.
    pub fn component_sum(&self) -> f64 {
        self.input_cost + self.output_cost + self.cache_write_cost + self.cache_read_cost
    }
}

/// Cost of running the same request shape many times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostProjection {
    /// Display name of the model, falling back to its id
    pub model_name: String,

    /// Number of requests projected
    pub num_requests: i64,

    /// Input tokens across all requests
    pub total_input_tokens: i64,

    /// Output tokens across all requests
    pub total_output_tokens: i64,

    /// Cost breakdown for the whole run
    pub breakdown: CostBreakdown,
}

/// Original vs. optimized prompt cost for the same workload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationComparison {
    /// Projection with the original prompt
    pub original: CostProjection,

    /// Projection with the optimized prompt
    pub optimized: CostProjection,

    /// Dollars saved by the optimized prompt
    pub savings: f64,

    /// Savings as a percentage of the original cost (0 when that cost is 0)
    pub savings_pct: f64,
}

/// Summary of cache economics over a set of requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Number of records aggregated
    pub total_requests: usize,

    /// Uncached input tokens
    pub total_input_tokens: i64,

    /// Output tokens
    pub total_output_tokens: i64,

    /// Cache write tokens
    pub total_cache_write_tokens: i64,

    /// Cache read tokens
    pub total_cache_read_tokens: i64,

    /// Input + cache write + cache read tokens
    pub total_tokens: i64,

    /// Input-side cost with cache write/read tiers applied
    pub cost_with_cache: f64,

    /// Input-side cost if every token were billed at the base input price
    pub cost_without_cache: f64,

    /// `cost_without_cache - cost_with_cache`
    pub savings: f64,

    /// Savings as a percentage of `cost_without_cache`
    pub savings_pct: f64,

    /// Cache reads as a percentage of cache reads + writes
    pub cache_hit_rate: f64,
}

/// Totals for one workshop version, as persisted and compared across runs.
///
/// Field names match the on-disk metrics file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionTotals {
    /// Total cost in USD
    #[serde(default)]
    pub total_cost: f64,

    /// Average latency in seconds
    #[serde(default)]
    pub avg_latency: f64,

    /// Total input tokens
    #[serde(default)]
    pub total_input_tokens: i64,

    /// Total output tokens
    #[serde(default)]
    pub total_output_tokens: i64,

    /// Total cache read tokens
    #[serde(default)]
    pub total_cache_read_tokens: i64,

    /// Total cache write tokens
    #[serde(default)]
    pub total_cache_write_tokens: i64,
}

impl From<&AggregateResult> for VersionTotals {
    fn from(result: &AggregateResult) -> Self {
        Self {
            total_cost: result.cost_with_cache,
            avg_latency: 0.0,
            total_input_tokens: result.total_input_tokens,
            total_output_tokens: result.total_output_tokens,
            total_cache_read_tokens: result.total_cache_read_tokens,
            total_cache_write_tokens: result.total_cache_write_tokens,
        }
    }
}
