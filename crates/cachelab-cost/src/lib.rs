//! # cachelab-cost
//!
//! Token cost and prompt-cache savings for Bedrock-hosted Claude models.
//!
//! This crate provides:
//! - [`PriceTable`] - Per-model rates and per-request [`CostBreakdown`]s
//! - [`aggregate`] - Cache hit rate and savings over a batch of [`UsageRecord`]s
//! - [`compare`] - Percent change between two versions' totals
//! - [`parser`] - Normalizing usage from Converse, InvokeModel, and trace JSON
//! - [`MetricsSession`] / [`MetricsStore`] - Per-run collection and cross-run persistence
//! - [`quota`] and [`routing`] - TPM quota math and keyword model routing
//!
//! The calculation functions are pure: no I/O and no shared state.
//!
//! ## Example
//!
//! ```
//! use cachelab_cost::{CacheRates, PriceTable, UsageRecord, aggregate, pricing::SONNET_GLOBAL};
//!
//! fn main() -> cachelab_cost::Result<()> {
//!     let table = PriceTable::bedrock_defaults();
//!     let first = UsageRecord::new(50, 300).with_cache(2_000, 0);
//!     let second = UsageRecord::new(40, 250).with_cache(0, 2_000);
//!
//!     let cost = table.cost(&first, SONNET_GLOBAL)?;
//!     println!("First request: ${:.6}", cost.total_cost);
//!
//!     let rates = CacheRates::from_pricing(table.get(SONNET_GLOBAL)?);
//!     let summary = aggregate(&[first, second], rates);
//!     assert_eq!(summary.cache_hit_rate, 50.0);
//!
//!     Ok(())
//! }
//! ```

pub mod compare;
pub mod error;
pub mod models;
pub mod parser;
pub mod pricing;
pub mod quota;
pub mod routing;
pub mod savings;
pub mod session;

// Re-export main types
pub use compare::{ComparisonReport, ComparisonRow, Metric, PercentChange, compare};
pub use error::{CostError, Result};
pub use models::{
    AggregateResult, CostBreakdown, CostProjection, OptimizationComparison, UsageRecord,
    VersionTotals,
};
pub use parser::UsageParser;
pub use pricing::{ModelPricing, PriceTable};
pub use routing::{ModelRoute, QueryComplexity, classify_query};
pub use savings::{CacheRates, aggregate};
pub use session::{MetricsSession, MetricsStore, RequestMetrics};
