//! Model price tables and per-request cost calculation.
//!
//! Rates are USD per million tokens, one rate per token category. The
//! calculator applies whatever rates are configured; it never assumes that
//! cache writes cost more than input or that cache reads cost less.

use crate::error::{CostError, Result};
use crate::models::{
    CostBreakdown, CostProjection, OptimizationComparison, TOKENS_PER_MILLION, UsageRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Claude Sonnet 4.5, global cross-region inference profile.
pub const SONNET_GLOBAL: &str = "global.anthropic.claude-sonnet-4-5-20250929-v1:0";
/// Claude Haiku 4.5, global cross-region inference profile.
pub const HAIKU_GLOBAL: &str = "global.anthropic.claude-haiku-4-5-20251001-v1:0";
/// Claude Sonnet 4.5, US cross-region inference profile.
pub const SONNET_US: &str = "us.anthropic.claude-sonnet-4-5-20250929-v1:0";
/// Claude Haiku 4.5, US cross-region inference profile.
pub const HAIKU_US: &str = "us.anthropic.claude-haiku-4-5-20251001-v1:0";

/// Per-million-token rates for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Human-readable model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

impl ModelPricing {
    /// Create rates with Bedrock's 5-minute cache economics
    /// (writes at 1.25x input, reads at 0.1x input).
    pub fn new(input: f64, output: f64) -> Self {
        Self {
            name: None,
            input,
            output,
            cache_write: input * 1.25,
            cache_read: input * 0.1,
        }
    }

    pub fn with_cache(mut self, write: f64, read: f64) -> Self {
        self.cache_write = write;
        self.cache_read = read;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Cost of a usage record at these rates.
    pub fn breakdown(&self, model: &str, usage: &UsageRecord) -> CostBreakdown {
        let input_cost = usage.input_tokens as f64 / TOKENS_PER_MILLION * self.input;
        let output_cost = usage.output_tokens as f64 / TOKENS_PER_MILLION * self.output;
        let cache_write_cost =
            usage.cache_write_tokens as f64 / TOKENS_PER_MILLION * self.cache_write;
        let cache_read_cost = usage.cache_read_tokens as f64 / TOKENS_PER_MILLION * self.cache_read;

        CostBreakdown {
            model: model.to_string(),
            input_cost,
            output_cost,
            cache_write_cost,
            cache_read_cost,
            total_cost: input_cost + output_cost + cache_write_cost + cache_read_cost,
        }
    }

    fn validate(&self, model: &str) -> Result<()> {
        let rates = [
            ("input", self.input),
            ("output", self.output),
            ("cache_write", self.cache_write),
            ("cache_read", self.cache_read),
        ];
        for (label, rate) in rates {
            if !rate.is_finite() || rate < 0.0 {
                return Err(CostError::Config(format!(
                    "model {model}: {label} rate must be a non-negative number, got {rate}"
                )));
            }
        }
        Ok(())
    }
}

/// On-disk shape of a price table file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PriceTableFile {
    models: BTreeMap<String, ModelPricing>,
}

/// Price table keyed by model id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    models: BTreeMap<String, ModelPricing>,
}

impl PriceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bedrock on-demand rates for the Claude 4.5 models (January 2026).
    ///
    /// Cache rates are the 5-minute TTL tier.
    pub fn bedrock_defaults() -> Self {
        let sonnet = ModelPricing::new(3.00, 15.00)
            .with_cache(3.75, 0.30)
            .with_name("Claude Sonnet 4.5");
        let haiku = ModelPricing::new(1.00, 5.00)
            .with_cache(1.25, 0.10)
            .with_name("Claude Haiku 4.5");

        let mut table = Self::new();
        table.insert(SONNET_GLOBAL, sonnet.clone());
        table.insert(SONNET_US, sonnet);
        table.insert(HAIKU_GLOBAL, haiku.clone());
        table.insert(HAIKU_US, haiku);
        table
    }

    /// Parse a YAML document of the form
    /// `models: { <id>: { input, output, cache_write, cache_read } }`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let file: PriceTableFile = serde_yaml::from_str(yaml)?;
        for (model, pricing) in &file.models {
            pricing.validate(model)?;
        }
        Ok(Self { models: file.models })
    }

    /// Load a YAML price table from disk.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_yaml_str(&content)?;
        info!(path = %path.display(), models = table.len(), "Loaded price table");
        Ok(table)
    }

    /// Add or replace a model's rates.
    pub fn insert(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        self.models.insert(model.into(), pricing);
    }

    /// Look up a model's rates.
    pub fn get(&self, model: &str) -> Result<&ModelPricing> {
        self.models.get(model).ok_or_else(|| CostError::UnknownModel {
            model: model.to_string(),
            available: self.model_ids(),
        })
    }

    /// Configured model ids, sorted.
    pub fn model_ids(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    /// Iterate over `(model id, rates)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModelPricing)> {
        self.models.iter().map(|(id, p)| (id.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Cost of one request for `model`.
    ///
    /// Fails with [`CostError::UnknownModel`] when the model is not configured.
    pub fn cost(&self, usage: &UsageRecord, model: &str) -> Result<CostBreakdown> {
        let pricing = self.get(model)?;
        let breakdown = pricing.breakdown(model, usage);
        debug!(model, total_cost = breakdown.total_cost, "Computed request cost");
        Ok(breakdown)
    }

    /// Cost of `num_requests` requests shaped like `per_request`.
    ///
    /// Input and output tokens are per request and get multiplied. Cache
    /// write/read tokens are totals for the whole run.
    pub fn project(
        &self,
        model: &str,
        per_request: &UsageRecord,
        num_requests: i64,
    ) -> Result<CostProjection> {
        let pricing = self.get(model)?;
        let scale = |tokens: i64| {
            tokens.checked_mul(num_requests).ok_or_else(|| {
                CostError::Config(format!(
                    "token count overflow: {tokens} tokens x {num_requests} requests"
                ))
            })
        };
        let run_usage = UsageRecord {
            input_tokens: scale(per_request.input_tokens)?,
            output_tokens: scale(per_request.output_tokens)?,
            cache_write_tokens: per_request.cache_write_tokens,
            cache_read_tokens: per_request.cache_read_tokens,
        };

        Ok(CostProjection {
            model_name: pricing.name.clone().unwrap_or_else(|| model.to_string()),
            num_requests,
            total_input_tokens: run_usage.input_tokens,
            total_output_tokens: run_usage.output_tokens,
            breakdown: pricing.breakdown(model, &run_usage),
        })
    }

    /// Compare an original prompt against an optimized one over the same workload.
    pub fn compare_optimization(
        &self,
        model: &str,
        original_input_tokens: i64,
        optimized_input_tokens: i64,
        output_tokens: i64,
        num_requests: i64,
    ) -> Result<OptimizationComparison> {
        let original_usage = UsageRecord::new(original_input_tokens, output_tokens);
        let optimized_usage = UsageRecord::new(optimized_input_tokens, output_tokens);
        let original = self.project(model, &original_usage, num_requests)?;
        let optimized = self.project(model, &optimized_usage, num_requests)?;

        let original_cost = original.breakdown.total_cost;
        let savings = original_cost - optimized.breakdown.total_cost;
        let savings_pct = if original_cost > 0.0 {
            savings / original_cost * 100.0
        } else {
            0.0
        };

        Ok(OptimizationComparison {
            original,
            optimized,
            savings,
            savings_pct,
        })
    }
}
