//! Usage extraction from provider responses and trace observations.
//!
//! Supports several JSON shapes:
//! - Bedrock Converse: `inputTokens`, `outputTokens`, `cacheWriteInputTokens`, `cacheReadInputTokens`
//! - Bedrock InvokeModel (Anthropic): `input_tokens`, `cache_creation_input_tokens`, TTL split under `cache_creation`
//! - Agent SDK metrics: usage under `metrics.accumulated_usage`
//! - Trace observations: `input`/`promptTokens`, `cacheRead`/`cacheWrite`, OTEL `gen_ai.usage.*` attributes

use crate::error::Result;
use crate::models::UsageRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{debug, trace};

const INPUT_KEYS: &[&str] = &[
    "inputTokens",
    "input_tokens",
    "input",
    "promptTokens",
    "prompt_tokens",
];
const OUTPUT_KEYS: &[&str] = &[
    "outputTokens",
    "output_tokens",
    "output",
    "completionTokens",
    "completion_tokens",
];
const CACHE_WRITE_KEYS: &[&str] = &[
    "cacheWriteInputTokens",
    "cache_creation_input_tokens",
    "cacheCreationInputTokens",
    "cacheWrite",
];
const CACHE_READ_KEYS: &[&str] = &["cacheReadInputTokens", "cache_read_input_tokens", "cacheRead"];

const OTEL_CACHE_READ_KEYS: &[&str] = &["gen_ai.usage.cache_read_input_tokens"];
const OTEL_CACHE_WRITE_KEYS: &[&str] = &[
    "gen_ai.usage.cache_creation_input_tokens",
    "gen_ai.usage.cache_write_input_tokens",
];

/// Cache writes split by TTL tier (InvokeModel responses only).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheTtlWrites {
    pub ttl_5m_write: i64,
    pub ttl_1h_write: i64,
}

/// Totals over the generation observations of one trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceTotals {
    /// Number of GENERATION observations counted
    pub generations: usize,
    pub usage: UsageRecord,
    /// Sum of backend-calculated costs
    pub cost_usd: f64,
}

/// One usage line read from a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedUsage {
    pub usage: UsageRecord,
    pub latency_secs: Option<f64>,
    pub model: Option<String>,
}

/// Lenient token count conversion.
///
/// Accepts integers, floats (truncated), numeric strings, OTEL-style
/// `{"intValue": N}` objects, and that object serialized into a string.
/// Anything else counts as 0.
pub fn token_count(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => {
            let s = s.trim();
            if s.starts_with('{')
                && let Ok(parsed) = serde_json::from_str::<Value>(s)
                && parsed.is_object()
            {
                return token_count(&parsed);
            }
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0)
        }
        Value::Object(map) => map.get("intValue").map(token_count).unwrap_or(0),
        _ => 0,
    }
}

/// First non-zero count among `keys`.
fn first_count(obj: &Value, keys: &[&str]) -> i64 {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .map(token_count)
        .find(|&n| n != 0)
        .unwrap_or(0)
}

/// Locate the usage object inside a response envelope, or treat `value` as usage itself.
fn usage_object(value: &Value) -> &Value {
    if let Some(usage) = value.get("usage").filter(|u| u.is_object()) {
        return usage;
    }
    if let Some(metrics) = value.get("metrics") {
        for key in ["accumulated_usage", "accumulatedUsage"] {
            if let Some(usage) = metrics.get(key).filter(|u| u.is_object()) {
                return usage;
            }
        }
    }
    value
}

/// Normalize a usage object (or a response carrying one) into a [`UsageRecord`].
pub fn extract_usage(value: &Value) -> UsageRecord {
    let usage = usage_object(value);
    UsageRecord {
        input_tokens: first_count(usage, INPUT_KEYS),
        output_tokens: first_count(usage, OUTPUT_KEYS),
        cache_write_tokens: first_count(usage, CACHE_WRITE_KEYS),
        cache_read_tokens: first_count(usage, CACHE_READ_KEYS),
    }
}

/// Cache writes by TTL from `usage.cache_creation`.
pub fn extract_cache_ttl(value: &Value) -> CacheTtlWrites {
    let Some(creation) = usage_object(value).get("cache_creation") else {
        return CacheTtlWrites::default();
    };
    CacheTtlWrites {
        ttl_5m_write: first_count(creation, &["ephemeral_5m_input_tokens"]),
        ttl_1h_write: first_count(creation, &["ephemeral_1h_input_tokens"]),
    }
}

/// Request latency in seconds, if the response carries one.
pub fn extract_latency_secs(value: &Value) -> Option<f64> {
    for key in ["latency_seconds", "latency"] {
        if let Some(secs) = value.get(key).and_then(Value::as_f64) {
            return Some(secs);
        }
    }
    if let Some(ms) = value.get("latency_ms").and_then(Value::as_f64) {
        return Some(ms / 1000.0);
    }
    value
        .get("metrics")
        .and_then(|m| m.get("latencyMs").or_else(|| m.get("latency_ms")))
        .and_then(Value::as_f64)
        .map(|ms| ms / 1000.0)
}

/// Sum usage and cost over the GENERATION observations of a trace.
///
/// Span observations repeat their children's usage and are skipped.
pub fn sum_generations(observations: &[Value]) -> TraceTotals {
    let mut totals = TraceTotals::default();

    for obs in observations {
        if obs.get("type").and_then(Value::as_str) != Some("GENERATION") {
            continue;
        }

        let mut usage = obs.get("usage").map(extract_usage).unwrap_or_default();

        if let Some(attrs) = obs.get("metadata").and_then(|m| m.get("attributes")) {
            if usage.cache_read_tokens == 0 {
                usage.cache_read_tokens = first_count(attrs, OTEL_CACHE_READ_KEYS);
            }
            if usage.cache_write_tokens == 0 {
                usage.cache_write_tokens = first_count(attrs, OTEL_CACHE_WRITE_KEYS);
            }
        }

        let cost = ["calculatedTotalCost", "calculated_total_cost"]
            .iter()
            .filter_map(|k| obs.get(*k).and_then(Value::as_f64))
            .find(|c| *c != 0.0)
            .unwrap_or(0.0);

        totals.generations += 1;
        totals.usage += usage;
        totals.cost_usd += cost;
    }

    debug!(
        generations = totals.generations,
        total_tokens = totals.usage.total_tokens(),
        "Summed trace generations"
    );
    totals
}

/// Reader for JSON-lines files of responses or usage objects.
#[derive(Debug, Default)]
pub struct UsageParser {
    skip_empty: bool,
}

impl UsageParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop lines whose usage is all zero.
    pub fn skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
        self
    }

    /// Parse one JSON line. `Ok(None)` when the line holds no usage to keep.
    pub fn parse_line(&self, line: &str) -> Result<Option<ParsedUsage>> {
        let value: Value = serde_json::from_str(line)?;
        let usage = extract_usage(&value);

        if self.skip_empty && usage.is_empty() {
            return Ok(None);
        }

        let model = value
            .get("model")
            .or_else(|| value.get("model_id"))
            .or_else(|| value.get("modelId"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Some(ParsedUsage {
            usage,
            latency_secs: extract_latency_secs(&value),
            model,
        }))
    }

    /// Parse a JSON-lines file, skipping blank, non-JSON, and malformed lines.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<ParsedUsage>> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut parsed = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line_number = index + 1;
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    trace!(line = line_number, error = %e, "Failed to read line");
                    continue;
                }
            };

            let line = line.trim();
            if !line.starts_with('{') {
                continue;
            }

            match self.parse_line(line) {
                Ok(Some(entry)) => parsed.push(entry),
                Ok(None) => {}
                Err(e) => {
                    trace!(line = line_number, error = %e, "Failed to parse line");
                }
            }
        }

        debug!(file = %path.display(), count = parsed.len(), "Parsed usage file");
        Ok(parsed)
    }
}
