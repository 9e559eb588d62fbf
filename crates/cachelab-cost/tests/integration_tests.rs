//! Integration tests for cachelab-cost with mock usage files.

use cachelab_cost::pricing::{HAIKU_GLOBAL, SONNET_GLOBAL};
use cachelab_cost::{
    CacheRates, CostError, Metric, MetricsSession, MetricsStore, PercentChange, PriceTable,
    RequestMetrics, UsageParser, UsageRecord, aggregate, compare,
};
use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

/// Create a mock usage file.
fn create_usage_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".jsonl").unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Three Converse calls sharing a cached system prompt: one write, two reads.
const CACHED_RUN: &str = r#"# converse responses
{"model":"global.anthropic.claude-sonnet-4-5-20250929-v1:0","latency_ms":3200,"usage":{"inputTokens":25,"outputTokens":310,"cacheWriteInputTokens":1100,"cacheReadInputTokens":0}}
{"model":"global.anthropic.claude-sonnet-4-5-20250929-v1:0","latency_ms":1800,"usage":{"inputTokens":30,"outputTokens":280,"cacheWriteInputTokens":0,"cacheReadInputTokens":1100}}

not json at all
{"model":"global.anthropic.claude-sonnet-4-5-20250929-v1:0","latency_ms":1700,"usage":{"inputTokens":18,"outputTokens":150,"cacheWriteInputTokens":0,"cacheReadInputTokens":1100}}
{"truncated":
"#;

/// The same workload without caching.
const UNCACHED_RUN: &str = r#"{"latency_ms":3400,"usage":{"input_tokens":1125,"output_tokens":310}}
{"latency_ms":3100,"usage":{"input_tokens":1130,"output_tokens":280}}
{"latency_ms":2900,"usage":{"input_tokens":1118,"output_tokens":150}}
"#;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_parse_file_skips_noise() {
    let file = create_usage_file(CACHED_RUN);

    let parsed = UsageParser::new().parse_file(file.path()).unwrap();

    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[0].usage, UsageRecord::new(25, 310).with_cache(1100, 0));
    assert_eq!(parsed[1].latency_secs, Some(1.8));
    assert_eq!(parsed[2].model.as_deref(), Some(SONNET_GLOBAL));
}

#[test]
fn test_parse_missing_file() {
    let dir = tempdir().unwrap();
    let err = UsageParser::new()
        .parse_file(dir.path().join("nope.jsonl"))
        .unwrap_err();
    assert!(matches!(err, CostError::Io(_)));
}

#[test]
fn test_cached_run_savings() {
    let file = create_usage_file(CACHED_RUN);
    let records: Vec<UsageRecord> = UsageParser::new()
        .parse_file(file.path())
        .unwrap()
        .into_iter()
        .map(|p| p.usage)
        .collect();

    let table = PriceTable::bedrock_defaults();
    let rates = CacheRates::from_pricing(table.get(SONNET_GLOBAL).unwrap());
    let result = aggregate(&records, rates);

    assert_eq!(result.total_requests, 3);
    assert_eq!(result.total_input_tokens, 73);
    assert_eq!(result.total_output_tokens, 740);
    assert_eq!(result.total_cache_write_tokens, 1100);
    assert_eq!(result.total_cache_read_tokens, 2200);
    assert_eq!(result.total_tokens, 3373);

    // 73*3 + 1100*3.75 + 2200*0.30 per million
    assert!(approx(result.cost_with_cache, (219.0 + 4125.0 + 660.0) / 1e6));
    assert!(approx(result.cost_without_cache, 3373.0 * 3.0 / 1e6));
    assert!(result.savings > 0.0);
    assert!(approx(result.cache_hit_rate, 2200.0 / 3300.0 * 100.0));
}

#[test]
fn test_per_request_costs_match_aggregate_input_side() {
    let file = create_usage_file(CACHED_RUN);
    let parsed = UsageParser::new().parse_file(file.path()).unwrap();
    let table = PriceTable::bedrock_defaults();

    let output_free: Vec<UsageRecord> = parsed
        .iter()
        .map(|p| UsageRecord { output_tokens: 0, ..p.usage })
        .collect();

    let per_request: f64 = output_free
        .iter()
        .map(|u| table.cost(u, SONNET_GLOBAL).unwrap().total_cost)
        .sum();

    let rates = CacheRates::from_pricing(table.get(SONNET_GLOBAL).unwrap());
    let result = aggregate(&output_free, rates);

    assert!(approx(per_request, result.cost_with_cache));
}

#[test]
fn test_session_store_and_compare_versions() {
    let dir = tempdir().unwrap();
    let store = MetricsStore::new(dir.path().join(".lab_metrics.json"));
    let table = PriceTable::bedrock_defaults();

    let run = |content: &str| {
        let file = create_usage_file(content);
        let mut session = MetricsSession::new();
        let parsed = UsageParser::new().parse_file(file.path()).unwrap();
        for (i, entry) in parsed.into_iter().enumerate() {
            let cost = table.cost(&entry.usage, SONNET_GLOBAL).unwrap().total_cost;
            let mut metrics = RequestMetrics::new(entry.usage, cost);
            if let Some(secs) = entry.latency_secs {
                metrics = metrics.with_latency(secs);
            }
            session.collect(format!("query-{i}"), metrics);
        }
        session.totals()
    };

    store.save("v2", &run(UNCACHED_RUN)).unwrap();
    store.save("v3", &run(CACHED_RUN)).unwrap();

    let previous = store.load("v2").unwrap().unwrap();
    let current = store.load("v3").unwrap().unwrap();
    let report = compare(&previous, &current);

    assert!(report.has_baseline());
    let cost_change = report.row(Metric::Cost).unwrap().change.percent().unwrap();
    assert!(cost_change < 0.0);
    let latency_change = report.row(Metric::Latency).unwrap().change.percent().unwrap();
    assert!(latency_change < 0.0);
    let input = report.row(Metric::InputTokens).unwrap();
    assert_eq!(input.previous, 3373.0);
    assert_eq!(input.current, 73.0);
}

#[test]
fn test_compare_against_missing_version() {
    let dir = tempdir().unwrap();
    let store = MetricsStore::new(dir.path().join(".lab_metrics.json"));

    let previous = store.load("v1").unwrap().unwrap_or_default();
    let mut session = MetricsSession::new();
    session.collect("q", RequestMetrics::new(UsageRecord::new(10, 10), 0.0002).with_latency(1.0));

    let report = compare(&previous, &session.totals());

    assert!(!report.has_baseline());
    assert!(report.rows.iter().all(|r| r.change == PercentChange::NotApplicable));
}

#[test]
fn test_yaml_price_table_file() {
    let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
    write!(
        file,
        "models:\n  sonnet:\n    input: 3.0\n    output: 15.0\n    cache_write: 3.75\n    cache_read: 0.3\n"
    )
    .unwrap();

    let table = PriceTable::from_yaml_file(file.path()).unwrap();
    let cost = table.cost(&UsageRecord::new(1_000_000, 0), "sonnet").unwrap();
    assert!(approx(cost.total_cost, 3.0));

    let err = table.cost(&UsageRecord::default(), HAIKU_GLOBAL).unwrap_err();
    assert!(err.to_string().contains("Available: sonnet"));
}
