//! Metrics collection for a run and persistence across runs.
//!
//! A [`MetricsSession`] is owned by the caller and passed along explicitly.
//! [`MetricsStore`] keeps one [`VersionTotals`] per version label in a JSON
//! file so a later run can compare against an earlier one.
//!
//! ## Usage
//!
//! ```no_run
//! use cachelab_cost::{MetricsSession, MetricsStore, RequestMetrics, UsageRecord, compare};
//!
//! fn main() -> cachelab_cost::Result<()> {
//!     let mut session = MetricsSession::new();
//!     session.collect("return policy", RequestMetrics::new(UsageRecord::new(1200, 80), 0.0048));
//!
//!     let store = MetricsStore::new(".lab_metrics.json");
//!     store.save("v2", &session.totals())?;
//!
//!     if let Some(previous) = store.load("v1")? {
//!         let report = compare(&previous, &session.totals());
//!         println!("{} rows", report.rows.len());
//!     }
//!     Ok(())
//! }
//! ```

use crate::error::Result;
use crate::models::{UsageRecord, VersionTotals};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default metrics file, relative to the working directory.
pub const DEFAULT_METRICS_FILE: &str = ".lab_metrics.json";

/// Measurements for one completed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMetrics {
    pub usage: UsageRecord,
    pub cost_usd: f64,
    pub latency_secs: Option<f64>,
}

impl RequestMetrics {
    pub fn new(usage: UsageRecord, cost_usd: f64) -> Self {
        Self {
            usage,
            cost_usd,
            latency_secs: None,
        }
    }

    pub fn with_latency(mut self, secs: f64) -> Self {
        self.latency_secs = Some(secs);
        self
    }
}

/// Result of one test request: metrics, or the reason none were obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricOutcome {
    Recorded(RequestMetrics),
    Failed { error: String },
}

/// One named entry in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedMetric {
    pub test_name: String,
    pub outcome: MetricOutcome,
}

impl CollectedMetric {
    pub fn metrics(&self) -> Option<&RequestMetrics> {
        match &self.outcome {
            MetricOutcome::Recorded(m) => Some(m),
            MetricOutcome::Failed { .. } => None,
        }
    }
}

/// Ordered collection of per-request metrics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSession {
    entries: Vec<CollectedMetric>,
}

impl MetricsSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful request.
    pub fn collect(&mut self, test_name: impl Into<String>, metrics: RequestMetrics) {
        self.entries.push(CollectedMetric {
            test_name: test_name.into(),
            outcome: MetricOutcome::Recorded(metrics),
        });
    }

    /// Record a request whose metrics could not be obtained.
    pub fn collect_error(&mut self, test_name: impl Into<String>, error: impl Into<String>) {
        self.entries.push(CollectedMetric {
            test_name: test_name.into(),
            outcome: MetricOutcome::Failed {
                error: error.into(),
            },
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[CollectedMetric] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Successful entries only.
    pub fn recorded(&self) -> impl Iterator<Item = &RequestMetrics> {
        self.entries.iter().filter_map(CollectedMetric::metrics)
    }

    /// Totals over successful entries.
    ///
    /// Missing latencies count as 0 in the average. Failed entries are ignored.
    pub fn totals(&self) -> VersionTotals {
        let recorded: Vec<&RequestMetrics> = self.recorded().collect();
        if recorded.is_empty() {
            return VersionTotals::default();
        }

        let usage: UsageRecord = recorded.iter().map(|m| m.usage).sum();
        let latency_sum: f64 = recorded.iter().map(|m| m.latency_secs.unwrap_or(0.0)).sum();

        VersionTotals {
            total_cost: recorded.iter().map(|m| m.cost_usd).sum(),
            avg_latency: latency_sum / recorded.len() as f64,
            total_input_tokens: usage.input_tokens,
            total_output_tokens: usage.output_tokens,
            total_cache_read_tokens: usage.cache_read_tokens,
            total_cache_write_tokens: usage.cache_write_tokens,
        }
    }
}

/// Saved totals plus when they were written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTotals {
    #[serde(flatten)]
    pub totals: VersionTotals,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// JSON file of version label -> totals.
#[derive(Debug, Clone)]
pub struct MetricsStore {
    path: PathBuf,
}

impl MetricsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, StoredTotals>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Store `totals` under `version`, keeping other versions in the file.
    pub fn save(&self, version: &str, totals: &VersionTotals) -> Result<()> {
        let mut data = self.read_all()?;
        data.insert(
            version.to_string(),
            StoredTotals {
                totals: totals.clone(),
                saved_at: Some(Utc::now()),
            },
        );

        std::fs::write(&self.path, serde_json::to_string_pretty(&data)?)?;
        info!(
            version,
            path = %self.path.display(),
            total_cost = totals.total_cost,
            "Saved metrics"
        );
        Ok(())
    }

    /// Totals saved under `version`, or `None` if the file or version is missing.
    pub fn load(&self, version: &str) -> Result<Option<VersionTotals>> {
        if !self.path.exists() {
            warn!(
                path = %self.path.display(),
                "No saved metrics found; run the previous version first"
            );
            return Ok(None);
        }

        let mut data = self.read_all()?;
        match data.remove(version) {
            Some(stored) => {
                debug!(version, total_cost = stored.totals.total_cost, "Loaded metrics");
                Ok(Some(stored.totals))
            }
            None => {
                let available = if data.is_empty() {
                    "none".to_string()
                } else {
                    data.keys().cloned().collect::<Vec<_>>().join(", ")
                };
                warn!(version, available = %available, "No metrics saved for version");
                Ok(None)
            }
        }
    }

    /// Saved version labels, sorted.
    pub fn versions(&self) -> Result<Vec<String>> {
        Ok(self.read_all()?.into_keys().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_session_totals() {
        let session = MetricsSession::new();
        assert_eq!(session.totals(), VersionTotals::default());
    }

    #[test]
    fn test_totals_skip_errors() {
        let mut session = MetricsSession::new();
        let policy = UsageRecord::new(100, 10).with_cache(0, 2_000);
        let product = UsageRecord::new(300, 30).with_cache(1_000, 0);
        session.collect("policy", RequestMetrics::new(policy, 0.01).with_latency(2.0));
        session.collect_error("timeout", "trace not ingested");
        session.collect("product", RequestMetrics::new(product, 0.03));

        let totals = session.totals();

        assert_eq!(session.len(), 3);
        assert!((totals.total_cost - 0.04).abs() < 1e-12);
        // (2.0 + 0.0) / 2 successful entries
        assert_eq!(totals.avg_latency, 1.0);
        assert_eq!(totals.total_input_tokens, 400);
        assert_eq!(totals.total_output_tokens, 40);
        assert_eq!(totals.total_cache_read_tokens, 2_000);
        assert_eq!(totals.total_cache_write_tokens, 1_000);
    }

    #[test]
    fn test_only_errors_is_zero() {
        let mut session = MetricsSession::new();
        session.collect_error("a", "boom");
        assert_eq!(session.totals(), VersionTotals::default());
        assert_eq!(session.recorded().count(), 0);
    }

    #[test]
    fn test_clear() {
        let mut session = MetricsSession::new();
        session.collect("a", RequestMetrics::new(UsageRecord::new(1, 1), 0.0));
        session.clear();
        assert!(session.is_empty());
    }

    #[test]
    fn test_store_round_trip_keeps_other_versions() {
        let dir = tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("metrics.json"));

        let v1 = VersionTotals {
            total_cost: 0.12,
            avg_latency: 4.2,
            total_input_tokens: 20_000,
            total_output_tokens: 1_500,
            ..Default::default()
        };
        let v2 = VersionTotals {
            total_cost: 0.05,
            total_cache_read_tokens: 9_000,
            ..Default::default()
        };

        store.save("v1", &v1).unwrap();
        store.save("v2", &v2).unwrap();

        assert_eq!(store.load("v1").unwrap(), Some(v1));
        assert_eq!(store.load("v2").unwrap(), Some(v2));
        assert_eq!(store.versions().unwrap(), vec!["v1".to_string(), "v2".to_string()]);
    }

    #[test]
    fn test_load_missing() {
        let dir = tempdir().unwrap();
        let store = MetricsStore::new(dir.path().join("absent.json"));

        assert_eq!(store.load("v1").unwrap(), None);
        assert!(store.versions().unwrap().is_empty());

        store.save("v1", &VersionTotals::default()).unwrap();
        assert_eq!(store.load("v9").unwrap(), None);
    }

    #[test]
    fn test_reads_file_without_timestamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.json");
        std::fs::write(
            &path,
            r#"{"v1": {"total_cost": 0.5, "avg_latency": 3.1, "total_input_tokens": 10,
                "total_output_tokens": 2, "total_cache_read_tokens": 0, "total_cache_write_tokens": 0}}"#,
        )
        .unwrap();

        let loaded = MetricsStore::new(&path).load("v1").unwrap().unwrap();
        assert_eq!(loaded.total_cost, 0.5);
        assert_eq!(loaded.avg_latency, 3.1);
    }
}
