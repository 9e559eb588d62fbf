//! Cross-version comparison of cost, latency, and token totals.
//!
//! Produces a table-shaped report; formatting is left to the caller.

use crate::models::VersionTotals;
use serde::{Deserialize, Serialize};

/// Metrics compared between versions, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cost,
    Latency,
    InputTokens,
    OutputTokens,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Cost,
        Metric::Latency,
        Metric::InputTokens,
        Metric::OutputTokens,
    ];

    /// Display label.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Cost => "Total Cost",
            Metric::Latency => "Avg Latency (s)",
            Metric::InputTokens => "Input Tokens",
            Metric::OutputTokens => "Output Tokens",
        }
    }

    fn value(&self, totals: &VersionTotals) -> f64 {
        match self {
            Metric::Cost => totals.total_cost,
            Metric::Latency => totals.avg_latency,
            Metric::InputTokens => totals.total_input_tokens as f64,
            Metric::OutputTokens => totals.total_output_tokens as f64,
        }
    }
}

/// Relative change from the previous value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PercentChange {
    /// `(current - previous) / previous * 100`
    Percent(f64),
    /// No previous data to compare against
    NotApplicable,
}

impl PercentChange {
    /// Change from `previous` to `current`; not applicable when `previous` is 0.
    pub fn between(previous: f64, current: f64) -> Self {
        if previous == 0.0 {
            PercentChange::NotApplicable
        } else {
            PercentChange::Percent((current - previous) / previous * 100.0)
        }
    }

    pub fn percent(&self) -> Option<f64> {
        match self {
            PercentChange::Percent(p) => Some(*p),
            PercentChange::NotApplicable => None,
        }
    }
}

/// One line of a comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub metric: Metric,
    pub previous: f64,
    pub current: f64,
    pub change: PercentChange,
}

/// Comparison of two versions, one row per [`Metric`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonReport {
    /// Row for `metric`.
    pub fn row(&self, metric: Metric) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.metric == metric)
    }

    /// True when the previous version has both a cost and a latency to compare against.
    pub fn has_baseline(&self) -> bool {
        let positive = |m| self.row(m).is_some_and(|r| r.previous > 0.0);
        positive(Metric::Cost) && positive(Metric::Latency)
    }
}

/// Compare `current` against `previous`.
pub fn compare(previous: &VersionTotals, current: &VersionTotals) -> ComparisonReport {
    let rows = Metric::ALL
        .iter()
        .map(|&metric| {
            let prev = metric.value(previous);
            let curr = metric.value(current);
            ComparisonRow {
                metric,
                previous: prev,
                current: curr,
                change: PercentChange::between(prev, curr),
            }
        })
        .collect();

    ComparisonReport { rows }
}
