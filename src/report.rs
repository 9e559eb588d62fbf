//! Text rendering for calculator results.

use cachelab_cost::quota::TpmUsage;
use cachelab_cost::session::MetricOutcome;
use cachelab_cost::{
    AggregateResult, ComparisonReport, CostProjection, Metric, MetricsSession,
    OptimizationComparison, PercentChange, PriceTable,
};
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};

/// `$x.xxxx`, or six decimals below one cent.
pub fn format_cost(cost: f64) -> String {
    if cost.abs() < 0.01 {
        format!("${cost:.6}")
    } else {
        format!("${cost:.4}")
    }
}

/// Integer with thousands separators.
pub fn format_count(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

/// `+x.x%` or `N/A`.
pub fn format_change(change: &PercentChange) -> String {
    match change {
        PercentChange::Percent(p) => format!("{p:+.1}%"),
        PercentChange::NotApplicable => "N/A".to_string(),
    }
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Cyan))
            .collect::<Vec<_>>(),
    );
    table
}

fn right(text: impl ToString) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn pricing_table(table: &PriceTable) -> String {
    let mut out = new_table(&["MODEL", "INPUT", "OUTPUT", "CACHE WRITE", "CACHE READ"]);
    for (id, p) in table.iter() {
        out.add_row(vec![
            Cell::new(id),
            right(format!("${:.2}", p.input)),
            right(format!("${:.2}", p.output)),
            right(format!("${:.2}", p.cache_write)),
            right(format!("${:.2}", p.cache_read)),
        ]);
    }
    format!("Model Pricing (per 1M tokens):\n{out}\n")
}

pub fn projection(p: &CostProjection) -> String {
    let b = &p.breakdown;
    let mut table = new_table(&["", "TOKENS", "COST"]);
    table.add_row(vec![
        Cell::new("Input"),
        right(format_count(p.total_input_tokens)),
        right(format_cost(b.input_cost)),
    ]);
    table.add_row(vec![
        Cell::new("Output"),
        right(format_count(p.total_output_tokens)),
        right(format_cost(b.output_cost)),
    ]);
    table.add_row(vec![
        Cell::new("Cache write"),
        right("-"),
        right(format_cost(b.cache_write_cost)),
    ]);
    table.add_row(vec![
        Cell::new("Cache read"),
        right("-"),
        right(format_cost(b.cache_read_cost)),
    ]);
    table.add_row(vec![Cell::new("Total"), right(""), right(format_cost(b.total_cost))]);

    format!("{} x {} requests:\n{table}\n", p.model_name, format_count(p.num_requests))
}

pub fn optimization(cmp: &OptimizationComparison) -> String {
    format!(
        "Original:  {}\nOptimized: {}\nSavings:   {} ({:.1}%)\n",
        format_cost(cmp.original.breakdown.total_cost),
        format_cost(cmp.optimized.breakdown.total_cost),
        format_cost(cmp.savings),
        cmp.savings_pct
    )
}

pub fn savings(result: &AggregateResult) -> String {
    let mut tokens = new_table(&["REQUESTS", "INPUT", "OUTPUT", "CACHE WRITE", "CACHE READ"]);
    tokens.add_row(vec![
        right(format_count(result.total_requests as i64)),
        right(format_count(result.total_input_tokens)),
        right(format_count(result.total_output_tokens)),
        right(format_count(result.total_cache_write_tokens)),
        right(format_count(result.total_cache_read_tokens)),
    ]);

    let mut costs = new_table(&["WITH CACHE", "WITHOUT CACHE", "SAVINGS", "SAVINGS %", "HIT RATE"]);
    costs.add_row(vec![
        right(format_cost(result.cost_with_cache)),
        right(format_cost(result.cost_without_cache)),
        right(format_cost(result.savings)),
        right(format!("{:.1}%", result.savings_pct)),
        right(format!("{:.1}%", result.cache_hit_rate)),
    ]);

    format!("Cache Savings:\n{tokens}\n{costs}\n")
}

pub fn comparison(prev_name: &str, curr_name: &str, report: &ComparisonReport) -> String {
    let mut table = new_table(&["METRIC", prev_name, curr_name, "CHANGE"]);

    for row in &report.rows {
        let (prev, curr) = match row.metric {
            Metric::Cost => (format!("${:.4}", row.previous), format!("${:.4}", row.current)),
            Metric::Latency => (format!("{:.2}", row.previous), format!("{:.2}", row.current)),
            Metric::InputTokens | Metric::OutputTokens => (
                format_count(row.previous as i64),
                format_count(row.current as i64),
            ),
        };
        table.add_row(vec![
            Cell::new(row.metric.label()),
            right(prev),
            right(curr),
            right(format_change(&row.change)),
        ]);
    }

    let mut out = format!(
        "{} vs {} Comparison:\n{table}\n",
        prev_name.to_uppercase(),
        curr_name.to_uppercase()
    );

    let change_of = |m: Metric| report.row(m).and_then(|r| r.change.percent()).unwrap_or(0.0);
    if report.has_baseline() {
        let cost = change_of(Metric::Cost);
        let latency = change_of(Metric::Latency);
        out.push_str(&format!(
            "Result: {:.1}% cost {}, {:.1}% latency {}\n",
            -cost,
            if cost < 0.0 { "reduction" } else { "increase" },
            -latency,
            if latency < 0.0 { "improvement" } else { "increase" },
        ));
    } else {
        out.push_str(&format!(
            "No saved {prev_name} metrics with cost and latency to compare against\n"
        ));
    }
    out
}

/// One row per collected request, failed ones marked ERROR, then a totals row.
pub fn session_table(session: &MetricsSession) -> String {
    if session.is_empty() {
        return "No metrics collected.\n".to_string();
    }

    let mut table = new_table(&[
        "TEST",
        "LATENCY",
        "COST",
        "INPUT",
        "OUTPUT",
        "CACHE READ",
        "CACHE WRITE",
    ]);

    for entry in session.entries() {
        let row = match &entry.outcome {
            MetricOutcome::Recorded(m) => vec![
                Cell::new(&entry.test_name),
                right(
                    m.latency_secs
                        .filter(|secs| *secs != 0.0)
                        .map_or_else(|| "N/A".to_string(), |secs| format!("{secs:.2}s")),
                ),
                right(format!("${:.4}", m.cost_usd)),
                right(format_count(m.usage.input_tokens)),
                right(format_count(m.usage.output_tokens)),
                right(format_count(m.usage.cache_read_tokens)),
                right(format_count(m.usage.cache_write_tokens)),
            ],
            MetricOutcome::Failed { .. } => {
                let mut cells = vec![Cell::new(&entry.test_name), right("ERROR").fg(Color::Red)];
                cells.extend((0..5).map(|_| right("-")));
                cells
            }
        };
        table.add_row(row);
    }

    let totals = session.totals();
    table.add_row(vec![
        Cell::new("TOTALS"),
        right(format!("{:.2}s", totals.avg_latency)),
        right(format!("${:.4}", totals.total_cost)),
        right(format_count(totals.total_input_tokens)),
        right(format_count(totals.total_output_tokens)),
        right(format_count(totals.total_cache_read_tokens)),
        right(format_count(totals.total_cache_write_tokens)),
    ]);

    format!("Metrics Summary:\n{table}\n")
}

pub fn tpm(usage: &TpmUsage) -> String {
    format!(
        "TPM reserved: {}\nTPM actual:   {}\nReleased:     {}\n",
        format_count(usage.reserved),
        format_count(usage.actual),
        format_count(usage.released())
    )
}
