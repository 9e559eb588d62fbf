//! cachelab - prompt-cache cost and savings toolkit
//!
//! Computes Bedrock token costs, prompt-cache savings, and version-to-version
//! comparisons from recorded usage.
//!
//! ## Usage
//!
//! ```bash
//! # Show the price table
//! cachelab pricing
//!
//! # Cost of 1,000 requests with a 1,500-token prompt
//! cachelab cost --input 1500 --output 300 --requests 1000
//!
//! # Cache savings over a JSON-lines file of responses
//! cachelab savings usage.jsonl
//!
//! # Record a version's totals, then compare two versions
//! cachelab record v3 usage.jsonl
//! cachelab compare v2 v3
//! ```

mod report;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use cachelab_core::{LabError, LogGuard, init_logging, log_cost_event};
use cachelab_cost::parser::ParsedUsage;
use cachelab_cost::pricing::SONNET_GLOBAL;
use cachelab_cost::quota::{OUTPUT_BURNDOWN_RATE, TpmUsage};
use cachelab_cost::session::DEFAULT_METRICS_FILE;
use cachelab_cost::{
    CacheRates, CostError, MetricsSession, MetricsStore, ModelRoute, PriceTable, RequestMetrics,
    UsageParser, UsageRecord, aggregate, classify_query, compare,
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Prompt-cache cost and savings toolkit
#[derive(Parser, Debug)]
#[command(name = "cachelab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.cachelab/logs/)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// YAML price table (defaults to built-in Bedrock rates)
    #[arg(long, global = true)]
    pricing: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show configured per-million-token rates
    Pricing,

    /// Cost of a request shape, optionally repeated
    Cost {
        #[arg(long, default_value = SONNET_GLOBAL)]
        model: String,
        /// Uncached input tokens per request
        #[arg(long, default_value_t = 0)]
        input: i64,
        /// Output tokens per request
        #[arg(long, default_value_t = 0)]
        output: i64,
        /// Cache write tokens for the whole run
        #[arg(long, default_value_t = 0)]
        cache_write: i64,
        /// Cache read tokens for the whole run
        #[arg(long, default_value_t = 0)]
        cache_read: i64,
        #[arg(long, default_value_t = 1)]
        requests: i64,
        /// Also compare against this optimized input size
        #[arg(long)]
        optimized_input: Option<i64>,
    },

    /// Cache hit rate and savings over a JSON-lines usage file
    Savings {
        file: PathBuf,
        /// Base input price per million tokens (defaults to the model's rate)
        #[arg(long)]
        price: Option<f64>,
        /// Model whose rates supply the price and multipliers
        #[arg(long, default_value = SONNET_GLOBAL)]
        model: String,
        #[arg(long)]
        write_multiplier: Option<f64>,
        #[arg(long)]
        read_multiplier: Option<f64>,
        /// Ignore lines whose usage is all zero
        #[arg(long)]
        skip_empty: bool,
    },

    /// Price a usage file and save its totals under a version label
    Record {
        version: String,
        file: PathBuf,
        /// Model used when a line does not name one
        #[arg(long, default_value = SONNET_GLOBAL)]
        model: String,
        #[arg(long, default_value = DEFAULT_METRICS_FILE)]
        metrics_file: PathBuf,
        /// Ignore lines whose usage is all zero
        #[arg(long)]
        skip_empty: bool,
    },

    /// Compare two saved versions
    Compare {
        previous: String,
        current: String,
        #[arg(long, default_value = DEFAULT_METRICS_FILE)]
        metrics_file: PathBuf,
    },

    /// Tokens-per-minute quota reserved and consumed by a request
    Tpm {
        #[arg(long)]
        input: i64,
        #[arg(long)]
        max_tokens: i64,
        #[arg(long, default_value_t = 0)]
        output: i64,
        #[arg(long, default_value_t = 0)]
        cache_write: i64,
        #[arg(long, default_value_t = OUTPUT_BURNDOWN_RATE)]
        burndown: i64,
    },

    /// Classify a query and show which model it routes to
    Classify { query: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    debug!(command = ?cli.command, "Starting cachelab");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("cachelab error: {:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(guidance) = e.downcast_ref::<LabError>().and_then(LabError::guidance) {
                eprintln!("Hint: {}", guidance);
            } else if let Some(cost_err) = e.downcast_ref::<CostError>() {
                eprintln!("{}", cost_err.friendly_message());
            }
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> cachelab_core::Result<LogGuard> {
    let log_dir = match &cli.log_dir {
        Some(dir) => Some(dir.clone()),
        None => dirs::home_dir().map(|home| home.join(".cachelab").join("logs")),
    };
    init_logging(log_dir, cli.verbose > 0)
}

fn load_price_table(path: Option<&Path>) -> anyhow::Result<PriceTable> {
    let Some(path) = path else {
        return Ok(PriceTable::bedrock_defaults());
    };
    if !path.exists() {
        return Err(LabError::config_not_found(path).into());
    }
    PriceTable::from_yaml_file(path)
        .map_err(|e| LabError::config_invalid(path, e.to_string()).into())
}

fn emit<T: Serialize>(
    json: bool,
    value: &T,
    text: impl FnOnce() -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

/// Attach the operation and path to file errors from the cost crate.
fn file_error(err: CostError, operation: &str, path: &Path) -> anyhow::Error {
    match err {
        CostError::Io(source) => LabError::io(operation, path, source).into(),
        other => anyhow::Error::new(other).context(format!("{operation} {}", path.display())),
    }
}

fn read_usage(path: &Path, skip_empty: bool) -> anyhow::Result<Vec<ParsedUsage>> {
    UsageParser::new()
        .skip_empty(skip_empty)
        .parse_file(path)
        .map_err(|e| file_error(e, "reading usage file", path))
}

/// Rates for `savings`. The model is only consulted for values not given explicitly.
fn savings_rates(
    table: &PriceTable,
    model: &str,
    price: Option<f64>,
    write_multiplier: Option<f64>,
    read_multiplier: Option<f64>,
) -> cachelab_cost::Result<CacheRates> {
    if let (Some(price), Some(write), Some(read)) = (price, write_multiplier, read_multiplier) {
        return Ok(CacheRates::new(price).with_multipliers(write, read));
    }

    let mut rates = CacheRates::from_pricing(table.get(model)?);
    if let Some(price) = price {
        rates.price_per_million_input = price;
    }
    if let Some(write) = write_multiplier {
        rates.cache_write_multiplier = write;
    }
    if let Some(read) = read_multiplier {
        rates.cache_read_multiplier = read;
    }
    Ok(rates)
}

/// Price each parsed request. Unpriced requests are kept as errors.
fn record_session(table: &PriceTable, parsed: Vec<ParsedUsage>, model: &str) -> MetricsSession {
    let mut session = MetricsSession::new();
    for (index, entry) in parsed.into_iter().enumerate() {
        let test_name = format!("request-{}", index + 1);
        let entry_model = entry.model.as_deref().unwrap_or(model);
        match table.cost(&entry.usage, entry_model) {
            Ok(cost) => {
                let mut metrics = RequestMetrics::new(entry.usage, cost.total_cost);
                if let Some(secs) = entry.latency_secs {
                    metrics = metrics.with_latency(secs);
                }
                session.collect(test_name, metrics);
            }
            Err(e) => {
                warn!(test_name = %test_name, error = %e, "Skipping unpriced request");
                session.collect_error(test_name, e.to_string());
            }
        }
    }
    session
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let table = load_price_table(cli.pricing.as_deref())?;

    match &cli.command {
        Command::Pricing => emit(cli.json, &table, || report::pricing_table(&table)),

        Command::Cost {
            model,
            input,
            output,
            cache_write,
            cache_read,
            requests,
            optimized_input,
        } => {
            let per_request =
                UsageRecord::new(*input, *output).with_cache(*cache_write, *cache_read);
            let projection = table.project(model, &per_request, *requests)?;
            log_cost_event!(
                model = %model,
                requests = *requests,
                cost_usd = projection.breakdown.total_cost
            );

            match optimized_input {
                Some(optimized) => {
                    let cmp = table.compare_optimization(
                        model, *input, *optimized, *output, *requests,
                    )?;
                    emit(cli.json, &cmp, || {
                        let text = report::projection(&projection);
                        format!("{text}{}", report::optimization(&cmp))
                    })
                }
                None => emit(cli.json, &projection, || report::projection(&projection)),
            }
        }

        Command::Savings {
            file,
            price,
            model,
            write_multiplier,
            read_multiplier,
            skip_empty,
        } => {
            let rates = savings_rates(&table, model, *price, *write_multiplier, *read_multiplier)?;
            let records: Vec<UsageRecord> =
                read_usage(file, *skip_empty)?.into_iter().map(|p| p.usage).collect();

            let result = aggregate(&records, rates);
            info!(
                requests = result.total_requests,
                savings_pct = result.savings_pct,
                cache_hit_rate = result.cache_hit_rate,
                "Computed cache savings"
            );
            emit(cli.json, &result, || report::savings(&result))
        }

        Command::Record {
            version,
            file,
            model,
            metrics_file,
            skip_empty,
        } => {
            let parsed = read_usage(file, *skip_empty)?;
            let session = record_session(&table, parsed, model);

            let totals = session.totals();
            let store = MetricsStore::new(metrics_file);
            store
                .save(version, &totals)
                .map_err(|e| file_error(e, "writing metrics file", store.path()))?;
            emit(cli.json, &totals, || {
                format!(
                    "{}Saved '{}' ({} of {} requests) to {}\n",
                    report::session_table(&session),
                    version,
                    session.recorded().count(),
                    session.len(),
                    store.path().display(),
                )
            })
        }

        Command::Compare {
            previous,
            current,
            metrics_file,
        } => {
            let store = MetricsStore::new(metrics_file);
            let load = |version: &str| {
                store
                    .load(version)
                    .map(Option::unwrap_or_default)
                    .map_err(|e| file_error(e, "reading metrics file", store.path()))
            };
            let prev = load(previous.as_str())?;
            let curr = load(current.as_str())?;
            let result = compare(&prev, &curr);
            emit(cli.json, &result, || report::comparison(previous, current, &result))
        }

        Command::Tpm {
            input,
            max_tokens,
            output,
            cache_write,
            burndown,
        } => {
            let usage = TpmUsage::new(*input, *max_tokens, *output, *cache_write, *burndown);
            emit(cli.json, &usage, || report::tpm(&usage))
        }

        Command::Classify { query } => {
            let complexity = classify_query(query);
            let route = ModelRoute::default();
            let model = route.model_for(complexity);
            let decision = serde_json::json!({ "complexity": complexity, "model": model });
            emit(cli.json, &decision, || format!("{complexity} -> {model}\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachelab_cost::pricing::HAIKU_GLOBAL;
    use clap::CommandFactory;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cost_defaults() {
        let cli = Cli::parse_from(["cachelab", "cost", "--input", "1500"]);
        match cli.command {
            Command::Cost { model, input, requests, .. } => {
                assert_eq!(model, SONNET_GLOBAL);
                assert_eq!(input, 1500);
                assert_eq!(requests, 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_missing_pricing_file() {
        let err = load_price_table(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        let lab = err.downcast_ref::<LabError>().unwrap();
        assert!(lab.is_config_error());
    }

    /// One all-zero response and one cache write.
    const ZERO_THEN_WRITE: &str = r#"{"latency_ms":4000,"usage":{"inputTokens":0,"outputTokens":0,"cacheWriteInputTokens":0,"cacheReadInputTokens":0}}
{"latency_ms":1000,"usage":{"cacheWriteInputTokens":1000000}}
"#;

    fn usage_file(content: &str) -> NamedTempFile {
        let file = NamedTempFile::with_suffix(".jsonl").unwrap();
        std::fs::write(file.path(), content).unwrap();
        file
    }

    #[test]
    fn test_all_zero_lines_are_counted() {
        let file = usage_file(ZERO_THEN_WRITE);
        let table = PriceTable::bedrock_defaults();

        let parsed = read_usage(file.path(), false).unwrap();
        let records: Vec<UsageRecord> = parsed.iter().map(|p| p.usage).collect();
        let rates = savings_rates(&table, SONNET_GLOBAL, None, None, None).unwrap();
        assert_eq!(aggregate(&records, rates).total_requests, 2);

        let session = record_session(&table, parsed, SONNET_GLOBAL);
        let totals = session.totals();
        assert_eq!(session.recorded().count(), 2);
        assert_eq!(totals.avg_latency, 2.5);
        assert!((totals.total_cost - 3.75).abs() < 1e-9);
    }

    #[test]
    fn test_skip_empty_is_opt_in() {
        let file = usage_file(ZERO_THEN_WRITE);
        assert_eq!(read_usage(file.path(), true).unwrap().len(), 1);

        let cli = Cli::parse_from(["cachelab", "savings", "usage.jsonl"]);
        assert!(matches!(cli.command, Command::Savings { skip_empty: false, .. }));
    }

    #[test]
    fn test_missing_usage_file_names_path() {
        let err = read_usage(Path::new("/definitely/not/usage.jsonl"), false).unwrap_err();
        let lab = err.downcast_ref::<LabError>().unwrap();

        assert!(matches!(lab, LabError::Io { .. }));
        assert!(lab.to_string().contains("/definitely/not/usage.jsonl"));
        assert!(lab.guidance().is_some());
    }

    #[test]
    fn test_unpriced_requests_recorded_as_errors() {
        let file = usage_file(
            r#"{"model":"mystery","usage":{"inputTokens":10}}
{"usage":{"inputTokens":10}}
"#,
        );
        let table = PriceTable::bedrock_defaults();

        let session = record_session(&table, read_usage(file.path(), false).unwrap(), HAIKU_GLOBAL);

        assert_eq!(session.len(), 2);
        assert_eq!(session.recorded().count(), 1);
        assert!(report::session_table(&session).contains("ERROR"));
    }

    #[test]
    fn test_explicit_rates_skip_model_lookup() {
        let table = PriceTable::bedrock_defaults();

        let rates = savings_rates(&table, "not-priced", Some(2.0), Some(1.5), Some(0.2)).unwrap();
        assert_eq!(rates, CacheRates::new(2.0).with_multipliers(1.5, 0.2));

        let err = savings_rates(&table, "not-priced", Some(2.0), None, None).unwrap_err();
        assert!(err.is_unknown_model());

        let rates = savings_rates(&table, HAIKU_GLOBAL, None, Some(2.0), None).unwrap();
        assert_eq!(rates.price_per_million_input, 1.0);
        assert_eq!(rates.cache_write_multiplier, 2.0);
    }

    #[test]
    fn test_invalid_pricing_file() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        std::fs::write(file.path(), "models: [not, a, map]").unwrap();

        let err = load_price_table(Some(file.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LabError>(),
            Some(LabError::ConfigInvalid { .. })
        ));
    }
}
