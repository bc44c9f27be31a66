//! TradeLens CLI — analyze, pnl, and compare commands.
//!
//! Commands:
//! - `analyze` — run one strategy over a candle CSV, print a JSON report
//! - `pnl` — FIFO-match a trade CSV, print realized P&L as JSON
//! - `compare` — reconcile an account's trades against a strategy run
//!
//! Strategy parameters come from an optional TOML file deserialized
//! into the per-variant param structs; anything omitted falls back to
//! the variant's defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tradelens_core::compare::{compare, Comparison};
use tradelens_core::data::{load_candles, load_trades};
use tradelens_core::domain::{RawTrade, Signal, SignalRecord};
use tradelens_core::ledger::{match_trades, LedgerConfig, UnmatchedSellPolicy};
use tradelens_core::strategies::{
    BollingerReversion, BollingerReversionParams, ContinuationParams, ContinuationPatterns,
    MaCrossover, MaCrossoverParams, ReversalParams, ReversalPatterns, RsiThreshold,
    RsiThresholdParams, Strategy, TrendlineBreakout, TrendlineBreakoutParams, VolumeSpike,
    VolumeSpikeParams,
};

#[derive(Parser)]
#[command(
    name = "tradelens",
    about = "TradeLens CLI — strategy signals, realized P&L, and actual-vs-strategy comparison"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one strategy over a candle CSV and print a JSON report.
    Analyze {
        /// Candle CSV (time,open,high,low,close,volume).
        #[arg(long)]
        candles: PathBuf,

        /// Strategy name: rsi_threshold, ma_crossover, bollinger_reversion,
        /// volume_spike, trendline_breakout, reversal_patterns,
        /// continuation_patterns.
        #[arg(long)]
        strategy: String,

        /// TOML file with strategy parameters. Defaults per variant.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Symbol label for the series.
        #[arg(long, default_value = "UNKNOWN")]
        symbol: String,

        /// Timeframe label for the series.
        #[arg(long, default_value = "1h")]
        timeframe: String,
    },
    /// FIFO-match a trade CSV and print the realized P&L report.
    Pnl {
        /// Trade CSV (symbol,side,price,quantity,time).
        #[arg(long)]
        trades: PathBuf,

        /// What to do with sell volume exceeding open buy lots.
        #[arg(long, value_enum, default_value_t = PolicyArg::Drop)]
        policy: PolicyArg,

        /// Only match trades executed at or after this RFC 3339 time
        /// (e.g., 2024-01-02T00:00:00Z).
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
    /// Compare an account's completed trades against a strategy run.
    Compare {
        /// Candle CSV for the strategy side.
        #[arg(long)]
        candles: PathBuf,

        /// Trade CSV for the actual side.
        #[arg(long)]
        trades: PathBuf,

        /// Symbol to compare; actual trades are filtered to it.
        #[arg(long)]
        symbol: String,

        /// Timeframe label for the series.
        #[arg(long, default_value = "1h")]
        timeframe: String,

        /// Strategy for the synthetic side.
        #[arg(long, default_value = "trendline_breakout")]
        strategy: String,

        /// TOML file with strategy parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Only include trades executed at or after this RFC 3339 time.
        #[arg(long)]
        since: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    Drop,
    Reject,
    CarryShort,
}

impl From<PolicyArg> for UnmatchedSellPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Drop => UnmatchedSellPolicy::Drop,
            PolicyArg::Reject => UnmatchedSellPolicy::Reject,
            PolicyArg::CarryShort => UnmatchedSellPolicy::CarryShort,
        }
    }
}

#[derive(Serialize)]
struct AnalysisReport {
    strategy: String,
    symbol: String,
    timeframe: String,
    bars: usize,
    current_signal: Signal,
    buy_signals: usize,
    sell_signals: usize,
    recent_signals: Vec<SignalRecord>,
}

#[derive(Serialize)]
struct ComparisonReport {
    symbol: String,
    strategy: String,
    #[serde(flatten)]
    comparison: Comparison,
    verdict_text: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            candles,
            strategy,
            config,
            symbol,
            timeframe,
        } => run_analyze(&candles, &strategy, config.as_deref(), &symbol, &timeframe),
        Commands::Pnl {
            trades,
            policy,
            since,
        } => run_pnl(&trades, policy, since),
        Commands::Compare {
            candles,
            trades,
            symbol,
            timeframe,
            strategy,
            config,
            since,
        } => run_compare(
            &candles,
            &trades,
            &symbol,
            &timeframe,
            &strategy,
            config.as_deref(),
            since,
        ),
    }
}

fn run_analyze(
    candles: &Path,
    strategy_name: &str,
    config: Option<&Path>,
    symbol: &str,
    timeframe: &str,
) -> Result<()> {
    let series = load_candles(candles, symbol, timeframe)
        .with_context(|| format!("could not load candles from {}", candles.display()))?;
    let strategy = build_strategy(strategy_name, config)?;
    let run = strategy
        .run(&series)
        .with_context(|| format!("strategy '{strategy_name}' failed on {symbol}"))?;

    let report = AnalysisReport {
        strategy: strategy.name().to_string(),
        symbol: symbol.to_string(),
        timeframe: timeframe.to_string(),
        bars: series.len(),
        current_signal: run.current_signal,
        buy_signals: run.buy_indices().len(),
        sell_signals: run.sell_indices().len(),
        recent_signals: run.recent_signals,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_pnl(trades: &Path, policy: PolicyArg, since: Option<DateTime<Utc>>) -> Result<()> {
    let raw = load_trades(trades)
        .with_context(|| format!("could not load trades from {}", trades.display()))?;
    let raw = filter_since(raw, since);
    let config = LedgerConfig {
        unmatched_sell: policy.into(),
    };
    let report = match_trades(&raw, &config)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_compare(
    candles: &Path,
    trades: &Path,
    symbol: &str,
    timeframe: &str,
    strategy_name: &str,
    config: Option<&Path>,
    since: Option<DateTime<Utc>>,
) -> Result<()> {
    let series = load_candles(candles, symbol, timeframe)
        .with_context(|| format!("could not load candles from {}", candles.display()))?;
    let raw = load_trades(trades)
        .with_context(|| format!("could not load trades from {}", trades.display()))?;

    let strategy = build_strategy(strategy_name, config)?;
    let run = strategy
        .run(&series)
        .with_context(|| format!("strategy '{strategy_name}' failed on {symbol}"))?;

    let account: Vec<_> = filter_since(raw, since)
        .into_iter()
        .filter(|t| t.symbol == symbol)
        .collect();
    let ledger = match_trades(&account, &LedgerConfig::default())?;
    let comparison = compare(&ledger.completed_trades, &run, &series);

    let report = ComparisonReport {
        symbol: symbol.to_string(),
        strategy: strategy.name().to_string(),
        verdict_text: comparison.verdict.to_string(),
        comparison,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Build a strategy from its name and an optional TOML parameter file.
fn build_strategy(name: &str, config: Option<&Path>) -> Result<Box<dyn Strategy>> {
    let text = config
        .map(|p| {
            fs::read_to_string(p)
                .with_context(|| format!("could not read config {}", p.display()))
        })
        .transpose()?;

    Ok(match name {
        "rsi_threshold" => {
            Box::new(RsiThreshold::new(parse_params::<RsiThresholdParams>(&text)?))
        }
        "ma_crossover" => Box::new(MaCrossover::new(parse_params::<MaCrossoverParams>(&text)?)),
        "bollinger_reversion" => Box::new(BollingerReversion::new(parse_params::<
            BollingerReversionParams,
        >(&text)?)),
        "volume_spike" => Box::new(VolumeSpike::new(parse_params::<VolumeSpikeParams>(&text)?)),
        "trendline_breakout" => Box::new(TrendlineBreakout::new(parse_params::<
            TrendlineBreakoutParams,
        >(&text)?)),
        "reversal_patterns" => {
            Box::new(ReversalPatterns::new(parse_params::<ReversalParams>(&text)?))
        }
        "continuation_patterns" => Box::new(ContinuationPatterns::new(parse_params::<
            ContinuationParams,
        >(&text)?)),
        other => bail!(
            "unknown strategy '{other}'; expected one of rsi_threshold, ma_crossover, \
             bollinger_reversion, volume_spike, trendline_breakout, reversal_patterns, \
             continuation_patterns"
        ),
    })
}

fn parse_params<T: Default + DeserializeOwned>(text: &Option<String>) -> Result<T> {
    match text {
        Some(t) => toml::from_str(t).context("invalid strategy parameter file"),
        None => Ok(T::default()),
    }
}

/// Drop trades executed before the cutoff. No cutoff, no filtering.
fn filter_since(trades: Vec<RawTrade>, since: Option<DateTime<Utc>>) -> Vec<RawTrade> {
    match since {
        Some(cutoff) => trades.into_iter().filter(|t| t.time >= cutoff).collect(),
        None => trades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tradelens_core::domain::TradeSide;

    fn trade_at(hour: u32) -> RawTrade {
        RawTrade {
            symbol: "BTC/USDT".into(),
            side: TradeSide::Buy,
            price: 100.0,
            quantity: 1.0,
            time: Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn since_filter_keeps_the_cutoff_bar_and_later() {
        let trades = vec![trade_at(0), trade_at(6), trade_at(12)];
        let cutoff = Utc.with_ymd_and_hms(2024, 1, 2, 6, 0, 0).unwrap();

        let kept = filter_since(trades.clone(), Some(cutoff));
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].time, cutoff);

        let all = filter_since(trades, None);
        assert_eq!(all.len(), 3);
    }
}
