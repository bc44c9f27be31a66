//! Actual-vs-strategy comparison.
//!
//! Reconciles an account's completed trades against what a strategy
//! run would have done over the same series. The strategy side is
//! reduced to synthetic single-unit trades read off the signal trace —
//! a depth-1 walk, since the strategy engine already enforces at most
//! one open position.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{CandleSeries, CompletedTrade, PnlSummary};
use crate::strategies::StrategyRun;

/// Win-rate margin, in percentage points, inside which the two sides
/// count as similar.
pub const WIN_RATE_MARGIN_PP: f64 = 5.0;

/// Per-side trade statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideMetrics {
    pub trades: usize,
    pub total_pnl: f64,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percentage in [0, 100]; 0 for an empty side.
    pub win_rate: f64,
}

impl SideMetrics {
    pub fn from_trades(trades: &[CompletedTrade]) -> Self {
        let summary = PnlSummary::from_trades(trades);
        Self {
            trades: summary.total_trades,
            total_pnl: summary.total_pnl,
            winning_trades: summary.winning_trades,
            losing_trades: summary.losing_trades,
            win_rate: summary.win_rate,
        }
    }
}

/// Coarse qualitative verdict over the win-rate gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    StrategyLeads,
    TraderLeads,
    Similar,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Verdict::StrategyLeads => "AI performs better",
            Verdict::TraderLeads => "Your trading performs better",
            Verdict::Similar => "Similar",
        };
        write!(f, "{text}")
    }
}

/// Side-by-side comparison of actual and synthetic trading.
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub actual: SideMetrics,
    pub strategy: SideMetrics,
    /// Strategy signal events per actual trade (denominator clamped to
    /// one so an empty account still yields a finite ratio).
    pub signal_frequency_ratio: f64,
    pub verdict: Verdict,
}

/// Reduce a strategy run to synthetic single-unit trades.
///
/// Only long round trips are realized: a BUY that leaves the run long
/// opens the unit position at that bar's close, the next SELL closes
/// it. The position trace disambiguates the flags for the
/// short-capable variants — a cover-buy or a short-entry sell leaves
/// the trace at or below flat and contributes nothing here. A position
/// still open at the end of the series realizes nothing.
pub fn synthetic_trades(run: &StrategyRun, series: &CandleSeries) -> Vec<CompletedTrade> {
    let candles = series.candles();
    let mut trades = Vec::new();
    let mut entry: Option<usize> = None;

    for i in 0..candles.len().min(run.buy_signal.len()) {
        if entry.is_none() {
            if run.buy_signal[i] && run.position.get(i).copied().unwrap_or(0) == 1 {
                entry = Some(i);
            }
        } else if run.sell_signal[i] {
            let e = entry.take().unwrap_or(i);
            let (entry_candle, exit_candle) = (&candles[e], &candles[i]);
            let pnl = exit_candle.close - entry_candle.close;
            trades.push(CompletedTrade {
                symbol: series.symbol().to_string(),
                buy_price: entry_candle.close,
                sell_price: exit_candle.close,
                quantity: 1.0,
                buy_time: entry_candle.time,
                sell_time: exit_candle.time,
                pnl,
                pnl_pct: pnl / entry_candle.close * 100.0,
                holding_period_secs: (exit_candle.time - entry_candle.time).num_seconds(),
            });
        }
    }
    trades
}

/// Compare completed account trades against one strategy run.
pub fn compare(
    actual: &[CompletedTrade],
    run: &StrategyRun,
    series: &CandleSeries,
) -> Comparison {
    let synthetic = synthetic_trades(run, series);
    let actual_metrics = SideMetrics::from_trades(actual);
    let strategy_metrics = SideMetrics::from_trades(&synthetic);

    let signal_frequency_ratio = run.signal_count() as f64 / actual.len().max(1) as f64;
    let verdict = verdict(strategy_metrics.win_rate, actual_metrics.win_rate);

    Comparison {
        actual: actual_metrics,
        strategy: strategy_metrics,
        signal_frequency_ratio,
        verdict,
    }
}

fn verdict(strategy_win_rate: f64, actual_win_rate: f64) -> Verdict {
    let gap = strategy_win_rate - actual_win_rate;
    if gap > WIN_RATE_MARGIN_PP {
        Verdict::StrategyLeads
    } else if gap < -WIN_RATE_MARGIN_PP {
        Verdict::TraderLeads
    } else {
        Verdict::Similar
    }
}
