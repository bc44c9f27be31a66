//! Raw trade input and the realized-P&L records derived from it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Side of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One executed trade as reported by an exchange or store.
///
/// Treated as immutable historical fact — matching never mutates the
/// input list, only transient lot copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTrade {
    pub symbol: String,
    pub side: TradeSide,
    pub price: f64,
    pub quantity: f64,
    pub time: DateTime<Utc>,
}

impl RawTrade {
    /// Validation applied before FIFO matching. Records failing this check
    /// are skipped (and counted), never fatal to the batch.
    pub fn is_valid(&self) -> bool {
        !self.symbol.is_empty()
            && self.price.is_finite()
            && self.price > 0.0
            && self.quantity.is_finite()
            && self.quantity > 0.0
    }
}

/// A matched buy/sell pair produced by the FIFO pass.
///
/// Derived data: recomputed from the RawTrade list on every run,
/// never edited in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedTrade {
    pub symbol: String,
    pub buy_price: f64,
    pub sell_price: f64,
    pub quantity: f64,
    pub buy_time: DateTime<Utc>,
    pub sell_time: DateTime<Utc>,
    pub pnl: f64,
    pub pnl_pct: f64,
    /// Seconds between entry and exit. Entry is always the earlier leg,
    /// so this is non-negative under every matching policy.
    pub holding_period_secs: i64,
}

impl CompletedTrade {
    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }

    pub fn holding_period(&self) -> Duration {
        Duration::seconds(self.holding_period_secs)
    }
}

/// Aggregate statistics over a set of completed trades.
///
/// All fields default to zero/None for the empty set — callers render a
/// "no data yet" state from this, so the empty case must never divide
/// by zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PnlSummary {
    pub total_pnl: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Percentage in [0, 100]; 0 when there are no completed trades.
    pub win_rate: f64,
    pub average_win: f64,
    pub average_loss: f64,
    pub best_trade: Option<CompletedTrade>,
    pub worst_trade: Option<CompletedTrade>,
}

impl PnlSummary {
    /// Compute the summary from a slice of completed trades.
    pub fn from_trades(trades: &[CompletedTrade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let winners: Vec<&CompletedTrade> = trades.iter().filter(|t| t.is_winner()).collect();
        let losers: Vec<&CompletedTrade> = trades.iter().filter(|t| !t.is_winner()).collect();

        let average_win = if winners.is_empty() {
            0.0
        } else {
            winners.iter().map(|t| t.pnl).sum::<f64>() / winners.len() as f64
        };
        let average_loss = if losers.is_empty() {
            0.0
        } else {
            losers.iter().map(|t| t.pnl).sum::<f64>() / losers.len() as f64
        };

        let best_trade = trades
            .iter()
            .max_by(|a, b| a.pnl.total_cmp(&b.pnl))
            .cloned();
        let worst_trade = trades
            .iter()
            .min_by(|a, b| a.pnl.total_cmp(&b.pnl))
            .cloned();

        Self {
            total_pnl,
            total_trades: trades.len(),
            winning_trades: winners.len(),
            losing_trades: losers.len(),
            win_rate: winners.len() as f64 / trades.len() as f64 * 100.0,
            average_win,
            average_loss,
            best_trade,
            worst_trade,
        }
    }
}
