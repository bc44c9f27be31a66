//! FIFO trade ledger: matches raw buys and sells into completed trades
//! with realized P&L.
//!
//! Matching is derived data — it recomputes from the raw trade list on
//! every call and never mutates its input. Within one symbol the walk
//! is strictly sequential in time order; symbols are independent and
//! matched in parallel.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::{CompletedTrade, PnlSummary, RawTrade, TradeSide};

/// What to do with sell volume that exceeds all open buy lots.
///
/// The drop policy matches how most spot exchanges report a transfer-in
/// sold later: there is no acquisition record, so the remainder simply
/// produces no completed trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedSellPolicy {
    /// Drop the remainder, logging a warning.
    #[default]
    Drop,
    /// Fail the whole batch.
    Reject,
    /// Open a short lot; later buys close it oldest-first.
    CarryShort,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub unmatched_sell: UnmatchedSellPolicy,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unmatched sell of {remaining} {symbol} at {time}")]
    UnmatchedSell {
        symbol: String,
        remaining: f64,
        time: DateTime<Utc>,
    },
}

/// Everything one matching pass produces.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReport {
    pub completed_trades: Vec<CompletedTrade>,
    pub summary: PnlSummary,
    /// Raw records dropped by validation, counted so callers can
    /// surface data-quality problems.
    pub skipped: usize,
}

/// An open position awaiting its matching counter-side.
#[derive(Debug, Clone, Copy)]
struct Lot {
    price: f64,
    remaining: f64,
    time: DateTime<Utc>,
}

/// Match a raw trade list into completed trades and a P&L summary.
///
/// Deterministic for any input order that preserves per-symbol
/// timestamp order: the per-symbol sort is stable, so same-timestamp
/// records keep their original relative order.
pub fn match_trades(
    trades: &[RawTrade],
    config: &LedgerConfig,
) -> Result<LedgerReport, LedgerError> {
    let mut skipped = 0usize;
    let mut by_symbol: BTreeMap<&str, Vec<&RawTrade>> = BTreeMap::new();
    for trade in trades {
        if !trade.is_valid() {
            warn!(
                symbol = %trade.symbol,
                price = trade.price,
                quantity = trade.quantity,
                "skipping malformed trade record"
            );
            skipped += 1;
            continue;
        }
        by_symbol.entry(&trade.symbol).or_default().push(trade);
    }

    let groups: Vec<Vec<&RawTrade>> = by_symbol.into_values().collect();
    let per_symbol: Vec<Vec<CompletedTrade>> = groups
        .into_par_iter()
        .map(|group| match_symbol(group, config.unmatched_sell))
        .collect::<Result<_, _>>()?;

    let mut completed_trades: Vec<CompletedTrade> = per_symbol.into_iter().flatten().collect();
    // Symbols were matched independently; interleave their results back
    // into one time-ordered history.
    completed_trades.sort_by(|a, b| (a.sell_time, a.buy_time).cmp(&(b.sell_time, b.buy_time)));

    let summary = PnlSummary::from_trades(&completed_trades);
    Ok(LedgerReport {
        completed_trades,
        summary,
        skipped,
    })
}

fn match_symbol(
    mut trades: Vec<&RawTrade>,
    policy: UnmatchedSellPolicy,
) -> Result<Vec<CompletedTrade>, LedgerError> {
    trades.sort_by(|a, b| a.time.cmp(&b.time));

    let mut completed = Vec::new();
    let mut buys: VecDeque<Lot> = VecDeque::new();
    let mut shorts: VecDeque<Lot> = VecDeque::new();

    for trade in trades {
        match trade.side {
            TradeSide::Buy => {
                let mut remaining = trade.quantity;
                // Open shorts (carry policy only) close before any new
                // long lot opens.
                while remaining > 0.0 {
                    let Some(front) = shorts.front_mut() else {
                        break;
                    };
                    let quantity = remaining.min(front.remaining);
                    completed.push(completed_trade(
                        &trade.symbol,
                        trade.price,
                        trade.time,
                        front.price,
                        front.time,
                        quantity,
                    ));
                    remaining -= quantity;
                    front.remaining -= quantity;
                    if front.remaining <= 0.0 {
                        shorts.pop_front();
                    }
                }
                if remaining > 0.0 {
                    buys.push_back(Lot {
                        price: trade.price,
                        remaining,
                        time: trade.time,
                    });
                }
            }
            TradeSide::Sell => {
                let mut remaining = trade.quantity;
                while remaining > 0.0 {
                    let Some(front) = buys.front_mut() else {
                        break;
                    };
                    let quantity = remaining.min(front.remaining);
                    completed.push(completed_trade(
                        &trade.symbol,
                        front.price,
                        front.time,
                        trade.price,
                        trade.time,
                        quantity,
                    ));
                    remaining -= quantity;
                    front.remaining -= quantity;
                    if front.remaining <= 0.0 {
                        buys.pop_front();
                    }
                }
                if remaining > 0.0 {
                    match policy {
                        UnmatchedSellPolicy::Drop => {
                            warn!(
                                symbol = %trade.symbol,
                                remaining,
                                time = %trade.time,
                                "dropping unmatched sell volume"
                            );
                        }
                        UnmatchedSellPolicy::Reject => {
                            return Err(LedgerError::UnmatchedSell {
                                symbol: trade.symbol.clone(),
                                remaining,
                                time: trade.time,
                            });
                        }
                        UnmatchedSellPolicy::CarryShort => {
                            shorts.push_back(Lot {
                                price: trade.price,
                                remaining,
                                time: trade.time,
                            });
                        }
                    }
                }
            }
        }
    }

    Ok(completed)
}

fn completed_trade(
    symbol: &str,
    buy_price: f64,
    buy_time: DateTime<Utc>,
    sell_price: f64,
    sell_time: DateTime<Utc>,
    quantity: f64,
) -> CompletedTrade {
    let pnl = (sell_price - buy_price) * quantity;
    // Entry is whichever leg executed first; short round trips have the
    // sell leg first.
    let holding_period_secs = (sell_time - buy_time).num_seconds().abs();
    CompletedTrade {
        symbol: symbol.to_string(),
        buy_price,
        sell_price,
        quantity,
        buy_time,
        sell_time,
        pnl,
        pnl_pct: (sell_price - buy_price) / buy_price * 100.0,
        holding_period_secs,
    }
}
