//! Core domain types: candles, trades, signals.

pub mod candle;
pub mod signal;
pub mod trade;

pub use candle::{Candle, CandleSeries};
pub use signal::{PositionState, Signal, SignalKind, SignalRecord};
pub use trade::{CompletedTrade, PnlSummary, RawTrade, TradeSide};
