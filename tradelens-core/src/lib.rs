//! TradeLens Core — domain types, indicators, strategy signal walks,
//! FIFO trade ledger, and the actual-vs-strategy comparator.
//!
//! This crate contains the analysis engine:
//! - Domain types (candles, raw/completed trades, signals, positions)
//! - Indicator library computing into NaN-padded frames
//! - Per-variant strategy state machines over one candle series
//! - FIFO buy-lot matching with realized P&L aggregation
//! - Comparison of an account's real trades against a strategy run

pub mod compare;
pub mod data;
pub mod domain;
pub mod indicators;
pub mod ledger;
pub mod strategies;
