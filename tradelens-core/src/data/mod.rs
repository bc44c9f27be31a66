//! Market-data collaborators: provider trait, structured errors, stores.
//!
//! The core never fetches anything itself. Candle series and trade
//! histories arrive complete through the `MarketData` trait, so the
//! algorithms stay synchronous and I/O-free.

pub mod cache;
pub mod csv_store;

pub use cache::CandleCache;
pub use csv_store::{load_candles, load_trades, CsvStore};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{CandleSeries, RawTrade};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no data available for {symbol} {timeframe}")]
    Unavailable { symbol: String, timeframe: String },

    #[error("candle series for {symbol} {timeframe} not ascending at {at}")]
    OutOfOrder {
        symbol: String,
        timeframe: String,
        at: DateTime<Utc>,
    },

    #[error("malformed record at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Trait for candle and trade-history providers.
///
/// Implementations handle the specifics of a particular source (CSV
/// files, in-memory fixtures, a future exchange client). The cache layer
/// sits above this trait — providers don't know about the cache.
pub trait MarketData: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch up to `limit` of the most recent candles for a symbol/timeframe.
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<CandleSeries, DataError>;

    /// Fetch the full executed-trade history for an account.
    fn fetch_trades(&self, account: &str) -> Result<Vec<RawTrade>, DataError>;
}

/// In-memory provider backed by plain maps. Used in tests and as the
/// seed for the cache layer.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    candles: std::collections::HashMap<(String, String), CandleSeries>,
    trades: std::collections::HashMap<String, Vec<RawTrade>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_candles(&mut self, series: CandleSeries) {
        self.candles.insert(
            (series.symbol().to_string(), series.timeframe().to_string()),
            series,
        );
    }

    pub fn insert_trades(&mut self, account: impl Into<String>, trades: Vec<RawTrade>) {
        self.trades.insert(account.into(), trades);
    }
}

impl MarketData for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<CandleSeries, DataError> {
        let series = self
            .candles
            .get(&(symbol.to_string(), timeframe.to_string()))
            .ok_or_else(|| DataError::Unavailable {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            })?;
        if series.len() <= limit {
            return Ok(series.clone());
        }
        let tail = series.candles()[series.len() - limit..].to_vec();
        CandleSeries::new(symbol, timeframe, tail)
    }

    fn fetch_trades(&self, account: &str) -> Result<Vec<RawTrade>, DataError> {
        self.trades
            .get(account)
            .cloned()
            .ok_or_else(|| DataError::Unavailable {
                symbol: account.to_string(),
                timeframe: String::new(),
            })
    }
}
