//! Candle — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::DataError;

/// OHLCV candle for a single symbol over a single timeframe interval.
///
/// Immutable once fetched. All analysis reads candles through a
/// `CandleSeries`, which guarantees strictly increasing timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLC sanity check: high bounds the bar from above, low from below.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// Ordered candle sequence for one (symbol, timeframe) pair.
///
/// Invariant: `candles` is strictly increasing by `time`. The constructor
/// rejects out-of-order and duplicate timestamps, so every downstream
/// consumer (indicators, strategy walks) can rely on time-ascending
/// iteration without re-checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleSeries {
    symbol: String,
    timeframe: String,
    candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        candles: Vec<Candle>,
    ) -> Result<Self, DataError> {
        let symbol = symbol.into();
        let timeframe = timeframe.into();
        for pair in candles.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(DataError::OutOfOrder {
                    symbol,
                    timeframe,
                    at: pair[1].time,
                });
            }
        }
        Ok(Self {
            symbol,
            timeframe,
            candles,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Close-price column as an owned vector.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// Volume column as an owned vector.
    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, hour, 0, 0).unwrap()
    }

    fn sample_candle(hour: u32) -> Candle {
        Candle {
            time: ts(hour),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle(0).is_sane());
    }

    #[test]
    fn candle_detects_void() {
        let mut candle = sample_candle(0);
        candle.close = f64::NAN;
        assert!(candle.is_void());
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_detects_insane_high_low() {
        let mut candle = sample_candle(0);
        candle.high = 97.0; // below low
        assert!(!candle.is_sane());
    }

    #[test]
    fn series_accepts_ascending_times() {
        let series =
            CandleSeries::new("BTC/USDT", "1h", vec![sample_candle(0), sample_candle(1)]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.symbol(), "BTC/USDT");
        assert_eq!(series.timeframe(), "1h");
    }

    #[test]
    fn series_rejects_duplicate_times() {
        let err = CandleSeries::new("BTC/USDT", "1h", vec![sample_candle(3), sample_candle(3)]);
        assert!(err.is_err());
    }

    #[test]
    fn series_rejects_regressing_times() {
        let err = CandleSeries::new("BTC/USDT", "1h", vec![sample_candle(5), sample_candle(2)]);
        assert!(err.is_err());
    }

    #[test]
    fn candle_serialization_roundtrip() {
        let candle = sample_candle(0);
        let json = serde_json::to_string(&candle).unwrap();
        let deser: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(candle.time, deser.time);
        assert_eq!(candle.close, deser.close);
    }
}
