//! Indicator trait and concrete indicator implementations.
//!
//! Indicators are pure functions: candle history in, numeric series out.
//! Strategies precompute every series they need into an `IndicatorFrame`
//! before the bar walk and read values back through an Option-returning
//! accessor, so warmup NaN never leaks into transition logic.
//!
//! Multi-series indicators (Bollinger) are exposed as separate named
//! instances per band, keeping the single-series `Indicator` trait
//! unchanged.

pub mod bollinger;
pub mod ema;
pub mod extrema;
pub mod frame;
pub mod rsi;
pub mod sma;
pub mod trendline;
pub mod volume;

pub use bollinger::{percent_b, Bollinger, BollingerBand};
pub use ema::Ema;
pub use extrema::{rw_bottom, rw_top};
pub use frame::IndicatorFrame;
pub use rsi::Rsi;
pub use sma::Sma;
pub use trendline::{
    fit_trendlines, fit_trendlines_high_low, TrendlineConfig, TrendlineFit, TrendlinePair,
};
pub use volume::{volume_ratio, VolumeSma};

use crate::domain::Candle;

/// Trait for indicators.
///
/// Indicators take a full candle series and produce a numeric output
/// series of the same length. The first `lookback()` values should be
/// `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No indicator value at bar t may depend on price data from bar t+1 or
/// later. Strategies rely on this when deriving the latest-bar signal.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire candle series.
    ///
    /// Returns a `Vec<f64>` of the same length as `candles`.
    /// The first `lookback()` values should be `f64::NAN`.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Create synthetic candles from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                time: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Same as `make_candles` but with an explicit volume column.
#[cfg(test)]
pub fn make_candles_with_volume(closes: &[f64], volumes: &[f64]) -> Vec<Candle> {
    let mut candles = make_candles(closes);
    for (candle, &v) in candles.iter_mut().zip(volumes) {
        candle.volume = v;
    }
    candles
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
