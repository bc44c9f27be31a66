//! Exponential Moving Average (EMA).
//!
//! Weighted mean with decaying weights, computed by the numerator /
//! denominator recurrence:
//!   num[t] = close[t] + (1 - alpha) * num[t-1]
//!   den[t] = 1        + (1 - alpha) * den[t-1]
//!   ema[t] = num[t] / den[t],  alpha = 2 / (period + 1)
//!
//! This matches a span-parameterized exponentially weighted mean with
//! adjusted weights, not the seeded recursive form. The first
//! `period - 1` values are masked as warmup so crossover checks only
//! ever compare settled averages.
//! Lookback: period - 1.

use crate::domain::Candle;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// Compute EMA values from a pre-extracted f64 slice.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if n < period || period == 0 {
        return result;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            // NaN taints everything downstream of it.
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        num = v + decay * num;
        den = 1.0 + decay * den;
        if i >= period - 1 {
            result[i] = num / den;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn ema_period_1_equals_close() {
        let candles = make_candles(&[100.0, 200.0, 300.0]);
        let result = Ema::new(1).compute(&candles);
        assert_approx(result[0], 100.0, DEFAULT_EPSILON);
        assert_approx(result[1], 200.0, DEFAULT_EPSILON);
        assert_approx(result[2], 300.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_3_known_values() {
        // alpha = 0.5, weights (1, 0.5, 0.25, ...) normalized.
        // EMA[2] = (12 + 0.5*11 + 0.25*10) / 1.75 = 20/1.75
        // EMA[3] = (13 + 0.5*20) / (1 + 0.5*1.75) = 23/1.875
        // EMA[4] = (14 + 0.5*23) / (1 + 0.5*1.875) = 25.5/1.9375
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Ema::new(3).compute(&candles);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 20.0 / 1.75, DEFAULT_EPSILON);
        assert_approx(result[3], 23.0 / 1.875, DEFAULT_EPSILON);
        assert_approx(result[4], 25.5 / 1.9375, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_tracks_closer_than_sma() {
        // On a steady uptrend the EMA sits above the same-period SMA.
        let closes = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let candles = make_candles(&closes);
        let ema = Ema::new(4).compute(&candles);
        let sma = crate::indicators::sma::sma_of_series(&closes, 4);
        for i in 3..closes.len() {
            assert!(ema[i] > sma[i], "EMA should lead SMA in an uptrend at {i}");
        }
    }

    #[test]
    fn ema_nan_propagates() {
        let mut candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        candles[3].close = f64::NAN;
        let result = Ema::new(3).compute(&candles);
        assert_approx(result[2], 20.0 / 1.75, DEFAULT_EPSILON);
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
    }

    #[test]
    fn ema_lookback() {
        assert_eq!(Ema::new(20).lookback(), 19);
        assert_eq!(Ema::new(1).lookback(), 0);
    }
}
