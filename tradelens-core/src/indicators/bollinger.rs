//! Bollinger Bands — moving average +/- standard deviation multiplier.
//!
//! Three bands (separate Indicator instances):
//! - Middle: SMA(close, period)
//! - Upper: middle + mult * stddev(close, period)
//! - Lower: middle - mult * stddev(close, period)
//!
//! Uses sample stddev (divide by N - 1).
//! Lookback: period - 1.

use crate::domain::Candle;

use super::Indicator;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::band(period, multiplier, BollingerBand::Upper, "upper")
    }

    pub fn middle(period: usize, multiplier: f64) -> Self {
        Self::band(period, multiplier, BollingerBand::Middle, "middle")
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::band(period, multiplier, BollingerBand::Lower, "lower")
    }

    fn band(period: usize, multiplier: f64, band: BollingerBand, tag: &str) -> Self {
        assert!(period >= 2, "Bollinger period must be >= 2");
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{tag}_{period}_{multiplier}"),
        }
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &candles[i + 1 - self.period..=i];
            if window.iter().any(|c| c.close.is_nan()) {
                continue;
            }

            let mean = window.iter().map(|c| c.close).sum::<f64>() / self.period as f64;
            result[i] = match self.band {
                BollingerBand::Middle => mean,
                BollingerBand::Upper | BollingerBand::Lower => {
                    // Sample stddev (N - 1 in the denominator).
                    let variance = window
                        .iter()
                        .map(|c| {
                            let diff = c.close - mean;
                            diff * diff
                        })
                        .sum::<f64>()
                        / (self.period - 1) as f64;
                    let stddev = variance.sqrt();
                    if self.band == BollingerBand::Upper {
                        mean + self.multiplier * stddev
                    } else {
                        mean - self.multiplier * stddev
                    }
                }
            };
        }

        result
    }
}

/// Position of a close inside the band envelope:
/// %B = (close - lower) / (upper - lower).
///
/// `None` when the bands have collapsed (constant price window), where
/// the ratio is undefined.
pub fn percent_b(close: f64, upper: f64, lower: f64) -> Option<f64> {
    let width = upper - lower;
    if width <= 0.0 || !width.is_finite() {
        return None;
    }
    Some((close - lower) / width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn bollinger_middle_is_sma() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let result = Bollinger::middle(3, 2.0).compute(&candles);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[3], 12.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_uses_sample_stddev() {
        // Window (10, 11, 12): mean 11, sample variance (1+0+1)/2 = 1.
        let candles = make_candles(&[10.0, 11.0, 12.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&candles);
        let lower = Bollinger::lower(3, 2.0).compute(&candles);
        assert_approx(upper[2], 11.0 + 2.0, DEFAULT_EPSILON);
        assert_approx(lower[2], 11.0 - 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_bands_symmetric() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&candles);
        let middle = Bollinger::middle(3, 2.0).compute(&candles);
        let lower = Bollinger::lower(3, 2.0).compute(&candles);

        for i in 2..5 {
            let half_width = upper[i] - middle[i];
            assert_approx(middle[i] - lower[i], half_width, DEFAULT_EPSILON);
        }
    }

    #[test]
    fn bollinger_constant_price_zero_width() {
        let candles = make_candles(&[100.0, 100.0, 100.0, 100.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&candles);
        let lower = Bollinger::lower(3, 2.0).compute(&candles);

        assert_approx(upper[2], 100.0, DEFAULT_EPSILON);
        assert_approx(lower[2], 100.0, DEFAULT_EPSILON);
        // %B is undefined on a collapsed envelope.
        assert_eq!(percent_b(100.0, upper[2], lower[2]), None);
    }

    #[test]
    fn percent_b_position() {
        assert_approx(percent_b(10.0, 12.0, 8.0).unwrap(), 0.5, DEFAULT_EPSILON);
        assert_approx(percent_b(8.0, 12.0, 8.0).unwrap(), 0.0, DEFAULT_EPSILON);
        assert_approx(percent_b(13.0, 12.0, 8.0).unwrap(), 1.25, DEFAULT_EPSILON);
    }

    #[test]
    fn bollinger_nan_window_skipped() {
        let mut candles = make_candles(&[10.0, 11.0, 12.0, 13.0]);
        candles[2].close = f64::NAN;
        let result = Bollinger::upper(3, 2.0).compute(&candles);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
    }

    #[test]
    fn bollinger_lookback() {
        assert_eq!(Bollinger::upper(20, 2.0).lookback(), 19);
    }
}
