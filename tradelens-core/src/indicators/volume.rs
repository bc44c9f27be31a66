//! Rolling mean of volume, the baseline for spike detection.
//!
//! A bar's volume ratio is volume / VolumeSma; the spike strategy
//! treats ratios above its threshold as abnormal activity.
//! Lookback: period - 1.

use crate::domain::Candle;

use super::sma::sma_of_series;
use super::Indicator;

#[derive(Debug, Clone)]
pub struct VolumeSma {
    period: usize,
    name: String,
}

impl VolumeSma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "volume SMA period must be >= 1");
        Self {
            period,
            name: format!("volume_sma_{period}"),
        }
    }
}

impl Indicator for VolumeSma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
        sma_of_series(&volumes, self.period)
    }
}

/// volume / average-volume at one bar. `None` when the average is
/// missing or zero (a dead market has no meaningful ratio).
pub fn volume_ratio(volume: f64, avg_volume: f64) -> Option<f64> {
    if !avg_volume.is_finite() || avg_volume <= 0.0 {
        return None;
    }
    Some(volume / avg_volume)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles_with_volume, DEFAULT_EPSILON};

    #[test]
    fn volume_sma_known_values() {
        let candles = make_candles_with_volume(
            &[10.0, 11.0, 12.0, 13.0],
            &[1000.0, 2000.0, 3000.0, 4000.0],
        );
        let result = VolumeSma::new(3).compute(&candles);
        assert!(result[1].is_nan());
        assert_approx(result[2], 2000.0, DEFAULT_EPSILON);
        assert_approx(result[3], 3000.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ratio_against_zero_average_is_none() {
        assert_eq!(volume_ratio(5000.0, 0.0), None);
        assert_eq!(volume_ratio(5000.0, f64::NAN), None);
        assert_approx(volume_ratio(5000.0, 2000.0).unwrap(), 2.5, DEFAULT_EPSILON);
    }
}
