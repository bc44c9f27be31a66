//! Relative Strength Index (RSI).
//!
//! Uses plain rolling means of gains and losses (not Wilder smoothing):
//!   avg_gain[t] = mean of positive changes over the last `period` bars
//!   avg_loss[t] = mean of |negative changes| over the same window
//!   RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period (the first change only exists at bar 1).
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0;
//! both zero (flat window) → RSI = 50.

use crate::domain::Candle;

use super::Indicator;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period + 1 {
            return result;
        }

        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for i in 1..n {
            let curr = candles[i].close;
            let prev = candles[i - 1].close;
            if curr.is_nan() || prev.is_nan() {
                continue;
            }
            let change = curr - prev;
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }

        for i in self.period..n {
            let start = i + 1 - self.period;
            let gain_window = &gains[start..=i];
            let loss_window = &losses[start..=i];
            if gain_window.iter().any(|v| v.is_nan()) {
                continue;
            }
            let avg_gain = gain_window.iter().sum::<f64>() / self.period as f64;
            let avg_loss = loss_window.iter().sum::<f64>() / self.period as f64;
            result[i] = compute_rsi(avg_gain, avg_loss);
        }

        result
    }
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
