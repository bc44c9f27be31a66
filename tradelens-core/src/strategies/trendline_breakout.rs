//! Trendline breakout strategy.
//!
//! Each bar refits support/resistance over the trailing `lookback`
//! window (current bar excluded, no look-ahead) and projects both lines
//! one bar forward to the current index. Entry: the close crosses up
//! through either projected line while flat. Exit while long: the close
//! crosses down through either line, or breaks below the most recent
//! confirmed swing low. Entries within `min_signal_spacing` bars of the
//! previous signal are suppressed to avoid chatter on a noisy tape.

use serde::{Deserialize, Serialize};

use crate::domain::CandleSeries;
use crate::indicators::{fit_trendlines, rw_bottom, IndicatorFrame, TrendlineConfig};

use super::{build_run, ensure_warmup, PositionTracker, Strategy, StrategyError, StrategyRun};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendlineBreakoutParams {
    /// Bars in the fitting window.
    pub lookback: usize,
    /// Pivot confirmation half-window for swing lows.
    pub order: usize,
    /// Minimum bars between the previous signal and a new entry.
    pub min_signal_spacing: usize,
    /// Initial slope step for the line optimizer.
    pub opt_step: f64,
    /// Optimizer termination step.
    pub min_step: f64,
}

impl Default for TrendlineBreakoutParams {
    fn default() -> Self {
        let fit = TrendlineConfig::default();
        Self {
            lookback: 30,
            order: 4,
            min_signal_spacing: 5,
            opt_step: fit.opt_step,
            min_step: fit.min_step,
        }
    }
}

impl TrendlineBreakoutParams {
    fn fit_config(&self) -> TrendlineConfig {
        TrendlineConfig {
            opt_step: self.opt_step,
            min_step: self.min_step,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrendlineBreakout {
    params: TrendlineBreakoutParams,
}

impl TrendlineBreakout {
    pub fn new(params: TrendlineBreakoutParams) -> Self {
        assert!(params.lookback >= 3, "lookback must be >= 3");
        assert!(params.order >= 1, "order must be >= 1");
        Self { params }
    }

    pub fn default_params() -> Self {
        Self::new(TrendlineBreakoutParams::default())
    }
}

impl Strategy for TrendlineBreakout {
    fn name(&self) -> &str {
        "trendline_breakout"
    }

    fn warmup_bars(&self) -> usize {
        self.params.lookback + 2
    }

    fn run(&self, series: &CandleSeries) -> Result<StrategyRun, StrategyError> {
        ensure_warmup(series, self.warmup_bars())?;

        let n = series.len();
        let closes = series.closes();
        let lookback = self.params.lookback;
        let fit_config = self.params.fit_config();

        // Projected levels per bar: the line fitted over the window
        // ending just before bar i, evaluated at bar i's position.
        let mut support = vec![f64::NAN; n];
        let mut resistance = vec![f64::NAN; n];
        for i in lookback..n {
            if let Some(pair) = fit_trendlines(&closes[i - lookback..i], &fit_config) {
                support[i] = pair.support.value_at(lookback);
                resistance[i] = pair.resistance.value_at(lookback);
            }
        }

        let mut frame = IndicatorFrame::new();
        frame.insert("trend_support", support.clone());
        frame.insert("trend_resistance", resistance.clone());

        let mut buy = vec![false; n];
        let mut sell = vec![false; n];
        let mut position = vec![0i8; n];
        let mut tracker = PositionTracker::new();
        let mut last_signal: Option<usize> = None;
        let mut last_swing_low = f64::NAN;

        for i in 0..n {
            // Swing lows confirm `order` bars late; usable from then on.
            if rw_bottom(&closes, i, self.params.order) {
                last_swing_low = closes[i - self.params.order];
            }

            let levels = i.checked_sub(1).and_then(|p| {
                let sup_prev = valid(support[p])?;
                let res_prev = valid(resistance[p])?;
                let sup = valid(support[i])?;
                let res = valid(resistance[i])?;
                Some((sup_prev, res_prev, sup, res))
            });

            if let Some((sup_prev, res_prev, sup, res)) = levels {
                let close = closes[i];
                let prev_close = closes[i - 1];

                if tracker.is_flat() {
                    let cross_up = (prev_close <= res_prev && close > res)
                        || (prev_close <= sup_prev && close > sup);
                    let spaced = last_signal
                        .map(|s| i - s >= self.params.min_signal_spacing)
                        .unwrap_or(true);
                    if cross_up && spaced && tracker.enter_long() {
                        buy[i] = true;
                        last_signal = Some(i);
                    }
                } else if tracker.is_long() {
                    let cross_down = (prev_close >= sup_prev && close < sup)
                        || (prev_close >= res_prev && close < res);
                    let swing_break = !last_swing_low.is_nan() && close < last_swing_low;
                    if (cross_down || swing_break) && tracker.exit_long() {
                        sell[i] = true;
                        last_signal = Some(i);
                    }
                }
            }
            position[i] = tracker.state().as_i8();
        }

        Ok(build_run(self.name(), series, frame, buy, sell, position))
    }
}

fn valid(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}
