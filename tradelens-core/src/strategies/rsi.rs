//! RSI threshold strategy.
//!
//! Entry fires on the downward cross INTO the oversold zone (prev >=
//! oversold, curr < oversold) while flat — buying the moment the market
//! becomes oversold, not on recovery. Exit fires while long on an
//! upward cross of the overbought level or a downward cross of the
//! midline.

use serde::{Deserialize, Serialize};

use crate::domain::CandleSeries;
use crate::indicators::{Indicator, IndicatorFrame, Rsi};

use super::{build_run, ensure_warmup, PositionTracker, Strategy, StrategyError, StrategyRun};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiThresholdParams {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    /// Midline exit level for longs.
    pub exit_level: f64,
}

impl Default for RsiThresholdParams {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
            exit_level: 50.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RsiThreshold {
    params: RsiThresholdParams,
    key: String,
}

impl RsiThreshold {
    pub fn new(params: RsiThresholdParams) -> Self {
        assert!(params.period >= 1, "RSI period must be >= 1");
        let key = format!("rsi_{}", params.period);
        Self { params, key }
    }

    pub fn default_params() -> Self {
        Self::new(RsiThresholdParams::default())
    }
}

impl Strategy for RsiThreshold {
    fn name(&self) -> &str {
        "rsi_threshold"
    }

    fn warmup_bars(&self) -> usize {
        // Crossing needs two defined RSI values; the first appears at
        // bar `period`.
        self.params.period + 2
    }

    fn run(&self, series: &CandleSeries) -> Result<StrategyRun, StrategyError> {
        ensure_warmup(series, self.warmup_bars())?;

        let n = series.len();
        let rsi = Rsi::new(self.params.period);
        let mut frame = IndicatorFrame::new();
        frame.insert(rsi.name(), rsi.compute(series.candles()));

        let mut buy = vec![false; n];
        let mut sell = vec![false; n];
        let mut position = vec![0i8; n];
        let mut tracker = PositionTracker::new();

        for i in 0..n {
            if let (Some(prev), Some(curr)) = (
                i.checked_sub(1).and_then(|p| frame.get(&self.key, p)),
                frame.get(&self.key, i),
            ) {
                if tracker.is_flat()
                    && curr < self.params.oversold
                    && prev >= self.params.oversold
                {
                    buy[i] = tracker.enter_long();
                } else if tracker.is_long() {
                    let overbought_cross =
                        curr > self.params.overbought && prev <= self.params.overbought;
                    let midline_cross =
                        curr < self.params.exit_level && prev >= self.params.exit_level;
                    if overbought_cross || midline_cross {
                        sell[i] = tracker.exit_long();
                    }
                }
            }
            position[i] = tracker.state().as_i8();
        }

        Ok(build_run(self.name(), series, frame, buy, sell, position))
    }
}
