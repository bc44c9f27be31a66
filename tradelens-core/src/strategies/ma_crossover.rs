//! Moving average crossover strategy — golden cross entry, death cross
//! exit.
//!
//! Both checks compare the current and previous bar; all four values
//! must be defined or the bar is a no-op.

use serde::{Deserialize, Serialize};

use crate::domain::CandleSeries;
use crate::indicators::{Ema, Indicator, IndicatorFrame, Sma};

use super::{build_run, ensure_warmup, PositionTracker, Strategy, StrategyError, StrategyRun};

/// Moving average type selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaType {
    Sma,
    Ema,
}

impl MaType {
    fn prefix(&self) -> &'static str {
        match self {
            MaType::Sma => "sma",
            MaType::Ema => "ema",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub ma_type: MaType,
}

impl Default for MaCrossoverParams {
    fn default() -> Self {
        Self {
            fast_period: 10,
            slow_period: 30,
            ma_type: MaType::Sma,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MaCrossover {
    params: MaCrossoverParams,
    fast_key: String,
    slow_key: String,
}

impl MaCrossover {
    pub fn new(params: MaCrossoverParams) -> Self {
        assert!(params.fast_period >= 1, "fast_period must be >= 1");
        assert!(
            params.slow_period > params.fast_period,
            "slow_period must be > fast_period"
        );
        let prefix = params.ma_type.prefix();
        let fast_key = format!("{prefix}_{}", params.fast_period);
        let slow_key = format!("{prefix}_{}", params.slow_period);
        Self {
            params,
            fast_key,
            slow_key,
        }
    }

    pub fn default_params() -> Self {
        Self::new(MaCrossoverParams::default())
    }

    fn compute_frame(&self, series: &CandleSeries) -> IndicatorFrame {
        let mut frame = IndicatorFrame::new();
        match self.params.ma_type {
            MaType::Sma => {
                let fast = Sma::new(self.params.fast_period);
                let slow = Sma::new(self.params.slow_period);
                frame.insert(fast.name(), fast.compute(series.candles()));
                frame.insert(slow.name(), slow.compute(series.candles()));
            }
            MaType::Ema => {
                let fast = Ema::new(self.params.fast_period);
                let slow = Ema::new(self.params.slow_period);
                frame.insert(fast.name(), fast.compute(series.candles()));
                frame.insert(slow.name(), slow.compute(series.candles()));
            }
        }
        frame
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn warmup_bars(&self) -> usize {
        self.params.slow_period + 1
    }

    fn run(&self, series: &CandleSeries) -> Result<StrategyRun, StrategyError> {
        ensure_warmup(series, self.warmup_bars())?;

        let n = series.len();
        let frame = self.compute_frame(series);

        let mut buy = vec![false; n];
        let mut sell = vec![false; n];
        let mut position = vec![0i8; n];
        let mut tracker = PositionTracker::new();

        for i in 0..n {
            let values = i.checked_sub(1).and_then(|p| {
                Some((
                    frame.get(&self.fast_key, p)?,
                    frame.get(&self.slow_key, p)?,
                    frame.get(&self.fast_key, i)?,
                    frame.get(&self.slow_key, i)?,
                ))
            });
            if let Some((fast_prev, slow_prev, fast_cur, slow_cur)) = values {
                if fast_cur > slow_cur && fast_prev <= slow_prev && tracker.is_flat() {
                    buy[i] = tracker.enter_long();
                } else if fast_cur < slow_cur && fast_prev >= slow_prev && tracker.is_long() {
                    sell[i] = tracker.exit_long();
                }
            }
            position[i] = tracker.state().as_i8();
        }

        Ok(build_run(self.name(), series, frame, buy, sell, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Signal;
    use crate::strategies::{assert_position_invariant, make_series};

    fn fast_strategy() -> MaCrossover {
        MaCrossover::new(MaCrossoverParams {
            fast_period: 2,
            slow_period: 4,
            ma_type: MaType::Sma,
        })
    }

    #[test]
    fn golden_then_death_cross_single_round_trip() {
        // Flat, then a rally (fast SMA overtakes slow), then a slide
        // (fast drops back under slow).
        let closes = [
            100.0, 100.0, 100.0, 100.0, 100.0, // flat warmup
            101.0, 103.0, 105.0, 107.0, 109.0, // rally
            107.0, 104.0, 101.0, 98.0, 95.0, // slide
        ];
        let series = make_series(&closes);
        let run = fast_strategy().run(&series).unwrap();

        let buys = run.buy_indices();
        let sells = run.sell_indices();
        assert_eq!(buys.len(), 1, "exactly one golden cross: {buys:?}");
        assert_eq!(sells.len(), 1, "exactly one death cross: {sells:?}");
        assert!(buys[0] < sells[0]);

        // Long exactly between the crosses.
        for i in 0..closes.len() {
            let expected = if i >= buys[0] && i < sells[0] { 1 } else { 0 };
            assert_eq!(run.position[i], expected, "position at bar {i}");
        }
        assert_position_invariant(&run);
    }

    #[test]
    fn no_cross_no_signal() {
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + i as f64).collect();
        let run = fast_strategy().run(&make_series(&closes)).unwrap();
        // Fast stays above slow the whole time after warmup: the state
        // is only entered on a cross, which a pure trend never makes.
        assert!(run.buy_indices().is_empty());
        assert_eq!(run.current_signal, Signal::HoldCash);
    }

    #[test]
    fn current_signal_hold_long_between_crosses() {
        let closes = [
            100.0, 100.0, 100.0, 100.0, 100.0, 101.0, 103.0, 105.0, 107.0, 109.0, 111.0,
        ];
        let run = fast_strategy().run(&make_series(&closes)).unwrap();
        assert_eq!(run.buy_indices().len(), 1);
        assert_eq!(run.current_signal, Signal::HoldLong);
    }

    #[test]
    fn ema_variant_uses_ema_keys() {
        let strat = MaCrossover::new(MaCrossoverParams {
            fast_period: 3,
            slow_period: 6,
            ma_type: MaType::Ema,
        });
        assert_eq!(strat.fast_key, "ema_3");
        assert_eq!(strat.slow_key, "ema_6");
        assert_eq!(strat.warmup_bars(), 7);
    }

    #[test]
    #[should_panic(expected = "slow_period must be > fast_period")]
    fn rejects_inverted_periods() {
        MaCrossover::new(MaCrossoverParams {
            fast_period: 30,
            slow_period: 10,
            ma_type: MaType::Sma,
        });
    }

    #[test]
    fn insufficient_history_is_error() {
        let series = make_series(&[100.0; 10]);
        let err = MaCrossover::default_params().run(&series).unwrap_err();
        assert!(matches!(
            err,
            StrategyError::InsufficientData {
                required: 31,
                actual: 10
            }
        ));
    }
}
