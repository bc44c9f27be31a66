//! Volume spike strategy.
//!
//! Entry: abnormal volume (ratio over the rolling average above the
//! spike multiplier) on a bullish bar (close-to-close change above the
//! price threshold) while flat. Exit while long, whichever comes first:
//! bearish spike, take-profit, stop-loss, or the max holding period.

use serde::{Deserialize, Serialize};

use crate::domain::CandleSeries;
use crate::indicators::{volume_ratio, Indicator, IndicatorFrame, VolumeSma};

use super::{build_run, ensure_warmup, PositionTracker, Strategy, StrategyError, StrategyRun};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeSpikeParams {
    pub volume_period: usize,
    /// Volume ratio above this counts as a spike.
    pub spike_multiplier: f64,
    /// Fractional close-to-close change that makes a spike directional.
    pub price_change_threshold: f64,
    /// Fractional gain over entry that takes profit.
    pub take_profit: f64,
    /// Fractional loss under entry that stops out.
    pub stop_loss: f64,
    /// Bars a position may be held before a forced exit.
    pub max_holding_bars: usize,
}

impl Default for VolumeSpikeParams {
    fn default() -> Self {
        Self {
            volume_period: 20,
            spike_multiplier: 2.0,
            price_change_threshold: 0.02,
            take_profit: 0.05,
            stop_loss: 0.03,
            max_holding_bars: 24,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VolumeSpike {
    params: VolumeSpikeParams,
    volume_key: String,
}

impl VolumeSpike {
    pub fn new(params: VolumeSpikeParams) -> Self {
        assert!(params.volume_period >= 1, "volume_period must be >= 1");
        assert!(params.max_holding_bars >= 1, "max_holding_bars must be >= 1");
        let volume_key = format!("volume_sma_{}", params.volume_period);
        Self { params, volume_key }
    }

    pub fn default_params() -> Self {
        Self::new(VolumeSpikeParams::default())
    }
}

impl Strategy for VolumeSpike {
    fn name(&self) -> &str {
        "volume_spike"
    }

    fn warmup_bars(&self) -> usize {
        self.params.volume_period + 1
    }

    fn run(&self, series: &CandleSeries) -> Result<StrategyRun, StrategyError> {
        ensure_warmup(series, self.warmup_bars())?;

        let n = series.len();
        let candles = series.candles();
        let vol_sma = VolumeSma::new(self.params.volume_period);
        let mut frame = IndicatorFrame::new();
        frame.insert(vol_sma.name(), vol_sma.compute(candles));

        let mut buy = vec![false; n];
        let mut sell = vec![false; n];
        let mut position = vec![0i8; n];
        let mut tracker = PositionTracker::new();

        // Entry context for the exit rules; valid only while long.
        let mut entry_price = 0.0;
        let mut entry_index = 0usize;

        for i in 1..n {
            let close = candles[i].close;
            let prev_close = candles[i - 1].close;
            let change = if prev_close != 0.0 {
                (close - prev_close) / prev_close
            } else {
                0.0
            };
            let ratio = frame
                .get(&self.volume_key, i)
                .and_then(|avg| volume_ratio(candles[i].volume, avg));
            let spike = ratio
                .map(|r| r > self.params.spike_multiplier)
                .unwrap_or(false);

            if tracker.is_flat() {
                if spike && change > self.params.price_change_threshold {
                    buy[i] = tracker.enter_long();
                    entry_price = close;
                    entry_index = i;
                }
            } else if tracker.is_long() {
                let bearish_spike = spike && change < -self.params.price_change_threshold;
                let take_profit = close >= entry_price * (1.0 + self.params.take_profit);
                let stop_loss = close <= entry_price * (1.0 - self.params.stop_loss);
                let held_too_long = i - entry_index >= self.params.max_holding_bars;
                if bearish_spike || take_profit || stop_loss || held_too_long {
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
    use crate::strategies::{assert_position_invariant, make_series_with_volume};

    fn strategy(max_holding_bars: usize) -> VolumeSpike {
        VolumeSpike::new(VolumeSpikeParams {
            volume_period: 3,
            max_holding_bars,
            ..VolumeSpikeParams::default()
        })
    }

    #[test]
    fn bullish_spike_enters_take_profit_exits() {
        let closes = [100.0, 100.0, 100.0, 100.0, 103.0, 104.0, 106.0, 107.0];
        let mut volumes = vec![1000.0; closes.len()];
        volumes[4] = 5000.0; // spike on the +3% bar
        let series = make_series_with_volume(&closes, &volumes);
        let run = strategy(24).run(&series).unwrap();

        assert_eq!(run.buy_indices(), vec![4]);
        // Entry at 103; the take-profit level 108.15 is never reached
        // and nothing else triggers, so the position is still open.
        assert!(run.sell_indices().is_empty());
        assert_position_invariant(&run);
    }

    #[test]
    fn take_profit_fires() {
        let closes = [100.0, 100.0, 100.0, 100.0, 103.0, 106.0, 109.0];
        let mut volumes = vec![1000.0; closes.len()];
        volumes[4] = 5000.0;
        let series = make_series_with_volume(&closes, &volumes);
        let run = strategy(24).run(&series).unwrap();

        assert_eq!(run.buy_indices(), vec![4]);
        // 109 >= 103 * 1.05 = 108.15.
        assert_eq!(run.sell_indices(), vec![6]);
        assert_position_invariant(&run);
    }

    #[test]
    fn stop_loss_fires() {
        let closes = [100.0, 100.0, 100.0, 100.0, 103.0, 101.0, 99.0];
        let mut volumes = vec![1000.0; closes.len()];
        volumes[4] = 5000.0;
        let series = make_series_with_volume(&closes, &volumes);
        let run = strategy(24).run(&series).unwrap();

        assert_eq!(run.buy_indices(), vec![4]);
        // 99 <= 103 * 0.97 = 99.91.
        assert_eq!(run.sell_indices(), vec![6]);
        assert_position_invariant(&run);
    }

    #[test]
    fn bearish_spike_exits() {
        // The entry spike has to leave the rolling window before the
        // exit bar, or it inflates the average and hides the second
        // spike.
        let closes = [100.0, 100.0, 100.0, 100.0, 103.0, 103.5, 103.5, 100.4];
        let mut volumes = vec![1000.0; closes.len()];
        volumes[4] = 5000.0;
        volumes[7] = 6000.0; // bearish spike: -3.0% on huge volume
        let series = make_series_with_volume(&closes, &volumes);
        let run = strategy(24).run(&series).unwrap();

        assert_eq!(run.buy_indices(), vec![4]);
        assert_eq!(run.sell_indices(), vec![7]);
        assert_position_invariant(&run);
    }

    #[test]
    fn max_holding_period_forces_exit() {
        let mut closes = vec![100.0, 100.0, 100.0, 100.0, 103.0];
        closes.extend(std::iter::repeat(103.5).take(6)); // drift, no TP/SL
        let mut volumes = vec![1000.0; closes.len()];
        volumes[4] = 5000.0;
        let series = make_series_with_volume(&closes, &volumes);
        let run = strategy(3).run(&series).unwrap();

        assert_eq!(run.buy_indices(), vec![4]);
        // Held 3 bars: forced out at bar 7.
        assert_eq!(run.sell_indices(), vec![7]);
        assert_position_invariant(&run);
    }

    #[test]
    fn quiet_tape_never_enters() {
        let closes = [100.0, 102.5, 100.0, 102.5, 100.0, 102.5, 100.0];
        let volumes = vec![1000.0; closes.len()];
        let series = make_series_with_volume(&closes, &volumes);
        let run = strategy(24).run(&series).unwrap();
        // Plenty of >2% bars but volume never spikes.
        assert!(run.buy_indices().is_empty());
    }
}
