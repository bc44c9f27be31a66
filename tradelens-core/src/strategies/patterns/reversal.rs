//! Reversal pattern strategy: head-and-shoulders (and inverse) and
//! double top/bottom.
//!
//! Pivots come from the confirmed rolling-window extrema, so every
//! pattern is only known `order` bars after its final shoulder or twin.
//! A bearish breakout opens a short (or closes a long); a bullish one
//! opens a long (or covers a short).

use serde::{Deserialize, Serialize};

use crate::domain::CandleSeries;
use crate::indicators::{rw_bottom, rw_top, volume_ratio, Indicator, IndicatorFrame, VolumeSma};

use super::{BreakoutScan, DetectedPattern, PatternDirection};
use crate::strategies::{
    build_run, ensure_warmup, PositionTracker, Strategy, StrategyError, StrategyRun,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReversalParams {
    /// Pivot confirmation half-window.
    pub order: usize,
    /// Max relative difference between the two shoulders of an H&S.
    pub shoulder_tolerance: f64,
    /// Max relative difference between the twins of a double top/bottom.
    pub twin_tolerance: f64,
    /// Min relative depth of the valley (peak) between twins.
    pub min_depth: f64,
    pub volume_period: usize,
    /// Volume ratio required to confirm a breakout.
    pub volume_threshold: f64,
    /// Bars after detection during which a breakout may fire.
    pub breakout_window: usize,
}

impl Default for ReversalParams {
    fn default() -> Self {
        Self {
            order: 5,
            shoulder_tolerance: 0.03,
            twin_tolerance: 0.02,
            min_depth: 0.03,
            volume_period: 20,
            volume_threshold: 1.5,
            breakout_window: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReversalPatterns {
    params: ReversalParams,
    volume_key: String,
}

/// A confirmed pivot: known at `detect_index`, located at
/// `extreme_index`.
#[derive(Debug, Clone, Copy)]
struct Pivot {
    detect_index: usize,
    extreme_index: usize,
    value: f64,
}

impl ReversalPatterns {
    pub fn new(params: ReversalParams) -> Self {
        assert!(params.order >= 1, "order must be >= 1");
        let volume_key = format!("volume_sma_{}", params.volume_period);
        Self { params, volume_key }
    }

    pub fn default_params() -> Self {
        Self::new(ReversalParams::default())
    }

    fn pivots(&self, closes: &[f64]) -> (Vec<Pivot>, Vec<Pivot>) {
        let order = self.params.order;
        let mut tops = Vec::new();
        let mut bottoms = Vec::new();
        for i in 0..closes.len() {
            if rw_top(closes, i, order) {
                tops.push(Pivot {
                    detect_index: i,
                    extreme_index: i - order,
                    value: closes[i - order],
                });
            }
            if rw_bottom(closes, i, order) {
                bottoms.push(Pivot {
                    detect_index: i,
                    extreme_index: i - order,
                    value: closes[i - order],
                });
            }
        }
        (tops, bottoms)
    }

    /// Run the full detection pass over one series.
    pub fn detect(&self, series: &CandleSeries) -> Vec<DetectedPattern> {
        let closes = series.closes();
        let (tops, bottoms) = self.pivots(&closes);
        let mut patterns = Vec::new();

        patterns.extend(self.head_and_shoulders(&closes, &tops, PatternDirection::Bearish));
        patterns.extend(self.head_and_shoulders(&closes, &bottoms, PatternDirection::Bullish));
        patterns.extend(self.double_extreme(&closes, &tops, PatternDirection::Bearish));
        patterns.extend(self.double_extreme(&closes, &bottoms, PatternDirection::Bullish));

        patterns.sort_by_key(|p| p.detect_index);
        patterns
    }

    /// Three consecutive pivots where the middle dominates both outer
    /// ones and the outer pair match within the shoulder tolerance.
    /// For the inverse (bullish) form the pivots are bottoms and every
    /// comparison flips.
    fn head_and_shoulders(
        &self,
        closes: &[f64],
        pivots: &[Pivot],
        direction: PatternDirection,
    ) -> Vec<DetectedPattern> {
        let mut out = Vec::new();
        for triple in pivots.windows(3) {
            let (left, head, right) = (triple[0], triple[1], triple[2]);
            let head_dominates = match direction {
                PatternDirection::Bearish => head.value > left.value && head.value > right.value,
                PatternDirection::Bullish => head.value < left.value && head.value < right.value,
            };
            if !head_dominates {
                continue;
            }
            if (left.value - right.value).abs() / left.value > self.params.shoulder_tolerance {
                continue;
            }

            // Neckline from the two valleys (bearish) or crests
            // (bullish) between the shoulders and the head.
            let first = between(closes, left.extreme_index, head.extreme_index, direction);
            let second = between(closes, head.extreme_index, right.extreme_index, direction);
            let neckline = (first + second) / 2.0;
            let height = (head.value - neckline).abs();
            let (name, target) = match direction {
                PatternDirection::Bearish => ("head_and_shoulders", neckline - height),
                PatternDirection::Bullish => ("inverse_head_and_shoulders", neckline + height),
            };
            out.push(DetectedPattern {
                name,
                direction,
                detect_index: right.detect_index,
                neckline,
                target,
                stop: head.value,
            });
        }
        out
    }

    /// Two consecutive pivots matching within the twin tolerance, with
    /// a sufficiently deep retracement between them.
    fn double_extreme(
        &self,
        closes: &[f64],
        pivots: &[Pivot],
        direction: PatternDirection,
    ) -> Vec<DetectedPattern> {
        let mut out = Vec::new();
        for pair in pivots.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if (first.value - second.value).abs() / first.value > self.params.twin_tolerance {
                continue;
            }

            let neckline = between(closes, first.extreme_index, second.extreme_index, direction);
            let reference = match direction {
                PatternDirection::Bearish => first.value.min(second.value),
                PatternDirection::Bullish => first.value.max(second.value),
            };
            if (reference - neckline).abs() / reference < self.params.min_depth {
                continue;
            }

            let height = (reference - neckline).abs();
            let (name, target) = match direction {
                PatternDirection::Bearish => ("double_top", neckline - height),
                PatternDirection::Bullish => ("double_bottom", neckline + height),
            };
            out.push(DetectedPattern {
                name,
                direction,
                detect_index: second.detect_index,
                neckline,
                target,
                stop: reference,
            });
        }
        out
    }
}

/// Retracement extreme strictly between two pivot bars: the lowest
/// close for top-based (bearish) patterns, the highest for
/// bottom-based ones.
fn between(closes: &[f64], start: usize, end: usize, direction: PatternDirection) -> f64 {
    let window = &closes[start + 1..end];
    match direction {
        PatternDirection::Bearish => window.iter().copied().fold(f64::INFINITY, f64::min),
        PatternDirection::Bullish => window.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

impl Strategy for ReversalPatterns {
    fn name(&self) -> &str {
        "reversal_patterns"
    }

    fn warmup_bars(&self) -> usize {
        // Three pivots with confirmation lag, or the volume average,
        // whichever needs more.
        (6 * self.params.order + 1).max(self.params.volume_period + 1)
    }

    fn run(&self, series: &CandleSeries) -> Result<StrategyRun, StrategyError> {
        ensure_warmup(series, self.warmup_bars())?;

        let n = series.len();
        let candles = series.candles();
        let vol_sma = VolumeSma::new(self.params.volume_period);
        let mut frame = IndicatorFrame::new();
        frame.insert(vol_sma.name(), vol_sma.compute(candles));

        let patterns = self.detect(series);
        let mut scan = BreakoutScan::new(
            patterns,
            self.params.breakout_window,
            self.params.volume_threshold,
        );

        let mut buy = vec![false; n];
        let mut sell = vec![false; n];
        let mut position = vec![0i8; n];
        let mut tracker = PositionTracker::new();

        for i in 0..n {
            let close = candles[i].close;
            let ratio = frame
                .get(&self.volume_key, i)
                .and_then(|avg| volume_ratio(candles[i].volume, avg));

            if let Some(pattern) = scan.check(i, close, ratio) {
                match pattern.direction {
                    PatternDirection::Bearish => {
                        if tracker.is_long() {
                            sell[i] = tracker.exit_long();
                        } else if tracker.is_flat() {
                            sell[i] = tracker.enter_short();
                        }
                    }
                    PatternDirection::Bullish => {
                        if tracker.is_short() {
                            buy[i] = tracker.exit_short();
                        } else if tracker.is_flat() {
                            buy[i] = tracker.enter_long();
                        }
                    }
                }
            }
            position[i] = tracker.state().as_i8();
        }

        Ok(build_run(self.name(), series, frame, buy, sell, position))
    }
}
