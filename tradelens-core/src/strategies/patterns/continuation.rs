//! Continuation pattern strategy: triangles, flags and rectangles.
//!
//! A consolidation window only counts as a continuation pattern when it
//! follows an established trend, so detection gates on two things: the
//! regression slope of the bars leading into the window, and which side
//! of the trend moving average the latest close sits on. The window
//! itself is classified from the fitted support/resistance pair; a
//! breakout with volume confirmation then trades in the direction of
//! the prior trend, and the open position is managed against the
//! pattern's measured-move target and its opposite line as the stop.

use serde::{Deserialize, Serialize};

use crate::domain::CandleSeries;
use crate::indicators::trendline::least_squares;
use crate::indicators::{
    fit_trendlines_high_low, volume_ratio, Indicator, IndicatorFrame, Sma, TrendlineConfig,
    VolumeSma,
};

use super::{BreakoutScan, DetectedPattern, PatternDirection};
use crate::strategies::{
    build_run, ensure_warmup, PositionTracker, Strategy, StrategyError, StrategyRun,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinuationParams {
    /// Bars in one consolidation window.
    pub pattern_window: usize,
    /// Step between scanned window ends.
    pub stride: usize,
    /// Bars of price action before the window used for the trend slope.
    pub trend_slope_window: usize,
    /// Moving average the latest close must agree with for a trend.
    pub trend_ma_period: usize,
    /// Normalized line slope at or below which a line counts as flat.
    /// Also the tolerance for two lines counting as parallel.
    pub flat_slope: f64,
    pub volume_period: usize,
    /// Volume ratio required to confirm a breakout.
    pub volume_threshold: f64,
    /// Bars after detection during which a breakout may fire.
    pub breakout_window: usize,
}

impl Default for ContinuationParams {
    fn default() -> Self {
        Self {
            pattern_window: 20,
            stride: 10,
            trend_slope_window: 20,
            trend_ma_period: 50,
            flat_slope: 0.25,
            volume_period: 20,
            volume_threshold: 1.5,
            breakout_window: 20,
        }
    }
}

/// Trend state leading into a consolidation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone)]
pub struct ContinuationPatterns {
    params: ContinuationParams,
    volume_key: String,
}

impl ContinuationPatterns {
    pub fn new(params: ContinuationParams) -> Self {
        assert!(params.pattern_window >= 3, "pattern_window must be >= 3");
        assert!(params.stride >= 1, "stride must be >= 1");
        assert!(
            params.trend_slope_window >= 2,
            "trend_slope_window must be >= 2"
        );
        assert!(params.volume_period >= 1, "volume_period must be >= 1");
        let volume_key = format!("volume_sma_{}", params.volume_period);
        Self { params, volume_key }
    }

    pub fn default_params() -> Self {
        Self::new(ContinuationParams::default())
    }

    /// Run the full detection pass over one series.
    pub fn detect(&self, series: &CandleSeries) -> Vec<DetectedPattern> {
        let candles = series.candles();
        let n = candles.len();
        let w = self.params.pattern_window;
        let closes = series.closes();
        let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
        let sma = Sma::new(self.params.trend_ma_period).compute(candles);
        let fit_config = TrendlineConfig::default();

        let mut patterns = Vec::new();
        // The earliest window that still has trend context before it.
        let mut end = w + self.params.trend_slope_window;
        while end <= n {
            let start = end - w;
            if let Some(trend) = self.trend_at(&closes, &sma, start, end) {
                if let Some(pattern) = self.classify_window(
                    &highs[start..end],
                    &lows[start..end],
                    &closes[start..end],
                    &fit_config,
                    trend,
                    end - 1,
                ) {
                    patterns.push(pattern);
                }
            }
            end += self.params.stride;
        }
        patterns
    }

    /// Trend into the window at `start`: the regression slope over the
    /// preceding bars and the moving-average side of the latest close
    /// must agree, otherwise there is no trend to continue.
    fn trend_at(&self, closes: &[f64], sma: &[f64], start: usize, end: usize) -> Option<Trend> {
        let sw = self.params.trend_slope_window;
        if start < sw {
            return None;
        }
        let slope = least_squares(&closes[start - sw..start]).slope;
        let last = end - 1;
        let ma = sma[last];
        if ma.is_nan() {
            return None;
        }
        if slope > 0.0 && closes[last] > ma {
            Some(Trend::Up)
        } else if slope < 0.0 && closes[last] < ma {
            Some(Trend::Down)
        } else {
            None
        }
    }

    /// Fit the window's bounding lines and classify their shape.
    fn classify_window(
        &self,
        highs: &[f64],
        lows: &[f64],
        closes: &[f64],
        fit_config: &TrendlineConfig,
        trend: Trend,
        detect_index: usize,
    ) -> Option<DetectedPattern> {
        let pair = fit_trendlines_high_low(highs, lows, closes, fit_config)?;
        let w = closes.len();

        // Slopes normalized by the window's price range, so the same
        // flatness threshold works at any price level.
        let range = highs.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            - lows.iter().copied().fold(f64::INFINITY, f64::min);
        if range <= 0.0 {
            return None;
        }
        let res_n = pair.resistance.slope * w as f64 / range;
        let sup_n = pair.support.slope * w as f64 / range;

        let (name, direction) = classify(res_n, sup_n, self.params.flat_slope, trend)?;

        // Breach level is the line projected one bar past the window;
        // the measured move is the channel height at the window start.
        let (neckline, stop) = match direction {
            PatternDirection::Bullish => (pair.resistance.value_at(w), pair.support.value_at(w)),
            PatternDirection::Bearish => (pair.support.value_at(w), pair.resistance.value_at(w)),
        };
        let height = (pair.resistance.value_at(0) - pair.support.value_at(0)).abs();
        let target = match direction {
            PatternDirection::Bullish => neckline + height,
            PatternDirection::Bearish => neckline - height,
        };

        Some(DetectedPattern {
            name,
            direction,
            detect_index,
            neckline,
            target,
            stop,
        })
    }
}

/// Map normalized line slopes to a pattern kind.
///
/// Triangles with an inherent bias (ascending/descending) only count
/// when the trend agrees with that bias; symmetrical triangles,
/// rectangles and flags continue whichever trend preceded them. A flag
/// is a parallel channel sloping against the trend.
fn classify(
    res_n: f64,
    sup_n: f64,
    flat: f64,
    trend: Trend,
) -> Option<(&'static str, PatternDirection)> {
    let res_flat = res_n.abs() <= flat;
    let sup_flat = sup_n.abs() <= flat;
    let with_trend = match trend {
        Trend::Up => PatternDirection::Bullish,
        Trend::Down => PatternDirection::Bearish,
    };

    if res_flat && sup_n > flat {
        return (trend == Trend::Up).then_some(("ascending_triangle", PatternDirection::Bullish));
    }
    if sup_flat && res_n < -flat {
        return (trend == Trend::Down)
            .then_some(("descending_triangle", PatternDirection::Bearish));
    }
    if res_n < -flat && sup_n > flat {
        return Some(("symmetrical_triangle", with_trend));
    }
    if res_flat && sup_flat {
        return Some(("rectangle", with_trend));
    }

    let parallel = (res_n - sup_n).abs() <= flat;
    let counter_trend = match trend {
        Trend::Up => res_n < -flat && sup_n < -flat,
        Trend::Down => res_n > flat && sup_n > flat,
    };
    if parallel && counter_trend {
        return Some(("flag", with_trend));
    }
    None
}

impl Strategy for ContinuationPatterns {
    fn name(&self) -> &str {
        "continuation_patterns"
    }

    fn warmup_bars(&self) -> usize {
        (self.params.pattern_window + self.params.trend_slope_window)
            .max(self.params.trend_ma_period)
            + 1
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

        // Exit levels from the pattern that opened the position; NaN
        // compares false, so they are inert while flat.
        let mut stop = f64::NAN;
        let mut target = f64::NAN;

        for i in 0..n {
            let close = candles[i].close;
            let ratio = frame
                .get(&self.volume_key, i)
                .and_then(|avg| volume_ratio(candles[i].volume, avg));

            let mut exited = false;
            if tracker.is_long() && (close <= stop || close >= target) {
                sell[i] = tracker.exit_long();
                exited = true;
            } else if tracker.is_short() && (close >= stop || close <= target) {
                buy[i] = tracker.exit_short();
                exited = true;
            }

            if !exited {
                if let Some(pattern) = scan.check(i, close, ratio) {
                    match pattern.direction {
                        PatternDirection::Bullish => {
                            if tracker.is_short() {
                                buy[i] = tracker.exit_short();
                            } else if tracker.enter_long() {
                                buy[i] = true;
                                stop = pattern.stop;
                                target = pattern.target;
                            }
                        }
                        PatternDirection::Bearish => {
                            if tracker.is_long() {
                                sell[i] = tracker.exit_long();
                            } else if tracker.enter_short() {
                                sell[i] = true;
                                stop = pattern.stop;
                                target = pattern.target;
                            }
                        }
                    }
                }
            }
            position[i] = tracker.state().as_i8();
        }

        Ok(build_run(self.name(), series, frame, buy, sell, position))
    }
}
