//! Chart-pattern detection shared by the reversal and continuation
//! strategies.
//!
//! Detection runs as a separate pass before the signal walk: pivots and
//! window fits produce a list of `DetectedPattern`s, each carrying a
//! neckline and a measured-move target. Signals then fire only when the
//! close crosses the neckline in the pattern's implied direction with
//! volume confirmation, within a bounded number of bars after
//! detection. Each pattern fires at most once; a pattern whose window
//! passes without a qualifying breakout expires silently.

pub mod continuation;
pub mod reversal;

use serde::{Deserialize, Serialize};

/// Implied breakout direction of a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternDirection {
    Bullish,
    Bearish,
}

/// One detected chart pattern, ready for the breakout scan.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedPattern {
    pub name: &'static str,
    pub direction: PatternDirection,
    /// Bar at which the pattern became known. Pivot confirmation lags
    /// the extremes, so this is always later than the shape itself —
    /// signals may only fire strictly after it.
    pub detect_index: usize,
    /// Level whose breach confirms the pattern.
    pub neckline: f64,
    /// Measured-move objective: pattern height projected beyond the
    /// neckline.
    pub target: f64,
    /// Invalidation level (the pattern extreme on the wrong side).
    pub stop: f64,
}

impl DetectedPattern {
    /// Whether `close` breaches the neckline in the implied direction.
    pub fn neckline_breached(&self, close: f64) -> bool {
        match self.direction {
            PatternDirection::Bullish => close > self.neckline,
            PatternDirection::Bearish => close < self.neckline,
        }
    }
}

/// First qualifying breakout scan state for one pattern list.
///
/// Shared by both pattern strategies: bars strictly after
/// `detect_index` and within `breakout_window` of it are eligible; a
/// breach with volume confirmation consumes the pattern, expiry
/// consumes it silently.
#[derive(Debug)]
pub(crate) struct BreakoutScan {
    patterns: Vec<DetectedPattern>,
    consumed: Vec<bool>,
    breakout_window: usize,
    volume_threshold: f64,
}

impl BreakoutScan {
    pub(crate) fn new(
        patterns: Vec<DetectedPattern>,
        breakout_window: usize,
        volume_threshold: f64,
    ) -> Self {
        let consumed = vec![false; patterns.len()];
        Self {
            patterns,
            consumed,
            breakout_window,
            volume_threshold,
        }
    }

    /// Check bar `i`; returns the triggering pattern if one fires.
    /// At most one pattern fires per bar.
    pub(crate) fn check(
        &mut self,
        i: usize,
        close: f64,
        volume_ratio: Option<f64>,
    ) -> Option<DetectedPattern> {
        for (idx, pattern) in self.patterns.iter().enumerate() {
            if self.consumed[idx] || i <= pattern.detect_index {
                continue;
            }
            if i - pattern.detect_index > self.breakout_window {
                // Expired: no breakout arrived in time.
                self.consumed[idx] = true;
                continue;
            }
            let confirmed = volume_ratio
                .map(|r| r >= self.volume_threshold)
                .unwrap_or(false);
            if confirmed && pattern.neckline_breached(close) {
                self.consumed[idx] = true;
                return Some(pattern.clone());
            }
        }
        None
    }
}
