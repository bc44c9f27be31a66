//! Strategy engine — per-variant signal state machines over one candle
//! series.
//!
//! Every variant shares the same contract: candles in, a `StrategyRun`
//! out with per-bar buy/sell flags, a position trace, the latest-bar
//! signal, and the most recent signal events. The bar walk is strictly
//! sequential (each bar's transition depends on the previous bar's
//! position), so no variant parallelizes within a run. Different
//! symbols are independent and may run concurrently.
//!
//! Strategies never reference portfolio or account state — they receive
//! candle history and precomputed indicator values, nothing else.

pub mod bollinger;
pub mod ma_crossover;
pub mod patterns;
pub mod rsi;
pub mod trendline_breakout;
pub mod volume_spike;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::domain::{CandleSeries, PositionState, Signal, SignalKind, SignalRecord};
use crate::indicators::IndicatorFrame;

pub use bollinger::{BollingerReversion, BollingerReversionParams};
pub use ma_crossover::{MaCrossover, MaCrossoverParams, MaType};
pub use patterns::continuation::{ContinuationPatterns, ContinuationParams};
pub use patterns::reversal::{ReversalPatterns, ReversalParams};
pub use patterns::{DetectedPattern, PatternDirection};
pub use rsi::{RsiThreshold, RsiThresholdParams};
pub use trendline_breakout::{TrendlineBreakout, TrendlineBreakoutParams};
pub use volume_spike::{VolumeSpike, VolumeSpikeParams};

/// Cap on the `recent_signals` list of a run, newest first.
pub const MAX_RECENT_SIGNALS: usize = 10;

/// Typed failure of a strategy run. Insufficient history is a value,
/// never a panic — dashboards render a "no data yet" state from it.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("insufficient data: {required} bars required, {actual} available")]
    InsufficientData { required: usize, actual: usize },
}

/// Output of one strategy run over one candle series.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    /// Per-bar entry flags, aligned with the candle series.
    pub buy_signal: Vec<bool>,
    /// Per-bar exit flags, aligned with the candle series.
    pub sell_signal: Vec<bool>,
    /// Per-bar position trace: -1 short, 0 flat, 1 long.
    pub position: Vec<i8>,
    /// Signal for the most recent bar.
    pub current_signal: Signal,
    /// Most recent signal events, newest first, capped at
    /// `MAX_RECENT_SIGNALS`.
    pub recent_signals: Vec<SignalRecord>,
    /// The indicator columns the walk consumed, for callers that render
    /// overlays.
    pub frame: IndicatorFrame,
}

impl StrategyRun {
    /// Bar indices where an entry fired.
    pub fn buy_indices(&self) -> Vec<usize> {
        flag_indices(&self.buy_signal)
    }

    /// Bar indices where an exit fired.
    pub fn sell_indices(&self) -> Vec<usize> {
        flag_indices(&self.sell_signal)
    }

    /// Total signal events in the run.
    pub fn signal_count(&self) -> usize {
        self.buy_signal.iter().filter(|&&b| b).count()
            + self.sell_signal.iter().filter(|&&s| s).count()
    }
}

fn flag_indices(flags: &[bool]) -> Vec<usize> {
    flags
        .iter()
        .enumerate()
        .filter_map(|(i, &f)| f.then_some(i))
        .collect()
}

/// Trait for strategy variants.
pub trait Strategy: Send + Sync {
    /// Human-readable name (e.g., "rsi_threshold").
    fn name(&self) -> &str;

    /// Minimum bars required before the walk can produce output.
    fn warmup_bars(&self) -> usize;

    /// Run the full bar walk over one series.
    fn run(&self, series: &CandleSeries) -> Result<StrategyRun, StrategyError>;
}

/// Position carried bar-to-bar during one walk.
///
/// Transitions are the only way to change state, and each returns
/// whether it applied, so a signal flag is only ever set together with
/// its transition. BUY requires flat; SELL-to-close requires long;
/// the short-side transitions exist for the pattern variants only.
#[derive(Debug, Clone, Copy)]
pub struct PositionTracker {
    state: PositionState,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self {
            state: PositionState::Flat,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    pub fn is_flat(&self) -> bool {
        self.state.is_flat()
    }

    pub fn is_long(&self) -> bool {
        self.state == PositionState::Long
    }

    pub fn is_short(&self) -> bool {
        self.state == PositionState::Short
    }

    /// Flat → Long. Returns false (no transition) from any other state.
    pub fn enter_long(&mut self) -> bool {
        if self.state.is_flat() {
            self.state = PositionState::Long;
            true
        } else {
            false
        }
    }

    /// Long → Flat.
    pub fn exit_long(&mut self) -> bool {
        if self.state == PositionState::Long {
            self.state = PositionState::Flat;
            true
        } else {
            false
        }
    }

    /// Flat → Short.
    pub fn enter_short(&mut self) -> bool {
        if self.state.is_flat() {
            self.state = PositionState::Short;
            true
        } else {
            false
        }
    }

    /// Short → Flat.
    pub fn exit_short(&mut self) -> bool {
        if self.state == PositionState::Short {
            self.state = PositionState::Flat;
            true
        } else {
            false
        }
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Guard shared by every variant: typed error instead of a partial run.
pub(crate) fn ensure_warmup(
    series: &CandleSeries,
    required: usize,
) -> Result<(), StrategyError> {
    if series.len() < required {
        return Err(StrategyError::InsufficientData {
            required,
            actual: series.len(),
        });
    }
    Ok(())
}

/// Assemble a `StrategyRun` from finished per-bar traces.
///
/// The current signal reads only the last row: entry flag wins, then
/// exit flag, then the carried position. Recent signals are collected
/// newest first from the flag vectors.
pub(crate) fn build_run(
    name: &str,
    series: &CandleSeries,
    frame: IndicatorFrame,
    buy_signal: Vec<bool>,
    sell_signal: Vec<bool>,
    position: Vec<i8>,
) -> StrategyRun {
    debug_assert_eq!(buy_signal.len(), series.len());
    debug_assert_eq!(sell_signal.len(), series.len());
    debug_assert_eq!(position.len(), series.len());

    let current_signal = match series.len().checked_sub(1) {
        Some(last) => {
            if buy_signal[last] {
                Signal::Buy
            } else if sell_signal[last] {
                Signal::Sell
            } else if position[last] == 1 {
                Signal::HoldLong
            } else if position[last] == -1 {
                Signal::HoldShort
            } else {
                Signal::HoldCash
            }
        }
        None => Signal::HoldCash,
    };

    let mut recent_signals = Vec::new();
    for i in (0..series.len()).rev() {
        if recent_signals.len() >= MAX_RECENT_SIGNALS {
            break;
        }
        // A bar never carries both flags; sells are listed before buys
        // on the same bar just in case.
        if sell_signal[i] {
            recent_signals.push(record(series, i, SignalKind::Sell));
        }
        if recent_signals.len() < MAX_RECENT_SIGNALS && buy_signal[i] {
            recent_signals.push(record(series, i, SignalKind::Buy));
        }
    }

    debug!(
        strategy = name,
        symbol = series.symbol(),
        bars = series.len(),
        signals = recent_signals.len(),
        current = %current_signal,
        "strategy run complete"
    );

    StrategyRun {
        buy_signal,
        sell_signal,
        position,
        current_signal,
        recent_signals,
        frame,
    }
}

fn record(series: &CandleSeries, bar_index: usize, kind: SignalKind) -> SignalRecord {
    let candle = &series.candles()[bar_index];
    SignalRecord {
        kind,
        bar_index,
        time: candle.time,
        price: candle.close,
    }
}

#[cfg(test)]
pub(crate) fn make_series(closes: &[f64]) -> CandleSeries {
    let candles = crate::indicators::make_candles(closes);
    CandleSeries::new("TEST/USDT", "1h", candles).unwrap()
}

#[cfg(test)]
pub(crate) fn make_series_with_volume(closes: &[f64], volumes: &[f64]) -> CandleSeries {
    let candles = crate::indicators::make_candles_with_volume(closes, volumes);
    CandleSeries::new("TEST/USDT", "1h", candles).unwrap()
}

/// Check the position-invariant over a finished run: entries only from
/// flat, exits only from a held position, trace consistent bar to bar.
#[cfg(test)]
pub(crate) fn assert_position_invariant(run: &StrategyRun) {
    let mut state = 0i8;
    for i in 0..run.position.len() {
        if run.buy_signal[i] {
            assert!(
                state <= 0,
                "entry fired at bar {i} while already long (state {state})"
            );
            state += 1;
        }
        if run.sell_signal[i] {
            assert!(
                state >= 0,
                "exit fired at bar {i} while already short (state {state})"
            );
            state -= 1;
        }
        assert!(
            (-1..=1).contains(&state),
            "position left the -1..=1 range at bar {i}"
        );
        assert_eq!(
            run.position[i], state,
            "position trace inconsistent at bar {i}"
        );
    }
}
