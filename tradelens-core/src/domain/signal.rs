//! Signal and position-state enums shared by every strategy walk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signal attached to the most recent bar of a strategy run.
///
/// `Buy`/`Sell` mean the transition fired on that bar; the `Hold*`
/// variants describe the carried position when nothing fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Buy,
    Sell,
    HoldLong,
    HoldShort,
    HoldCash,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
            Signal::HoldLong => "HOLD LONG",
            Signal::HoldShort => "HOLD SHORT",
            Signal::HoldCash => "HOLD CASH",
        };
        f.write_str(s)
    }
}

/// Position carried bar-to-bar within one strategy run.
///
/// Encoded as -1/0/1 in the per-bar trace. Short only occurs in the
/// pattern strategies; everything else is long/flat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

impl PositionState {
    pub fn as_i8(self) -> i8 {
        match self {
            PositionState::Flat => 0,
            PositionState::Long => 1,
            PositionState::Short => -1,
        }
    }

    pub fn is_flat(self) -> bool {
        self == PositionState::Flat
    }
}

/// One entry in a run's recent-signals list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalRecord {
    pub kind: SignalKind,
    pub bar_index: usize,
    pub time: DateTime<Utc>,
    pub price: f64,
}

/// Direction of a recorded signal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
}
