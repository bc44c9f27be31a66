//! Bollinger mean-reversion strategy.
//!
//! Entry: close at or below the lower band with %B <= 0.1 while flat
//! (price pinned to the bottom of the envelope). Exit while long: close
//! at or above the upper band with %B >= 0.9, or a downward cross of
//! the middle band. A collapsed envelope (%B undefined) is a no-op bar.

use serde::{Deserialize, Serialize};

use crate::domain::CandleSeries;
use crate::indicators::{percent_b, Bollinger, Indicator, IndicatorFrame};

use super::{build_run, ensure_warmup, PositionTracker, Strategy, StrategyError, StrategyRun};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BollingerReversionParams {
    pub period: usize,
    pub multiplier: f64,
    /// %B at or below this arms the entry.
    pub lower_pct_b: f64,
    /// %B at or above this arms the band-touch exit.
    pub upper_pct_b: f64,
}

impl Default for BollingerReversionParams {
    fn default() -> Self {
        Self {
            period: 20,
            multiplier: 2.0,
            lower_pct_b: 0.1,
            upper_pct_b: 0.9,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BollingerReversion {
    params: BollingerReversionParams,
    upper_key: String,
    middle_key: String,
    lower_key: String,
}

impl BollingerReversion {
    pub fn new(params: BollingerReversionParams) -> Self {
        assert!(params.period >= 2, "Bollinger period must be >= 2");
        let upper = Bollinger::upper(params.period, params.multiplier);
        let middle = Bollinger::middle(params.period, params.multiplier);
        let lower = Bollinger::lower(params.period, params.multiplier);
        Self {
            upper_key: upper.name().to_string(),
            middle_key: middle.name().to_string(),
            lower_key: lower.name().to_string(),
            params,
        }
    }

    pub fn default_params() -> Self {
        Self::new(BollingerReversionParams::default())
    }
}

impl Strategy for BollingerReversion {
    fn name(&self) -> &str {
        "bollinger_reversion"
    }

    fn warmup_bars(&self) -> usize {
        self.params.period + 1
    }

    fn run(&self, series: &CandleSeries) -> Result<StrategyRun, StrategyError> {
        ensure_warmup(series, self.warmup_bars())?;

        let n = series.len();
        let candles = series.candles();
        let mut frame = IndicatorFrame::new();
        for band in [
            Bollinger::upper(self.params.period, self.params.multiplier),
            Bollinger::middle(self.params.period, self.params.multiplier),
            Bollinger::lower(self.params.period, self.params.multiplier),
        ] {
            frame.insert(band.name(), band.compute(candles));
        }

        let mut buy = vec![false; n];
        let mut sell = vec![false; n];
        let mut position = vec![0i8; n];
        let mut tracker = PositionTracker::new();

        for i in 0..n {
            let bands = (|| {
                Some((
                    frame.get(&self.upper_key, i)?,
                    frame.get(&self.middle_key, i)?,
                    frame.get(&self.lower_key, i)?,
                ))
            })();
            if let Some((upper, middle, lower)) = bands {
                let close = candles[i].close;
                let pct_b = percent_b(close, upper, lower);

                if tracker.is_flat() {
                    if let Some(pct_b) = pct_b {
                        if close <= lower && pct_b <= self.params.lower_pct_b {
                            buy[i] = tracker.enter_long();
                        }
                    }
                } else if tracker.is_long() {
                    let band_touch = pct_b
                        .map(|p| close >= upper && p >= self.params.upper_pct_b)
                        .unwrap_or(false);
                    let midline_cross = i
                        .checked_sub(1)
                        .and_then(|p| {
                            let prev_middle = frame.get(&self.middle_key, p)?;
                            Some(close < middle && candles[p].close >= prev_middle)
                        })
                        .unwrap_or(false);
                    if band_touch || midline_cross {
                        sell[i] = tracker.exit_long();
                    }
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
    use crate::strategies::{assert_position_invariant, make_series};

    fn tight_strategy() -> BollingerReversion {
        BollingerReversion::new(BollingerReversionParams {
            period: 4,
            multiplier: 1.0,
            ..BollingerReversionParams::default()
        })
    }

    #[test]
    fn buys_lower_band_pin_sells_upper_band_pin() {
        // Chop around 100, a plunge pinning the close under the lower
        // band, then a melt-up pinning it over the upper band.
        let closes = [
            100.0, 101.0, 99.0, 100.0, 101.0, // warmup chop
            99.0, 92.0, // plunge: close far below lower band
            94.0, 96.0, 99.0, 104.0, 110.0, // melt-up through the envelope
        ];
        let run = tight_strategy().run(&make_series(&closes)).unwrap();

        let buys = run.buy_indices();
        let sells = run.sell_indices();
        assert_eq!(buys.len(), 1, "one plunge, one entry: {buys:?}");
        assert_eq!(buys[0], 6);
        assert_eq!(sells.len(), 1, "one melt-up, one exit: {sells:?}");
        assert!(sells[0] > buys[0]);
        assert_position_invariant(&run);
    }

    #[test]
    fn midline_cross_closes_the_position() {
        // Entry on the plunge, partial recovery above the middle band,
        // then a fade back through it.
        let closes = [
            100.0, 101.0, 99.0, 100.0, 101.0, // warmup
            99.0, 92.0, // plunge, entry
            97.0, 99.0, 100.0, // recovery above the middle
            94.0, // fade through the middle band
        ];
        let run = tight_strategy().run(&make_series(&closes)).unwrap();

        assert_eq!(run.buy_indices(), vec![6]);
        let sells = run.sell_indices();
        assert_eq!(sells.len(), 1);
        assert_eq!(sells[0], 10);
        assert_position_invariant(&run);
    }

    #[test]
    fn flat_market_stays_cash() {
        let closes = vec![100.0; 12];
        let run = tight_strategy().run(&make_series(&closes)).unwrap();
        // Zero-width envelope: %B undefined, no transition ever fires.
        assert!(run.buy_indices().is_empty());
        assert!(run.sell_indices().is_empty());
        assert!(run.position.iter().all(|&p| p == 0));
    }

    #[test]
    fn insufficient_history_is_error() {
        let err = BollingerReversion::default_params()
            .run(&make_series(&[100.0; 10]))
            .unwrap_err();
        assert!(matches!(err, StrategyError::InsufficientData { .. }));
    }
}
