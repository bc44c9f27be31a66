//! End-to-end strategy engine scenarios, plus a comparator pass over
//! a full run.

use chrono::{TimeZone, Utc};
use tradelens_core::compare::{compare, Verdict};
use tradelens_core::domain::{Candle, CandleSeries, CompletedTrade, Signal};
use tradelens_core::strategies::{
    MaCrossover, MaCrossoverParams, MaType, RsiThreshold, Strategy, StrategyError,
};

fn make_series(closes: &[f64]) -> CandleSeries {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    let candles: Vec<Candle> = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                time: base + chrono::Duration::hours(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect();
    CandleSeries::new("BTC/USDT", "1h", candles).unwrap()
}

#[test]
fn rising_tape_never_triggers_an_oversold_buy() {
    // 20 strictly increasing bars at the default RSI parameters: RSI
    // pins at 100, nowhere near the oversold threshold.
    let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    let run = RsiThreshold::default_params().run(&make_series(&closes)).unwrap();

    assert!(run.buy_indices().is_empty());
    assert!(run.sell_indices().is_empty());
    assert!(run.position.iter().all(|&p| p == 0));
    assert_eq!(run.current_signal, Signal::HoldCash);
}

/// Tape engineered so SMA(2) crosses above SMA(4) exactly at bar 10
/// and back below exactly at bar 20.
fn single_round_trip_closes() -> Vec<f64> {
    let mut closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect(); // 100..91
    closes.push(100.0); // bar 10: jump, golden cross
    closes.extend((0..9).map(|i| 101.0 + i as f64)); // bars 11..19: 101..109
    closes.push(95.0); // bar 20: collapse, death cross
    closes.extend([94.0, 93.0, 92.0]);
    closes
}

#[test]
fn one_golden_one_death_cross_bounds_the_position() {
    let strategy = MaCrossover::new(MaCrossoverParams {
        fast_period: 2,
        slow_period: 4,
        ma_type: MaType::Sma,
    });
    let run = strategy.run(&make_series(&single_round_trip_closes())).unwrap();

    assert_eq!(run.buy_indices(), vec![10]);
    assert_eq!(run.sell_indices(), vec![20]);
    for (i, &p) in run.position.iter().enumerate() {
        let expected = if (10..20).contains(&i) { 1 } else { 0 };
        assert_eq!(p, expected, "position wrong at bar {i}");
    }
    assert_eq!(run.current_signal, Signal::HoldCash);
}

#[test]
fn comparator_reconciles_run_against_account() {
    let series = make_series(&single_round_trip_closes());
    let strategy = MaCrossover::new(MaCrossoverParams {
        fast_period: 2,
        slow_period: 4,
        ma_type: MaType::Sma,
    });
    let run = strategy.run(&series).unwrap();

    // The synthetic round trip enters at 100 and exits at 95.
    let ts = |h: u32| Utc.with_ymd_and_hms(2024, 1, 2, h, 0, 0).unwrap();
    let actual = vec![CompletedTrade {
        symbol: "BTC/USDT".into(),
        buy_price: 100.0,
        sell_price: 112.0,
        quantity: 1.0,
        buy_time: ts(0),
        sell_time: ts(6),
        pnl: 12.0,
        pnl_pct: 12.0,
        holding_period_secs: 6 * 3600,
    }];
    let comparison = compare(&actual, &run, &series);

    assert_eq!(comparison.strategy.trades, 1);
    assert!((comparison.strategy.total_pnl - (-5.0)).abs() < 1e-10);
    assert_eq!(comparison.strategy.win_rate, 0.0);
    assert_eq!(comparison.actual.win_rate, 100.0);
    assert_eq!(comparison.verdict, Verdict::TraderLeads);
    // Two signal events against one actual trade.
    assert!((comparison.signal_frequency_ratio - 2.0).abs() < 1e-10);
}

#[test]
fn too_little_history_is_a_typed_error() {
    let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
    let err = RsiThreshold::default_params()
        .run(&make_series(&closes))
        .unwrap_err();
    match err {
        StrategyError::InsufficientData { required, actual } => {
            assert_eq!(required, 16);
            assert_eq!(actual, 10);
        }
    }
}
