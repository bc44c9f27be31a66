//! File-backed `MarketData` provider reading plain CSV exports.
//!
//! Layout under the store root:
//!   candles/<SYMBOL>_<TIMEFRAME>.csv   time,open,high,low,close,volume
//!   trades/<ACCOUNT>.csv               symbol,side,price,quantity,time
//!
//! Symbol slashes are flattened to dashes in filenames, so BTC/USDT on
//! the 1h timeframe lives at candles/BTC-USDT_1h.csv.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{Candle, CandleSeries, RawTrade, TradeSide};

use super::{DataError, MarketData};

pub struct CsvStore {
    root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    time: chrono::DateTime<chrono::Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct TradeRow {
    symbol: String,
    side: TradeSide,
    price: f64,
    quantity: f64,
    time: chrono::DateTime<chrono::Utc>,
}

impl CsvStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn candle_path(&self, symbol: &str, timeframe: &str) -> PathBuf {
        let flat = symbol.replace('/', "-");
        self.root
            .join("candles")
            .join(format!("{flat}_{timeframe}.csv"))
    }

    fn trade_path(&self, account: &str) -> PathBuf {
        self.root.join("trades").join(format!("{account}.csv"))
    }

}

fn read_candle_rows(path: &Path) -> Result<Vec<Candle>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut candles = Vec::new();
    for (i, row) in reader.deserialize::<CandleRow>().enumerate() {
        // Header occupies line 1; data rows start at line 2.
        let line = i + 2;
        let row = row.map_err(|e| DataError::Malformed {
            line,
            reason: e.to_string(),
        })?;
        let candle = Candle {
            time: row.time,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        };
        if !candle.is_sane() {
            return Err(DataError::Malformed {
                line,
                reason: format!("implausible OHLCV at {}", candle.time),
            });
        }
        candles.push(candle);
    }
    Ok(candles)
}

/// Load one candle CSV (time,open,high,low,close,volume) directly,
/// outside any store layout, tagging the series with a caller-supplied
/// symbol and timeframe. Used by the CLI's file arguments.
pub fn load_candles(
    path: &Path,
    symbol: &str,
    timeframe: &str,
) -> Result<CandleSeries, DataError> {
    CandleSeries::new(symbol, timeframe, read_candle_rows(path)?)
}

/// Load one trade CSV (symbol,side,price,quantity,time) directly.
pub fn load_trades(path: &Path) -> Result<Vec<RawTrade>, DataError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut trades = Vec::new();
    for (i, row) in reader.deserialize::<TradeRow>().enumerate() {
        let row: TradeRow = row.map_err(|e| DataError::Malformed {
            line: i + 2,
            reason: e.to_string(),
        })?;
        trades.push(RawTrade {
            symbol: row.symbol,
            side: row.side,
            price: row.price,
            quantity: row.quantity,
            time: row.time,
        });
    }
    Ok(trades)
}

impl MarketData for CsvStore {
    fn name(&self) -> &str {
        "csv_store"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<CandleSeries, DataError> {
        let path = self.candle_path(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::Unavailable {
                symbol: symbol.to_string(),
                timeframe: timeframe.to_string(),
            });
        }
        let mut candles = read_candle_rows(&path)?;
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }
        CandleSeries::new(symbol, timeframe, candles)
    }

    fn fetch_trades(&self, account: &str) -> Result<Vec<RawTrade>, DataError> {
        let path = self.trade_path(account);
        if !path.exists() {
            return Err(DataError::Unavailable {
                symbol: account.to_string(),
                timeframe: String::new(),
            });
        }
        load_trades(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "tradelens-csv-{tag}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("candles")).unwrap();
        fs::create_dir_all(dir.join("trades")).unwrap();
        dir
    }

    #[test]
    fn reads_candles_and_applies_limit() {
        let dir = scratch_dir("candles");
        fs::write(
            dir.join("candles/BTC-USDT_1h.csv"),
            "time,open,high,low,close,volume\n\
             2024-01-02T00:00:00Z,100,105,98,103,1000\n\
             2024-01-02T01:00:00Z,103,108,102,107,1100\n\
             2024-01-02T02:00:00Z,107,109,105,106,900\n",
        )
        .unwrap();

        let store = CsvStore::new(&dir);
        let series = store.fetch_candles("BTC/USDT", "1h", 2).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.candles()[0].close, 107.0);
        assert_eq!(series.last().unwrap().close, 106.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_candle_file_is_unavailable() {
        let dir = scratch_dir("missing");
        let store = CsvStore::new(&dir);
        let err = store.fetch_candles("ETH/USDT", "4h", 10).unwrap_err();
        assert!(matches!(err, DataError::Unavailable { .. }));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn malformed_row_reports_line_number() {
        let dir = scratch_dir("malformed");
        fs::write(
            dir.join("candles/BTC-USDT_1h.csv"),
            "time,open,high,low,close,volume\n\
             2024-01-02T00:00:00Z,100,105,98,103,1000\n\
             2024-01-02T01:00:00Z,not-a-number,108,102,107,1100\n",
        )
        .unwrap();

        let store = CsvStore::new(&dir);
        let err = store.fetch_candles("BTC/USDT", "1h", 10).unwrap_err();
        match err {
            DataError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("expected Malformed, got {other:?}"),
        }
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn out_of_order_candles_rejected() {
        let dir = scratch_dir("ooo");
        fs::write(
            dir.join("candles/BTC-USDT_1h.csv"),
            "time,open,high,low,close,volume\n\
             2024-01-02T01:00:00Z,103,108,102,107,1100\n\
             2024-01-02T00:00:00Z,100,105,98,103,1000\n",
        )
        .unwrap();

        let store = CsvStore::new(&dir);
        let err = store.fetch_candles("BTC/USDT", "1h", 10).unwrap_err();
        assert!(matches!(err, DataError::OutOfOrder { .. }));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn reads_trades() {
        let dir = scratch_dir("trades");
        fs::write(
            dir.join("trades/main.csv"),
            "symbol,side,price,quantity,time\n\
             BTC/USDT,buy,100,1.5,2024-01-02T00:00:00Z\n\
             BTC/USDT,sell,110,1.5,2024-01-02T04:00:00Z\n",
        )
        .unwrap();

        let store = CsvStore::new(&dir);
        let trades = store.fetch_trades("main").unwrap();
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[1].price, 110.0);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn loads_arbitrary_paths_outside_the_layout() {
        let dir = scratch_dir("direct");
        let candle_file = dir.join("export.csv");
        fs::write(
            &candle_file,
            "time,open,high,low,close,volume\n\
             2024-01-02T00:00:00Z,100,105,98,103,1000\n\
             2024-01-02T01:00:00Z,103,108,102,107,1100\n",
        )
        .unwrap();
        let trade_file = dir.join("fills.csv");
        fs::write(
            &trade_file,
            "symbol,side,price,quantity,time\n\
             ETH/USDT,sell,2000,0.5,2024-01-02T02:00:00Z\n",
        )
        .unwrap();

        let series = load_candles(&candle_file, "BTC/USDT", "1h").unwrap();
        assert_eq!(series.symbol(), "BTC/USDT");
        assert_eq!(series.timeframe(), "1h");
        assert_eq!(series.len(), 2);

        let trades = load_trades(&trade_file).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].symbol, "ETH/USDT");

        fs::remove_dir_all(&dir).unwrap();
    }
}
