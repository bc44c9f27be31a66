//! In-memory candle cache layered over any `MarketData` provider.
//!
//! Keyed by (symbol, timeframe); the (symbol, timeframe, timestamp)
//! uniqueness the callers rely on is already guaranteed by
//! `CandleSeries`' strictly-ascending invariant. Results must be
//! identical whether served from cache or a fresh fetch, so the cache
//! stores the provider's series verbatim and only trims to `limit`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{CandleSeries, RawTrade};

use super::{DataError, MarketData};

pub struct CandleCache<P> {
    inner: P,
    series: RwLock<HashMap<(String, String), CandleSeries>>,
}

impl<P: MarketData> CandleCache<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            series: RwLock::new(HashMap::new()),
        }
    }

    /// Number of (symbol, timeframe) entries currently cached.
    pub fn entries(&self) -> usize {
        self.series.read().expect("cache lock poisoned").len()
    }

    /// Drop all cached series.
    pub fn clear(&self) {
        self.series.write().expect("cache lock poisoned").clear();
    }

    fn trim(series: &CandleSeries, limit: usize) -> Result<CandleSeries, DataError> {
        if series.len() <= limit {
            return Ok(series.clone());
        }
        let tail = series.candles()[series.len() - limit..].to_vec();
        CandleSeries::new(series.symbol(), series.timeframe(), tail)
    }
}

impl<P: MarketData> MarketData for CandleCache<P> {
    fn name(&self) -> &str {
        "candle_cache"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: &str,
        limit: usize,
    ) -> Result<CandleSeries, DataError> {
        let key = (symbol.to_string(), timeframe.to_string());

        if let Some(cached) = self
            .series
            .read()
            .expect("cache lock poisoned")
            .get(&key)
        {
            // Only serve from cache when the cached series covers the request.
            if cached.len() >= limit {
                return Self::trim(cached, limit);
            }
        }

        let fresh = self.inner.fetch_candles(symbol, timeframe, limit)?;
        self.series
            .write()
            .expect("cache lock poisoned")
            .insert(key, fresh.clone());
        Self::trim(&fresh, limit)
    }

    fn fetch_trades(&self, account: &str) -> Result<Vec<RawTrade>, DataError> {
        // Trade history is not cached: the ledger re-derives everything
        // from it, and stale fills would silently skew P&L.
        self.inner.fetch_trades(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryStore;
    use crate::domain::Candle;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn series(n: usize) -> CandleSeries {
        let candles = (0..n)
            .map(|i| Candle {
                time: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64),
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0 + i as f64,
                volume: 1000.0,
            })
            .collect();
        CandleSeries::new("BTC/USDT", "1h", candles).unwrap()
    }

    /// Provider that counts fetches, for verifying cache hits.
    struct Counting {
        store: InMemoryStore,
        fetches: AtomicUsize,
    }

    impl MarketData for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch_candles(
            &self,
            symbol: &str,
            timeframe: &str,
            limit: usize,
        ) -> Result<CandleSeries, DataError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.store.fetch_candles(symbol, timeframe, limit)
        }

        fn fetch_trades(&self, account: &str) -> Result<Vec<RawTrade>, DataError> {
            self.store.fetch_trades(account)
        }
    }

    #[test]
    fn second_fetch_is_served_from_cache() {
        let mut store = InMemoryStore::new();
        store.insert_candles(series(50));
        let provider = Counting {
            store,
            fetches: AtomicUsize::new(0),
        };
        let cache = CandleCache::new(provider);

        let a = cache.fetch_candles("BTC/USDT", "1h", 20).unwrap();
        let b = cache.fetch_candles("BTC/USDT", "1h", 20).unwrap();

        assert_eq!(cache.inner.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(a.len(), b.len());
        assert_eq!(
            a.last().unwrap().close,
            b.last().unwrap().close,
            "cached and fresh results must be identical"
        );
    }

    #[test]
    fn larger_request_bypasses_short_cache_entry() {
        let mut store = InMemoryStore::new();
        store.insert_candles(series(50));
        let provider = Counting {
            store,
            fetches: AtomicUsize::new(0),
        };
        let cache = CandleCache::new(provider);

        cache.fetch_candles("BTC/USDT", "1h", 10).unwrap();
        let wide = cache.fetch_candles("BTC/USDT", "1h", 40).unwrap();

        assert_eq!(cache.inner.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(wide.len(), 40);
    }

    #[test]
    fn clear_empties_cache() {
        let mut store = InMemoryStore::new();
        store.insert_candles(series(10));
        let cache = CandleCache::new(store);

        cache.fetch_candles("BTC/USDT", "1h", 5).unwrap();
        assert_eq!(cache.entries(), 1);
        cache.clear();
        assert_eq!(cache.entries(), 0);
    }
}
