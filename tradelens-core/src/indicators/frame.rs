//! Container for precomputed indicator series.
//!
//! Built once before the bar walk, then queried by bar index. Storage
//! keeps NaN for warmup/undefined slots, but the read path surfaces
//! `Option<f64>` so strategy transition checks can never compare
//! against NaN by accident.

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndicatorFrame {
    series: HashMap<String, Vec<f64>>,
}

impl IndicatorFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a named indicator series.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.series.insert(name.into(), values);
    }

    /// Value at a specific bar index; `None` for warmup NaN, missing
    /// series, or out-of-bounds index.
    pub fn get(&self, name: &str, bar_index: usize) -> Option<f64> {
        self.series
            .get(name)
            .and_then(|v| v.get(bar_index).copied())
            .filter(|v| !v.is_nan())
    }

    /// Raw stored series (NaN warmup intact) for a named indicator.
    pub fn get_series(&self, name: &str) -> Option<&[f64]> {
        self.series.get(name).map(|v| v.as_slice())
    }

    /// Number of indicator series stored.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
