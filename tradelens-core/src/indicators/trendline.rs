//! Support/resistance trendline fitting.
//!
//! A candidate line is anchored at a pivot bar and must stay on one side
//! of the price series: at or below every point for support, at or above
//! for resistance. Fitting starts from the least-squares slope, anchors
//! at the extreme-residual bar, then hill-climbs the slope with a
//! halving step until the squared-error improvement stalls.
//!
//! The step scale is normalized by the series price range so the same
//! `opt_step` works for BTC at 60k and a 0.2-dollar altcoin.

/// Tuning for the slope hill-climb.
#[derive(Debug, Clone, Copy)]
pub struct TrendlineConfig {
    /// Initial slope step, in units of (price range / window length).
    pub opt_step: f64,
    /// Terminate when the step falls below this.
    pub min_step: f64,
}

impl Default for TrendlineConfig {
    fn default() -> Self {
        Self {
            opt_step: 1.0,
            min_step: 1e-4,
        }
    }
}

/// A fitted line over bar indices: y = slope * x + intercept.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendlineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl TrendlineFit {
    pub fn value_at(&self, x: usize) -> f64 {
        self.slope * x as f64 + self.intercept
    }
}

/// Support and resistance lines fitted over the same window.
#[derive(Debug, Clone, Copy)]
pub struct TrendlinePair {
    pub support: TrendlineFit,
    pub resistance: TrendlineFit,
}

/// Squared error of a pivot-anchored line, or `None` when the line
/// crosses to the wrong side of the data (tolerance 1e-5 for float
/// noise).
fn line_error(support: bool, pivot: usize, slope: f64, y: &[f64]) -> Option<f64> {
    let intercept = y[pivot] - slope * pivot as f64;
    let mut err = 0.0;
    for (x, &v) in y.iter().enumerate() {
        let diff = slope * x as f64 + intercept - v;
        if support && diff > 1e-5 {
            return None;
        }
        if !support && diff < -1e-5 {
            return None;
        }
        err += diff * diff;
    }
    Some(err)
}

/// Ordinary least-squares line over bar indices 0..n.
pub fn least_squares(y: &[f64]) -> TrendlineFit {
    let n = y.len() as f64;
    let mean_x = (y.len() as f64 - 1.0) / 2.0;
    let mean_y = y.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var = 0.0;
    for (x, &v) in y.iter().enumerate() {
        let dx = x as f64 - mean_x;
        cov += dx * (v - mean_y);
        var += dx * dx;
    }
    let slope = if var == 0.0 { 0.0 } else { cov / var };
    TrendlineFit {
        slope,
        intercept: mean_y - slope * mean_x,
    }
}

fn optimize_slope(
    support: bool,
    pivot: usize,
    init_slope: f64,
    y: &[f64],
    cfg: &TrendlineConfig,
) -> TrendlineFit {
    let range = y.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        - y.iter().copied().fold(f64::INFINITY, f64::min);
    let slope_unit = range / y.len() as f64;

    let anchored = |slope: f64| TrendlineFit {
        slope,
        intercept: y[pivot] - slope * pivot as f64,
    };

    // Flat series: the zero-slope line through the pivot is the exact
    // zero-error bound.
    if slope_unit == 0.0 {
        return TrendlineFit {
            slope: 0.0,
            intercept: y[pivot],
        };
    }

    let mut best_slope = init_slope;
    let mut best_err = match line_error(support, pivot, init_slope, y) {
        Some(err) => err,
        // Anchoring at the extreme residual guarantees validity; a NaN
        // in the window is the only way to get here.
        None => return anchored(init_slope),
    };

    let mut curr_step = cfg.opt_step;
    let mut refresh_derivative = true;
    let mut derivative = 0.0;

    while curr_step > cfg.min_step {
        if refresh_derivative {
            // Numerical slope of the error surface, probing upward first
            // and downward if the upward probe leaves the valid region.
            let probe = best_slope + slope_unit * cfg.min_step;
            derivative = match line_error(support, pivot, probe, y) {
                Some(err) => err - best_err,
                None => {
                    let probe = best_slope - slope_unit * cfg.min_step;
                    match line_error(support, pivot, probe, y) {
                        Some(err) => best_err - err,
                        None => break,
                    }
                }
            };
            refresh_derivative = false;
        }

        let test_slope = if derivative > 0.0 {
            best_slope - slope_unit * curr_step
        } else {
            best_slope + slope_unit * curr_step
        };

        match line_error(support, pivot, test_slope, y) {
            Some(err) if err < best_err => {
                best_err = err;
                best_slope = test_slope;
                refresh_derivative = true;
            }
            _ => curr_step *= 0.5,
        }
    }

    anchored(best_slope)
}

/// Fit support and resistance lines over one window of closes.
///
/// `None` when the window is shorter than 3 bars or contains NaN.
pub fn fit_trendlines(closes: &[f64], cfg: &TrendlineConfig) -> Option<TrendlinePair> {
    fit_trendlines_high_low(closes, closes, closes, cfg)
}

/// Fit the resistance against highs and the support against lows, using
/// closes for the initial least-squares slope.
pub fn fit_trendlines_high_low(
    highs: &[f64],
    lows: &[f64],
    closes: &[f64],
    cfg: &TrendlineConfig,
) -> Option<TrendlinePair> {
    let n = closes.len();
    if n < 3 || highs.len() != n || lows.len() != n {
        return None;
    }
    if highs
        .iter()
        .chain(lows)
        .chain(closes)
        .any(|v| v.is_nan())
    {
        return None;
    }

    let base = least_squares(closes);

    // Anchor each line at the bar with the extreme residual: the line
    // shifted through that bar already sits entirely on the right side.
    let mut upper_pivot = 0;
    let mut lower_pivot = 0;
    let mut max_resid = f64::NEG_INFINITY;
    let mut min_resid = f64::INFINITY;
    for i in 0..n {
        let line = base.value_at(i);
        let upper_resid = highs[i] - line;
        let lower_resid = lows[i] - line;
        if upper_resid > max_resid {
            max_resid = upper_resid;
            upper_pivot = i;
        }
        if lower_resid < min_resid {
            min_resid = lower_resid;
            lower_pivot = i;
        }
    }

    Some(TrendlinePair {
        support: optimize_slope(true, lower_pivot, base.slope, lows, cfg),
        resistance: optimize_slope(false, upper_pivot, base.slope, highs, cfg),
    })
}
