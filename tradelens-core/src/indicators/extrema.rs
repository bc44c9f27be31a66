//! Confirmed local top/bottom detection.
//!
//! `rw_top` / `rw_bottom` confirm a pivot `order` bars after the fact:
//! the candidate at `curr_index - order` must strictly dominate `order`
//! bars on each side. Confirmation lag is the price of not looking
//! ahead — a pivot is only usable once the right-hand bars exist. The
//! pattern detectors and the trendline-breakout stop both scan pivots
//! this way.

/// True if the bar at `curr_index - order` is a confirmed local top:
/// strictly greater than the `order` bars on each side of it.
pub fn rw_top(data: &[f64], curr_index: usize, order: usize) -> bool {
    if order == 0 || curr_index < 2 * order {
        return false;
    }
    let k = curr_index - order;
    let center = data[k];
    if center.is_nan() {
        return false;
    }
    for i in 1..=order {
        if !(data[k + i] < center) || !(data[k - i] < center) {
            return false;
        }
    }
    true
}

/// True if the bar at `curr_index - order` is a confirmed local bottom.
pub fn rw_bottom(data: &[f64], curr_index: usize, order: usize) -> bool {
    if order == 0 || curr_index < 2 * order {
        return false;
    }
    let k = curr_index - order;
    let center = data[k];
    if center.is_nan() {
        return false;
    }
    for i in 1..=order {
        if !(data[k + i] > center) || !(data[k - i] > center) {
            return false;
        }
    }
    true
}
