//! Trend math over chronological sold-price series.
//!
//! All helpers take prices sorted oldest to newest and return `None` when
//! the series is too short, never an error.

/// EMA windows the comprehensive bundle reports.
pub const EMA_WINDOWS: [u32; 3] = [7, 14, 30];

/// Mean sold price. With unit-volume listings this is the VWAP.
pub fn vwap_of(prices: &[f64]) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}

/// Exponential moving average with span `window`.
///
/// Requires at least `window` points. Alpha is `2 / (window + 1)`; the
/// series is seeded with the oldest price and folded forward.
pub fn ema_of(prices: &[f64], window: u32) -> Option<f64> {
    if window == 0 || prices.len() < window as usize {
        return None;
    }
    let alpha = 2.0 / (window as f64 + 1.0);
    let mut ema = prices[0];
    for &price in &prices[1..] {
        ema = alpha * price + (1.0 - alpha) * ema;
    }
    Some(ema)
}

/// Percentage change from the earliest to the latest price.
///
/// Requires at least two points and a positive starting price.
pub fn delta_of(prices: &[f64]) -> Option<f64> {
    if prices.len() < 2 {
        return None;
    }
    let first = prices[0];
    let last = prices[prices.len() - 1];
    if first <= 0.0 {
        return None;
    }
    Some((last - first) / first * 100.0)
}
