use chrono::Utc;

use crate::config::IndicatorConfig;
use crate::models::{IndicatorSet, MarketSnapshot};

/// Compute the full indicator set for a snapshot.
///
/// Deterministic for identical input; only `computed_at` touches the
/// clock. Indicators whose period exceeds the available bar count come
/// back `None`: an incomplete snapshot yields a partial set, never an
/// extrapolated one.
pub fn compute(snapshot: &MarketSnapshot, cfg: &IndicatorConfig) -> IndicatorSet {
    let closes = snapshot.closes();

    let (support, resistance) = pivot_levels(
        &snapshot.highs(),
        &snapshot.lows(),
        cfg.pivot_lookaround,
        cfg.level_tolerance,
    );

    IndicatorSet {
        symbol: snapshot.symbol().to_string(),
        computed_at: Utc::now(),
        ema20: ema(&closes, cfg.ema_fast),
        ema50: ema(&closes, cfg.ema_mid),
        ema200: ema(&closes, cfg.ema_slow),
        rsi: rsi(&closes, cfg.rsi_period),
        volatility: volatility(&closes, cfg.volatility_window),
        support,
        resistance,
    }
}

/// Exponential moving average, last value.
///
/// Smoothing factor `2 / (period + 1)`, seeded with the SMA of the first
/// `period` closes. `None` while fewer than `period` bars exist.
pub fn ema(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let sma: f64 = closes[..period].iter().sum::<f64>() / period as f64;

    let mut value = sma;
    for &close in &closes[period..] {
        value = close * alpha + value * (1.0 - alpha);
    }
    Some(value)
}

/// Relative Strength Index with Wilder's smoothing.
///
/// Needs `period + 1` closes for the initial average gain/loss. When the
/// smoothed average loss is zero, RSI is 100 rather than a division by
/// zero.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period]
        .iter()
        .map(|&c| c.max(0.0))
        .sum::<f64>()
        / period as f64;
    let mut avg_loss = changes[..period]
        .iter()
        .map(|&c| (-c).max(0.0))
        .sum::<f64>()
        / period as f64;

    for &c in &changes[period..] {
        let gain = c.max(0.0);
        let loss = (-c).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// Standard deviation of percentage returns over the trailing window.
///
/// Needs `window + 1` closes to form `window` returns. Always
/// non-negative when defined.
pub fn volatility(closes: &[f64], window: usize) -> Option<f64> {
    if window < 2 || closes.len() < window + 1 {
        return None;
    }

    let tail = &closes[closes.len() - (window + 1)..];
    let returns: Vec<f64> = tail
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return None;
    }

    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>()
        / returns.len() as f64;
    Some(variance.sqrt())
}

/// Support and resistance from local extrema.
///
/// A pivot high is a bar whose high exceeds every high within
/// `lookaround` bars on both sides (pivot lows mirrored). Levels within
/// `tolerance` of each other collapse into one; both lists come back
/// ascending.
pub fn pivot_levels(
    highs: &[f64],
    lows: &[f64],
    lookaround: usize,
    tolerance: f64,
) -> (Vec<f64>, Vec<f64>) {
    let n = highs.len();
    if lookaround == 0 || n < 2 * lookaround + 1 {
        return (Vec::new(), Vec::new());
    }

    let mut pivot_highs = Vec::new();
    let mut pivot_lows = Vec::new();

    for i in lookaround..n - lookaround {
        let window = (i - lookaround)..=(i + lookaround);
        let is_high = window
            .clone()
            .filter(|&j| j != i)
            .all(|j| highs[j] < highs[i]);
        let is_low = window.filter(|&j| j != i).all(|j| lows[j] > lows[i]);

        if is_high {
            pivot_highs.push(highs[i]);
        }
        if is_low {
            pivot_lows.push(lows[i]);
        }
    }

    (
        dedupe_levels(pivot_lows, tolerance),
        dedupe_levels(pivot_highs, tolerance),
    )
}

fn dedupe_levels(mut levels: Vec<f64>, tolerance: f64) -> Vec<f64> {
    levels.sort_by(|a, b| a.partial_cmp(b).expect("levels are finite"));
    let mut out: Vec<f64> = Vec::with_capacity(levels.len());
    for level in levels {
        match out.last() {
            Some(&prev) if (level - prev).abs() <= prev.abs() * tolerance => {}
            _ => out.push(level),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::trending_bars;
    use crate::pipeline::snapshot;
    use crate::models::Timeframe;

    fn rising_snapshot() -> MarketSnapshot {
        snapshot::build(trending_bars(250, 100.0, 150.0), "BTCUSDT", Timeframe::M1, 200)
            .unwrap()
    }

    #[test]
    fn ema_matches_reference_recursion() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        // period 3: seed = SMA(100,101,102) = 101, alpha = 0.5
        let mut expected = 101.0;
        for &c in &closes[3..] {
            expected = c * 0.5 + expected * 0.5;
        }
        let got = ema(&closes, 3).unwrap();
        assert!((got - expected).abs() < 1e-12);
    }

    #[test]
    fn ema_undefined_below_period() {
        let closes = vec![100.0, 101.0];
        assert!(ema(&closes, 3).is_none());
        assert!(ema(&closes, 0).is_none());
    }

    #[test]
    fn ema200_defined_for_250_bars() {
        let snap = rising_snapshot();
        let set = compute(&snap, &IndicatorConfig::default());
        assert!(set.ema200.is_some());
        assert!(set.has_full_emas());
    }

    #[test]
    fn rising_closes_order_emas_and_lift_rsi() {
        let snap = rising_snapshot();
        let set = compute(&snap, &IndicatorConfig::default());
        let (e20, e50, e200) = (
            set.ema20.unwrap(),
            set.ema50.unwrap(),
            set.ema200.unwrap(),
        );
        assert!(e20 > e50 && e50 > e200, "{e20} {e50} {e200}");
        assert!(set.rsi.unwrap() > 70.0);
    }

    #[test]
    fn rsi_bounded_and_saturates_on_pure_gains() {
        let gains: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        assert!((rsi(&gains, 14).unwrap() - 100.0).abs() < 1e-9);

        let losses: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let r = rsi(&losses, 14).unwrap();
        assert!((0.0..=100.0).contains(&r));
        assert!(r < 1.0);

        let mixed: Vec<f64> = (0..40)
            .map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -0.5 } * i as f64 * 0.1)
            .collect();
        let r = rsi(&mixed, 14).unwrap();
        assert!((0.0..=100.0).contains(&r));
    }

    #[test]
    fn volatility_non_negative_and_zero_for_flat_series() {
        let flat = vec![100.0; 30];
        assert!(volatility(&flat, 20).unwrap() < 1e-12);

        let noisy: Vec<f64> = (0..30)
            .map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        assert!(volatility(&noisy, 20).unwrap() > 0.0);
        assert!(volatility(&noisy, 40).is_none());
    }

    #[test]
    fn pivots_found_on_zigzag() {
        // One clear peak at index 3 and trough at index 7.
        let highs = vec![101.0, 102.0, 103.0, 110.0, 103.0, 102.0, 101.0, 100.5, 101.5, 102.5, 103.5];
        let lows = vec![99.0, 100.0, 101.0, 104.0, 101.0, 100.0, 99.0, 95.0, 99.5, 100.5, 101.5];
        let (support, resistance) = pivot_levels(&highs, &lows, 3, 0.002);
        assert_eq!(resistance, vec![110.0]);
        assert_eq!(support, vec![95.0]);
    }

    #[test]
    fn nearby_levels_collapse() {
        let levels = vec![100.0, 100.1, 105.0, 100.05];
        let out = dedupe_levels(levels, 0.002);
        assert_eq!(out, vec![100.0, 105.0]);
    }

    #[test]
    fn incomplete_snapshot_yields_partial_set() {
        let snap = snapshot::build(trending_bars(60, 100.0, 110.0), "BTCUSDT", Timeframe::M1, 200)
            .unwrap();
        assert!(snap.is_incomplete());
        let set = compute(&snap, &IndicatorConfig::default());
        assert!(set.ema20.is_some());
        assert!(set.ema50.is_some());
        assert!(set.ema200.is_none());
        assert!(set.rsi.is_some());
    }
}
