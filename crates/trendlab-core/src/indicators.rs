//! Pure indicator primitives: EMA, ATR (Wilder), ADX/±DI (Wilder), Donchian-high.
//!
//! Every primitive returns one entry per input bar. Warm-up is represented
//! as `None`, never a sentinel number, so downstream code cannot mistake an
//! undefined value for a real one (see design notes: optionals over
//! sentinels).

use crate::bar::Bar;

/// Simple/exponential moving average of a close-price (or other) series.
///
/// First defined index is `p - 1`; seeded with the simple mean of the first
/// `p` values, then the standard EMA recursion with smoothing `k = 2/(p+1)`.
pub fn ema(values: &[f64], p: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if p == 0 || values.len() < p {
        return out;
    }

    let seed = values[..p].iter().sum::<f64>() / p as f64;
    out[p - 1] = Some(seed);

    let k = 2.0 / (p as f64 + 1.0);
    let mut prev = seed;
    for i in p..values.len() {
        let next = values[i] * k + prev * (1.0 - k);
        out[i] = Some(next);
        prev = next;
    }
    out
}

fn true_range(bars: &[Bar], i: usize) -> f64 {
    if i == 0 {
        return bars[0].high - bars[0].low;
    }
    let (curr, prev) = (&bars[i], &bars[i - 1]);
    (curr.high - curr.low)
        .max((curr.high - prev.close).abs())
        .max((curr.low - prev.close).abs())
}

/// Wilder-smoothed Average True Range. Defined from index `p` onward.
pub fn atr_wilder(bars: &[Bar], p: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if p == 0 || bars.len() <= p {
        return out;
    }

    let tr: Vec<f64> = (0..bars.len()).map(|i| true_range(bars, i)).collect();

    let seed = tr[1..=p].iter().sum::<f64>() / p as f64;
    out[p] = Some(seed);

    let mut prev = seed;
    for i in (p + 1)..bars.len() {
        let next = (prev * (p as f64 - 1.0) + tr[i]) / p as f64;
        out[i] = Some(next);
        prev = next;
    }
    out
}

/// Output of the Wilder ADX/±DI calculation: three series of equal length,
/// each following the warm-up rules in §4.1.
#[derive(Debug, Clone)]
pub struct AdxSeries {
    pub plus_di: Vec<Option<f64>>,
    pub minus_di: Vec<Option<f64>>,
    pub adx: Vec<Option<f64>>,
}

/// Wilder ADX / +DI / -DI. `+DI`/`-DI` are defined from index `p` onward;
/// `ADX` is defined from index `2p - 1` onward, seeded as the mean of
/// `DX_{p..2p-1}`.
pub fn adx_wilder(bars: &[Bar], p: usize) -> AdxSeries {
    let n = bars.len();
    let mut plus_di = vec![None; n];
    let mut minus_di = vec![None; n];
    let mut adx = vec![None; n];

    if p == 0 || n <= 2 * p {
        return AdxSeries {
            plus_di,
            minus_di,
            adx,
        };
    }

    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    let tr: Vec<f64> = (0..n).map(|i| true_range(bars, i)).collect();

    for i in 1..n {
        let up_move = bars[i].high - bars[i - 1].high;
        let down_move = bars[i - 1].low - bars[i].low;
        if up_move > down_move {
            plus_dm[i] = up_move.max(0.0);
        } else if down_move > up_move {
            minus_dm[i] = down_move.max(0.0);
        }
        // Exact tie: both stay zero, matching the spec's tie-break policy.
    }

    // Wilder-smoothed TR/+DM/-DM, seeded at index p as the sum over 1..=p.
    let mut tr_smooth = tr[1..=p].iter().sum::<f64>();
    let mut plus_dm_smooth = plus_dm[1..=p].iter().sum::<f64>();
    let mut minus_dm_smooth = minus_dm[1..=p].iter().sum::<f64>();

    let mut dx = vec![None; n];
    let dx_at = |plus_di: f64, minus_di: f64| -> f64 {
        let denom = plus_di + minus_di;
        if denom == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / denom
        }
    };

    let di_at = |smooth: f64, tr_smooth: f64| -> f64 {
        if tr_smooth == 0.0 {
            0.0
        } else {
            100.0 * smooth / tr_smooth
        }
    };

    plus_di[p] = Some(di_at(plus_dm_smooth, tr_smooth));
    minus_di[p] = Some(di_at(minus_dm_smooth, tr_smooth));
    dx[p] = Some(dx_at(plus_di[p].unwrap(), minus_di[p].unwrap()));

    for i in (p + 1)..n {
        tr_smooth = tr_smooth - tr_smooth / p as f64 + tr[i];
        plus_dm_smooth = plus_dm_smooth - plus_dm_smooth / p as f64 + plus_dm[i];
        minus_dm_smooth = minus_dm_smooth - minus_dm_smooth / p as f64 + minus_dm[i];

        let pd = di_at(plus_dm_smooth, tr_smooth);
        let md = di_at(minus_dm_smooth, tr_smooth);
        plus_di[i] = Some(pd);
        minus_di[i] = Some(md);
        dx[i] = Some(dx_at(pd, md));
    }

    // ADX seeded at 2p - 1 as mean(DX_{p..2p-1}).
    let seed_window: Vec<f64> = dx[p..2 * p].iter().map(|v| v.unwrap()).collect();
    let seed = seed_window.iter().sum::<f64>() / p as f64;
    adx[2 * p - 1] = Some(seed);

    let mut prev_adx = seed;
    for i in (2 * p)..n {
        let next = (prev_adx * (p as f64 - 1.0) + dx[i].unwrap()) / p as f64;
        adx[i] = Some(next);
        prev_adx = next;
    }

    AdxSeries {
        plus_di,
        minus_di,
        adx,
    }
}

/// Donchian-high: the max of `high` over the last `n` bars strictly
/// preceding bar `i`. Never includes bar `i` itself. Undefined for `i == 0`.
pub fn donchian_high(bars: &[Bar], n: usize, i: usize) -> Option<f64> {
    if i == 0 || n == 0 {
        return None;
    }
    let start = i.saturating_sub(n);
    bars[start..i]
        .iter()
        .map(|b| b.high)
        .fold(None, |acc, h| match acc {
            None => Some(h),
            Some(m) => Some(m.max(h)),
        })
}

/// Donchian-high for every index in `bars`, as a dense series.
pub fn donchian_high_series(bars: &[Bar], n: usize) -> Vec<Option<f64>> {
    (0..bars.len()).map(|i| donchian_high(bars, n, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bars_from_ohlc(ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        ohlc.iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| {
                let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::hours(i as i64);
                let close_time = open_time + chrono::Duration::hours(1);
                Bar::new(open_time, close_time, o, h, l, c, 0.0)
            })
            .collect()
    }

    #[test]
    fn ema_seed_is_simple_mean_of_first_p() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let out = ema(&values, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0)); // mean(1,2,3)
        assert!(out[3].is_some());
    }

    #[test]
    fn ema_recursion_matches_standard_formula() {
        let values = vec![10.0, 10.0, 10.0, 20.0];
        let out = ema(&values, 3);
        let k = 2.0 / 4.0;
        let expected = 20.0 * k + 10.0 * (1.0 - k);
        assert!((out[3].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_defined_from_index_p() {
        let bars = bars_from_ohlc(&[
            (100.0, 102.0, 98.0, 101.0),
            (101.0, 103.0, 99.0, 102.0),
            (102.0, 104.0, 100.0, 103.0),
            (103.0, 105.0, 101.0, 104.0),
        ]);
        let out = atr_wilder(&bars, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], None);
        assert!(out[3].is_some());
    }

    #[test]
    fn donchian_excludes_current_bar() {
        let bars = bars_from_ohlc(&[
            (100.0, 110.0, 90.0, 100.0), // i=0
            (100.0, 200.0, 90.0, 100.0), // i=1, huge high, must not count toward donchian(1)
        ]);
        // donchian_high(1) should only see bar 0's high = 110.
        assert_eq!(donchian_high(&bars, 20, 1), Some(110.0));
    }

    #[test]
    fn donchian_undefined_before_first_predecessor() {
        let bars = bars_from_ohlc(&[(100.0, 110.0, 90.0, 100.0)]);
        assert_eq!(donchian_high(&bars, 20, 0), None);
    }

    #[test]
    fn donchian_single_predecessor_equals_its_high() {
        let bars = bars_from_ohlc(&[
            (100.0, 110.0, 90.0, 100.0),
            (100.0, 95.0, 90.0, 100.0),
        ]);
        assert_eq!(donchian_high(&bars, 20, 1), Some(110.0));
    }

    #[test]
    fn adx_defined_from_index_2p_minus_1() {
        // 14-period ADX needs 2p = 28 bars before the seed index (27).
        let p = 3;
        let mut ohlc = Vec::new();
        let mut price = 100.0;
        for i in 0..20 {
            let drift = if i % 2 == 0 { 1.0 } else { -0.3 };
            price += drift;
            ohlc.push((price - 0.5, price + 1.0, price - 1.0, price));
        }
        let bars = bars_from_ohlc(&ohlc);
        let series = adx_wilder(&bars, p);
        for i in 0..(2 * p - 1) {
            assert_eq!(series.adx[i], None, "adx[{i}] should be undefined");
        }
        assert!(series.adx[2 * p - 1].is_some());
    }

    #[test]
    fn adx_zero_tr_yields_zero_di_and_dx() {
        // Perfectly flat bars: TR, +DM, -DM are all zero throughout.
        let bars = bars_from_ohlc(&vec![(100.0, 100.0, 100.0, 100.0); 10]);
        let series = adx_wilder(&bars, 3);
        assert_eq!(series.plus_di[3], Some(0.0));
        assert_eq!(series.minus_di[3], Some(0.0));
    }
}
