//! Indicator builders (C2): bundle the C1 primitives into per-bar feature
//! records for each timeframe.

use crate::bar::Bar;
use crate::config::CoreConfig;
use crate::indicators::{adx_wilder, atr_wilder, donchian_high_series, ema};

/// Periods used to build HTF feature records.
#[derive(Debug, Clone, Copy)]
pub struct HtfPeriods {
    pub ema_medium: usize,
    pub ema_long: usize,
    pub adx: usize,
}

/// Periods and lookback used to build LTF feature records.
#[derive(Debug, Clone, Copy)]
pub struct LtfPeriods {
    pub ema_short: usize,
    pub ema_medium: usize,
    pub atr: usize,
    pub adx: usize,
    pub donchian_lookback: usize,
    /// Window size for `adx_history`; must be at least `trend_exhaust_bars + 1`.
    pub adx_history_window: usize,
}

impl HtfPeriods {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            ema_medium: config.indicators.ema_medium,
            ema_long: config.indicators.ema_long,
            adx: config.indicators.adx_period,
        }
    }
}

impl LtfPeriods {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            ema_short: config.indicators.ema_short,
            ema_medium: config.indicators.ema_medium,
            atr: config.indicators.atr_period,
            adx: config.indicators.adx_period,
            donchian_lookback: config.strategy.lookback_period,
            adx_history_window: config.adx_history_window(),
        }
    }
}

/// Per-HTF-bar feature record. Each field is `None` during warm-up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HtfFeatures {
    pub ema_medium: Option<f64>,
    pub ema_long: Option<f64>,
    pub adx: Option<f64>,
}

impl HtfFeatures {
    pub fn undefined() -> Self {
        Self {
            ema_medium: None,
            ema_long: None,
            adx: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ema_medium.is_some() && self.ema_long.is_some() && self.adx.is_some()
    }
}

/// Per-LTF-bar feature record.
#[derive(Debug, Clone, PartialEq)]
pub struct LtfFeatures {
    pub ema_short: Option<f64>,
    pub ema_medium: Option<f64>,
    pub adx: Option<f64>,
    /// ADX values from bars strictly preceding the current one, oldest first.
    /// Warm-up `None` entries are dropped, so this is always dense.
    pub adx_history: Vec<f64>,
    pub atr: Option<f64>,
    pub donchian_high: Option<f64>,
}

impl LtfFeatures {
    pub fn undefined() -> Self {
        Self {
            ema_short: None,
            ema_medium: None,
            adx: None,
            adx_history: Vec::new(),
            atr: None,
            donchian_high: None,
        }
    }

    /// Fields required by the strategy function (§4.4).
    pub fn is_complete(&self) -> bool {
        self.ema_short.is_some()
            && self.ema_medium.is_some()
            && self.adx.is_some()
            && self.donchian_high.is_some()
    }
}

/// Build one `HtfFeatures` record per HTF bar.
pub fn build_htf_features(bars: &[Bar], periods: HtfPeriods) -> Vec<HtfFeatures> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_medium = ema(&closes, periods.ema_medium);
    let ema_long = ema(&closes, periods.ema_long);
    let adx = adx_wilder(bars, periods.adx);

    (0..bars.len())
        .map(|i| HtfFeatures {
            ema_medium: ema_medium[i],
            ema_long: ema_long[i],
            adx: adx.adx[i],
        })
        .collect()
}

/// Build one `LtfFeatures` record per LTF bar.
pub fn build_ltf_features(bars: &[Bar], periods: LtfPeriods) -> Vec<LtfFeatures> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_short = ema(&closes, periods.ema_short);
    let ema_medium = ema(&closes, periods.ema_medium);
    let atr = atr_wilder(bars, periods.atr);
    let adx = adx_wilder(bars, periods.adx);
    let donchian = donchian_high_series(bars, periods.donchian_lookback);

    (0..bars.len())
        .map(|i| {
            let history_start = i.saturating_sub(periods.adx_history_window);
            let adx_history: Vec<f64> = adx.adx[history_start..i].iter().filter_map(|v| *v).collect();

            LtfFeatures {
                ema_short: ema_short[i],
                ema_medium: ema_medium[i],
                adx: adx.adx[i],
                adx_history,
                atr: atr[i],
                donchian_high: donchian[i],
            }
        })
        .collect()
}
