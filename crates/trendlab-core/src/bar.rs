//! Bar (OHLCV) data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV bar representing price action over one closed interval.
///
/// `open_time` and `close_time` are carried explicitly (rather than derived
/// from a timeframe string) because the time aligner (see `align`) compares
/// `close_time` against another series' `open_time` directly, and must not
/// assume any fixed ratio between timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Start of the bar's interval, UTC.
    pub open_time: DateTime<Utc>,

    /// End of the bar's interval, UTC. Always strictly after `open_time`.
    pub close_time: DateTime<Utc>,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        open_time: DateTime<Utc>,
        close_time: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            open_time,
            close_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns the bar's range (high - low).
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Returns the bar's body size (absolute difference between open and close).
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    /// Returns true if this is a bullish (green) bar.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Returns true if this is a bearish (red) bar.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Basic shape sanity: finite positive prices and the low/high/close
    /// ordering required by the data model. Does not check cross-bar
    /// properties (monotonic ordering, duplicates) — see `validate`.
    pub fn is_well_formed(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
            && self.close_time > self.open_time
    }
}
