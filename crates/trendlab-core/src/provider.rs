//! Bar-provider contract (§6): external collaborator, consumed by the bar
//! runner. Fetching and disk caching of market data are out of scope for
//! this crate — only the contract is described here.

use crate::bar::Bar;
use crate::error::CoreError;
use chrono::{DateTime, Utc};

/// Supplies closed OHLCV bars to the runner. Implementations live outside
/// this crate (historical replay reads a pre-loaded sequence; paper/live
/// poll an exchange or a local cache).
pub trait BarProvider {
    /// All bars strictly closed in `[start, end]`, ascending `open_time`,
    /// de-duplicated by `open_time`.
    fn fetch_closed(
        &self,
        symbol: &str,
        timeframe_hours: u32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, CoreError>;

    /// The last `n` closed bars. Must never return an unclosed (forming) bar.
    fn poll_tail(&self, symbol: &str, timeframe_hours: u32, n: usize) -> Result<Vec<Bar>, CoreError>;
}
