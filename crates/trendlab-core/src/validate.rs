//! Bar-sequence data quality validation.
//!
//! Checks an incoming bar sequence for the conditions enumerated under
//! `DataQualityError` before it reaches the runner: duplicate `open_time`,
//! out-of-order bars, and invalid OHLC relationships. The bar-provider
//! itself (fetching, caching) is out of scope; this module validates
//! whatever sequence a caller hands to the core.

use crate::bar::Bar;
use crate::error::{CoreError, DataQualityIssue};
use std::collections::HashSet;

/// Check a single-symbol bar sequence for data quality issues. Returns every
/// issue found rather than failing on the first one.
pub fn check(bars: &[Bar]) -> Vec<DataQualityIssue> {
    let mut issues = Vec::new();
    let mut seen: HashSet<chrono::DateTime<chrono::Utc>> = HashSet::new();
    let mut prev_open_time = None;

    for bar in bars {
        if !seen.insert(bar.open_time) {
            issues.push(DataQualityIssue::DuplicateOpenTime {
                open_time: bar.open_time,
            });
        }

        if let Some(prev) = prev_open_time {
            if bar.open_time < prev {
                issues.push(DataQualityIssue::OutOfOrder {
                    open_time: bar.open_time,
                    previous_open_time: prev,
                });
            }
        }
        prev_open_time = Some(bar.open_time);

        if bar.close_time <= bar.open_time {
            issues.push(DataQualityIssue::NonPositiveCloseTime {
                open_time: bar.open_time,
            });
        }

        if !bar.is_well_formed() {
            issues.push(DataQualityIssue::InvalidOhlc {
                open_time: bar.open_time,
                reason: format!(
                    "open={} high={} low={} close={}",
                    bar.open, bar.high, bar.low, bar.close
                ),
            });
        }
    }

    issues
}

/// Validate a sequence and turn any issues into a single `CoreError`.
pub fn validate(symbol: &str, bars: &[Bar]) -> Result<(), CoreError> {
    let issues = check(bars);
    if issues.is_empty() {
        return Ok(());
    }
    Err(CoreError::data_quality(
        symbol,
        format!("{} issue(s): {:?}", issues.len(), issues),
    ))
}
