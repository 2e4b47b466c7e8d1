//! Execution adapter (C8): slippage-adjusted fills, commission, trade
//! records and running equity. Commission/slippage never alter `active_stop`
//! comparisons — stops compare against `bar.low`/`bar.high`, never slipped
//! prices (see §4.8).

use crate::bar::Bar;
use crate::config::ExecutionConfig;
use crate::position::Position;
use crate::strategy::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A closed position, appended once per trade in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_time: DateTime<Utc>,
    pub size: f64,
    pub pnl: f64,
    pub commission: f64,
    pub slippage: f64,
    pub equity_after: f64,
    pub reason: String,
}

impl serde::Serialize for Side {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Side::Long => serializer.serialize_str("LONG"),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Side {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "LONG" => Ok(Side::Long),
            other => Err(serde::de::Error::custom(format!("unknown side: {other}"))),
        }
    }
}

fn slippage_rate(config: &ExecutionConfig, atr: Option<f64>, close: f64) -> f64 {
    let base = config.slippage_rate;
    let scaled = match (config.slippage_atr_coefficient, atr) {
        (Some(k), Some(atr)) if close > 0.0 => base + k * (atr / close),
        _ => base,
    };
    scaled.min(config.max_slippage_rate)
}

/// Compute the slippage-adjusted entry price, size, and initial stop for a
/// new LONG position. The sizing formula (§4.6) uses the *slipped* entry
/// price, not `bar.close`.
pub fn entry_fill(
    bar: &Bar,
    equity: f64,
    config: &ExecutionConfig,
    risk_per_trade: f64,
    initial_stop_pct: f64,
    atr: Option<f64>,
) -> (f64, f64, f64) {
    let s = slippage_rate(config, atr, bar.close);
    let entry_price = bar.close * (1.0 + s);
    let initial_stop = entry_price * (1.0 - initial_stop_pct);
    let risk_amount = equity * risk_per_trade;
    let size = risk_amount / (entry_price - initial_stop);
    (entry_price, initial_stop, size)
}

/// Compute the slippage-adjusted exit fill and assemble the trade record.
pub fn exit_fill(
    position: &Position,
    bar: &Bar,
    reason: &'static str,
    exit_time: DateTime<Utc>,
    previous_equity: f64,
    config: &ExecutionConfig,
    atr: Option<f64>,
) -> Trade {
    let s = slippage_rate(config, atr, bar.close);
    let exit_price = bar.close * (1.0 - s);
    let commission = (position.entry_price * position.size + exit_price * position.size) * config.commission_rate;
    let pnl = (exit_price - position.entry_price) * position.size - commission;
    let slippage_cost = (bar.close - exit_price).abs() * position.size;

    Trade {
        side: position.side,
        entry_price: position.entry_price,
        entry_time: position.entry_time,
        exit_price,
        exit_time,
        size: position.size,
        pnl,
        commission,
        slippage: slippage_cost,
        equity_after: previous_equity + pnl,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn bar(close: f64) -> Bar {
        Bar::new(now(), now() + chrono::Duration::hours(1), close, close + 1.0, close - 1.0, close, 10.0)
    }

    fn config() -> ExecutionConfig {
        ExecutionConfig {
            commission_rate: 0.0006,
            slippage_rate: 0.001,
            slippage_atr_coefficient: None,
            max_slippage_rate: 0.01,
        }
    }

    #[test]
    fn entry_price_slips_upward() {
        let (entry_price, initial_stop, size) = entry_fill(&bar(100.0), 10_000.0, &config(), 0.01, 0.01, None);
        assert!(entry_price > 100.0);
        assert!(initial_stop < entry_price);
        assert!(size > 0.0);
    }

    #[test]
    fn exit_price_slips_downward() {
        let position = Position::open_long(100.0, now(), 1.0, 99.0);
        let trade = exit_fill(&position, &bar(110.0), "STOP_LOSS_INITIAL", now(), 10_000.0, &config(), None);
        assert!(trade.exit_price < 110.0);
        assert!(trade.commission > 0.0);
    }

    #[test]
    fn equity_after_reflects_pnl() {
        let position = Position::open_long(100.0, now(), 1.0, 99.0);
        let trade = exit_fill(&position, &bar(110.0), "TRAILING_STOP_HIT", now(), 10_000.0, &config(), None);
        assert_eq!(trade.equity_after, 10_000.0 + trade.pnl);
    }

    #[test]
    fn volatility_scaled_slippage_is_capped() {
        let high_vol_config = ExecutionConfig {
            commission_rate: 0.0006,
            slippage_rate: 0.0002,
            slippage_atr_coefficient: Some(10.0),
            max_slippage_rate: 0.005,
        };
        let (entry_price, _, _) = entry_fill(&bar(100.0), 10_000.0, &high_vol_config, 0.01, 0.01, Some(50.0));
        // Uncapped rate would be 0.0002 + 10*0.5 = 5.0002; capped at 0.005.
        assert!((entry_price - 100.0 * 1.005).abs() < 1e-9);
    }
}
