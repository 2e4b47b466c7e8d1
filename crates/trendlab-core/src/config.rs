//! Core configuration (C10): a single immutable record supplied per
//! instance, loadable from TOML.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeframeConfig {
    pub trend_hours: u32,
    pub signal_hours: u32,
}

impl Default for TimeframeConfig {
    fn default() -> Self {
        Self { trend_hours: 4, signal_hours: 1 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub ema_short: usize,
    pub ema_medium: usize,
    pub ema_long: usize,
    pub atr_period: usize,
    pub adx_period: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self { ema_short: 20, ema_medium: 50, ema_long: 200, atr_period: 14, adx_period: 14 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub lookback_period: usize,
    pub htf_adx_min: f64,
    pub ltf_adx_min: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self { lookback_period: 20, htf_adx_min: 20.0, ltf_adx_min: 25.0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub max_risk_per_trade: f64,
    pub initial_stop_pct: f64,
    pub break_even_r: f64,
    pub trailing_activation_r: f64,
    pub trend_exhaust_adx: f64,
    pub trend_exhaust_bars: usize,
    pub profit_lock_r: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_risk_per_trade: 0.01,
            initial_stop_pct: 0.01,
            break_even_r: 1.0,
            trailing_activation_r: 2.0,
            trend_exhaust_adx: 20.0,
            trend_exhaust_bars: 3,
            profit_lock_r: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub initial_capital: f64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self { initial_capital: 10_000.0 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub commission_rate: f64,
    pub slippage_rate: f64,
    /// Optional cap on volatility-scaled slippage; `None` disables scaling.
    pub slippage_atr_coefficient: Option<f64>,
    pub max_slippage_rate: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            commission_rate: 0.0006,
            slippage_rate: 0.0002,
            slippage_atr_coefficient: None,
            max_slippage_rate: 0.002,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self { start_date: None, end_date: None }
    }
}

/// The single immutable configuration record for one core instance.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub timeframe: TimeframeConfig,
    pub indicators: IndicatorConfig,
    pub strategy: StrategyConfig,
    pub risk: RiskConfig,
    pub account: AccountConfig,
    pub execution: ExecutionConfig,
    pub backtest: BacktestConfig,
}

impl CoreConfig {
    pub fn from_toml(s: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(s)?)
    }

    /// Validate cross-field invariants the type system can't express.
    /// Non-positive periods, out-of-range fractions, and `start >= end`
    /// are all `ConfigurationError`s, fatal at startup.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut problems = Vec::new();

        if self.indicators.ema_short == 0 || self.indicators.ema_medium == 0 || self.indicators.ema_long == 0 {
            problems.push("EMA periods must be positive".to_string());
        }
        if self.indicators.atr_period == 0 || self.indicators.adx_period == 0 {
            problems.push("ATR/ADX periods must be positive".to_string());
        }
        if self.strategy.lookback_period == 0 {
            problems.push("strategy.lookback_period must be positive".to_string());
        }
        if !(0.0..1.0).contains(&self.risk.max_risk_per_trade) {
            problems.push("risk.max_risk_per_trade must be in (0, 1)".to_string());
        }
        if !(0.0..1.0).contains(&self.risk.initial_stop_pct) {
            problems.push("risk.initial_stop_pct must be in (0, 1)".to_string());
        }
        if self.risk.trailing_activation_r <= self.risk.break_even_r {
            problems.push("risk.trailing_activation_r must exceed risk.break_even_r".to_string());
        }
        if self.account.initial_capital <= 0.0 {
            problems.push("account.initial_capital must be positive".to_string());
        }
        if self.execution.commission_rate < 0.0 || self.execution.slippage_rate < 0.0 {
            problems.push("commission_rate and slippage_rate must be non-negative".to_string());
        }
        if let (Some(start), Some(end)) = (self.backtest.start_date, self.backtest.end_date) {
            if start >= end {
                problems.push("backtest.start_date must be strictly before end_date".to_string());
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Configuration(problems.join("; ")))
        }
    }

    /// Minimum `adx_history` window satisfying `H >= trend_exhaust_bars + 1`.
    pub fn adx_history_window(&self) -> usize {
        self.risk.trend_exhaust_bars + 1
    }
}
