//! Bar runner (C7): per-bar orchestration — risk strictly precedes strategy,
//! and a bar that triggers an exit never opens a new position on the same
//! bar (§4.7).

use crate::config::CoreConfig;
use crate::error::CoreError;
use crate::execution::{self, Trade};
use crate::features::{HtfFeatures, LtfFeatures};
use crate::position::{Position, PositionSlot, PositionState};
use crate::risk::{self, RiskDecision};
use crate::strategy::{self, Signal};
use crate::bar::Bar;

/// Owns the position slot, running equity, and trade log for one
/// instrument. Single-threaded and synchronous — see the concurrency model.
pub struct BarRunner {
    config: CoreConfig,
    slot: PositionSlot,
    equity: f64,
    trades: Vec<Trade>,
}

impl BarRunner {
    pub fn new(config: CoreConfig) -> Self {
        let equity = config.account.initial_capital;
        Self {
            config,
            slot: PositionSlot::new(),
            equity,
            trades: Vec::new(),
        }
    }

    pub fn equity(&self) -> f64 {
        self.equity
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn state(&self) -> PositionState {
        self.slot.state()
    }

    pub fn position(&self) -> Option<&Position> {
        self.slot.position()
    }

    /// Process one closed LTF bar. Insufficient warm-up is not an error:
    /// the strategy function returns HOLD on its own when required features
    /// are undefined, so there is nothing special to do here beyond letting
    /// that happen (see design notes, §4.7.1 of the expanded spec).
    pub fn on_bar(&mut self, bar: &Bar, htf: &HtfFeatures, ltf: &LtfFeatures) -> Result<(), CoreError> {
        tracing::debug!(open_time = %bar.open_time, close = bar.close, "processing bar");

        if self.slot.state() == PositionState::Open {
            // Copy out: risk::evaluate is pure and must not hold a borrow
            // across the later mutation of `self.slot`.
            let position = *self.slot.position().expect("OPEN implies a live position");
            let decision = risk::evaluate(&position, bar, ltf, &self.config.risk);

            match decision {
                RiskDecision::Continue(update) => {
                    tracing::debug!(stop_update = ?update, "stop updated");
                    self.slot.update_stop(update)?;
                }
                RiskDecision::Exit(reason) => {
                    tracing::info!(reason, "risk exit triggered");
                    self.slot.start_close()?;
                    let trade = execution::exit_fill(
                        &position,
                        bar,
                        reason,
                        bar.close_time,
                        self.equity,
                        &self.config.execution,
                        ltf.atr,
                    );
                    self.equity = trade.equity_after;
                    tracing::info!(pnl = trade.pnl, equity = self.equity, reason, "trade closed");
                    self.trades.push(trade);
                    self.slot.close_position();
                    return Ok(());
                }
            }
        }

        if self.slot.state() == PositionState::Flat {
            let signal = strategy::evaluate(bar, htf, ltf, self.slot.state(), &self.config);
            if let Signal::Entry { reason, .. } = signal {
                let (entry_price, initial_stop, size) = execution::entry_fill(
                    bar,
                    self.equity,
                    &self.config.execution,
                    self.config.risk.max_risk_per_trade,
                    self.config.risk.initial_stop_pct,
                    ltf.atr,
                );
                let position = Position::open_long(entry_price, bar.close_time, size, initial_stop);
                self.slot.open_position(position)?;
                tracing::info!(reason, entry_price, size, "position opened");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use chrono::{Duration, TimeZone, Utc};

    fn htf_bull(config: &CoreConfig) -> HtfFeatures {
        HtfFeatures {
            ema_medium: Some(110.0),
            ema_long: Some(100.0),
            adx: Some(config.strategy.htf_adx_min + 5.0),
        }
    }

    fn ltf_confirming(config: &CoreConfig, donchian_high: f64) -> LtfFeatures {
        LtfFeatures {
            ema_short: Some(105.0),
            ema_medium: Some(100.0),
            adx: Some(config.strategy.ltf_adx_min + 5.0),
            adx_history: vec![20.0, 21.0, 22.0, 23.0],
            atr: Some(2.0),
            donchian_high: Some(donchian_high),
        }
    }

    fn bar_at(hour: i64, close: f64, low: f64, high: f64) -> Bar {
        let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
        Bar::new(open_time, open_time + Duration::hours(1), close, high, low, close, 10.0)
    }

    #[test]
    fn opens_position_on_entry_signal() {
        let config = CoreConfig::default();
        let mut runner = BarRunner::new(config.clone());
        let bar = bar_at(0, 120.0, 118.0, 121.0);
        runner.on_bar(&bar, &htf_bull(&config), &ltf_confirming(&config, 115.0)).unwrap();
        assert_eq!(runner.state(), PositionState::Open);
    }

    #[test]
    fn does_not_open_new_position_on_bar_that_exits() {
        let config = CoreConfig::default();
        let mut runner = BarRunner::new(config.clone());

        let entry_bar = bar_at(0, 120.0, 118.0, 121.0);
        runner.on_bar(&entry_bar, &htf_bull(&config), &ltf_confirming(&config, 115.0)).unwrap();
        assert_eq!(runner.state(), PositionState::Open);

        // Next bar: low pierces the initial stop. Even though strategy
        // conditions still hold, no new position should open on this bar.
        let exit_bar = bar_at(1, 115.0, 90.0, 121.0);
        runner.on_bar(&exit_bar, &htf_bull(&config), &ltf_confirming(&config, 115.0)).unwrap();
        assert_eq!(runner.state(), PositionState::Flat);
        assert_eq!(runner.trades().len(), 1);
    }

    #[test]
    fn flat_market_never_trades() {
        let config = CoreConfig::default();
        let mut runner = BarRunner::new(config);
        let htf = HtfFeatures::undefined();
        let ltf = LtfFeatures::undefined();
        for hour in 0..50 {
            let bar = bar_at(hour, 100.0, 100.0, 100.0);
            runner.on_bar(&bar, &htf, &ltf).unwrap();
        }
        assert_eq!(runner.trades().len(), 0);
        assert_eq!(runner.equity(), runner_initial_equity());
    }

    fn runner_initial_equity() -> f64 {
        CoreConfig::default().account.initial_capital
    }
}
