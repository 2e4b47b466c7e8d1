//! Strategy function (C4): a pure, stateless ENTRY/HOLD decision.
//!
//! Never emits EXIT — exits are entirely the risk manager's concern (C6).
//! Has no access to account equity, size, or price history beyond what the
//! feature records encode, which is what makes replay deterministic.

use crate::bar::Bar;
use crate::config::CoreConfig;
use crate::features::{HtfFeatures, LtfFeatures};
use crate::position::PositionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Entry { side: Side, reason: &'static str },
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regime {
    Bull,
    Range,
}

fn htf_regime(htf: &HtfFeatures, config: &CoreConfig) -> Option<Regime> {
    let (ema_medium, ema_long, adx) = (htf.ema_medium?, htf.ema_long?, htf.adx?);
    Some(if ema_medium > ema_long && adx > config.strategy.htf_adx_min {
        Regime::Bull
    } else {
        Regime::Range
    })
}

/// Evaluate one LTF bar. Pure: depends only on its arguments.
pub fn evaluate(
    bar: &Bar,
    htf: &HtfFeatures,
    ltf: &LtfFeatures,
    position_state: PositionState,
    config: &CoreConfig,
) -> Signal {
    if position_state != PositionState::Flat {
        return Signal::Hold;
    }

    if !ltf.is_complete() {
        return Signal::Hold;
    }

    let Some(regime) = htf_regime(htf, config) else {
        return Signal::Hold;
    };

    // Already checked is_complete above, these unwraps are safe.
    let ltf_adx = ltf.adx.unwrap();
    let ema_short = ltf.ema_short.unwrap();
    let ema_medium = ltf.ema_medium.unwrap();
    let donchian_high = ltf.donchian_high.unwrap();

    let entry_confirmed = regime == Regime::Bull
        && ltf_adx > config.strategy.ltf_adx_min
        && ema_short > ema_medium
        && bar.close > donchian_high;

    if entry_confirmed {
        Signal::Entry {
            side: Side::Long,
            reason: "HTF_BULL_BREAKOUT_CONFIRMED",
        }
    } else {
        Signal::Hold
    }
}
