//! Risk manager (C6) — the hardest part.
//!
//! A pure function of `(position, bar, ltf_features, config)` returning a
//! tagged result: `Exit(reason)` or `Continue(stop_update)`. Invoked exactly
//! once per LTF bar when a position exists, strictly before the strategy
//! function (see the bar runner, C7).

use crate::bar::Bar;
use crate::config::RiskConfig;
use crate::features::LtfFeatures;
use crate::position::{Position, Stage, StopUpdate, TrailingMode};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskDecision {
    Exit(&'static str),
    Continue(StopUpdate),
}

/// Trend-exhaustion predicate (§4.6). `history` is ADX values strictly
/// preceding the current bar, oldest first. Returns false (blocks exit)
/// whenever history is shorter than `k + 1` — this is the spec's resolved
/// behaviour for the "short adx_history" open question, not a distinct
/// default from the main predicate.
pub fn trend_exhausted(history: &[f64], tau: f64, k: usize) -> bool {
    let l = history.len();
    if l < k + 1 {
        return false;
    }
    let s = &history[l - k - 1..l];
    let strictly_declining = s.windows(2).all(|w| w[1] < w[0]);
    s[k] < tau && strictly_declining
}

/// Evaluate one LTF bar against an open position. Pure: no side effects, no
/// mutation — the caller applies the returned `StopUpdate` via
/// `PositionSlot::update_stop`.
pub fn evaluate(position: &Position, bar: &Bar, ltf: &LtfFeatures, config: &RiskConfig) -> RiskDecision {
    // Step 1 & 2: stage-specific stop checks. Stage 3's stop is checked here
    // (via trailing_stop) and never re-checked as a plain stop in step 2.
    if position.is_trailing_active {
        if let Some(trailing_stop) = position.trailing_stop {
            if bar.low <= trailing_stop {
                let exhausted = trend_exhausted(&ltf.adx_history, config.trend_exhaust_adx, config.trend_exhaust_bars);
                if exhausted {
                    return RiskDecision::Exit("TRAILING_STOP_HIT");
                }
                // Strong trend: do not exit, fall through so the trailing
                // stop can still advance on this bar.
            }
        }
    } else {
        match position.stage() {
            Stage::One => {
                if bar.low <= position.active_stop() {
                    return RiskDecision::Exit("STOP_LOSS_INITIAL");
                }
            }
            Stage::Two => {
                if bar.low <= position.active_stop() {
                    return RiskDecision::Exit("STOP_LOSS_BREAK_EVEN");
                }
            }
            Stage::Three => unreachable!("is_trailing_active is false, stage cannot be Three"),
        }
    }

    // Step 3: progress stage and update the stop. Never decreases
    // active_stop — see Position::apply_stop_update's ratchet.
    let r = position.unrealized_r(bar.close);
    let max_r = position.max_unrealized_r.max(r);
    let stage = position.stage();

    let mut is_trailing_active = position.is_trailing_active;
    let mut trailing_stop = position.trailing_stop;
    let mut trailing_mode = position.trailing_mode;
    let mut active_stop = position.active_stop();

    if !is_trailing_active {
        if stage == Stage::One && r >= config.break_even_r && r < config.trailing_activation_r {
            active_stop = position.entry_price;
        }
        if r >= config.trailing_activation_r {
            is_trailing_active = true;
            trailing_stop = Some(position.entry_price);
            active_stop = position.entry_price;
            trailing_mode = TrailingMode::EmaShort;
        }
    } else if let Some(profit_lock_r) = config.profit_lock_r {
        if max_r >= profit_lock_r {
            trailing_mode = TrailingMode::EmaMedium;
        }
    }

    if is_trailing_active {
        let candidate = match trailing_mode {
            TrailingMode::EmaShort => ltf.ema_short,
            TrailingMode::EmaMedium => ltf.ema_medium,
        };
        if let Some(candidate) = candidate {
            let current_trailing = trailing_stop.unwrap_or(position.entry_price);
            if candidate > current_trailing {
                trailing_stop = Some(candidate);
                active_stop = candidate;
            }
        }
    }

    RiskDecision::Continue(StopUpdate {
        active_stop: Some(active_stop),
        trailing_stop,
        is_trailing_active: Some(is_trailing_active),
        trailing_mode: Some(trailing_mode),
        max_unrealized_r: Some(max_r),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn bar(close: f64, low: f64, high: f64) -> Bar {
        Bar::new(now(), now() + chrono::Duration::hours(1), close, high, low, close, 10.0)
    }

    fn ltf(ema_short: f64, ema_medium: f64, history: Vec<f64>) -> LtfFeatures {
        LtfFeatures {
            ema_short: Some(ema_short),
            ema_medium: Some(ema_medium),
            adx: Some(30.0),
            adx_history: history,
            atr: Some(1.0),
            donchian_high: Some(90.0),
        }
    }

    fn default_config() -> RiskConfig {
        RiskConfig {
            max_risk_per_trade: 0.01,
            initial_stop_pct: 0.01,
            break_even_r: 1.0,
            trailing_activation_r: 2.0,
            trend_exhaust_adx: 20.0,
            trend_exhaust_bars: 3,
            profit_lock_r: None,
        }
    }

    #[test]
    fn stage1_exit_on_initial_stop_touch() {
        let position = Position::open_long(100.0, now(), 1.0, 99.0);
        let bar = bar(98.0, 98.5, 99.0);
        let features = ltf(99.5, 99.0, vec![]);
        let decision = evaluate(&position, &bar, &features, &default_config());
        assert_eq!(decision, RiskDecision::Exit("STOP_LOSS_INITIAL"));
    }

    #[test]
    fn stage1_progresses_to_break_even_without_exit() {
        let position = Position::open_long(100.0, now(), 1.0, 99.0);
        // r = (101.5 - 100)/(100-99) = 1.5, in [break_even_r, trailing_activation_r)
        let bar = bar(101.5, 101.0, 102.0);
        let features = ltf(101.0, 100.5, vec![]);
        let decision = evaluate(&position, &bar, &features, &default_config());
        match decision {
            RiskDecision::Continue(update) => {
                assert_eq!(update.active_stop, Some(100.0));
                assert_eq!(update.is_trailing_active, Some(false));
            }
            RiskDecision::Exit(_) => panic!("unexpected exit"),
        }
    }

    #[test]
    fn break_even_stop_triggers_exit_on_touch() {
        let mut position = Position::open_long(100.0, now(), 1.0, 99.0);
        position
            .apply_stop_update(StopUpdate { active_stop: Some(100.0), ..Default::default() })
            .unwrap();
        let bar = bar(100.5, 99.9, 101.0);
        let features = ltf(100.5, 100.0, vec![]);
        let decision = evaluate(&position, &bar, &features, &default_config());
        assert_eq!(decision, RiskDecision::Exit("STOP_LOSS_BREAK_EVEN"));
    }

    #[test]
    fn trailing_activates_at_threshold_r() {
        let position = Position::open_long(100.0, now(), 1.0, 99.0);
        // r = (103 - 100)/1 = 3.0 >= trailing_activation_r(2.0)
        let bar = bar(103.0, 102.5, 103.5);
        let features = ltf(103.0, 101.0, vec![]);
        let decision = evaluate(&position, &bar, &features, &default_config());
        match decision {
            RiskDecision::Continue(update) => {
                assert_eq!(update.is_trailing_active, Some(true));
                // trailing_stop advances to ema_short(103.0) since it exceeds entry_price(100.0)
                assert_eq!(update.trailing_stop, Some(103.0));
            }
            RiskDecision::Exit(_) => panic!("unexpected exit"),
        }
    }

    #[test]
    fn strong_trend_ignores_trailing_touch() {
        let mut position = Position::open_long(100.0, now(), 1.0, 99.0);
        position
            .apply_stop_update(StopUpdate {
                active_stop: Some(100.0),
                trailing_stop: Some(100.0),
                is_trailing_active: Some(true),
                ..Default::default()
            })
            .unwrap();
        let bar = bar(104.0, 100.0, 104.5); // touches trailing_stop at 100
        let features = ltf(101.0, 100.5, vec![35.0, 37.0, 40.0]); // rising ADX, not exhausted
        let decision = evaluate(&position, &bar, &features, &default_config());
        match decision {
            RiskDecision::Continue(update) => {
                // trailing stop should advance since ema_short(101.0) > 100
                assert_eq!(update.trailing_stop, Some(101.0));
            }
            RiskDecision::Exit(_) => panic!("strong trend must not exit on touch"),
        }
    }

    #[test]
    fn exhaustion_triggers_exit_on_trailing_touch() {
        let mut position = Position::open_long(100.0, now(), 1.0, 99.0);
        position
            .apply_stop_update(StopUpdate {
                active_stop: Some(100.0),
                trailing_stop: Some(100.0),
                is_trailing_active: Some(true),
                ..Default::default()
            })
            .unwrap();
        let bar = bar(99.95, 99.9, 100.2); // touches/breaches trailing_stop at 100
        let features = ltf(99.0, 99.5, vec![22.0, 20.0, 19.0, 18.0]); // declining, last < tau(20)
        let decision = evaluate(&position, &bar, &features, &default_config());
        assert_eq!(decision, RiskDecision::Exit("TRAILING_STOP_HIT"));
    }

    #[test]
    fn trailing_stop_never_decreases() {
        let mut position = Position::open_long(100.0, now(), 1.0, 99.0);
        position
            .apply_stop_update(StopUpdate {
                active_stop: Some(105.0),
                trailing_stop: Some(105.0),
                is_trailing_active: Some(true),
                ..Default::default()
            })
            .unwrap();
        let bar = bar(106.0, 105.5, 106.5);
        // ema_short below current trailing stop: must not move it down.
        let features = ltf(102.0, 101.0, vec![30.0, 31.0, 32.0]);
        let decision = evaluate(&position, &bar, &features, &default_config());
        match decision {
            RiskDecision::Continue(update) => {
                assert_eq!(update.trailing_stop, Some(105.0));
            }
            RiskDecision::Exit(_) => panic!("unexpected exit"),
        }
    }

    #[test]
    fn profit_lock_switches_trailing_mode() {
        let mut position = Position::open_long(100.0, now(), 1.0, 99.0);
        position
            .apply_stop_update(StopUpdate {
                active_stop: Some(100.0),
                trailing_stop: Some(100.0),
                is_trailing_active: Some(true),
                max_unrealized_r: Some(3.0),
                ..Default::default()
            })
            .unwrap();
        let mut config = default_config();
        config.profit_lock_r = Some(4.0);
        // r = (105 - 100)/1 = 5.0 >= profit_lock_r
        let bar = bar(105.0, 104.0, 105.5);
        let features = ltf(103.0, 104.5, vec![30.0, 31.0, 32.0]);
        let decision = evaluate(&position, &bar, &features, &config);
        match decision {
            RiskDecision::Continue(update) => {
                assert_eq!(update.trailing_mode, Some(TrailingMode::EmaMedium));
                // uses ema_medium(104.5) as the candidate, since mode switched
                assert_eq!(update.trailing_stop, Some(104.5));
            }
            RiskDecision::Exit(_) => panic!("unexpected exit"),
        }
    }

    #[test]
    fn trend_exhausted_false_on_constant_series() {
        assert!(!trend_exhausted(&[20.0, 20.0, 20.0, 20.0], 25.0, 3));
    }

    #[test]
    fn trend_exhausted_true_on_strictly_decreasing_series_below_tau() {
        assert!(trend_exhausted(&[25.0, 22.0, 19.0, 18.0], 20.0, 3));
    }

    #[test]
    fn trend_exhausted_false_when_history_too_short() {
        assert!(!trend_exhausted(&[19.0, 18.0], 20.0, 3));
    }

    #[test]
    fn trend_exhausted_false_on_tie() {
        assert!(!trend_exhausted(&[25.0, 19.0, 19.0, 18.0], 20.0, 3));
    }
}
