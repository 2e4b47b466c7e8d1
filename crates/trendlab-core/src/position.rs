//! Position state machine (C5): FLAT <-> OPEN <-> CLOSING transitions and
//! the Position record itself, with a guarded setter enforcing stop
//! monotonicity (see design notes: stop monotonicity enforcement).

use crate::error::CoreError;
use crate::strategy::Side;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Open,
    Closing,
}

impl PositionState {
    fn label(self) -> &'static str {
        match self {
            PositionState::Flat => "FLAT",
            PositionState::Open => "OPEN",
            PositionState::Closing => "CLOSING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingMode {
    EmaShort,
    EmaMedium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    One,
    Two,
    Three,
}

/// A live position. Exists only while the containing `PositionSlot` is not
/// `Flat`. `entry_price`, `entry_time`, `size` and `initial_stop` are set at
/// open and never mutated afterward.
#[derive(Debug, Clone, Copy)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub size: f64,
    initial_stop: f64,
    active_stop: f64,
    pub trailing_stop: Option<f64>,
    pub is_trailing_active: bool,
    pub max_unrealized_r: f64,
    pub trailing_mode: TrailingMode,
}

impl Position {
    pub fn open_long(entry_price: f64, entry_time: DateTime<Utc>, size: f64, initial_stop: f64) -> Self {
        Self {
            side: Side::Long,
            entry_price,
            entry_time,
            size,
            initial_stop,
            active_stop: initial_stop,
            trailing_stop: None,
            is_trailing_active: false,
            max_unrealized_r: 0.0,
            trailing_mode: TrailingMode::EmaShort,
        }
    }

    /// The stop recorded at entry. Permanent basis for all R-unit arithmetic
    /// (see design notes: R-unit anchor) — never use `active_stop` for this.
    pub fn initial_stop(&self) -> f64 {
        self.initial_stop
    }

    pub fn active_stop(&self) -> f64 {
        self.active_stop
    }

    /// Unrealized R at `price`, anchored to `initial_stop`, never `active_stop`.
    pub fn unrealized_r(&self, price: f64) -> f64 {
        (price - self.entry_price) / (self.entry_price - self.initial_stop)
    }

    pub fn stage(&self) -> Stage {
        if self.is_trailing_active {
            Stage::Three
        } else if self.active_stop >= self.entry_price {
            Stage::Two
        } else {
            Stage::One
        }
    }

    /// Apply a stop update, rejecting any decrease of `active_stop`. This is
    /// the guarded setter the design notes call for: a ratchet that turns a
    /// whole bug class into an assertion-time failure instead of a silent
    /// state corruption.
    pub fn apply_stop_update(&mut self, update: StopUpdate) -> Result<(), CoreError> {
        if let Some(new_stop) = update.active_stop {
            if new_stop < self.active_stop {
                return Err(CoreError::StateMachineViolation {
                    attempted: "UPDATE_STOP(decrease active_stop)",
                    current: "OPEN",
                });
            }
            self.active_stop = new_stop;
        }
        if let Some(trailing_stop) = update.trailing_stop {
            self.trailing_stop = Some(trailing_stop);
        }
        if let Some(is_trailing_active) = update.is_trailing_active {
            self.is_trailing_active = is_trailing_active;
        }
        if let Some(trailing_mode) = update.trailing_mode {
            self.trailing_mode = trailing_mode;
        }
        if let Some(max_r) = update.max_unrealized_r {
            self.max_unrealized_r = self.max_unrealized_r.max(max_r);
        }
        Ok(())
    }
}

/// Delta produced by the risk manager for one bar. `None` fields leave the
/// corresponding position field untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StopUpdate {
    pub active_stop: Option<f64>,
    pub trailing_stop: Option<f64>,
    pub is_trailing_active: Option<bool>,
    pub trailing_mode: Option<TrailingMode>,
    pub max_unrealized_r: Option<f64>,
}

/// Owns the one-position-per-instrument slot and its state machine. The
/// runner (C7) is the sole owner; never aliased (see concurrency model).
#[derive(Debug, Default)]
pub struct PositionSlot {
    state_: Option<PositionState>,
    position: Option<Position>,
}

impl PositionSlot {
    pub fn new() -> Self {
        Self {
            state_: None,
            position: None,
        }
    }

    pub fn state(&self) -> PositionState {
        self.state_.unwrap_or(PositionState::Flat)
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn position_mut(&mut self) -> Option<&mut Position> {
        self.position.as_mut()
    }

    /// OPEN_POSITION: fatal if not currently FLAT.
    pub fn open_position(&mut self, position: Position) -> Result<(), CoreError> {
        if self.state() != PositionState::Flat {
            return Err(CoreError::StateMachineViolation {
                attempted: "OPEN_POSITION",
                current: self.state().label(),
            });
        }
        self.position = Some(position);
        self.state_ = Some(PositionState::Open);
        Ok(())
    }

    /// UPDATE_STOP: silently ignored while FLAT, so defensive callers are
    /// harmless.
    pub fn update_stop(&mut self, update: StopUpdate) -> Result<(), CoreError> {
        if self.state() != PositionState::Open {
            return Ok(());
        }
        self.position
            .as_mut()
            .expect("OPEN state implies a live position")
            .apply_stop_update(update)
    }

    /// START_CLOSE: valid only from OPEN.
    pub fn start_close(&mut self) -> Result<(), CoreError> {
        if self.state() != PositionState::Open {
            return Err(CoreError::StateMachineViolation {
                attempted: "START_CLOSE",
                current: self.state().label(),
            });
        }
        self.state_ = Some(PositionState::Closing);
        Ok(())
    }

    /// CLOSE_POSITION: silently ignored while FLAT; valid from OPEN or
    /// CLOSING. Discards the position and returns it to the caller (the
    /// execution adapter needs the final fields to build a trade record).
    pub fn close_position(&mut self) -> Option<Position> {
        if self.state() == PositionState::Flat {
            return None;
        }
        self.state_ = Some(PositionState::Flat);
        self.position.take()
    }
}
