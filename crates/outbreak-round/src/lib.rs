//! Round lifecycle for Outbreak.
//!
//! One round runs at a time. The [`RoundController`] owns the [`Round`]
//! record exclusively and exposes its phase transitions as operations the
//! host-event handlers call.
//!
//! # Key types
//!
//! - [`RoundController`] — phase entry, rebalancing, objective purge, mode roll
//! - [`RoundPhase`] — lifecycle state machine
//! - [`RoundConfig`] — round length, countdown, mode chances
//! - [`RoundJob`] — the timer tasks the round schedules
//! - [`Step`] / [`SkipReason`] — outcome of a guarded operation

mod config;
mod outcome;
mod round;

pub use config::{ModeRule, ModeRules, RoundConfig, RoundPhase};
pub use outcome::{SkipReason, Step};
pub use round::{CountdownTick, OBJECTIVE_CLASSNAMES, Round, RoundController, RoundJob};
