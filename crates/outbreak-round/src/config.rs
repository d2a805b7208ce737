//! Round configuration and phase state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoundConfig
// ---------------------------------------------------------------------------

/// Whether and how often a special round mode is rolled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeRule {
    pub enabled: bool,
    /// One in `chance` rounds. `0` never rolls.
    pub chance: u32,
    /// Alive players required before the mode can be rolled.
    pub min_players: usize,
}

impl Default for ModeRule {
    fn default() -> Self {
        Self {
            enabled: true,
            chance: 20,
            min_players: 0,
        }
    }
}

/// Rules for the special modes, rolled in field order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeRules {
    pub nemesis: ModeRule,
    pub survivor: ModeRule,
    pub swarm: ModeRule,
    pub multi: ModeRule,
    pub armageddon: ModeRule,
}

/// Configuration for the round lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Round length in minutes; the deadline fires one second early.
    pub round_minutes: f32,

    /// Seconds between freeze-time end and the mode start.
    pub countdown_secs: u32,

    /// Alive players needed for the mode to start at countdown end.
    pub min_players: usize,

    /// Fraction of alive players infected in a `Multi` round.
    pub multi_ratio: f32,

    pub modes: ModeRules,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            round_minutes: 4.0,
            countdown_secs: 10,
            min_players: 2,
            multi_ratio: 0.15,
            modes: ModeRules {
                armageddon: ModeRule {
                    chance: 0,
                    min_players: 8,
                    ..ModeRule::default()
                },
                ..ModeRules::default()
            },
        }
    }
}

impl RoundConfig {
    /// Delay of the round-end deadline after the round goes live.
    pub fn deadline(&self) -> Duration {
        let secs = (self.round_minutes.max(0.0) * 60.0 - 1.0).max(1.0);
        Duration::from_secs_f32(secs)
    }
}

// ---------------------------------------------------------------------------
// RoundPhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of the round.
///
/// ```text
/// PreStart → Starting → Active → Ending → PreStart (next round)
/// ```
///
/// - **PreStart**: the counter was bumped, the mode is unset and teams
///   are being rebalanced. Passed through within one host event.
/// - **Starting**: freeze time. Players spawn as humans.
/// - **Active**: the round is live; the countdown to the mode start and
///   the round deadline are running.
/// - **Ending**: the host declared a winner. Deaths no longer reward or
///   schedule respawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    PreStart,
    Starting,
    Active,
    Ending,
}

impl RoundPhase {
    pub fn next(self) -> Self {
        match self {
            Self::PreStart => Self::Starting,
            Self::Starting => Self::Active,
            Self::Active => Self::Ending,
            Self::Ending => Self::PreStart,
        }
    }

    /// Valid transitions follow `next`, plus a host-forced restart
    /// (back to `PreStart`) from any phase.
    pub fn can_transition_to(self, target: Self) -> bool {
        target == Self::PreStart || self.next() == target
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreStart => write!(f, "PreStart"),
            Self::Starting => write!(f, "Starting"),
            Self::Active => write!(f, "Active"),
            Self::Ending => write!(f, "Ending"),
        }
    }
}
