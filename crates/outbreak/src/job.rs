//! Timer tasks the controller schedules.

use outbreak_protocol::UserId;
use outbreak_round::RoundJob;

/// A task owned by one player record.
///
/// Jobs name the user, never the slot: when one fires, the controller
/// resolves the user again and drops the job if they left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerJob {
    /// Revive the player. Dropped if the round number moved on.
    Respawn { round: u64 },
    /// Redraw the balance overlay.
    CashOverlay,
    Ambience,
    /// Redraw the "infection in N" readout.
    CountdownHud,
    /// The leap cooldown ran out.
    SkillReady,
    Heal,
    Moan,
}

/// Everything that can sit in the controller's scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    Round(RoundJob),
    Player { user: UserId, job: PlayerJob },
}

impl Job {
    pub fn player(user: UserId, job: PlayerJob) -> Self {
        Self::Player { user, job }
    }
}

impl From<RoundJob> for Job {
    fn from(job: RoundJob) -> Self {
        Self::Round(job)
    }
}
