//! Result of a guarded gameplay operation.

use crate::RoundPhase;

/// Why a gameplay operation did nothing.
///
/// None of these are errors: a respawn that finds its player already alive
/// or a reward for a world kill is simply not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The round is not in the phase the operation needs.
    WrongPhase(RoundPhase),
    /// A timer from an earlier round fired.
    StaleRound,
    /// The timer fired after its owning field moved on to another handle.
    StaleTimer,
    /// The round is in its end-validation window.
    RoundEnding,
    ModeNotStarted,
    ModeAlreadyStarted,
    NotEnoughPlayers,
    /// The user left before the operation could run.
    Disconnected,
    /// The slot holds no registered player.
    UnknownPlayer,
    AlreadyAlive,
    NotAlive,
    WorldKill,
    DeathmatchDisabled,
    /// The switch for the victim's role is off.
    RespawnDisabled,
    RespawnLimit,
    /// Only the last human is left and respawning them is disabled.
    LastHuman,
    FeatureDisabled,
    NotZombie,
    SkillCoolingDown,
}

/// Outcome of a guarded operation: either applied with a result, or
/// skipped with a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Step<T> {
    Applied(T),
    Skipped(SkipReason),
}

impl<T> Step<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(v) => Some(v),
            Self::Skipped(_) => None,
        }
    }

    pub fn skipped(&self) -> Option<SkipReason> {
        match self {
            Self::Applied(_) => None,
            Self::Skipped(r) => Some(*r),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Step<U> {
        match self {
            Self::Applied(v) => Step::Applied(f(v)),
            Self::Skipped(r) => Step::Skipped(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_accessors() {
        let ok: Step<u32> = Step::Applied(3);
        assert!(ok.is_applied());
        assert_eq!(ok.clone().map(|v| v * 2), Step::Applied(6));
        assert_eq!(ok.applied(), Some(3));

        let no: Step<u32> = Step::Skipped(SkipReason::LastHuman);
        assert_eq!(no.skipped(), Some(SkipReason::LastHuman));
        assert_eq!(no.applied(), None);
    }
}
