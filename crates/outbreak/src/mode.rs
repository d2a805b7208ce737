//! Mode start: the countdown's last second rolls a mode and converts the
//! opening zombies, survivors and nemeses.

use outbreak_host::{Engine, Presentation, SoundKind, Target};
use outbreak_protocol::{RoundMode, UserId};
use outbreak_round::{CountdownTick, SkipReason, Step};
use rand::seq::SliceRandom;
use tracing::info;

use crate::ZombieKind;
use crate::controller::Controller;

/// Countdown seconds that get a voice cue.
const VOICED_COUNTDOWN: u32 = 10;

impl<E: Engine, P: Presentation> Controller<E, P> {
    /// One second of the round countdown.
    pub(crate) fn on_round_countdown(&mut self, round: u64) -> Step<()> {
        match self.round.on_countdown(round, &mut self.timers) {
            Step::Applied(CountdownTick::Remaining(left)) => {
                if left <= VOICED_COUNTDOWN {
                    self.presentation
                        .play_sound(SoundKind::Countdown(left), Target::All);
                }
                Step::Applied(())
            }
            Step::Applied(CountdownTick::Elapsed) => self.start_mode().map(|_| ()),
            Step::Skipped(reason) => Step::Skipped(reason),
        }
    }

    /// Rolls the mode for the players alive now and applies it.
    ///
    /// With too few players alive the countdown starts over.
    pub fn start_mode(&mut self) -> Step<RoundMode> {
        let mut alive: Vec<UserId> = self
            .registry
            .iter()
            .filter(|p| self.engine.is_alive(p.slot))
            .map(|p| p.user)
            .collect();
        alive.sort_unstable();

        let needed = self.round.config().min_players.max(2);
        if alive.len() < needed {
            self.round.restart_countdown(&mut self.timers);
            info!(alive = alive.len(), needed, "not enough players, countdown restarted");
            return Step::Skipped(SkipReason::NotEnoughPlayers);
        }

        let mode = self.round.choose_mode(alive.len(), &mut self.rng);
        if let Step::Skipped(reason) = self.round.begin_mode(mode, &mut self.timers) {
            return Step::Skipped(reason);
        }

        alive.shuffle(&mut self.rng);
        let half = (alive.len() / 2).max(1);
        match mode {
            RoundMode::Infection => {
                let _ = self.infect(alive[0], ZombieKind::First);
            }
            RoundMode::Multi => {
                let count = self.round.multi_count(alive.len()).clamp(1, alive.len() - 1);
                for &user in &alive[..count] {
                    let _ = self.infect(user, ZombieKind::First);
                }
            }
            RoundMode::Swarm => {
                for &user in &alive[..half] {
                    let _ = self.infect(user, ZombieKind::Regular);
                }
            }
            RoundMode::Nemesis => {
                let _ = self.infect(alive[0], ZombieKind::Nemesis);
            }
            RoundMode::Survivor => {
                let _ = self.make_survivor(alive[0]);
                for &user in &alive[1..] {
                    let _ = self.infect(user, ZombieKind::Regular);
                }
            }
            RoundMode::Armageddon => {
                for &user in &alive[..half] {
                    let _ = self.infect(user, ZombieKind::Nemesis);
                }
                for &user in &alive[half..] {
                    let _ = self.make_survivor(user);
                }
            }
        }

        for player in self.registry.iter_mut() {
            self.timers.clear(&mut player.timers.countdown);
        }
        self.presentation
            .play_sound(SoundKind::ModeStart(mode), Target::All);
        info!(round = self.round.number(), %mode, alive = alive.len(), "mode applied");
        Step::Applied(mode)
    }
}
