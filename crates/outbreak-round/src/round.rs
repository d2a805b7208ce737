//! The round record and the controller that owns it.

use std::time::Duration;

use outbreak_host::Engine;
use outbreak_protocol::{EntityIndex, RoundMode, Slot, Team};
use outbreak_registry::PlayerRegistry;
use outbreak_timer::{TaskHandle, TimerScheduler};
use rand::Rng;
use tracing::{debug, info};

use crate::{ModeRule, RoundConfig, RoundPhase, SkipReason, Step};

/// Map entities tied to native objectives. Matched as substrings.
pub const OBJECTIVE_CLASSNAMES: [&str; 3] =
    ["func_bomb_target", "func_hostage_rescue", "func_buyzone"];

/// Timer tasks owned by the round.
///
/// Both carry the round number they were scheduled in, so a task that
/// somehow outlives its round is recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundJob {
    /// The round clock ran out.
    Deadline { round: u64 },
    /// One second of the mode countdown elapsed.
    Countdown { round: u64 },
}

/// Result of one countdown second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Remaining(u32),
    /// The countdown reached zero; a mode should start now.
    Elapsed,
}

/// The process-wide round record.
///
/// Only [`RoundController`] can mutate it; everyone else gets `&Round`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub phase: RoundPhase,
    /// `None` until the countdown elapses and a mode is chosen.
    pub mode: Option<RoundMode>,
    /// Incremented once per `PreStart`. Never decreases.
    pub number: u64,
    /// Seconds left until the mode starts.
    pub countdown: u32,
    /// Round-end deadline.
    pub timer: Option<TaskHandle>,
    pub countdown_timer: Option<TaskHandle>,
}

/// Drives round phases, team rebalancing and objective cleanup.
pub struct RoundController {
    round: Round,
    config: RoundConfig,
}

impl RoundController {
    pub fn new(config: RoundConfig) -> Self {
        Self {
            round: Round {
                phase: RoundPhase::PreStart,
                mode: None,
                number: 0,
                countdown: config.countdown_secs,
                timer: None,
                countdown_timer: None,
            },
            config,
        }
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase
    }

    pub fn mode(&self) -> Option<RoundMode> {
        self.round.mode
    }

    pub fn number(&self) -> u64 {
        self.round.number
    }

    /// Whether a mode has been chosen this round.
    pub fn mode_started(&self) -> bool {
        self.round.mode.is_some()
    }

    pub fn is_ending(&self) -> bool {
        self.round.phase == RoundPhase::Ending
    }

    // -- phase entry ---------------------------------------------------------

    /// Enters `PreStart`, rebalances teams, and moves on to `Starting`.
    ///
    /// Returns the team assignment made by the rebalance.
    pub fn enter_pre_start<E, T>(
        &mut self,
        registry: &PlayerRegistry,
        engine: &mut E,
        timers: &mut TimerScheduler<T>,
    ) -> Vec<(Slot, Team)>
    where
        E: Engine,
        T: From<RoundJob> + Clone,
    {
        timers.clear(&mut self.round.timer);
        timers.clear(&mut self.round.countdown_timer);

        self.round.number += 1;
        self.round.mode = None;
        self.round.phase = RoundPhase::PreStart;
        self.round.countdown = self.config.countdown_secs;
        info!(round = self.round.number, "round pre-start");

        let assigned = self.rebalance(registry, engine);
        self.round.phase = RoundPhase::Starting;
        assigned
    }

    /// Puts every in-game player on Zombie (odd slot) or Human (even slot).
    pub fn rebalance<E: Engine>(
        &self,
        registry: &PlayerRegistry,
        engine: &mut E,
    ) -> Vec<(Slot, Team)> {
        let mut assigned = Vec::new();
        for user in registry.users() {
            let Some(slot) = registry.resolve(user) else {
                continue;
            };
            if !engine.is_connected(slot) || !engine.is_in_game(slot) {
                debug!(%user, %slot, "rebalance skipped player not in game");
                continue;
            }
            let team = if slot.is_odd() { Team::Zombie } else { Team::Human };
            engine.set_team(slot, team);
            assigned.push((slot, team));
        }
        debug!(round = self.round.number, players = assigned.len(), "teams rebalanced");
        assigned
    }

    /// Freeze time ended: arm the round deadline and the mode countdown,
    /// then purge objective entities.
    ///
    /// Returns the number of entities removed.
    pub fn enter_active<E, T>(&mut self, engine: &mut E, timers: &mut TimerScheduler<T>) -> Step<usize>
    where
        E: Engine,
        T: From<RoundJob> + Clone,
    {
        if self.round.phase != RoundPhase::Starting {
            return Step::Skipped(SkipReason::WrongPhase(self.round.phase));
        }
        self.round.phase = RoundPhase::Active;
        let round = self.round.number;

        let deadline = self.config.deadline();
        let handle = timers.schedule_once(deadline, RoundJob::Deadline { round }.into());
        timers.replace(&mut self.round.timer, handle);
        self.arm_countdown(timers);

        let purged = self.purge_objectives(engine);
        info!(
            round,
            deadline_secs = deadline.as_secs(),
            countdown = self.round.countdown,
            purged,
            "round active"
        );
        Step::Applied(purged)
    }

    /// Removes every objective entity above the player slot range.
    ///
    /// Entities whose classname can't be read yet are skipped; the purge
    /// runs again next round.
    pub fn purge_objectives<E: Engine>(&self, engine: &mut E) -> usize {
        let mut removed = 0;
        for index in (engine.max_clients() + 1)..engine.max_entities() {
            let entity = EntityIndex(index);
            let Some(classname) = engine.entity_classname(entity) else {
                continue;
            };
            if OBJECTIVE_CLASSNAMES.iter().any(|c| classname.contains(c)) {
                engine.remove_entity(entity);
                removed += 1;
            }
        }
        removed
    }

    /// The host declared the round over.
    pub fn enter_ending<T: Clone>(&mut self, winner: Team, timers: &mut TimerScheduler<T>) -> Step<()> {
        match self.round.phase {
            RoundPhase::Starting | RoundPhase::Active => {}
            other => return Step::Skipped(SkipReason::WrongPhase(other)),
        }
        timers.clear(&mut self.round.timer);
        timers.clear(&mut self.round.countdown_timer);
        self.round.phase = RoundPhase::Ending;
        info!(round = self.round.number, %winner, mode = ?self.round.mode, "round ending");
        Step::Applied(())
    }

    // -- countdown and mode --------------------------------------------------

    fn arm_countdown<T: From<RoundJob> + Clone>(&mut self, timers: &mut TimerScheduler<T>) {
        let round = self.round.number;
        let handle =
            timers.schedule_repeating(Duration::from_secs(1), RoundJob::Countdown { round }.into());
        timers.replace(&mut self.round.countdown_timer, handle);
    }

    /// One second of the countdown passed.
    pub fn on_countdown<T: Clone>(&mut self, round: u64, timers: &mut TimerScheduler<T>) -> Step<CountdownTick> {
        if round != self.round.number {
            return Step::Skipped(SkipReason::StaleRound);
        }
        if self.round.phase != RoundPhase::Active {
            return Step::Skipped(SkipReason::WrongPhase(self.round.phase));
        }
        if self.round.mode.is_some() {
            timers.clear(&mut self.round.countdown_timer);
            return Step::Skipped(SkipReason::ModeAlreadyStarted);
        }

        self.round.countdown = self.round.countdown.saturating_sub(1);
        if self.round.countdown == 0 {
            timers.clear(&mut self.round.countdown_timer);
            Step::Applied(CountdownTick::Elapsed)
        } else {
            Step::Applied(CountdownTick::Remaining(self.round.countdown))
        }
    }

    /// Starts the countdown over, used when too few players are alive at
    /// countdown end.
    pub fn restart_countdown<T: From<RoundJob> + Clone>(&mut self, timers: &mut TimerScheduler<T>) {
        self.round.countdown = self.config.countdown_secs.max(1);
        self.arm_countdown(timers);
        debug!(round = self.round.number, countdown = self.round.countdown, "countdown restarted");
    }

    /// Records the chosen mode. Only valid once per active round.
    pub fn begin_mode<T: Clone>(&mut self, mode: RoundMode, timers: &mut TimerScheduler<T>) -> Step<RoundMode> {
        if self.round.phase != RoundPhase::Active {
            return Step::Skipped(SkipReason::WrongPhase(self.round.phase));
        }
        if self.round.mode.is_some() {
            return Step::Skipped(SkipReason::ModeAlreadyStarted);
        }
        timers.clear(&mut self.round.countdown_timer);
        self.round.countdown = 0;
        self.round.mode = Some(mode);
        info!(round = self.round.number, %mode, "mode started");
        Step::Applied(mode)
    }

    /// Rolls the mode for a round with `alive` players.
    ///
    /// Special modes are tried in a fixed order (nemesis, survivor, swarm,
    /// multi, armageddon); the first whose roll succeeds wins.
    pub fn choose_mode<R: Rng>(&self, alive: usize, rng: &mut R) -> RoundMode {
        let modes = &self.config.modes;
        let multi_count = self.multi_count(alive);
        let multi_fits = multi_count >= 2 && multi_count < alive;
        let mut roll = |rule: &ModeRule| {
            rule.enabled
                && rule.chance > 0
                && alive >= rule.min_players
                && rng.random_range(0..rule.chance) == 0
        };

        if roll(&modes.nemesis) {
            RoundMode::Nemesis
        } else if roll(&modes.survivor) {
            RoundMode::Survivor
        } else if roll(&modes.swarm) {
            RoundMode::Swarm
        } else if multi_fits && roll(&modes.multi) {
            RoundMode::Multi
        } else if roll(&modes.armageddon) {
            RoundMode::Armageddon
        } else {
            RoundMode::Infection
        }
    }

    /// First-wave zombies in a `Multi` round.
    pub fn multi_count(&self, alive: usize) -> usize {
        (alive as f32 * self.config.multi_ratio).ceil() as usize
    }

    /// The round clock ran out: humans held on.
    pub fn on_deadline<E: Engine>(&mut self, round: u64, engine: &mut E) -> Step<Team> {
        if round != self.round.number {
            return Step::Skipped(SkipReason::StaleRound);
        }
        self.round.timer = None;
        if self.round.phase != RoundPhase::Active {
            return Step::Skipped(SkipReason::WrongPhase(self.round.phase));
        }
        engine.terminate_round(Team::Human);
        info!(round, "round deadline reached");
        Step::Applied(Team::Human)
    }
}
