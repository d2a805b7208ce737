//! The controller: owns every piece of game-mode state and the host.

use std::time::Duration;

use outbreak_host::{Engine, Presentation};
use outbreak_protocol::{Role, RoundMode, Slot, UserId};
use outbreak_registry::{Player, PlayerRegistry, PlayerTimers};
use outbreak_round::{RoundController, RoundJob, RoundPhase, SkipReason, Step};
use outbreak_timer::{Fired, TaskHandle, TimerScheduler};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, trace};

use crate::{EconomyRegulator, Job, ModeConfig, PlayerJob};

/// Selects one handle field of a player's timers.
pub(crate) type TimerField = fn(&mut PlayerTimers) -> &mut Option<TaskHandle>;

/// The infection game-mode controller.
///
/// One instance per server. Host events arrive through
/// [`dispatch`](Self::dispatch), time through [`advance`](Self::advance);
/// both run to completion before the next call, so no two handlers ever
/// interleave. The constructors clamp the config with
/// [`ModeConfig::validated`].
pub struct Controller<E: Engine, P: Presentation> {
    pub(crate) config: ModeConfig,
    pub(crate) round: RoundController,
    pub(crate) registry: PlayerRegistry,
    pub(crate) timers: TimerScheduler<Job>,
    pub(crate) economy: EconomyRegulator,
    pub(crate) engine: E,
    pub(crate) presentation: P,
    pub(crate) rng: StdRng,
}

impl<E: Engine, P: Presentation> Controller<E, P> {
    pub fn new(config: ModeConfig, engine: E, presentation: P) -> Self {
        Self::with_rng(config, engine, presentation, StdRng::from_os_rng())
    }

    /// Like [`new`](Self::new) with a fixed seed for mode rolls and weapon
    /// draws.
    pub fn with_seed(config: ModeConfig, engine: E, presentation: P, seed: u64) -> Self {
        Self::with_rng(config, engine, presentation, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ModeConfig, engine: E, presentation: P, rng: StdRng) -> Self {
        let config = config.validated();
        Self {
            round: RoundController::new(config.round.clone()),
            economy: EconomyRegulator::new(config.economy),
            registry: PlayerRegistry::new(),
            timers: TimerScheduler::new(),
            config,
            engine,
            presentation,
            rng,
        }
    }

    pub fn config(&self) -> &ModeConfig {
        &self.config
    }

    pub fn round(&self) -> &RoundController {
        &self.round
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn player(&self, user: UserId) -> Option<&Player> {
        self.registry.get(user)
    }

    /// Mutable access for host-side features such as class menus. Balance
    /// changes must still go through [`adjust_balance`](Self::adjust_balance).
    pub fn player_mut(&mut self, user: UserId) -> Option<&mut Player> {
        self.registry.get_mut(user)
    }

    pub fn timers(&self) -> &TimerScheduler<Job> {
        &self.timers
    }

    pub fn economy(&self) -> &EconomyRegulator {
        &self.economy
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut P {
        &mut self.presentation
    }

    /// Adds `delta` to a player's balance through the economy policy.
    pub fn adjust_balance(&mut self, user: UserId, delta: i64) -> Step<u32> {
        let Some(player) = self.registry.get_mut(user) else {
            return Step::Skipped(SkipReason::UnknownPlayer);
        };
        let _ = self.economy.add(player, delta, &mut self.engine, &mut self.timers);
        Step::Applied(player.balance)
    }

    // -- time ----------------------------------------------------------------

    /// Moves the clock forward by `dt` and runs every job that came due, in
    /// deadline order. Returns the number of jobs run.
    pub fn advance(&mut self, dt: Duration) -> usize {
        self.timers.advance(dt);
        let mut ran = 0;
        while let Some(fired) = self.timers.pop_due() {
            ran += 1;
            self.run_job(fired);
        }
        ran
    }

    fn run_job(&mut self, fired: Fired<Job>) {
        trace!(handle = %fired.handle, job = ?fired.task, at_ms = fired.at.as_millis() as u64, "timer fired");
        let handle = fired.handle;
        match fired.task {
            Job::Round(RoundJob::Deadline { round }) => {
                log_skip("deadline", &self.round.on_deadline(round, &mut self.engine));
            }
            Job::Round(RoundJob::Countdown { round }) => {
                let step = self.on_round_countdown(round);
                log_skip("countdown", &step);
            }
            Job::Player { user, job } => {
                let step = match job {
                    PlayerJob::Respawn { round } => self.respawn_due(user, round, handle).map(|_| ()),
                    PlayerJob::CashOverlay => self
                        .economy
                        .on_overlay_tick(
                            self.registry.get_mut(user),
                            handle,
                            &mut self.timers,
                            &mut self.presentation,
                        )
                        .map(|_| ()),
                    PlayerJob::Ambience => self.ambience_due(user, handle),
                    PlayerJob::CountdownHud => self.countdown_hud_due(user, handle),
                    PlayerJob::SkillReady => self.skill_ready(user, handle),
                    PlayerJob::Heal => self.heal_due(user, handle),
                    PlayerJob::Moan => self.moan_due(user, handle),
                };
                if let Step::Skipped(reason) = step {
                    debug!(%user, ?job, ?reason, "player job skipped");
                }
            }
        }
    }

    /// Resolves the slot of the player a support timer fired for.
    ///
    /// Cancels `handle` when the user left or the field no longer holds it.
    pub(crate) fn owned_timer(&mut self, user: UserId, handle: TaskHandle, field: TimerField) -> Step<Slot> {
        let Some(player) = self.registry.get_mut(user) else {
            self.timers.cancel(handle);
            return Step::Skipped(SkipReason::Disconnected);
        };
        if *field(&mut player.timers) != Some(handle) {
            self.timers.cancel(handle);
            return Step::Skipped(SkipReason::StaleTimer);
        }
        Step::Applied(player.slot)
    }

    /// Cancels whatever `field` holds for `user`.
    pub(crate) fn stop_timer(&mut self, user: UserId, field: TimerField) {
        if let Some(player) = self.registry.get_mut(user) {
            self.timers.clear(field(&mut player.timers));
        }
    }

    // -- queries -------------------------------------------------------------

    pub(crate) fn alive_with(&self, pred: impl Fn(&Player) -> bool) -> usize {
        self.registry
            .iter()
            .filter(|p| pred(p) && self.engine.is_alive(p.slot))
            .count()
    }

    pub fn alive_humans(&self) -> usize {
        self.alive_with(Player::is_human)
    }

    pub fn alive_zombies(&self) -> usize {
        self.alive_with(Player::is_zombie)
    }

    /// Read-only view for diagnostics and the actor's snapshot command.
    pub fn snapshot(&self) -> ControllerSnapshot {
        let round = self.round.round();
        let players = self
            .registry
            .users()
            .into_iter()
            .filter_map(|user| self.registry.get(user))
            .map(|p| PlayerSnapshot {
                user: p.user,
                slot: p.slot,
                alive: self.engine.is_alive(p.slot),
                role: p.role,
                survivor: p.survivor,
                nemesis: p.nemesis,
                respawn_count: p.respawn_count,
                respawn_pending: self.timers.is_live_field(&p.timers.respawn),
                balance: p.balance,
                level: p.level,
                experience: p.experience,
            })
            .collect();

        ControllerSnapshot {
            round: round.number,
            phase: round.phase,
            mode: round.mode,
            countdown: round.countdown,
            live_timers: self.timers.len(),
            players,
        }
    }
}

pub(crate) fn log_skip<T>(what: &'static str, step: &Step<T>) {
    if let Some(reason) = step.skipped() {
        debug!(what, ?reason, "skipped");
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerSnapshot {
    pub round: u64,
    pub phase: RoundPhase,
    pub mode: Option<RoundMode>,
    pub countdown: u32,
    pub live_timers: usize,
    pub players: Vec<PlayerSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSnapshot {
    pub user: UserId,
    pub slot: Slot,
    pub alive: bool,
    pub role: Role,
    pub survivor: bool,
    pub nemesis: bool,
    pub respawn_count: u32,
    pub respawn_pending: bool,
    pub balance: u32,
    pub level: u32,
    pub experience: u32,
}
