//! Reactions to host events.
//!
//! Every [`HostEvent`] lands in [`Controller::dispatch`], which routes it to
//! one `on_*` handler. Handlers are synchronous and finish before the next
//! event is looked at.

use outbreak_host::{Engine, Menu, Presentation};
use outbreak_protocol::{Buttons, HostEvent, Role, Slot, Team, UserId};
use outbreak_registry::{Player, RegistryError};
use outbreak_round::{SkipReason, Step};
use outbreak_timer::TaskHandle;
use tracing::{debug, info};

use crate::controller::{Controller, log_skip};
use crate::lifecycle::remove_glow;
use crate::{KillReward, OutbreakError};

/// What a death led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeathOutcome {
    /// The payout to the killer, if any.
    pub reward: Option<KillReward>,
    /// The revival timer, or why none was armed.
    pub respawn: Step<TaskHandle>,
}

/// The input tick as it should be handed back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputOutcome {
    pub buttons: Buttons,
    /// `buttons` differs from what the host reported.
    pub modified: bool,
    pub menu_opened: bool,
    pub leapt: bool,
}

impl<E: Engine, P: Presentation> Controller<E, P> {
    /// Routes one host event.
    ///
    /// # Errors
    /// - [`OutbreakError::Protocol`] — the event names the world slot
    /// - [`OutbreakError::Registry`] — a connect for a user or slot that is
    ///   already taken, or a disconnect for an unknown user
    pub fn dispatch(&mut self, event: HostEvent) -> Result<(), OutbreakError> {
        event.validate()?;
        debug!(kind = event.kind(), "host event");
        match event {
            HostEvent::Connect { slot, user, bot } => self.on_connect(slot, user, bot)?,
            HostEvent::Disconnect { user } => {
                self.on_disconnect(user)?;
            }
            HostEvent::Death { victim, attacker } => {
                log_skip("death", &self.on_death(victim, attacker));
            }
            HostEvent::Spawn { slot } => {
                log_skip("spawn", &self.on_spawn(slot));
            }
            HostEvent::RoundPreStart => {
                self.on_round_pre_start();
            }
            HostEvent::RoundStart => {
                log_skip("round start", &self.on_round_start());
            }
            HostEvent::RoundEnd { winner } => {
                log_skip("round end", &self.on_round_end(winner));
            }
            HostEvent::Input { slot, buttons } => {
                let _ = self.on_input(slot, buttons);
            }
        }
        Ok(())
    }

    // -- connections ---------------------------------------------------------

    /// Registers a client and gives them the starting balance.
    ///
    /// # Errors
    /// Propagates [`RegistryError`] from the registry.
    pub fn on_connect(&mut self, slot: Slot, user: UserId, bot: bool) -> Result<(), RegistryError> {
        self.registry.connect(slot, user, bot)?;
        let start = i64::from(self.economy.config().starting_balance);
        if let Some(player) = self.registry.get_mut(user) {
            let _ = self
                .economy
                .set_balance(player, start, &mut self.engine, &mut self.timers);
        }
        Ok(())
    }

    /// Drops the record and cancels every timer it owned.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] for an unknown user.
    pub fn on_disconnect(&mut self, user: UserId) -> Result<Player, RegistryError> {
        let mut player = self.registry.disconnect(user)?;
        let cancelled = player
            .timers
            .take_all()
            .into_iter()
            .filter(|h| self.timers.cancel(*h))
            .count();
        remove_glow(&mut self.engine, &mut player);
        debug!(%user, cancelled, "player timers cancelled");
        Ok(player)
    }

    // -- death and spawn -----------------------------------------------------

    /// A player died.
    pub fn on_death(&mut self, victim: Slot, attacker: Option<Slot>) -> Step<DeathOutcome> {
        let Some(user) = self.registry.user_at(victim) else {
            return Step::Skipped(SkipReason::UnknownPlayer);
        };
        self.clear_on_death(user);
        if self.round.is_ending() {
            return Step::Skipped(SkipReason::RoundEnding);
        }

        let world_kill = attacker.is_none_or(|a| a == victim || a == Slot::WORLD);
        let killer = attacker
            .filter(|_| !world_kill)
            .filter(|a| self.engine.is_alive(*a))
            .and_then(|a| self.registry.user_at(a));

        let reward = killer.and_then(|k| self.reward_kill(k, user));
        let respawn = if world_kill && !self.config.respawn.on_world_kill {
            Step::Skipped(SkipReason::WorldKill)
        } else {
            self.schedule_respawn(user)
        };

        info!(
            %user,
            %victim,
            killer = ?killer,
            rewarded = reward.is_some(),
            respawn = ?respawn.skipped(),
            "player died"
        );
        Step::Applied(DeathOutcome { reward, respawn })
    }

    /// A player (re)spawned.
    pub fn on_spawn(&mut self, slot: Slot) -> Step<Role> {
        let Some(user) = self.registry.user_at(slot) else {
            return Step::Skipped(SkipReason::UnknownPlayer);
        };
        self.spawn_player(user)
    }

    // -- round ---------------------------------------------------------------

    /// New round: per-round player state is reset and teams rebalanced.
    pub fn on_round_pre_start(&mut self) -> Vec<(Slot, Team)> {
        for player in self.registry.iter_mut() {
            let timers = &mut player.timers;
            for field in [
                &mut timers.respawn,
                &mut timers.countdown,
                &mut timers.skill,
                &mut timers.heal,
                &mut timers.moan,
            ] {
                self.timers.clear(field);
            }
            remove_glow(&mut self.engine, player);
            player.reset_round();
        }
        self.round
            .enter_pre_start(&self.registry, &mut self.engine, &mut self.timers)
    }

    /// Freeze time is over.
    pub fn on_round_start(&mut self) -> Step<usize> {
        self.round.enter_active(&mut self.engine, &mut self.timers)
    }

    /// The host ended the round.
    pub fn on_round_end(&mut self, winner: Team) -> Step<()> {
        let step = self.round.enter_ending(winner, &mut self.timers);
        if step.is_applied() {
            for player in self.registry.iter_mut() {
                self.timers.clear(&mut player.timers.respawn);
                self.timers.clear(&mut player.timers.countdown);
            }
        }
        step
    }

    // -- input ---------------------------------------------------------------

    /// One input tick for `slot`.
    pub fn on_input(&mut self, slot: Slot, buttons: Buttons) -> InputOutcome {
        let mut out = InputOutcome {
            buttons,
            modified: false,
            menu_opened: false,
            leapt: false,
        };
        let Some(player) = self.registry.at_slot_mut(slot) else {
            return out;
        };
        let user = player.user;
        let previous = std::mem::replace(&mut player.last_buttons, buttons);
        let alive = self.engine.is_alive(slot);

        if !alive && buttons.contains(Buttons::USE) {
            out.buttons.remove(Buttons::USE);
            out.modified = true;
        }

        let menu = self.config.input.menu_button;
        if !menu.is_empty() && buttons.combo_pressed(previous, menu) {
            self.presentation.open_menu(slot, Menu::Main);
            out.menu_opened = true;
        }

        if alive && buttons.combo_pressed(previous, Buttons::LEAP) {
            let step = self.leap(user);
            log_skip("leap", &step);
            out.leapt = step.is_applied();
        }
        out
    }
}
