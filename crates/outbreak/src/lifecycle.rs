//! Player lifecycle: death, revival, spawn, role changes and the timers that
//! run on a player's behalf.
//!
//! # Death and revival
//!
//! ```text
//! on_death ──→ cancel support timers ──→ reward killer ──→ respawn gates
//!                                                              │
//!              schedule_once(delay, Respawn { user, round }) ←─┘
//!                                │
//! respawn_due ←──── timer fires ┘  re-resolve user → slot, check round,
//!                                   phase, liveness; pick the role; ask the
//!                                   engine to revive
//! ```
//!
//! A revival timer carries the `UserId` and the round number it was armed
//! in, never a slot. When it fires the user is resolved again: a player who
//! left (or whose slot now belongs to someone else) is skipped, and so is a
//! timer armed in an earlier round. The role is decided at firing time, so
//! a round that became Nemesis or Survivor in the meantime still overrides
//! the deathmatch setting.
//!
//! # Spawn
//!
//! The engine's spawn event is the single place a life begins. Every
//! visual and movement attribute is reset first, then the player becomes a
//! human (joining the human team only once the mode has started) or is
//! infected straight away when the revival asked for a zombie. Human stats
//! scale with level; armor is only ever raised.
//!
//! # Support timers
//!
//! Regeneration, zombie moans, the ambience loop, the countdown readout and
//! the leap cooldown are timers stored in [`PlayerTimers`](outbreak_registry::PlayerTimers).
//! Each callback looks the player up again and cancels its own handle when
//! the player left or no longer fits the role the timer was armed for.

use std::time::Duration;

use outbreak_host::{
    Attr, AttrValue, DEFAULT_FOV, Engine, MoveType, Presentation, SoundKind, Target, Voice,
};
use outbreak_protocol::{Color, Gender, Role, RoundMode, Slot, Team, UserId};
use outbreak_registry::Player;
use outbreak_round::{RoundPhase, SkipReason, Step};
use outbreak_timer::TaskHandle;
use rand::Rng;
use tracing::{debug, info};

use crate::controller::Controller;
use crate::{ClassConfig, Deathmatch, Job, ModeConfig, PlayerJob, Reward, WeightedItem};

const HUD_HOLD: Duration = Duration::from_millis(1100);
const ONE_SECOND: Duration = Duration::from_secs(1);

/// How a player becomes a zombie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZombieKind {
    /// Infected after the mode started, or revived as a zombie.
    Regular,
    /// Picked when the mode started; gets the first-zombie health bonus.
    First,
    Nemesis,
}

/// A kill reward that was paid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillReward {
    pub killer: UserId,
    pub reward: Reward,
    /// Killer's level after the payout.
    pub level: u32,
}

impl<E: Engine, P: Presentation> Controller<E, P> {
    // -- death ---------------------------------------------------------------

    /// Everything a death does regardless of the round phase: the death
    /// cry, clearing the visual state, and cancelling every timer the
    /// victim owns.
    pub(crate) fn clear_on_death(&mut self, user: UserId) {
        let variant = self.rng.random_range(1..=4);
        let Some(player) = self.registry.get_mut(user) else {
            return;
        };
        let slot = player.slot;

        let voice = death_voice(&self.config.classes, player);
        self.presentation
            .play_sound(SoundKind::Death { voice, variant }, Target::Around(slot));

        player.night_vision_on = false;
        self.engine.set_bool(slot, Attr::NightVision, false);
        self.engine.set_attr(slot, Attr::RenderColor, AttrValue::Color(Color::WHITE));
        remove_glow(&mut self.engine, player);
        self.presentation.screen_overlay(slot, None);

        for handle in player.timers.take_all() {
            self.timers.cancel(handle);
        }
    }

    /// Pays the killer for `victim`, if the victim is still within the
    /// respawn limit.
    ///
    /// The reward row is picked by the victim: nemesis first, then zombie,
    /// then survivor, then human.
    pub(crate) fn reward_kill(&mut self, killer: UserId, victim: UserId) -> Option<KillReward> {
        let rewards = &self.config.rewards;
        let victim = self.registry.get(victim)?;
        if victim.respawn_count >= self.config.respawn.limit {
            return None;
        }
        let reward = if victim.nemesis {
            rewards.nemesis_kill
        } else if victim.is_zombie() {
            rewards.zombie_kill
        } else if victim.survivor {
            rewards.survivor_kill
        } else {
            rewards.human_kill
        };

        let leveling = &self.config.leveling;
        let player = self.registry.get_mut(killer)?;
        let _ = self
            .economy
            .add(player, i64::from(reward.money), &mut self.engine, &mut self.timers);
        if leveling.enabled {
            player.experience = player.experience.saturating_add(reward.experience);
            player.level = player.level.max(leveling.level_for(player.experience));
        }

        info!(%killer, money = reward.money, experience = reward.experience, level = player.level, "kill rewarded");
        Some(KillReward {
            killer,
            reward,
            level: player.level,
        })
    }

    /// Runs the respawn gates for a dead player and, if all pass, arms the
    /// revival timer.
    pub(crate) fn schedule_respawn(&mut self, user: UserId) -> Step<TaskHandle> {
        let respawn = &self.config.respawn;
        if respawn.deathmatch == Deathmatch::Disabled {
            return Step::Skipped(SkipReason::DeathmatchDisabled);
        }
        let Some(player) = self.registry.get_mut(user) else {
            return Step::Skipped(SkipReason::UnknownPlayer);
        };

        let allowed = if player.nemesis {
            respawn.nemesis
        } else if player.is_zombie() {
            respawn.zombie
        } else if player.survivor {
            respawn.survivor
        } else {
            respawn.human
        };
        if !allowed {
            return Step::Skipped(SkipReason::RespawnDisabled);
        }
        if player.respawn_count >= respawn.limit {
            return Step::Skipped(SkipReason::RespawnLimit);
        }

        player.respawn_count += 1;
        player.pending_respawn_role = match respawn.deathmatch {
            Deathmatch::Human => Role::Human,
            Deathmatch::Zombie => Role::Zombie,
            // Decided when the timer fires, from the counts at that moment.
            _ if player.is_zombie() => Role::Zombie,
            _ => Role::Human,
        };

        let round = self.round.number();
        let job = Job::player(user, PlayerJob::Respawn { round });
        let handle = self.timers.schedule_once(respawn.delay(), job);
        self.timers.replace(&mut player.timers.respawn, handle);
        debug!(%user, round, count = player.respawn_count, delay_ms = respawn.delay().as_millis() as u64, "respawn scheduled");
        Step::Applied(handle)
    }

    /// The revival timer fired.
    pub fn respawn_due(&mut self, user: UserId, round: u64, handle: TaskHandle) -> Step<Role> {
        if let Some(player) = self.registry.get_mut(user) {
            if player.timers.respawn == Some(handle) {
                player.timers.respawn = None;
            }
        }

        if round != self.round.number() || self.round.phase() == RoundPhase::PreStart {
            return Step::Skipped(SkipReason::StaleRound);
        }
        if self.round.is_ending() {
            return Step::Skipped(SkipReason::RoundEnding);
        }
        let Some(mode) = self.round.mode() else {
            return Step::Skipped(SkipReason::ModeNotStarted);
        };
        let Some(slot) = self.registry.resolve(user) else {
            return Step::Skipped(SkipReason::Disconnected);
        };
        if self.engine.is_alive(slot) {
            return Step::Skipped(SkipReason::AlreadyAlive);
        }
        if mode != RoundMode::Survivor
            && !self.config.respawn.after_last_human
            && self.alive_humans() <= 1
        {
            return Step::Skipped(SkipReason::LastHuman);
        }

        let mut role = self.deathmatch_role();
        match mode {
            RoundMode::Survivor => role = Role::Zombie,
            RoundMode::Nemesis => role = Role::Human,
            _ => {}
        }

        if let Some(player) = self.registry.get_mut(user) {
            player.pending_respawn_role = role;
        }
        self.engine.respawn(slot);
        info!(%user, %slot, round, ?role, "player respawned");
        Step::Applied(role)
    }

    fn deathmatch_role(&mut self) -> Role {
        match self.config.respawn.deathmatch {
            Deathmatch::Disabled | Deathmatch::Human => Role::Human,
            Deathmatch::Zombie => Role::Zombie,
            Deathmatch::Random => {
                if self.rng.random_bool(0.5) {
                    Role::Zombie
                } else {
                    Role::Human
                }
            }
            Deathmatch::Balance => {
                // The reviving player isn't alive yet; count them in.
                let alive = self.alive_with(|_| true) + 1;
                if self.alive_zombies() * 2 < alive {
                    Role::Zombie
                } else {
                    Role::Human
                }
            }
        }
    }

    // -- spawn ---------------------------------------------------------------

    /// Brings a freshly (re)spawned player into their role for this life.
    pub(crate) fn spawn_player(&mut self, user: UserId) -> Step<Role> {
        let mode_started = self.round.mode_started();
        let ambience = self.config.ambience;
        let Some(player) = self.registry.get_mut(user) else {
            return Step::Skipped(SkipReason::UnknownPlayer);
        };
        let slot = player.slot;

        let revive_as_zombie = player.pending_respawn_role == Role::Zombie;
        player.pending_respawn_role = Role::Human;
        player.reset_life_flags();
        self.timers.clear(&mut player.timers.respawn);

        self.engine.set_bool(slot, Attr::NightVision, false);
        self.engine.set_int(slot, Attr::Fov, DEFAULT_FOV);
        self.engine.set_attr(slot, Attr::RenderColor, AttrValue::Color(Color::WHITE));
        self.engine.set_bool(slot, Attr::Flashlight, false);
        self.engine.set_bool(slot, Attr::DrawViewModel, true);
        self.engine.set_int(slot, Attr::MoveType, MoveType::Walk as i32);
        self.presentation.screen_overlay(slot, None);
        remove_glow(&mut self.engine, player);

        if ambience.enabled {
            let interval = Duration::from_secs_f32(ambience.interval_secs);
            let handle = self
                .timers
                .schedule_repeating(interval, Job::player(user, PlayerJob::Ambience));
            self.timers.replace(&mut player.timers.ambient, handle);
        }

        if mode_started && revive_as_zombie {
            return self.infect(user, ZombieKind::Regular).map(|_| Role::Zombie);
        }

        player.role = Role::Human;
        if mode_started {
            self.engine.set_team(slot, Team::Human);
        } else {
            player.respawn_count = 0;
            player.round_purchases = 0;
            let handle = self
                .timers
                .schedule_repeating(ONE_SECOND, Job::player(user, PlayerJob::CountdownHud));
            self.timers.replace(&mut player.timers.countdown, handle);
        }
        apply_human_stats(&mut self.engine, &self.config, player);
        let _ = self.economy.reapply(player, &mut self.engine, &mut self.timers);

        debug!(%user, %slot, mode_started, "spawned as human");
        Step::Applied(Role::Human)
    }

    // -- role changes --------------------------------------------------------

    /// Turns a living player into a zombie.
    pub fn infect(&mut self, user: UserId, kind: ZombieKind) -> Step<()> {
        let ambience = self.config.ambience;
        let classes = &self.config.classes;
        let Some(player) = self.registry.get_mut(user) else {
            return Step::Skipped(SkipReason::UnknownPlayer);
        };
        let slot = player.slot;
        if !self.engine.is_alive(slot) {
            return Step::Skipped(SkipReason::NotAlive);
        }
        let Some(class) = classes.zombie(player.zombie_class) else {
            return Step::Skipped(SkipReason::FeatureDisabled);
        };

        player.role = Role::Zombie;
        player.survivor = false;
        player.nemesis = kind == ZombieKind::Nemesis;
        player.first_zombie = kind == ZombieKind::First;
        player.skill_active = false;
        self.timers.clear(&mut player.timers.skill);
        self.timers.clear(&mut player.timers.countdown);

        self.engine.set_team(slot, Team::Zombie);
        self.engine.strip_items(slot);
        self.engine.give_item(slot, &classes.zombie_weapon);

        if player.nemesis {
            let nemesis = &classes.nemesis;
            write_stats(&mut self.engine, slot, &nemesis.model, nemesis.health, nemesis.speed, nemesis.gravity);
            if nemesis.glow {
                attach_glow(&mut self.engine, player, nemesis.glow_color);
            }
        } else {
            remove_glow(&mut self.engine, player);
            write_stats(
                &mut self.engine,
                slot,
                &class.model,
                zombie_max_health(classes, player),
                class.speed,
                class.gravity,
            );
        }

        if ambience.regen_enabled && !player.nemesis && class.regen_per_sec > 0 {
            let handle = self.timers.schedule_repeating(ONE_SECOND, Job::player(user, PlayerJob::Heal));
            self.timers.replace(&mut player.timers.heal, handle);
        } else {
            self.timers.clear(&mut player.timers.heal);
        }
        let moan = Duration::from_secs_f32(ambience.moan_interval_secs);
        let handle = self.timers.schedule_repeating(moan, Job::player(user, PlayerJob::Moan));
        self.timers.replace(&mut player.timers.moan, handle);

        self.presentation.play_sound(SoundKind::Infect, Target::Around(slot));
        let _ = self.economy.reapply(player, &mut self.engine, &mut self.timers);
        info!(%user, %slot, ?kind, "player infected");
        Step::Applied(())
    }

    /// Promotes a living player to survivor.
    pub fn make_survivor(&mut self, user: UserId) -> Step<()> {
        let survivor = &self.config.classes.survivor;
        let pools = &self.config.classes.survivor_weapons;
        let Some(player) = self.registry.get_mut(user) else {
            return Step::Skipped(SkipReason::UnknownPlayer);
        };
        let slot = player.slot;
        if !self.engine.is_alive(slot) {
            return Step::Skipped(SkipReason::NotAlive);
        }

        player.role = Role::Human;
        player.survivor = true;
        player.nemesis = false;
        player.first_zombie = false;
        self.timers.clear(&mut player.timers.heal);
        self.timers.clear(&mut player.timers.countdown);

        self.engine.set_team(slot, Team::Human);
        self.engine.strip_items(slot);
        let pool = if player.is_bot { &pools.bots } else { &pools.humans };
        if let Some(weapon) = pick_weighted(pool, &mut self.rng) {
            self.engine.give_item(slot, weapon);
        }
        write_stats(&mut self.engine, slot, &survivor.model, survivor.health, survivor.speed, survivor.gravity);
        if survivor.glow {
            attach_glow(&mut self.engine, player, survivor.glow_color);
        }

        let _ = self.economy.reapply(player, &mut self.engine, &mut self.timers);
        info!(%user, %slot, "player promoted to survivor");
        Step::Applied(())
    }

    // -- skills --------------------------------------------------------------

    /// Launches a zombie forward. The skill cools down for
    /// `leap_cooldown_secs`.
    pub(crate) fn leap(&mut self, user: UserId) -> Step<()> {
        let input = &self.config.input;
        if !input.leap_enabled {
            return Step::Skipped(SkipReason::FeatureDisabled);
        }
        let Some(player) = self.registry.get_mut(user) else {
            return Step::Skipped(SkipReason::UnknownPlayer);
        };
        if !player.is_zombie() {
            return Step::Skipped(SkipReason::NotZombie);
        }
        if player.nemesis && !input.leap_nemesis {
            return Step::Skipped(SkipReason::FeatureDisabled);
        }
        if player.skill_active {
            return Step::Skipped(SkipReason::SkillCoolingDown);
        }
        let slot = player.slot;
        if !self.engine.is_alive(slot) {
            return Step::Skipped(SkipReason::NotAlive);
        }

        self.engine.push(slot, input.leap_force, input.leap_height);
        player.skill_active = true;
        let cooldown = Duration::from_secs_f32(input.leap_cooldown_secs);
        let handle = self
            .timers
            .schedule_once(cooldown, Job::player(user, PlayerJob::SkillReady));
        self.timers.replace(&mut player.timers.skill, handle);
        self.presentation.play_sound(SoundKind::Leap, Target::Around(slot));
        debug!(%user, %slot, "leap");
        Step::Applied(())
    }

    pub(crate) fn skill_ready(&mut self, user: UserId, handle: TaskHandle) -> Step<()> {
        let Some(player) = self.registry.get_mut(user) else {
            return Step::Skipped(SkipReason::Disconnected);
        };
        if player.timers.skill != Some(handle) {
            return Step::Skipped(SkipReason::StaleTimer);
        }
        player.timers.skill = None;
        player.skill_active = false;
        Step::Applied(())
    }

    // -- support timers ------------------------------------------------------

    pub(crate) fn ambience_due(&mut self, user: UserId, handle: TaskHandle) -> Step<()> {
        let slot = match self.owned_timer(user, handle, |t| &mut t.ambient) {
            Step::Applied(slot) => slot,
            Step::Skipped(reason) => return Step::Skipped(reason),
        };
        if !self.config.ambience.enabled {
            self.stop_timer(user, |t| &mut t.ambient);
            return Step::Skipped(SkipReason::FeatureDisabled);
        }
        self.presentation.play_sound(SoundKind::Ambience, Target::Player(slot));
        Step::Applied(())
    }

    pub(crate) fn countdown_hud_due(&mut self, user: UserId, handle: TaskHandle) -> Step<()> {
        let slot = match self.owned_timer(user, handle, |t| &mut t.countdown) {
            Step::Applied(slot) => slot,
            Step::Skipped(reason) => return Step::Skipped(reason),
        };
        if self.round.mode_started() || self.round.is_ending() {
            self.stop_timer(user, |t| &mut t.countdown);
            return Step::Skipped(SkipReason::ModeAlreadyStarted);
        }
        let phase = self.round.phase();
        if phase != RoundPhase::Active {
            return Step::Skipped(SkipReason::WrongPhase(phase));
        }
        let text = format!("Infection in {}", self.round.round().countdown);
        self.presentation.show_hud(slot, &text, Color::WHITE, HUD_HOLD);
        Step::Applied(())
    }

    pub(crate) fn heal_due(&mut self, user: UserId, handle: TaskHandle) -> Step<()> {
        let slot = match self.owned_timer(user, handle, |t| &mut t.heal) {
            Step::Applied(slot) => slot,
            Step::Skipped(reason) => return Step::Skipped(reason),
        };
        let Some(player) = self.registry.get(user) else {
            return Step::Skipped(SkipReason::Disconnected);
        };
        if !player.is_zombie() || player.nemesis {
            self.stop_timer(user, |t| &mut t.heal);
            return Step::Skipped(SkipReason::NotZombie);
        }
        if !self.engine.is_alive(slot) {
            return Step::Skipped(SkipReason::NotAlive);
        }
        let classes = &self.config.classes;
        let Some(class) = classes.zombie(player.zombie_class) else {
            return Step::Skipped(SkipReason::FeatureDisabled);
        };

        let max = zombie_max_health(classes, player);
        let health = self.engine.get_int(slot, Attr::Health).unwrap_or(0);
        if health < max {
            let healed = (health + class.regen_per_sec).min(max);
            self.engine.set_int(slot, Attr::Health, healed);
        }
        Step::Applied(())
    }

    pub(crate) fn moan_due(&mut self, user: UserId, handle: TaskHandle) -> Step<()> {
        let slot = match self.owned_timer(user, handle, |t| &mut t.moan) {
            Step::Applied(slot) => slot,
            Step::Skipped(reason) => return Step::Skipped(reason),
        };
        if !self.registry.get(user).is_some_and(Player::is_zombie) {
            self.stop_timer(user, |t| &mut t.moan);
            return Step::Skipped(SkipReason::NotZombie);
        }
        if !self.engine.is_alive(slot) {
            return Step::Skipped(SkipReason::NotAlive);
        }
        self.presentation.play_sound(SoundKind::ZombieIdle, Target::Around(slot));
        Step::Applied(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn death_voice(classes: &ClassConfig, player: &Player) -> Voice {
    if player.nemesis {
        Voice::Nemesis
    } else if player.is_zombie() {
        match classes.zombie(player.zombie_class).map(|c| c.gender) {
            Some(Gender::Female) => Voice::ZombieFemale,
            _ => Voice::ZombieMale,
        }
    } else if player.survivor {
        Voice::Survivor
    } else {
        match classes.human(player.human_class).map(|c| c.gender) {
            Some(Gender::Female) => Voice::HumanFemale,
            _ => Voice::HumanMale,
        }
    }
}

fn zombie_max_health(classes: &ClassConfig, player: &Player) -> i32 {
    let base = classes.zombie(player.zombie_class).map_or(0, |c| c.health);
    if player.first_zombie {
        (base as f32 * classes.first_zombie_health_multiplier).round() as i32
    } else {
        base
    }
}

/// Human class stats, scaled by level when leveling is on. Armor is only
/// ever raised.
pub(crate) fn apply_human_stats<E: Engine>(engine: &mut E, config: &ModeConfig, player: &Player) {
    let Some(class) = config.classes.human(player.human_class) else {
        return;
    };
    let slot = player.slot;
    let mut health = class.health as f32;
    let mut speed = class.speed;
    let mut gravity = class.gravity;

    let leveling = &config.leveling;
    if leveling.enabled {
        let level = player.level as f32;
        health *= 1.0 + level * leveling.health_ratio;
        speed *= 1.0 + level * leveling.speed_ratio;
        gravity *= (1.0 - level * leveling.gravity_ratio).max(0.1);
    }

    write_stats(engine, slot, &class.model, health.round() as i32, speed, gravity);
    let armor = engine.get_int(slot, Attr::Armor).unwrap_or(0);
    if armor < class.armor {
        engine.set_int(slot, Attr::Armor, class.armor);
    }
}

fn write_stats<E: Engine>(
    engine: &mut E,
    slot: Slot,
    model: &str,
    health: i32,
    speed: f32,
    gravity: f32,
) {
    engine.set_int(slot, Attr::Health, health);
    engine.set_float(slot, Attr::Speed, speed);
    engine.set_float(slot, Attr::Gravity, gravity);
    if !model.is_empty() {
        engine.set_attr(slot, Attr::Model, AttrValue::Text(model.to_string()));
    }
}

fn attach_glow<E: Engine>(engine: &mut E, player: &mut Player, color: Color) {
    remove_glow(engine, player);
    player.glow_light = engine.create_glow_light(player.slot, color);
}

pub(crate) fn remove_glow<E: Engine>(engine: &mut E, player: &mut Player) {
    if let Some(light) = player.glow_light.take() {
        engine.remove_entity(light);
    }
}

/// Draws one item by weight. `None` for an empty or weightless pool.
pub(crate) fn pick_weighted<'a, R: Rng>(pool: &'a [WeightedItem], rng: &mut R) -> Option<&'a str> {
    let total: u32 = pool.iter().map(|w| w.weight).sum();
    if total == 0 {
        return None;
    }
    let mut roll = rng.random_range(0..total);
    for entry in pool {
        if roll < entry.weight {
            return Some(&entry.item);
        }
        roll -= entry.weight;
    }
    None
}
