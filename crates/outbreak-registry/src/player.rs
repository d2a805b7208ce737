//! The per-player record.
//!
//! A `Player` is the controller's view of one connected client:
//! - WHO they are (`user`, and the `slot` they currently occupy)
//! - WHAT they are this life (`role` plus the `survivor`/`nemesis` flags)
//! - WHAT they have earned (`balance`, `level`, `experience`)
//! - WHICH timers run on their behalf (`timers`)

use outbreak_protocol::{Buttons, EntityIndex, Role, Slot, UserId};
use outbreak_timer::TaskHandle;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// PlayerTimers
// ---------------------------------------------------------------------------

/// Task handles owned by one player record.
///
/// Each field holds at most one live handle. Code that schedules into a
/// field goes through `TimerScheduler::replace`, which cancels the old
/// handle first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerTimers {
    /// Pending revival. Live only while the player is dead.
    pub respawn: Option<TaskHandle>,
    /// Leap cooldown; clears `skill_active` when it fires.
    pub skill: Option<TaskHandle>,
    /// Balance overlay shown while the balance is above the engine ceiling.
    pub hud: Option<TaskHandle>,
    pub ambient: Option<TaskHandle>,
    /// Per-second "infection in N" readout before the mode starts.
    pub countdown: Option<TaskHandle>,
    /// Zombie regeneration.
    pub heal: Option<TaskHandle>,
    /// Zombie idle sounds.
    pub moan: Option<TaskHandle>,
}

impl PlayerTimers {
    /// Drains every handle, leaving all fields empty. The caller cancels
    /// the returned handles.
    pub fn take_all(&mut self) -> Vec<TaskHandle> {
        [
            self.respawn.take(),
            self.skill.take(),
            self.hud.take(),
            self.ambient.take(),
            self.countdown.take(),
            self.heal.take(),
            self.moan.take(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progression that survives rounds and reconnects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub level: u32,
    pub experience: u32,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One connected client.
///
/// Role and respawn fields are written only by the player lifecycle
/// operations; `balance` only by the economy regulator.
#[derive(Debug, Clone)]
pub struct Player {
    pub user: UserId,
    pub slot: Slot,
    pub is_bot: bool,

    pub role: Role,
    pub survivor: bool,
    pub nemesis: bool,
    /// A class skill (leap) is cooling down.
    pub skill_active: bool,
    pub first_zombie: bool,

    /// Role applied by the next successful respawn.
    pub pending_respawn_role: Role,
    /// Revivals this round.
    pub respawn_count: u32,

    /// Never negative; may exceed what the engine field can show.
    pub balance: u32,
    pub level: u32,
    pub experience: u32,

    pub night_vision_on: bool,
    /// Button mask of the previous input tick, for edge detection.
    pub last_buttons: Buttons,

    /// Index into the configured human classes.
    pub human_class: usize,
    /// Index into the configured zombie classes.
    pub zombie_class: usize,
    /// Extra items bought this round, checked against a per-round limit.
    pub round_purchases: u32,

    /// Dynamic light following a glowing nemesis or survivor.
    pub glow_light: Option<EntityIndex>,

    pub timers: PlayerTimers,
}

impl Player {
    pub fn new(user: UserId, slot: Slot, is_bot: bool) -> Self {
        Self {
            user,
            slot,
            is_bot,
            role: Role::None,
            survivor: false,
            nemesis: false,
            skill_active: false,
            first_zombie: false,
            pending_respawn_role: Role::Human,
            respawn_count: 0,
            balance: 0,
            level: 0,
            experience: 0,
            night_vision_on: false,
            last_buttons: Buttons::empty(),
            human_class: 0,
            zombie_class: 0,
            round_purchases: 0,
            glow_light: None,
            timers: PlayerTimers::default(),
        }
    }

    pub fn is_zombie(&self) -> bool {
        self.role == Role::Zombie
    }

    pub fn is_human(&self) -> bool {
        self.role == Role::Human
    }

    pub fn progress(&self) -> Progress {
        Progress {
            level: self.level,
            experience: self.experience,
        }
    }

    /// Clears the flags that only last one life.
    pub fn reset_life_flags(&mut self) {
        self.survivor = false;
        self.nemesis = false;
        self.skill_active = false;
        self.first_zombie = false;
        self.night_vision_on = false;
    }

    /// Clears everything scoped to one round. Progress and balance stay.
    pub fn reset_round(&mut self) {
        self.reset_life_flags();
        self.role = Role::None;
        self.pending_respawn_role = Role::Human;
        self.respawn_count = 0;
        self.round_purchases = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outbreak_timer::TimerScheduler;

    #[test]
    fn test_take_all_drains_every_field() {
        let mut sched = TimerScheduler::new();
        let mut timers = PlayerTimers {
            respawn: Some(sched.schedule_once(Default::default(), ())),
            moan: Some(sched.schedule_once(Default::default(), ())),
            ..PlayerTimers::default()
        };
        assert_eq!(timers.take_all().len(), 2);
        assert_eq!(timers, PlayerTimers::default());
    }

    #[test]
    fn test_reset_round_keeps_progress_and_balance() {
        let mut p = Player::new(UserId(1), Slot(1), false);
        p.role = Role::Zombie;
        p.nemesis = true;
        p.respawn_count = 4;
        p.balance = 900;
        p.level = 3;
        p.experience = 50;
        p.reset_round();
        assert_eq!(p.role, Role::None);
        assert!(!p.nemesis);
        assert_eq!(p.respawn_count, 0);
        assert_eq!(p.balance, 900);
        assert_eq!(p.progress(), Progress { level: 3, experience: 50 });
    }
}
