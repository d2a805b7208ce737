//! Core types shared by every Outbreak crate.
//!
//! These are the words the host engine and the controller use to talk to
//! each other: who a player is, which faction they belong to, which round
//! mode is running, and which events the host delivers.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A stable identifier for a connected player.
///
/// Unlike [`Slot`], a `UserId` is never reused while the server runs: a
/// player who disconnects and a different player who later takes the same
/// slot have different user ids. Everything that outlives the current event
/// (timers above all) stores a `UserId` and re-resolves the slot when it
/// fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// The volatile in-engine client index (1-based, `0` is the world).
///
/// Slots are recycled on reconnect. Never hold one across ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slot(pub u32);

impl Slot {
    /// The world pseudo-slot used by the host for environmental kills.
    pub const WORLD: Slot = Slot(0);

    /// Returns `true` for odd slot indices. Team rebalancing keys on this.
    pub fn is_odd(self) -> bool {
        self.0 % 2 == 1
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a non-player map entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityIndex(pub u32);

impl fmt::Display for EntityIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Factions
// ---------------------------------------------------------------------------

/// Engine team a player is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Unassigned,
    Spectator,
    Zombie,
    Human,
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unassigned => write!(f, "Unassigned"),
            Self::Spectator => write!(f, "Spectator"),
            Self::Zombie => write!(f, "Zombie"),
            Self::Human => write!(f, "Human"),
        }
    }
}

/// A player's faction inside the infection mode.
///
/// `Survivor` and `Nemesis` are modifier flags on the player record, not
/// roles: a survivor is a `Human` with the flag set, a nemesis a `Zombie`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    None,
    Human,
    Zombie,
}

impl Role {
    /// The engine team that matches this role.
    pub fn team(self) -> Team {
        match self {
            Self::None => Team::Unassigned,
            Self::Human => Team::Human,
            Self::Zombie => Team::Zombie,
        }
    }
}

/// Voice/model gender of a player class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Male,
    Female,
}

/// The game mode of the current round.
///
/// `Round::mode` holds `Option<RoundMode>`; `None` is "unset" and is the
/// only value a round has before its countdown elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundMode {
    /// One first zombie, everybody else human.
    Infection,
    /// Several first zombies, picked by ratio.
    Multi,
    /// Half the server starts as zombies; no infection by attack.
    Swarm,
    /// One nemesis against everybody.
    Nemesis,
    /// One survivor against everybody.
    Survivor,
    /// Half nemeses, half survivors.
    Armageddon,
}

impl fmt::Display for RoundMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Infection => "Infection",
            Self::Multi => "Multi",
            Self::Swarm => "Swarm",
            Self::Nemesis => "Nemesis",
            Self::Survivor => "Survivor",
            Self::Armageddon => "Armageddon",
        };
        f.write_str(name)
    }
}

/// RGBA colour used for render tints, glow lights and HUD text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GREEN: Color = Color::rgb(0, 200, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

bitflags! {
    /// Per-tick button mask as reported by the host (`IN_*` bit layout).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Buttons: u32 {
        const ATTACK = 1 << 0;
        const JUMP = 1 << 1;
        const DUCK = 1 << 2;
        const FORWARD = 1 << 3;
        const BACK = 1 << 4;
        const USE = 1 << 5;
        const CANCEL = 1 << 6;
        const LEFT = 1 << 7;
        const RIGHT = 1 << 8;
        const MOVELEFT = 1 << 9;
        const MOVERIGHT = 1 << 10;
        const ATTACK2 = 1 << 11;
        const RUN = 1 << 12;
        const RELOAD = 1 << 13;
        const ALT1 = 1 << 14;
        const ALT2 = 1 << 15;
        const SCORE = 1 << 16;
        const SPEED = 1 << 17;
        const WALK = 1 << 18;
        const ZOOM = 1 << 19;
        const WEAPON1 = 1 << 20;
        const WEAPON2 = 1 << 21;
        const BULLRUSH = 1 << 22;
        const GRENADE1 = 1 << 23;
        const GRENADE2 = 1 << 24;
        const LOOKSPIN = 1 << 25;

        /// The leap combination.
        const LEAP = Self::JUMP.bits() | Self::DUCK.bits();
    }
}

impl Buttons {
    /// Bits set in `self` that were not set in `previous`.
    pub fn pressed_since(self, previous: Buttons) -> Buttons {
        self & !previous
    }

    /// Returns `true` on the tick where every bit of `combo` becomes held
    /// after at least one of them was up.
    pub fn combo_pressed(self, previous: Buttons, combo: Buttons) -> bool {
        self.contains(combo) && !previous.contains(combo)
    }
}

// ---------------------------------------------------------------------------
// HostEvent
// ---------------------------------------------------------------------------

/// An occurrence the host engine reports to the controller.
///
/// Each event is delivered exactly once, synchronously, on the game thread.
/// The controller never assumes an order between `Death`, `Spawn` and the
/// round events beyond "one at a time".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    /// A client finished connecting and owns `slot`.
    Connect {
        slot: Slot,
        user: UserId,
        #[serde(default)]
        bot: bool,
    },
    /// The client identified by `user` left.
    Disconnect { user: UserId },
    /// `victim` died. `attacker` is `None` for world or environmental kills.
    Death {
        victim: Slot,
        #[serde(default)]
        attacker: Option<Slot>,
    },
    /// `slot` (re)spawned.
    Spawn { slot: Slot },
    /// The host is about to start a new round.
    RoundPreStart,
    /// Freeze time ended; the round is live.
    RoundStart,
    /// The host decided the round is over.
    RoundEnd { winner: Team },
    /// Per-tick input for `slot`.
    Input { slot: Slot, buttons: Buttons },
}

impl HostEvent {
    /// Short name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::Death { .. } => "death",
            Self::Spawn { .. } => "spawn",
            Self::RoundPreStart => "round_pre_start",
            Self::RoundStart => "round_start",
            Self::RoundEnd { .. } => "round_end",
            Self::Input { .. } => "input",
        }
    }

    /// Rejects events that name the world slot where a player is required.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidEvent`] for a player slot of `0`.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let slot = match self {
            Self::Connect { slot, .. } | Self::Spawn { slot } | Self::Input { slot, .. } => {
                Some(*slot)
            }
            Self::Death { victim, .. } => Some(*victim),
            _ => None,
        };
        match slot {
            Some(Slot::WORLD) => Err(ProtocolError::InvalidEvent(format!(
                "{} event names the world slot",
                self.kind()
            ))),
            _ => Ok(()),
        }
    }
}
