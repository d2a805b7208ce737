//! Host abstraction layer for Outbreak.
//!
//! Provides the [`Engine`] and [`Presentation`] traits the controller drives.
//! The controller never touches engine memory or asset files; it only reads
//! and writes typed attributes by symbolic name and issues fire-and-forget
//! presentation requests.
//!
//! # Feature Flags
//!
//! - `sim` (default) — [`SimHost`] and [`SimPresentation`], in-memory
//!   implementations used by tests and the demo.

#[cfg(feature = "sim")]
mod sim;

#[cfg(feature = "sim")]
pub use sim::{HudLine, SimClient, SimHost, SimPresentation};

use std::time::Duration;

use outbreak_protocol::{Color, EntityIndex, RoundMode, Slot, Team};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Attributes
// ---------------------------------------------------------------------------

/// Symbolic names of the per-player engine fields the controller touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attr {
    Health,
    Armor,
    Gravity,
    /// Lagged-movement multiplier; 1.0 is the engine default run speed.
    Speed,
    MoveType,
    RenderColor,
    Model,
    ActiveWeapon,
    Fov,
    NightVision,
    Flashlight,
    DrawViewModel,
    /// The engine-visible money field. Wraps above 65000 on stock engines.
    Account,
}

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i32),
    Float(f32),
    Bool(bool),
    Color(Color),
    Text(String),
}

/// Engine move types the controller sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MoveType {
    None = 0,
    Walk = 2,
    Noclip = 8,
}

/// Default engine field of view.
pub const DEFAULT_FOV: i32 = 90;

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Read/write access to player and entity records in the host engine.
///
/// Implementations are thin wrappers over the host's native API. Calls are
/// synchronous and never fail from the controller's point of view: writing
/// to a slot that went away is a silent no-op.
pub trait Engine: Send + 'static {
    /// Highest valid player slot.
    fn max_clients(&self) -> u32;

    /// Entity capacity reported by the engine (exclusive upper bound).
    fn max_entities(&self) -> u32;

    /// Whether a client occupies `slot`.
    fn is_connected(&self, slot: Slot) -> bool;

    /// Whether the client in `slot` has finished loading into the game.
    fn is_in_game(&self, slot: Slot) -> bool;

    fn is_alive(&self, slot: Slot) -> bool;

    fn is_fake_client(&self, slot: Slot) -> bool;

    /// Reads an attribute. `None` if the slot is empty or the field unset.
    fn get_attr(&self, slot: Slot, attr: Attr) -> Option<AttrValue>;

    fn set_attr(&mut self, slot: Slot, attr: Attr, value: AttrValue);

    fn team(&self, slot: Slot) -> Team;

    /// Moves the client to `team` without killing them.
    fn set_team(&mut self, slot: Slot, team: Team);

    /// Revives a dead client. The host reports the resulting spawn
    /// through a separate `HostEvent::Spawn`.
    fn respawn(&mut self, slot: Slot);

    /// Removes every carried item.
    fn strip_items(&mut self, slot: Slot);

    fn give_item(&mut self, slot: Slot, item: &str);

    /// Classname of a map entity, or `None` if the index is free or the
    /// entity is still being constructed.
    fn entity_classname(&self, entity: EntityIndex) -> Option<String>;

    fn remove_entity(&mut self, entity: EntityIndex);

    /// Attaches a dynamic light to the player. `None` if the engine is out
    /// of edicts.
    fn create_glow_light(&mut self, slot: Slot, color: Color) -> Option<EntityIndex>;

    /// Adds velocity along the player's view direction.
    fn push(&mut self, slot: Slot, forward: f32, up: f32);

    /// Overrides a replicated console variable for one client only.
    fn replicate_convar(&mut self, slot: Slot, name: &str, value: &str);

    /// Ends the current round in favour of `winner`.
    fn terminate_round(&mut self, winner: Team);

    // -- typed conveniences -------------------------------------------------

    fn get_int(&self, slot: Slot, attr: Attr) -> Option<i32> {
        match self.get_attr(slot, attr) {
            Some(AttrValue::Int(v)) => Some(v),
            _ => None,
        }
    }

    fn get_float(&self, slot: Slot, attr: Attr) -> Option<f32> {
        match self.get_attr(slot, attr) {
            Some(AttrValue::Float(v)) => Some(v),
            _ => None,
        }
    }

    fn set_int(&mut self, slot: Slot, attr: Attr, value: i32) {
        self.set_attr(slot, attr, AttrValue::Int(value));
    }

    fn set_float(&mut self, slot: Slot, attr: Attr, value: f32) {
        self.set_attr(slot, attr, AttrValue::Float(value));
    }

    fn set_bool(&mut self, slot: Slot, attr: Attr, value: bool) {
        self.set_attr(slot, attr, AttrValue::Bool(value));
    }
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Who hears a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Only this client.
    Player(Slot),
    /// Every client, positioned at the emitting player.
    Around(Slot),
    All,
}

/// Which voice set a death sound is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Voice {
    Nemesis,
    ZombieMale,
    ZombieFemale,
    Survivor,
    HumanMale,
    HumanFemale,
}

/// Sound cues. Asset selection is the presentation layer's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundKind {
    /// `variant` is 1..=4.
    Death { voice: Voice, variant: u8 },
    Ambience,
    ZombieIdle,
    Leap,
    Infect,
    Countdown(u32),
    ModeStart(RoundMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Menu {
    Main,
}

/// Fire-and-forget feedback to players.
pub trait Presentation: Send + 'static {
    fn play_sound(&mut self, sound: SoundKind, target: Target);

    fn show_hud(&mut self, slot: Slot, text: &str, color: Color, hold: Duration);

    /// Sets or clears (`None`) a full-screen overlay material.
    fn screen_overlay(&mut self, slot: Slot, material: Option<&str>);

    fn open_menu(&mut self, slot: Slot, menu: Menu);
}
