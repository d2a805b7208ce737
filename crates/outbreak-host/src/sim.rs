//! In-memory host used by tests and the demo.
//!
//! `SimHost` keeps every client and entity in plain maps and records the
//! side effects the controller asks for, so tests can assert on them.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use outbreak_protocol::{Color, EntityIndex, Slot, Team};

use crate::{Attr, AttrValue, Engine, Menu, Presentation, SoundKind, Target};

/// One simulated client.
#[derive(Debug, Clone, Default)]
pub struct SimClient {
    pub in_game: bool,
    pub alive: bool,
    pub bot: bool,
    pub team: Team,
    pub attrs: HashMap<Attr, AttrValue>,
    pub items: Vec<String>,
    pub pushes: Vec<(f32, f32)>,
    pub convars: HashMap<String, String>,
}

/// An [`Engine`] backed by maps.
#[derive(Debug)]
pub struct SimHost {
    max_clients: u32,
    max_entities: u32,
    clients: BTreeMap<Slot, SimClient>,
    /// `None` marks an entity that is valid but still under construction.
    entities: BTreeMap<u32, Option<String>>,
    next_entity: u32,
    pending_spawns: Vec<Slot>,
    terminated: Option<Team>,
}

impl SimHost {
    pub fn new(max_clients: u32, max_entities: u32) -> Self {
        Self {
            max_clients,
            max_entities,
            clients: BTreeMap::new(),
            entities: BTreeMap::new(),
            next_entity: max_entities.saturating_sub(1),
            pending_spawns: Vec::new(),
            terminated: None,
        }
    }

    /// Seats a dead, in-game client in `slot`.
    pub fn add_client(&mut self, slot: Slot, bot: bool) {
        self.clients.insert(
            slot,
            SimClient {
                in_game: true,
                bot,
                ..SimClient::default()
            },
        );
    }

    pub fn remove_client(&mut self, slot: Slot) {
        self.clients.remove(&slot);
    }

    pub fn client(&self, slot: Slot) -> Option<&SimClient> {
        self.clients.get(&slot)
    }

    pub fn client_mut(&mut self, slot: Slot) -> Option<&mut SimClient> {
        self.clients.get_mut(&slot)
    }

    pub fn set_alive(&mut self, slot: Slot, alive: bool) {
        if let Some(c) = self.clients.get_mut(&slot) {
            c.alive = alive;
        }
    }

    pub fn add_entity(&mut self, index: u32, classname: &str) {
        self.entities.insert(index, Some(classname.to_string()));
    }

    /// Registers an entity index whose classname cannot be read yet.
    pub fn add_unfinished_entity(&mut self, index: u32) {
        self.entities.insert(index, None);
    }

    pub fn has_entity(&self, index: u32) -> bool {
        self.entities.contains_key(&index)
    }

    /// Slots revived through [`Engine::respawn`] since the last drain. The
    /// demo feeds them back as `HostEvent::Spawn`.
    pub fn drain_spawns(&mut self) -> Vec<Slot> {
        std::mem::take(&mut self.pending_spawns)
    }

    pub fn terminated(&self) -> Option<Team> {
        self.terminated
    }
}

impl Engine for SimHost {
    fn max_clients(&self) -> u32 {
        self.max_clients
    }

    fn max_entities(&self) -> u32 {
        self.max_entities
    }

    fn is_connected(&self, slot: Slot) -> bool {
        self.clients.contains_key(&slot)
    }

    fn is_in_game(&self, slot: Slot) -> bool {
        self.clients.get(&slot).is_some_and(|c| c.in_game)
    }

    fn is_alive(&self, slot: Slot) -> bool {
        self.clients.get(&slot).is_some_and(|c| c.alive)
    }

    fn is_fake_client(&self, slot: Slot) -> bool {
        self.clients.get(&slot).is_some_and(|c| c.bot)
    }

    fn get_attr(&self, slot: Slot, attr: Attr) -> Option<AttrValue> {
        self.clients.get(&slot)?.attrs.get(&attr).cloned()
    }

    fn set_attr(&mut self, slot: Slot, attr: Attr, value: AttrValue) {
        if let Some(c) = self.clients.get_mut(&slot) {
            c.attrs.insert(attr, value);
        }
    }

    fn team(&self, slot: Slot) -> Team {
        self.clients.get(&slot).map(|c| c.team).unwrap_or_default()
    }

    fn set_team(&mut self, slot: Slot, team: Team) {
        if let Some(c) = self.clients.get_mut(&slot) {
            c.team = team;
        }
    }

    fn respawn(&mut self, slot: Slot) {
        if let Some(c) = self.clients.get_mut(&slot) {
            c.alive = true;
            self.pending_spawns.push(slot);
            tracing::trace!(%slot, "sim respawn");
        }
    }

    fn strip_items(&mut self, slot: Slot) {
        if let Some(c) = self.clients.get_mut(&slot) {
            c.items.clear();
        }
    }

    fn give_item(&mut self, slot: Slot, item: &str) {
        if let Some(c) = self.clients.get_mut(&slot) {
            c.items.push(item.to_string());
        }
    }

    fn entity_classname(&self, entity: EntityIndex) -> Option<String> {
        self.entities.get(&entity.0).cloned().flatten()
    }

    fn remove_entity(&mut self, entity: EntityIndex) {
        self.entities.remove(&entity.0);
    }

    fn create_glow_light(&mut self, slot: Slot, _color: Color) -> Option<EntityIndex> {
        if !self.clients.contains_key(&slot) {
            return None;
        }
        // Lights are allocated from the top of the edict range downwards.
        let index = self.next_entity;
        self.next_entity = self.next_entity.saturating_sub(1);
        self.entities.insert(index, Some("light_dynamic".to_string()));
        Some(EntityIndex(index))
    }

    fn push(&mut self, slot: Slot, forward: f32, up: f32) {
        if let Some(c) = self.clients.get_mut(&slot) {
            c.pushes.push((forward, up));
        }
    }

    fn replicate_convar(&mut self, slot: Slot, name: &str, value: &str) {
        if let Some(c) = self.clients.get_mut(&slot) {
            c.convars.insert(name.to_string(), value.to_string());
        }
    }

    fn terminate_round(&mut self, winner: Team) {
        self.terminated = Some(winner);
    }
}

/// A HUD line shown through [`SimPresentation`].
#[derive(Debug, Clone, PartialEq)]
pub struct HudLine {
    pub slot: Slot,
    pub text: String,
    pub color: Color,
    pub hold: Duration,
}

/// A [`Presentation`] that records every request.
#[derive(Debug, Default)]
pub struct SimPresentation {
    pub sounds: Vec<(SoundKind, Target)>,
    pub huds: Vec<HudLine>,
    pub overlays: Vec<(Slot, Option<String>)>,
    pub menus: Vec<(Slot, Menu)>,
}

impl SimPresentation {
    /// HUD lines shown to `slot`, oldest first.
    pub fn huds_for(&self, slot: Slot) -> Vec<&HudLine> {
        self.huds.iter().filter(|h| h.slot == slot).collect()
    }
}

impl Presentation for SimPresentation {
    fn play_sound(&mut self, sound: SoundKind, target: Target) {
        self.sounds.push((sound, target));
    }

    fn show_hud(&mut self, slot: Slot, text: &str, color: Color, hold: Duration) {
        self.huds.push(HudLine {
            slot,
            text: text.to_string(),
            color,
            hold,
        });
    }

    fn screen_overlay(&mut self, slot: Slot, material: Option<&str>) {
        self.overlays.push((slot, material.map(str::to_string)));
    }

    fn open_menu(&mut self, slot: Slot, menu: Menu) {
        self.menus.push((slot, menu));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfinished_entity_has_no_classname() {
        let mut host = SimHost::new(4, 64);
        host.add_entity(10, "func_buyzone");
        host.add_unfinished_entity(11);
        assert_eq!(host.entity_classname(EntityIndex(10)).as_deref(), Some("func_buyzone"));
        assert_eq!(host.entity_classname(EntityIndex(11)), None);
        assert!(host.has_entity(11));
    }

    #[test]
    fn test_respawn_queues_spawn_and_revives() {
        let mut host = SimHost::new(4, 64);
        host.add_client(Slot(2), false);
        host.respawn(Slot(2));
        assert!(host.is_alive(Slot(2)));
        assert_eq!(host.drain_spawns(), vec![Slot(2)]);
        assert!(host.drain_spawns().is_empty());
    }

    #[test]
    fn test_writes_to_empty_slot_are_ignored() {
        let mut host = SimHost::new(4, 64);
        host.set_int(Slot(3), Attr::Health, 100);
        assert_eq!(host.get_int(Slot(3), Attr::Health), None);
    }
}
