//! The player registry: every connected client, by user id and by slot.
//!
//! # Concurrency note
//!
//! `PlayerRegistry` is a plain pair of `HashMap`s. It is owned by the
//! controller, which runs on a single task; no locking happens here.

use std::collections::{HashMap, VecDeque};

use outbreak_protocol::{Slot, UserId};

use crate::{Player, Progress, RegistryError};

/// Users whose progress is kept after they leave. The oldest departure is
/// forgotten first.
pub const DEFAULT_SAVED_CAPACITY: usize = 1024;

/// Tracks connected players.
///
/// ## Lifecycle
///
/// ```text
/// connect() ──→ [record] ──→ disconnect() ──→ Player returned to caller
///    ↑                                              │
///    └──── progress restored ←── saved progress ←───┘
/// ```
pub struct PlayerRegistry {
    /// All records, keyed by the stable user id.
    players: HashMap<UserId, Player>,

    /// Index from the live slot to its user. Kept in sync with `players`.
    slots: HashMap<Slot, UserId>,

    /// Level/experience of users who left, restored if they come back.
    /// Holds at most `saved_capacity` entries; users with no progress are
    /// not saved at all.
    saved: HashMap<UserId, Progress>,

    /// Departure order for `saved`. May hold ids already restored; those
    /// are skipped on eviction.
    saved_order: VecDeque<UserId>,

    saved_capacity: usize,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::with_saved_capacity(DEFAULT_SAVED_CAPACITY)
    }

    pub fn with_saved_capacity(saved_capacity: usize) -> Self {
        Self {
            players: HashMap::new(),
            slots: HashMap::new(),
            saved: HashMap::new(),
            saved_order: VecDeque::new(),
            saved_capacity,
        }
    }

    /// Creates the record for a newly connected client.
    ///
    /// # Errors
    /// - [`RegistryError::AlreadyConnected`] — the user already has a record
    /// - [`RegistryError::SlotOccupied`] — another user still holds `slot`
    pub fn connect(
        &mut self,
        slot: Slot,
        user: UserId,
        is_bot: bool,
    ) -> Result<&Player, RegistryError> {
        if self.players.contains_key(&user) {
            return Err(RegistryError::AlreadyConnected(user));
        }
        if let Some(holder) = self.slots.get(&slot) {
            return Err(RegistryError::SlotOccupied(slot, *holder));
        }

        let mut player = Player::new(user, slot, is_bot);
        if let Some(progress) = self.saved.remove(&user) {
            player.level = progress.level;
            player.experience = progress.experience;
        }

        self.slots.insert(slot, user);
        tracing::info!(%user, %slot, is_bot, "player connected");
        Ok(self.players.entry(user).or_insert(player))
    }

    /// Removes the record and returns it so the caller can cancel its timers.
    ///
    /// # Errors
    /// Returns [`RegistryError::NotFound`] if the user has no record.
    pub fn disconnect(&mut self, user: UserId) -> Result<Player, RegistryError> {
        let player = self
            .players
            .remove(&user)
            .ok_or(RegistryError::NotFound(user))?;
        self.slots.remove(&player.slot);
        self.save_progress(user, player.progress());
        tracing::info!(%user, slot = %player.slot, "player disconnected");
        Ok(player)
    }

    fn save_progress(&mut self, user: UserId, progress: Progress) {
        if progress == Progress::default() || self.saved_capacity == 0 {
            return;
        }
        while self.saved.len() >= self.saved_capacity {
            let Some(oldest) = self.saved_order.pop_front() else {
                break;
            };
            if self.saved.remove(&oldest).is_some() {
                tracing::debug!(user = %oldest, "saved progress evicted");
            }
        }
        // Restored ids linger in the order queue; drop them once it outgrows
        // the map.
        if self.saved_order.len() > self.saved_capacity * 2 {
            let saved = &self.saved;
            self.saved_order.retain(|u| saved.contains_key(u));
        }
        self.saved.insert(user, progress);
        self.saved_order.push_back(user);
    }

    /// Number of departed users whose progress is still kept.
    pub fn saved_len(&self) -> usize {
        self.saved.len()
    }

    /// The slot `user` occupies right now, or `None` if they left.
    pub fn resolve(&self, user: UserId) -> Option<Slot> {
        self.players.get(&user).map(|p| p.slot)
    }

    /// The user occupying `slot`, if any.
    pub fn user_at(&self, slot: Slot) -> Option<UserId> {
        self.slots.get(&slot).copied()
    }

    pub fn get(&self, user: UserId) -> Option<&Player> {
        self.players.get(&user)
    }

    pub fn get_mut(&mut self, user: UserId) -> Option<&mut Player> {
        self.players.get_mut(&user)
    }

    pub fn at_slot(&self, slot: Slot) -> Option<&Player> {
        self.user_at(slot).and_then(|u| self.players.get(&u))
    }

    pub fn at_slot_mut(&mut self, slot: Slot) -> Option<&mut Player> {
        let user = self.user_at(slot)?;
        self.players.get_mut(&user)
    }

    /// All user ids, ordered by slot. Loops that must be reproducible
    /// (rebalancing, mode picks) iterate this.
    pub fn users(&self) -> Vec<UserId> {
        let mut slots: Vec<(Slot, UserId)> =
            self.slots.iter().map(|(s, u)| (*s, *u)).collect();
        slots.sort_unstable();
        slots.into_iter().map(|(_, u)| u).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================
