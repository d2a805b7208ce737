//! Error types for the registry layer.

use outbreak_protocol::{Slot, UserId};

/// Errors returned by [`PlayerRegistry`](crate::PlayerRegistry).
///
/// Gameplay code never sees these: a timer that cannot resolve its user
/// uses [`PlayerRegistry::resolve`](crate::PlayerRegistry::resolve), which
/// returns `None`. Errors are reserved for the connect/disconnect boundary,
/// where they point at a host adapter bug.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The user already has a record.
    #[error("user {0} is already connected")]
    AlreadyConnected(UserId),

    /// Another user still owns the slot (a disconnect was missed).
    #[error("slot {0} is still held by user {1}")]
    SlotOccupied(Slot, UserId),

    /// No record exists for the user.
    #[error("user {0} not found")]
    NotFound(UserId),
}
