//! Player records for Outbreak.
//!
//! One [`Player`] per connected client, keyed by the stable [`UserId`]
//! rather than the recyclable [`Slot`]:
//!
//! 1. **Records** — role, modifier flags, counters, balance ([`Player`])
//! 2. **Timer ownership** — every per-player task handle lives in
//!    [`PlayerTimers`], at most one per field
//! 3. **Resolution** — [`PlayerRegistry::resolve`] maps a user back to
//!    its live slot, or `None` once they left
//!
//! # How it fits in the stack
//!
//! ```text
//! Controller (above)  ← mutates records through the lifecycle operations
//!     ↕
//! Registry (this crate)  ← who is connected, in which slot, with what state
//!     ↕
//! Protocol / Timer (below)  ← UserId, Slot, TaskHandle
//! ```
//!
//! [`UserId`]: outbreak_protocol::UserId
//! [`Slot`]: outbreak_protocol::Slot

mod error;
mod player;
mod registry;

pub use error::RegistryError;
pub use player::{Player, PlayerTimers, Progress};
pub use registry::{DEFAULT_SAVED_CAPACITY, PlayerRegistry};
