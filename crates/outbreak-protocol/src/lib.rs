//! Shared vocabulary for Outbreak.
//!
//! - **Types** ([`UserId`], [`Slot`], [`Role`], [`RoundMode`], [`Buttons`],
//!   [`HostEvent`]) — identities, factions and the events the host fires.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how event streams are
//!   converted to and from bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Host (bytes / callbacks) → Protocol (HostEvent) → Controller (round + players)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Buttons, Color, EntityIndex, Gender, HostEvent, Role, RoundMode, Slot, Team, UserId,
};
