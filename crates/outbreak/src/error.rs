//! Unified error type for Outbreak.

use outbreak_protocol::ProtocolError;
use outbreak_registry::RegistryError;

/// Errors raised while loading a [`ModeConfig`](crate::ModeConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config text is not valid JSON for `ModeConfig`.
    #[error("config parse failed: {0}")]
    Parse(#[from] serde_json::Error),

    /// A class list the controller draws from is empty.
    #[error("class list {0} is empty")]
    EmptyClassList(&'static str),

    /// A weapon pool has no items or only zero weights.
    #[error("weapon pool {0} is empty")]
    EmptyWeaponPool(&'static str),
}

/// Top-level error that wraps all crate-specific errors.
///
/// Gameplay operations never return this; it only surfaces at the
/// boundaries: decoding host events, the connect/disconnect bookkeeping,
/// config loading, and talking to the controller actor.
#[derive(Debug, thiserror::Error)]
pub enum OutbreakError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The controller actor has shut down.
    #[error("controller unavailable")]
    Unavailable,
}
