//! Error types for the protocol layer.
//!
//! Each crate in Outbreak defines its own error enum. A `ProtocolError`
//! always means the problem is in turning host events into bytes or back,
//! never in game rules.

/// Errors that can occur while encoding or decoding host events.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, or an
    /// unknown event tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The event decoded cleanly but names something the controller can
    /// never act on, such as slot 0 (reserved for the world).
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}
