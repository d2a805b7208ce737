//! Codec trait and implementations for host event streams.
//!
//! The host adapter and the scripted simulator both hand the controller
//! bytes; a [`Codec`] turns them into [`HostEvent`](crate::HostEvent)s (or
//! anything else serde can describe) and back.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// Encodes values to bytes and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// Behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use outbreak_protocol::{Codec, HostEvent, JsonCodec, Slot};
///
/// let codec = JsonCodec;
/// let event = HostEvent::Spawn { slot: Slot(4) };
///
/// let bytes = codec.encode(&event).unwrap();
/// assert_eq!(bytes, br#"{"type":"spawn","slot":4}"#);
///
/// let decoded: HostEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(event, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Buttons, HostEvent, Slot, Team, UserId};

    #[test]
    fn test_decode_death_without_attacker_defaults_to_world_kill() {
        let ev: HostEvent = JsonCodec.decode(br#"{"type":"death","victim":3}"#).unwrap();
        assert_eq!(ev, HostEvent::Death { victim: Slot(3), attacker: None });
    }

    #[test]
    fn test_decode_connect_bot_flag_defaults_false() {
        let ev: HostEvent =
            JsonCodec.decode(br#"{"type":"connect","slot":1,"user":90}"#).unwrap();
        assert_eq!(ev, HostEvent::Connect { slot: Slot(1), user: UserId(90), bot: false });
    }

    #[test]
    fn test_decode_input_uses_named_buttons() {
        let ev: HostEvent = JsonCodec
            .decode(br#"{"type":"input","slot":2,"buttons":"JUMP | DUCK"}"#)
            .unwrap();
        assert_eq!(ev, HostEvent::Input { slot: Slot(2), buttons: Buttons::LEAP });
    }

    #[test]
    fn test_decode_round_end() {
        let ev: HostEvent =
            JsonCodec.decode(br#"{"type":"round_end","winner":"zombie"}"#).unwrap();
        assert_eq!(ev, HostEvent::RoundEnd { winner: Team::Zombie });
    }

    #[test]
    fn test_decode_unknown_tag_fails() {
        let result: Result<HostEvent, _> = JsonCodec.decode(br#"{"type":"explode"}"#);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
