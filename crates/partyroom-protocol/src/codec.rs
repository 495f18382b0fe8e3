//! Codec trait and the JSON implementation.
//!
//! The gateway speaks text frames, so a codec turns outbound values into a
//! `String` and parses inbound frames from raw bytes. Swapping the format
//! means providing another [`Codec`]; nothing above the gateway changes.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes outbound values to text and decodes inbound bytes.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Parses a frame payload into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or do
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use partyroom_protocol::{ClientCommand, Codec, JsonCodec, ServerEvent};
///
/// let codec = JsonCodec;
/// let text = codec.encode(&ServerEvent::Pong).unwrap();
/// assert_eq!(text, r#"{"event":"pong"}"#);
///
/// let cmd: ClientCommand = codec.decode(br#"{"event":"ping"}"#).unwrap();
/// assert_eq!(cmd, ClientCommand::Ping);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
