//! Error types for the protocol layer.

/// Errors raised while encoding, decoding or validating wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A value could not be serialized.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Bytes did not parse into the expected command.
    ///
    /// Common causes: malformed JSON, an unknown `event` name, missing
    /// fields, or a field that failed validation (e.g. a bad room code).
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
