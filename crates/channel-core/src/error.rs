//! Error kinds raised by the channel core, per the error handling design.

use thiserror::Error;

/// Every fallible operation in `channel_core` returns this.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Underlying stream read/write failure, or EOF mid-frame. Fatal for the endpoint.
    #[error("connection error: {0}")]
    Io(#[from] std::io::Error),

    /// Declared frame length exceeds `max_package_size`. Inbound: fatal, the
    /// endpoint closes. Outbound: handled by `Endpoint::write` returning
    /// `Ok(None)`, this variant is only ever raised for inbound frames.
    #[error("frame too large: declared {declared} bytes, max {max}")]
    FrameTooLarge { declared: u32, max: u32 },

    /// RSA keygen, RSA wrap/unwrap, or symmetric encrypt/decrypt failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// gunzip failure on an inbound payload whose compression bit was set.
    #[error("decompression error: {0}")]
    Decompression(std::io::Error),

    /// Stream-layer chunk hash didn't match, reported back over the ACK channel.
    #[error("hash mismatch: expected {expected}, got {got}")]
    HashMismatch { expected: String, got: String },

    /// A non-empty ACK was received by the stream-layer sender.
    #[error("remote error: {0}")]
    RemoteStreamError(String),

    /// Payload bytes were not valid UTF-8 where a string was expected.
    #[error("invalid utf-8 payload: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Payload did not decode as the expected JSON shape.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// `EndpointConfig` was built with a role that is neither Server nor Client.
    #[error("unknown role")]
    UnknownRole,

    /// A prior fatal error already put this endpoint into the `Broken` state.
    #[error("endpoint is broken, handshake or connection previously failed")]
    HandshakeBroken,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
