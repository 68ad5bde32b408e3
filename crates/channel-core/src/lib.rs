//! Secure length-framed message channel: an RSA-bootstrapped handshake,
//! a framed + encrypted + optionally-gzipped datagram layer, and a chunked
//! stream-transfer layer with per-chunk integrity and stop-and-wait ACKs.

mod cipher;
mod compress;
mod config;
mod endpoint;
mod error;
mod frame;
mod handshake;
mod stream_xfer;
mod transform;

pub use config::{
    Compress, EndpointConfig, EndpointConfigBuilder, PasswordMode, Role, DEFAULT_MAX_PACKAGE_SIZE,
    DEFAULT_READ_BUFFER_SIZE, DEFAULT_RSA_KEY_SIZE,
};
pub use endpoint::Endpoint;
pub use error::{ChannelError, Result};
pub use stream_xfer::{read_stream, write_stream, ByteSink, ByteSource};
pub use transform::{Direction, PasswordGenerator, Transformer};
