//! Endpoint configuration — an explicit value passed to the endpoint
//! builder, never a process-global (see SPEC_FULL.md §9 / Design Notes).

use std::sync::Arc;

use crate::error::{ChannelError, Result};
use crate::transform::{PasswordGenerator, Transformer};

/// Hard cap on any single frame length in either direction, per §6.
pub const DEFAULT_MAX_PACKAGE_SIZE: u32 = 16_777_211;

/// Bit length of the client's ephemeral RSA key. 512 is the wire-compatible
/// default (see Open Question #4); cryptographically broken, kept for
/// byte-level compatibility with the source protocol.
pub const DEFAULT_RSA_KEY_SIZE: usize = 512;

/// Default sender chunk size for the stream layer.
pub const DEFAULT_READ_BUFFER_SIZE: u32 = 8_192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

/// Which half of Open Question #1 this endpoint implements.
///
/// `V2Compat` preserves the source's wire behavior byte-for-byte: the
/// session password travels in the clear in the handshake password frame.
/// `V3RsaEncrypted` actually RSA-OAEP-encrypts the password with the
/// client's public key before sending it, and decrypts it on the client.
/// Both sides of a connection must agree on the mode out of band; it is not
/// negotiated on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordMode {
    V2Compat,
    V3RsaEncrypted,
}

impl Default for PasswordMode {
    fn default() -> Self {
        PasswordMode::V2Compat
    }
}

/// Opportunistic / forced / disabled compression policy (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compress {
    /// Compress only when gzip is strictly smaller than the input.
    Opportunistic,
    Always,
    Never,
}

impl Default for Compress {
    fn default() -> Self {
        Compress::Opportunistic
    }
}

#[derive(Clone)]
pub struct EndpointConfig {
    pub role: Role,
    pub max_package_size: u32,
    pub rsa_key_size: usize,
    pub compress: Compress,
    pub read_buffer_size: u32,
    pub password_mode: PasswordMode,
    pub data_transformer: Option<Arc<dyn Transformer>>,
    pub handshake_transformer: Option<Arc<dyn Transformer>>,
    pub password_generator: Option<Arc<dyn PasswordGenerator>>,
}

impl EndpointConfig {
    pub fn builder(role: Role) -> EndpointConfigBuilder {
        EndpointConfigBuilder::new(role)
    }
}

/// Builder for [`EndpointConfig`]; a config can't be mutated after the
/// endpoint is built from it.
pub struct EndpointConfigBuilder {
    role: Role,
    max_package_size: u32,
    rsa_key_size: usize,
    compress: Compress,
    read_buffer_size: u32,
    password_mode: PasswordMode,
    data_transformer: Option<Arc<dyn Transformer>>,
    handshake_transformer: Option<Arc<dyn Transformer>>,
    password_generator: Option<Arc<dyn PasswordGenerator>>,
}

impl EndpointConfigBuilder {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            max_package_size: DEFAULT_MAX_PACKAGE_SIZE,
            rsa_key_size: DEFAULT_RSA_KEY_SIZE,
            compress: Compress::default(),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            password_mode: PasswordMode::default(),
            data_transformer: None,
            handshake_transformer: None,
            password_generator: None,
        }
    }

    pub fn max_package_size(mut self, v: u32) -> Self {
        self.max_package_size = v;
        self
    }

    pub fn rsa_key_size(mut self, v: usize) -> Self {
        self.rsa_key_size = v;
        self
    }

    pub fn compress(mut self, v: Compress) -> Self {
        self.compress = v;
        self
    }

    pub fn read_buffer_size(mut self, v: u32) -> Self {
        self.read_buffer_size = v;
        self
    }

    pub fn password_mode(mut self, v: PasswordMode) -> Self {
        self.password_mode = v;
        self
    }

    pub fn data_transformer(mut self, t: Arc<dyn Transformer>) -> Self {
        self.data_transformer = Some(t);
        self
    }

    pub fn handshake_transformer(mut self, t: Arc<dyn Transformer>) -> Self {
        self.handshake_transformer = Some(t);
        self
    }

    pub fn password_generator(mut self, g: Arc<dyn PasswordGenerator>) -> Self {
        self.password_generator = Some(g);
        self
    }

    pub fn build(self) -> Result<EndpointConfig> {
        if self.rsa_key_size == 0 {
            return Err(ChannelError::Crypto("rsa_key_size must be positive".into()));
        }
        Ok(EndpointConfig {
            role: self.role,
            max_package_size: self.max_package_size,
            rsa_key_size: self.rsa_key_size,
            compress: self.compress,
            read_buffer_size: self.read_buffer_size,
            password_mode: self.password_mode,
            data_transformer: self.data_transformer,
            handshake_transformer: self.handshake_transformer,
            password_generator: self.password_generator,
        })
    }
}
