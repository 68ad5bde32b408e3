//! Datagram layer (§4.5): `write(bytes)` / `read() -> bytes`, enforcing
//! `max_package_size` and triggering the handshake lazily on first use.

use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, warn};

use crate::cipher::KeyMaterial;
use crate::compress::{compress, decompress};
use crate::config::EndpointConfig;
use crate::error::{ChannelError, Result};
use crate::frame::{read_frame, write_frame};
use crate::handshake::{client_handshake, server_handshake};
use crate::transform::Direction;
use crate::Role;

const COMPRESSED_FLAG: u8 = 0x80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeState {
    Fresh,
    Keyed,
    Broken,
}

/// One side of a secure channel. Generic over the underlying byte stream so
/// it can be driven by a `TcpStream` in production or an in-memory
/// `tokio::io::duplex` half in tests.
pub struct Endpoint<S> {
    stream: S,
    config: EndpointConfig,
    state: HandshakeState,
    key_material: Option<KeyMaterial>,
}

impl<S> Endpoint<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, config: EndpointConfig) -> Self {
        Self {
            stream,
            config,
            state: HandshakeState::Fresh,
            key_material: None,
        }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Runs the role-appropriate handshake exactly once; subsequent calls
    /// are no-ops. A handshake failure puts the endpoint into `Broken` — it
    /// is never retried (§4.4 "Lazy trigger").
    async fn ensure_keyed(&mut self) -> Result<()> {
        match self.state {
            HandshakeState::Keyed => return Ok(()),
            HandshakeState::Broken => return Err(ChannelError::HandshakeBroken),
            HandshakeState::Fresh => {}
        }

        let password = match self.config.role {
            Role::Client => client_handshake(&mut self.stream, &self.config).await,
            Role::Server => server_handshake(&mut self.stream, &self.config).await,
        };

        match password {
            Ok(password) => {
                self.key_material = Some(KeyMaterial::derive(&password));
                self.state = HandshakeState::Keyed;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "handshake failed, endpoint is now broken");
                self.state = HandshakeState::Broken;
                Err(e)
            }
        }
    }

    /// Encrypts and frames `bytes`, running the handshake first if needed.
    /// Returns `Ok(None)` if the encrypted frame would exceed
    /// `max_package_size` — a soft failure, the endpoint stays usable.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<Option<()>> {
        if self.state == HandshakeState::Broken {
            return Err(ChannelError::HandshakeBroken);
        }

        let transformed = match &self.config.data_transformer {
            Some(t) => t.apply(bytes.to_vec(), Direction::Transform).await?,
            None => bytes.to_vec(),
        };

        let outcome = compress(&transformed, self.config.compress);
        if let Some(err) = &outcome.gzip_error {
            warn!(error = %err, "compression fell back to uncompressed payload");
        }

        self.ensure_keyed().await?;

        let flag = (rand::thread_rng().next_u32() as u8 & 0x7f)
            | if outcome.is_compressed { COMPRESSED_FLAG } else { 0 };
        let mut plaintext = Vec::with_capacity(1 + outcome.payload.len());
        plaintext.push(flag);
        plaintext.extend_from_slice(&outcome.payload);

        let ciphertext = self
            .key_material
            .as_ref()
            .expect("keyed endpoint always has key material")
            .encrypt(&plaintext);

        if ciphertext.len() as u32 > self.config.max_package_size {
            warn!(
                len = ciphertext.len(),
                max = self.config.max_package_size,
                "outbound frame exceeds max_package_size, dropping write"
            );
            return Ok(None);
        }

        if let Err(e) = write_frame(&mut self.stream, &ciphertext).await {
            error!(error = %e, "write failed, endpoint is now broken");
            self.state = HandshakeState::Broken;
            return Err(e);
        }
        Ok(Some(()))
    }

    /// Reads one datagram, running the handshake first if needed.
    ///
    /// A declared inbound length over `max_package_size` is fatal (§4.1/§7):
    /// the endpoint is marked `Broken` and no further bytes are consumed.
    /// Decrypt and decompress failures are fatal for that call only — the
    /// endpoint stays usable for subsequent reads.
    pub async fn read(&mut self) -> Result<Vec<u8>> {
        if self.state == HandshakeState::Broken {
            return Err(ChannelError::HandshakeBroken);
        }
        self.ensure_keyed().await?;

        let ciphertext = match read_frame(&mut self.stream, self.config.max_package_size).await {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "read failed, endpoint is now broken");
                self.state = HandshakeState::Broken;
                return Err(e);
            }
        };

        if ciphertext.is_empty() {
            return Ok(Vec::new());
        }

        let plaintext = self
            .key_material
            .as_ref()
            .expect("keyed endpoint always has key material")
            .decrypt(&ciphertext);

        let (flag, body) = plaintext
            .split_first()
            .ok_or_else(|| ChannelError::Crypto("decrypted frame missing flag byte".into()))?;

        let body = if flag & COMPRESSED_FLAG != 0 {
            decompress(body)?
        } else {
            body.to_vec()
        };

        let restored = match &self.config.data_transformer {
            Some(t) => t.apply(body, Direction::Restore).await?,
            None => body,
        };
        Ok(restored)
    }

    pub async fn write_string(&mut self, s: &str) -> Result<Option<()>> {
        self.write(s.as_bytes()).await
    }

    pub async fn read_string(&mut self) -> Result<String> {
        let bytes = self.read().await?;
        Ok(String::from_utf8(bytes)?)
    }

    pub async fn write_json<T: Serialize + Sync>(&mut self, value: &T) -> Result<Option<()>> {
        let bytes = serde_json::to_vec(value)?;
        self.write(&bytes).await
    }

    pub async fn read_json<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.read().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) fn max_package_size(&self) -> u32 {
        self.config.max_package_size
    }

    pub(crate) fn read_buffer_size(&self) -> u32 {
        self.config.read_buffer_size
    }
}
