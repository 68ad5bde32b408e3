//! Stream layer (§4.6): chunked byte-stream transfer over the datagram
//! layer, with a SHA-256 per chunk and a stop-and-wait ACK per chunk.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::endpoint::Endpoint;
use crate::error::{ChannelError, Result};

const HASH_LEN: usize = 32;

/// Byte-addressable source for the sender side of the stream layer. Any
/// `tokio::io::AsyncRead` already satisfies this via the blanket impl below.
#[async_trait]
pub trait ByteSource: Send {
    async fn read_into(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

#[async_trait]
impl<T: AsyncRead + Unpin + Send> ByteSource for T {
    async fn read_into(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.read(buf).await
    }
}

/// Byte-addressable sink for the receiver side of the stream layer. Any
/// `tokio::io::AsyncWrite` already satisfies this via the blanket impl below.
#[async_trait]
pub trait ByteSink: Send {
    async fn write_chunk(&mut self, buf: &[u8]) -> std::io::Result<()>;
}

#[async_trait]
impl<T: AsyncWrite + Unpin + Send> ByteSink for T {
    async fn write_chunk(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.write_all(buf).await
    }
}

fn encode_chunk(chunk: &[u8]) -> Vec<u8> {
    if chunk.is_empty() {
        return 0u32.to_le_bytes().to_vec();
    }
    let hash = Sha256::digest(chunk);
    let mut buf = Vec::with_capacity(4 + HASH_LEN + chunk.len());
    buf.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    buf.extend_from_slice(&hash);
    buf.extend_from_slice(chunk);
    buf
}

enum ChunkEnvelope {
    Terminator,
    Chunk { hash: [u8; HASH_LEN], body: Vec<u8> },
}

fn decode_chunk(envelope: &[u8], max_package_size: u32) -> Result<ChunkEnvelope> {
    if envelope.len() < 4 {
        return Err(ChannelError::Crypto("chunk envelope shorter than length prefix".into()));
    }
    let chunk_len = u32::from_le_bytes(envelope[0..4].try_into().unwrap());
    if chunk_len == 0 {
        return Ok(ChunkEnvelope::Terminator);
    }
    if chunk_len > max_package_size {
        return Err(ChannelError::FrameTooLarge {
            declared: chunk_len,
            max: max_package_size,
        });
    }
    let want = 4 + HASH_LEN + chunk_len as usize;
    if envelope.len() != want {
        return Err(ChannelError::Crypto(format!(
            "chunk envelope length mismatch: declared {chunk_len} bytes, frame carries {}",
            envelope.len().saturating_sub(4 + HASH_LEN)
        )));
    }
    let mut hash = [0u8; HASH_LEN];
    hash.copy_from_slice(&envelope[4..4 + HASH_LEN]);
    let body = envelope[4 + HASH_LEN..].to_vec();
    Ok(ChunkEnvelope::Chunk { hash, body })
}

/// Sender loop (§4.6): reads from `source` in `buf_size`-byte pieces (or
/// `endpoint`'s configured `read_buffer_size`), sending each as a hashed
/// chunk envelope and awaiting an ACK before sending the next.
pub async fn write_stream<S, R>(
    endpoint: &mut Endpoint<S>,
    source: &mut R,
    max_bytes: Option<u64>,
    buf_size: Option<u32>,
) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    R: ByteSource,
{
    let buf_size = buf_size.unwrap_or_else(|| endpoint.read_buffer_size()) as usize;
    let mut buf = vec![0u8; buf_size];
    let mut total: u64 = 0;

    loop {
        let want = match max_bytes {
            Some(max) => {
                let remaining = max.saturating_sub(total);
                if remaining == 0 {
                    0
                } else {
                    std::cmp::min(remaining, buf_size as u64) as usize
                }
            }
            None => buf_size,
        };

        let n = if want == 0 { 0 } else { source.read_into(&mut buf[..want]).await? };

        if n == 0 {
            endpoint
                .write(&encode_chunk(&[]))
                .await?
                .ok_or_else(|| ChannelError::Crypto("terminator chunk exceeds max_package_size".into()))?;
            debug!(total, "stream send complete, sent terminator");
            return Ok(total);
        }

        let envelope = encode_chunk(&buf[..n]);
        endpoint
            .write(&envelope)
            .await?
            .ok_or_else(|| ChannelError::Crypto("chunk exceeds max_package_size".into()))?;

        let ack = endpoint.read_string().await?;
        if !ack.is_empty() {
            warn!(response = %ack, "stream peer reported an error");
            return Err(ChannelError::RemoteStreamError(ack));
        }

        total += n as u64;
    }
}

/// Receiver loop (§4.6): reads hashed chunk envelopes, verifies each
/// against its SHA-256, writes the body to `sink`, and ACKs before the
/// sender proceeds. Returns the total byte count on a clean terminator.
pub async fn read_stream<S, W>(endpoint: &mut Endpoint<S>, sink: &mut W) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
    W: ByteSink,
{
    let mut total: u64 = 0;
    loop {
        let envelope = endpoint.read().await?;
        match decode_chunk(&envelope, endpoint.max_package_size()) {
            Ok(ChunkEnvelope::Terminator) => {
                debug!(total, "stream receive complete");
                return Ok(total);
            }
            Ok(ChunkEnvelope::Chunk { hash, body }) => {
                let computed = Sha256::digest(&body);
                if computed.as_slice() != hash {
                    let expected = hex::encode(hash);
                    let got = hex::encode(computed);
                    let msg = format!("Invalid chunk hash: {got}");
                    endpoint.write_string(&msg).await?;
                    return Err(ChannelError::HashMismatch { expected, got });
                }
                sink.write_chunk(&body).await?;
                endpoint.write_string("").await?;
                total += body.len() as u64;
            }
            Err(ChannelError::FrameTooLarge { declared, max }) => {
                endpoint.write_string("Chunk is too big!").await?;
                return Err(ChannelError::FrameTooLarge { declared, max });
            }
            Err(e) => return Err(e),
        }
    }
}
