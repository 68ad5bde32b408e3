//! Frame codec (§4.1): a 4-byte little-endian length prefix followed by that
//! many opaque bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{ChannelError, Result};

/// Write `len_u32_le(bytes) || bytes`.
pub async fn write_frame<S>(stream: &mut S, bytes: &[u8]) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    let len = bytes.len() as u32;
    stream.write_u32_le(len).await?;
    stream.write_all(bytes).await?;
    trace!(len, "wrote frame");
    Ok(())
}

/// Read exactly one frame. If the declared length exceeds `max_package_size`
/// no further bytes are consumed from the stream before the error is
/// returned — the caller is expected to close the connection.
pub async fn read_frame<S>(stream: &mut S, max_package_size: u32) -> Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let len = stream.read_u32_le().await?;
    if len > max_package_size {
        return Err(ChannelError::FrameTooLarge {
            declared: len,
            max: max_package_size,
        });
    }
    let mut buf = vec![0u8; len as usize];
    stream.read_exact(&mut buf).await?;
    trace!(len, "read frame");
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn roundtrip_empty() {
        let (mut a, mut b) = duplex(64);
        write_frame(&mut a, &[]).await.unwrap();
        let got = read_frame(&mut b, 1024).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn roundtrip_bytes() {
        let (mut a, mut b) = duplex(64);
        write_frame(&mut a, b"hello").await.unwrap();
        let got = read_frame(&mut b, 1024).await.unwrap();
        assert_eq!(got, b"hello");
    }

    #[tokio::test]
    async fn oversized_declared_length_is_rejected_without_consuming_body() {
        let (mut a, mut b) = duplex(1024);
        // Hand-craft a frame declaring more than max_package_size.
        a.write_u32_le(100).await.unwrap();
        a.write_all(&[0u8; 100]).await.unwrap();

        let err = read_frame(&mut b, 10).await.unwrap_err();
        assert!(matches!(err, ChannelError::FrameTooLarge { declared: 100, max: 10 }));
    }
}
