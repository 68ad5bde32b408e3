//! Compression stage (§4.2): opportunistic/forced/disabled gzip of the
//! payload, carried as the high bit of the frame's flag byte.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::warn;

use crate::config::Compress;
use crate::error::{ChannelError, Result};

/// Outcome of applying the compression policy to an outbound payload.
pub struct CompressOutcome {
    pub payload: Vec<u8>,
    pub is_compressed: bool,
    /// Set when gzip itself failed and we silently fell back to the
    /// uncompressed buffer (§4.2 "On a gzip failure, fall back...").
    pub gzip_error: Option<ChannelError>,
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data)?;
    enc.finish()
}

pub fn compress(data: &[u8], policy: Compress) -> CompressOutcome {
    match policy {
        Compress::Never => CompressOutcome {
            payload: data.to_vec(),
            is_compressed: false,
            gzip_error: None,
        },
        Compress::Always => match gzip(data) {
            Ok(z) => CompressOutcome {
                payload: z,
                is_compressed: true,
                gzip_error: None,
            },
            Err(e) => {
                warn!(error = %e, "gzip failed, sending uncompressed");
                CompressOutcome {
                    payload: data.to_vec(),
                    is_compressed: false,
                    gzip_error: Some(ChannelError::Crypto(format!("gzip failed: {e}"))),
                }
            }
        },
        Compress::Opportunistic => match gzip(data) {
            Ok(z) if z.len() < data.len() => CompressOutcome {
                payload: z,
                is_compressed: true,
                gzip_error: None,
            },
            Ok(_) => CompressOutcome {
                payload: data.to_vec(),
                is_compressed: false,
                gzip_error: None,
            },
            Err(e) => {
                warn!(error = %e, "gzip failed, sending uncompressed");
                CompressOutcome {
                    payload: data.to_vec(),
                    is_compressed: false,
                    gzip_error: Some(ChannelError::Crypto(format!("gzip failed: {e}"))),
                }
            }
        },
    }
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut dec = GzDecoder::new(data);
    let mut out = Vec::new();
    dec.read_to_end(&mut out)
        .map_err(ChannelError::Decompression)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opportunistic_skips_incompressible_small_input() {
        let data = b"x";
        let out = compress(data, Compress::Opportunistic);
        assert!(!out.is_compressed);
        assert_eq!(out.payload, data);
    }

    #[test]
    fn opportunistic_compresses_redundant_input() {
        let data = vec![0u8; 1 << 20];
        let out = compress(&data, Compress::Opportunistic);
        assert!(out.is_compressed);
        assert!(out.payload.len() < data.len());
        let back = decompress(&out.payload).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn always_emits_gzip_regardless_of_size() {
        let data = b"x";
        let out = compress(data, Compress::Always);
        assert!(out.is_compressed);
        let back = decompress(&out.payload).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn never_never_compresses() {
        let data = vec![0u8; 4096];
        let out = compress(&data, Compress::Never);
        assert!(!out.is_compressed);
        assert_eq!(out.payload, data);
    }
}
