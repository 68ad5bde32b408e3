use aes::Aes256;
use cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use md5::{Digest, Md5};
use rand::{rngs::OsRng, RngCore};
use std::time::Instant;

type Aes256Ctr = Ctr128BE<Aes256>;

const BENCHMARK_SIZE: usize = 256 * 1024 * 1024;
const CHUNK_SIZE: usize = 8192; // matches channel_core::DEFAULT_READ_BUFFER_SIZE

/// `EVP_BytesToKey` with MD5, 1 iteration, no salt.
fn derive_key_iv(password: &[u8]) -> ([u8; 32], [u8; 16]) {
    let mut material = Vec::with_capacity(48);
    let mut prev: Vec<u8> = Vec::new();
    while material.len() < 48 {
        let mut hasher = Md5::new();
        hasher.update(&prev);
        hasher.update(password);
        let digest = hasher.finalize();
        material.extend_from_slice(&digest);
        prev = digest.to_vec();
    }
    let mut key = [0u8; 32];
    let mut iv = [0u8; 16];
    key.copy_from_slice(&material[..32]);
    iv.copy_from_slice(&material[32..48]);
    (key, iv)
}

fn main() {
    println!("=== AES-256-CTR Throughput Benchmark ===\n");

    let mut password = [0u8; 32];
    OsRng.fill_bytes(&mut password);

    let kdf_start = Instant::now();
    let (key, iv) = derive_key_iv(&password);
    println!(
        "EVP_BytesToKey (MD5, 1 iteration, no salt) derivation: {:?}",
        kdf_start.elapsed()
    );

    println!(
        "Generating {} MB of random test data...",
        BENCHMARK_SIZE / (1024 * 1024)
    );
    let mut data = vec![0u8; BENCHMARK_SIZE];
    OsRng.fill_bytes(&mut data);

    let mut cipher = Aes256Ctr::new((&key).into(), (&iv).into());

    println!(
        "Starting keystream benchmark ({} byte chunks, matching the stream layer's read_buffer_size)...\n",
        CHUNK_SIZE
    );
    let start = Instant::now();
    for chunk in data.chunks_mut(CHUNK_SIZE) {
        cipher.apply_keystream(chunk);
    }
    let duration = start.elapsed();

    let seconds = duration.as_secs_f64();
    let mb_processed = BENCHMARK_SIZE as f64 / (1024.0 * 1024.0);
    let throughput_mbps = mb_processed / seconds;

    println!("=== Results ===");
    println!("Total processed: {mb_processed:.2} MB");
    println!("Time elapsed:    {seconds:.3} seconds");
    println!("Throughput:      {throughput_mbps:.2} MB/s");
}
