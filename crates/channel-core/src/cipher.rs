//! Cipher stage (§4.3): AES-256-CTR keyed by a password-derived key/IV.
//!
//! No authentication tag is added — decryption never fails on tampering, it
//! produces garbage (Open Question #2). The key/IV derivation intentionally
//! reproduces the legacy OpenSSL `EVP_BytesToKey` construction with MD5 and
//! a single iteration and no salt, the same KDF the source's
//! `crypto.createCipher(algorithm, password)` call uses internally (Open
//! Question #3). This is byte-compatible with that source, not secure by
//! modern standards; do not use this key-derivation scheme for anything new.

use aes::Aes256;
use cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;
use md5::{Digest, Md5};
use zeroize::Zeroize;

type Aes256Ctr = Ctr128BE<Aes256>;

const KEY_LEN: usize = 32;
const IV_LEN: usize = 16;

/// Derived, password-bound key material. Zeroized on drop.
pub struct KeyMaterial {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

impl KeyMaterial {
    /// `EVP_BytesToKey` with MD5, 1 iteration, no salt: repeatedly hash
    /// `prev || password` until there are enough bytes for the key and IV.
    pub fn derive(password: &[u8]) -> Self {
        let mut material = Vec::with_capacity(KEY_LEN + IV_LEN);
        let mut prev: Vec<u8> = Vec::new();
        while material.len() < KEY_LEN + IV_LEN {
            let mut hasher = Md5::new();
            hasher.update(&prev);
            hasher.update(password);
            let digest = hasher.finalize();
            material.extend_from_slice(&digest);
            prev = digest.to_vec();
        }
        let mut key = [0u8; KEY_LEN];
        let mut iv = [0u8; IV_LEN];
        key.copy_from_slice(&material[..KEY_LEN]);
        iv.copy_from_slice(&material[KEY_LEN..KEY_LEN + IV_LEN]);
        material.zeroize();
        Self { key, iv }
    }

    fn cipher(&self) -> Aes256Ctr {
        Aes256Ctr::new((&self.key).into(), (&self.iv).into())
    }

    /// CTR mode is its own inverse: the same keystream is XORed in both
    /// directions, each call reinitializing the counter at zero.
    pub fn apply(&self, data: &[u8]) -> Vec<u8> {
        let mut buf = data.to_vec();
        self.cipher().apply_keystream(&mut buf);
        buf
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        self.apply(plaintext)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Vec<u8> {
        self.apply(ciphertext)
    }
}
