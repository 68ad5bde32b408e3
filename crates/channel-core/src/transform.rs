//! User-supplied bytes -> bytes hooks (§4.7), applied before send / after receive.

use async_trait::async_trait;

use crate::error::Result;

/// Which way a [`Transformer`] is being applied. The receiver's `Restore`
/// must invert the sender's `Transform`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Transform,
    Restore,
}

/// A payload or handshake public-key transform. Absent hook is identity.
///
/// Modeled as `async fn` rather than "bytes or a future of bytes" — a
/// synchronous implementation is just an `async fn` that never awaits.
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn apply(&self, bytes: Vec<u8>, direction: Direction) -> Result<Vec<u8>>;
}

/// Supplies the server-side session password (§4.4 step 4). Defaults to 48
/// cryptographically random bytes when absent.
#[async_trait]
pub trait PasswordGenerator: Send + Sync {
    async fn generate(&self) -> Vec<u8>;
}
