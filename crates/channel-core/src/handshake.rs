//! Handshake engine (§4.4): one-shot RSA-bootstrapped password exchange.
//!
//! The session password is the only thing ever used as cipher key material
//! (§4.4 "Observed keys used for encryption") — the RSA exchange exists to
//! carry the password across the wire, not to key the cipher directly. In
//! `PasswordMode::V2Compat` the password travels in the clear in the
//! handshake password frame, reproducing the source's behavior byte for
//! byte (Open Question #1). `PasswordMode::V3RsaEncrypted` actually wraps
//! it with the client's public key.
//!
//! OAEP-SHA256 needs room for two hash digests plus padding overhead, so it
//! cannot wrap anything under a ~512-bit RSA modulus and has no headroom to
//! spare at exactly 512 bits. `PasswordMode::V3RsaEncrypted` only works with
//! an `EndpointConfig.rsa_key_size` raised well above the 512-bit default —
//! at the default size, the wrap fails at handshake time with
//! `ChannelError::Crypto`, not at config-build time.

use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::config::{EndpointConfig, PasswordMode};
use crate::error::{ChannelError, Result};
use crate::transform::Direction;

const DEFAULT_PASSWORD_LEN: usize = 48;

fn crypto_err(context: &str, e: impl std::fmt::Display) -> ChannelError {
    ChannelError::Crypto(format!("{context}: {e}"))
}

/// §4.4 "Client-initiated handshake".
pub async fn client_handshake<S>(stream: &mut S, config: &EndpointConfig) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, config.rsa_key_size)
        .map_err(|e| crypto_err("rsa keygen", e))?;
    let public_key = RsaPublicKey::from(&private_key);

    let pem = public_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| crypto_err("pem encode", e))?;
    let mut pub_bytes = pem.into_bytes();
    if let Some(t) = &config.handshake_transformer {
        pub_bytes = t.apply(pub_bytes, Direction::Transform).await?;
    }

    stream.write_u32_le(pub_bytes.len() as u32).await?;
    stream.write_all(&pub_bytes).await?;
    info!(rsa_key_size = config.rsa_key_size, "client: sent handshake public key");

    let password_len = stream.read_u16_le().await? as usize;
    if password_len as u32 > config.max_package_size {
        return Err(ChannelError::FrameTooLarge {
            declared: password_len as u32,
            max: config.max_package_size,
        });
    }
    let mut wire_bytes = vec![0u8; password_len];
    stream.read_exact(&mut wire_bytes).await?;

    let password = match config.password_mode {
        PasswordMode::V2Compat => wire_bytes,
        PasswordMode::V3RsaEncrypted => private_key
            .decrypt(Oaep::new::<Sha256>(), &wire_bytes)
            .map_err(|e| crypto_err("rsa oaep decrypt of session password", e))?,
    };

    info!(password_len = password.len(), "client: handshake complete");
    Ok(password)
}

/// §4.4 "Server-side handshake".
pub async fn server_handshake<S>(stream: &mut S, config: &EndpointConfig) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let pub_len = stream.read_u32_le().await?;
    if pub_len > config.max_package_size {
        return Err(ChannelError::FrameTooLarge {
            declared: pub_len,
            max: config.max_package_size,
        });
    }
    let mut pub_bytes = vec![0u8; pub_len as usize];
    stream.read_exact(&mut pub_bytes).await?;
    if let Some(t) = &config.handshake_transformer {
        pub_bytes = t.apply(pub_bytes, Direction::Restore).await?;
    }

    let pem = String::from_utf8(pub_bytes).map_err(|e| crypto_err("handshake pem utf-8", e))?;
    let peer_public = RsaPublicKey::from_pkcs1_pem(&pem).map_err(|e| crypto_err("pem decode", e))?;
    info!("server: parsed client public key");

    let password = match &config.password_generator {
        Some(gen) => gen.generate().await,
        None => {
            let mut buf = vec![0u8; DEFAULT_PASSWORD_LEN];
            OsRng.fill_bytes(&mut buf);
            buf
        }
    };

    let wire_bytes = match config.password_mode {
        PasswordMode::V2Compat => password.clone(),
        PasswordMode::V3RsaEncrypted => {
            let mut rng = OsRng;
            peer_public
                .encrypt(&mut rng, Oaep::new::<Sha256>(), password.as_slice())
                .map_err(|e| crypto_err("rsa oaep wrap of session password", e))?
        }
    };
    if wire_bytes.len() > u16::MAX as usize {
        return Err(crypto_err(
            "session password frame",
            "wrapped password exceeds 2-byte length field",
        ));
    }

    stream.write_u16_le(wire_bytes.len() as u16).await?;
    stream.write_all(&wire_bytes).await?;
    info!(password_len = password.len(), "server: handshake complete");

    Ok(password)
}
