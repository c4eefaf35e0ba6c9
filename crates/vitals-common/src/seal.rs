//! Payload integrity and confidentiality.
//!
//! The agent signs the *uncompressed* JSON payload with HMAC-SHA256 and, when
//! a public key is configured, encrypts the *compressed* payload with RSA.
//! The server runs the inverse steps, so the relative order of the stages is
//! fixed: signing covers the plaintext, encryption wraps the gzip output.
//!
//! RSA encryption is chunked PKCS#1 v1.5: each block holds at most
//! `modulus_size - 11` bytes, so payloads of any length round-trip.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use std::path::Path;

type HmacSha256 = Hmac<Sha256>;

/// PKCS#1 v1.5 padding overhead per RSA block.
const PKCS1_OVERHEAD: usize = 11;

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("seal: cannot read key file '{path}': {source}")]
    KeyFile {
        path: String,
        source: std::io::Error,
    },

    #[error("seal: invalid key material in '{path}': {reason}")]
    KeyFormat { path: String, reason: String },

    #[error("seal: invalid signing key")]
    SigningKey,

    #[error("seal: RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),

    #[error("seal: ciphertext length {len} is not a multiple of the key size {block}")]
    CiphertextLength { len: usize, block: usize },

    #[error("seal: signature is not valid base64: {0}")]
    SignatureEncoding(#[from] base64::DecodeError),

    #[error("seal: signature mismatch")]
    SignatureMismatch,
}

/// Computes the base64 HMAC-SHA256 of `payload` under `key`.
///
/// # Examples
///
/// ```
/// let sig = vitals_common::seal::sign(b"[]", "secret").unwrap();
/// assert!(vitals_common::seal::verify(b"[]", "secret", &sig).is_ok());
/// ```
pub fn sign(payload: &[u8], key: &str) -> Result<String, SealError> {
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| SealError::SigningKey)?;
    mac.update(payload);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Verifies a base64 HMAC-SHA256 signature over `payload`.
pub fn verify(payload: &[u8], key: &str, signature: &str) -> Result<(), SealError> {
    let expected = BASE64.decode(signature)?;
    let mut mac =
        HmacSha256::new_from_slice(key.as_bytes()).map_err(|_| SealError::SigningKey)?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| SealError::SignatureMismatch)
}

/// RSA public-key side of the seal, held by the agent.
#[derive(Debug, Clone)]
pub struct Encryptor {
    key: RsaPublicKey,
}

impl Encryptor {
    pub fn from_key(key: RsaPublicKey) -> Self {
        Self { key }
    }

    /// Loads a PEM public key (PKCS#8 `PUBLIC KEY` or PKCS#1
    /// `RSA PUBLIC KEY`) from `path`.
    pub fn from_pem_file(path: &Path) -> Result<Self, SealError> {
        let pem = read_key(path)?;
        let key = RsaPublicKey::from_public_key_pem(&pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(&pem))
            .map_err(|e| SealError::KeyFormat {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { key })
    }

    pub fn encrypt(&self, plain: &[u8]) -> Result<Vec<u8>, SealError> {
        let block = self.key.size() - PKCS1_OVERHEAD;
        let mut rng = rand::thread_rng();
        let mut out = Vec::with_capacity(plain.len() + self.key.size());
        for chunk in plain.chunks(block) {
            out.extend(self.key.encrypt(&mut rng, Pkcs1v15Encrypt, chunk)?);
        }
        Ok(out)
    }
}

/// RSA private-key side of the seal, held by the server.
#[derive(Debug, Clone)]
pub struct Decryptor {
    key: RsaPrivateKey,
}

impl Decryptor {
    pub fn from_key(key: RsaPrivateKey) -> Self {
        Self { key }
    }

    /// Loads a PEM private key (PKCS#8 `PRIVATE KEY` or PKCS#1
    /// `RSA PRIVATE KEY`) from `path`.
    pub fn from_pem_file(path: &Path) -> Result<Self, SealError> {
        let pem = read_key(path)?;
        let key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
            .map_err(|e| SealError::KeyFormat {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { key })
    }

    pub fn decrypt(&self, cipher: &[u8]) -> Result<Vec<u8>, SealError> {
        let block = self.key.size();
        if cipher.len() % block != 0 {
            return Err(SealError::CiphertextLength {
                len: cipher.len(),
                block,
            });
        }
        let mut out = Vec::with_capacity(cipher.len());
        for chunk in cipher.chunks(block) {
            out.extend(self.key.decrypt(Pkcs1v15Encrypt, chunk)?);
        }
        Ok(out)
    }
}

fn read_key(path: &Path) -> Result<String, SealError> {
    std::fs::read_to_string(path).map_err(|source| SealError::KeyFile {
        path: path.display().to_string(),
        source,
    })
}
