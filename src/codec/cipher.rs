// Nyseal — Payload Codec
//
// decrypt(payload, secret):
//   1. key = PBKDF2-HMAC-SHA256(secret, payload.salt, 100 000 rounds, 32 bytes)
//   2. AES-256-GCM open with the detached tag; a tag mismatch aborts before
//      any plaintext is released
//   3. strip PKCS7 padding (16-byte blocks)
//
// The derived key and every intermediate plaintext buffer are zeroized on drop.

use std::fmt;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{self, AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{Aes256Gcm, AesGcm};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::{DecryptionError, EncryptedPayload, SealError};
use crate::enclave::MasterSecret;

// ─── Constants ───────────────────────────────────────────────────────────────

/// PBKDF2 work factor for artifact keys.
pub const KDF_ITERATIONS: u32 = 100_000;

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const SEAL_IV_LEN: usize = 12;
const TAG_LEN: usize = 16;
const BLOCK_LEN: usize = 16;

/// AES-256-GCM with a 128-bit IV, for artifacts sealed with 16-byte IVs.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

// ─── Decrypted Source ────────────────────────────────────────────────────────

/// Plaintext recovered from a verified artifact. Overwritten on drop.
pub struct DecryptedSource(Zeroizing<String>);

impl DecryptedSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DecryptedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecryptedSource([REDACTED; {} bytes])", self.0.len())
    }
}

// ─── Codec ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct PayloadCodec {
    iterations: u32,
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl PayloadCodec {
    pub fn new() -> Self {
        Self {
            iterations: KDF_ITERATIONS,
        }
    }

    /// Codec with a custom PBKDF2 round count. Artifacts only open with the
    /// count they were sealed with.
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub fn decrypt(
        &self,
        payload: &EncryptedPayload,
        secret: &MasterSecret,
    ) -> Result<DecryptedSource, DecryptionError> {
        if payload.tag.len() != TAG_LEN {
            return Err(DecryptionError::MalformedPayload(format!(
                "tag must be {} bytes, got {}",
                TAG_LEN,
                payload.tag.len()
            )));
        }

        let key = self.derive_key(secret, &payload.salt);
        let mut buf = Zeroizing::new(payload.ciphertext.clone());

        match payload.iv.len() {
            12 => open_in_place(
                &new_cipher::<Aes256Gcm>(&key).map_err(DecryptionError::MalformedPayload)?,
                &payload.iv,
                &payload.tag,
                buf.as_mut_slice(),
            )?,
            16 => open_in_place(
                &new_cipher::<Aes256Gcm16>(&key).map_err(DecryptionError::MalformedPayload)?,
                &payload.iv,
                &payload.tag,
                buf.as_mut_slice(),
            )?,
            n => {
                return Err(DecryptionError::MalformedPayload(format!(
                    "unsupported IV length {}",
                    n
                )));
            }
        }

        let len = pkcs7_unpadded_len(&buf)?;
        buf.truncate(len);

        let text = String::from_utf8(std::mem::take(&mut *buf)).map_err(|e| {
            e.into_bytes().zeroize();
            DecryptionError::NotUtf8
        })?;

        Ok(DecryptedSource(Zeroizing::new(text)))
    }

    /// Matching encryption routine: fresh salt and 12-byte IV per call.
    pub fn seal(
        &self,
        plaintext: &[u8],
        secret: &MasterSecret,
    ) -> Result<EncryptedPayload, SealError> {
        let mut iv = vec![0u8; SEAL_IV_LEN];
        rand::rng().fill_bytes(&mut iv);
        self.seal_padded(pkcs7_pad(plaintext), iv, secret)
    }

    fn seal_padded(
        &self,
        padded: Vec<u8>,
        iv: Vec<u8>,
        secret: &MasterSecret,
    ) -> Result<EncryptedPayload, SealError> {
        let mut salt = vec![0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);

        let key = self.derive_key(secret, &salt);
        let mut buf = padded;

        let tag = match iv.len() {
            12 => {
                let cipher = new_cipher::<Aes256Gcm>(&key).map_err(SealError::Cipher)?;
                seal_in_place(&cipher, &iv, &mut buf)?
            }
            16 => {
                let cipher = new_cipher::<Aes256Gcm16>(&key).map_err(SealError::Cipher)?;
                seal_in_place(&cipher, &iv, &mut buf)?
            }
            n => return Err(SealError::Cipher(format!("unsupported IV length {}", n))),
        };

        Ok(EncryptedPayload {
            salt,
            iv,
            tag,
            ciphertext: buf,
        })
    }

    fn derive_key(&self, secret: &MasterSecret, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2_hmac::<Sha256>(secret.expose(), salt, self.iterations, key.as_mut_slice());
        key
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn new_cipher<A: KeyInit>(key: &[u8; KEY_LEN]) -> Result<A, String> {
    A::new_from_slice(key).map_err(|e| format!("invalid key: {}", e))
}

fn open_in_place<A: AeadInPlace>(
    cipher: &A,
    iv: &[u8],
    tag: &[u8],
    buf: &mut [u8],
) -> Result<(), DecryptionError> {
    let nonce = aead::Nonce::<A>::from_slice(iv);
    let tag = aead::Tag::<A>::from_slice(tag);
    cipher
        .decrypt_in_place_detached(nonce, b"", buf, tag)
        .map_err(|_| DecryptionError::Authentication)
}

fn seal_in_place<A: AeadInPlace>(
    cipher: &A,
    iv: &[u8],
    buf: &mut [u8],
) -> Result<Vec<u8>, SealError> {
    let nonce = aead::Nonce::<A>::from_slice(iv);
    cipher
        .encrypt_in_place_detached(nonce, b"", buf)
        .map(|tag| tag.to_vec())
        .map_err(|e| SealError::Cipher(e.to_string()))
}

fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad = BLOCK_LEN - data.len() % BLOCK_LEN;
    let mut out = Vec::with_capacity(data.len() + pad);
    out.extend_from_slice(data);
    // pad is in 1..=16
    out.resize(data.len() + pad, pad as u8);
    out
}

fn pkcs7_unpadded_len(data: &[u8]) -> Result<usize, DecryptionError> {
    if data.is_empty() || data.len() % BLOCK_LEN != 0 {
        return Err(DecryptionError::Padding);
    }
    let pad = data.last().map(|b| usize::from(*b)).unwrap_or(0);
    if pad == 0 || pad > BLOCK_LEN {
        return Err(DecryptionError::Padding);
    }
    if !data[data.len() - pad..].iter().all(|b| usize::from(*b) == pad) {
        return Err(DecryptionError::Padding);
    }
    Ok(data.len() - pad)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
