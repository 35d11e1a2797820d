//! Passphrase-sealed container for PEM key material.
//!
//! # Format
//!
//! ```text
//! v1.<rounds>.<base64url-no-pad(salt)>.<base64url-no-pad(nonce)>.<base64url-no-pad(ciphertext+tag)>
//! ```
//!
//! The AES-256-GCM-SIV key is derived from the passphrase with
//! PBKDF2-HMAC-SHA256 over `salt` for `rounds` iterations. The authentication
//! tag doubles as the passphrase check: a wrong passphrase and a tampered blob
//! are indistinguishable and both fail with [`SealError::AuthenticationFailed`].

use aes_gcm_siv::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng},
    Aes256GcmSiv, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// Byte length of the derived AES-256 key.
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM-SIV nonce.
pub const NONCE_LEN: usize = 12;

/// Byte length of the PBKDF2 salt.
pub const SALT_LEN: usize = 16;

/// PBKDF2 iteration count used by [`seal`].
pub const DEFAULT_ROUNDS: u32 = 210_000;

/// Lowest iteration count accepted when opening a store.
pub const MIN_ROUNDS: u32 = 1_000;

/// Prefix that appears at the start of every sealed store.
pub const VERSION_PREFIX: &str = "v1";

/// Errors produced by the sealing layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SealError {
    /// The blob does not match the `v1.<rounds>.<salt>.<nonce>.<ciphertext>` layout.
    #[error("invalid sealed store format: {0}")]
    InvalidFormat(&'static str),

    /// The iteration count is below [`MIN_ROUNDS`].
    #[error("PBKDF2 rounds {0} below minimum of {MIN_ROUNDS}")]
    WeakRounds(u32),

    /// Wrong passphrase, or the ciphertext was modified.
    #[error("sealed store authentication failed")]
    AuthenticationFailed,

    /// AES-GCM-SIV encryption failed.
    #[error("aead operation failed")]
    AeadFailure,
}

/// A parsed sealed store, prior to decryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedStore {
    pub rounds: u32,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext followed by the 16-byte authentication tag.
    pub ciphertext: Vec<u8>,
}

impl SealedStore {
    /// Encode this store to its canonical one-line representation.
    pub fn to_string_repr(&self) -> String {
        format!(
            "{}.{}.{}.{}.{}",
            VERSION_PREFIX,
            self.rounds,
            URL_SAFE_NO_PAD.encode(self.salt),
            URL_SAFE_NO_PAD.encode(self.nonce),
            URL_SAFE_NO_PAD.encode(&self.ciphertext),
        )
    }

    /// Parse the one-line representation. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::InvalidFormat`] on any structural problem and
    /// [`SealError::WeakRounds`] if the iteration count is too low.
    pub fn parse(bytes: &[u8]) -> Result<Self, SealError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| SealError::InvalidFormat("not UTF-8"))?
            .trim();

        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 5 {
            return Err(SealError::InvalidFormat("expected 5 dot-separated parts"));
        }
        if parts[0] != VERSION_PREFIX {
            return Err(SealError::InvalidFormat("unknown version prefix"));
        }

        let rounds: u32 = parts[1]
            .parse()
            .map_err(|_| SealError::InvalidFormat("rounds is not an integer"))?;
        if rounds < MIN_ROUNDS {
            return Err(SealError::WeakRounds(rounds));
        }

        let salt = decode_fixed::<SALT_LEN>(parts[2], "bad salt")?;
        let nonce = decode_fixed::<NONCE_LEN>(parts[3], "bad nonce")?;
        let ciphertext = URL_SAFE_NO_PAD
            .decode(parts[4])
            .map_err(|_| SealError::InvalidFormat("bad ciphertext encoding"))?;
        if ciphertext.is_empty() {
            return Err(SealError::InvalidFormat("empty ciphertext"));
        }

        Ok(Self {
            rounds,
            salt,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt the store with `passphrase`.
    ///
    /// The returned buffer is zeroed when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SealError::AuthenticationFailed`] on a wrong passphrase or
    /// tampered data.
    pub fn open(&self, passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>, SealError> {
        let cipher = build_cipher(passphrase, &self.salt, self.rounds);
        cipher
            .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_ref())
            .map(Zeroizing::new)
            .map_err(|_| SealError::AuthenticationFailed)
    }
}

/// Seal `plaintext` under `passphrase` with [`DEFAULT_ROUNDS`].
///
/// # Errors
///
/// Returns [`SealError::AeadFailure`] on an internal AEAD error.
pub fn seal(plaintext: &[u8], passphrase: &[u8]) -> Result<SealedStore, SealError> {
    seal_with_rounds(plaintext, passphrase, DEFAULT_ROUNDS)
}

/// Seal `plaintext` under `passphrase` with an explicit PBKDF2 iteration count.
///
/// # Errors
///
/// Returns [`SealError::WeakRounds`] if `rounds` is below [`MIN_ROUNDS`], or
/// [`SealError::AeadFailure`] on an internal AEAD error.
pub fn seal_with_rounds(
    plaintext: &[u8],
    passphrase: &[u8],
    rounds: u32,
) -> Result<SealedStore, SealError> {
    if rounds < MIN_ROUNDS {
        return Err(SealError::WeakRounds(rounds));
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = build_cipher(passphrase, &salt, rounds);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| SealError::AeadFailure)?;

    Ok(SealedStore {
        rounds,
        salt,
        nonce,
        ciphertext,
    })
}

fn build_cipher(passphrase: &[u8], salt: &[u8], rounds: u32) -> Aes256GcmSiv {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, rounds, &mut key[..]);
    Aes256GcmSiv::new(Key::<Aes256GcmSiv>::from_slice(&key[..]))
}

fn decode_fixed<const N: usize>(part: &str, what: &'static str) -> Result<[u8; N], SealError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| SealError::InvalidFormat(what))?;
    bytes.try_into().map_err(|_| SealError::InvalidFormat(what))
}
