//! Payload cipher for encrypted certificate requests.
//!
//! AES-CBC with PKCS#7 padding, base64 on the wire. The key is stretched from a
//! passphrase with scrypt under a fixed salt and the IV comes from a configured
//! seed string, so every message under one deployment shares the same key and
//! IV. That matches what existing clients produce; it is not authenticated
//! encryption and identical plaintexts yield identical ciphertexts.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use zeroize::Zeroizing;

/// Salt literal shared with existing clients.
const KDF_SALT: &[u8] = b"salt";

/// scrypt cost parameters (N = 2^14, r = 8, p = 1).
const KDF_LOG_N: u8 = 14;
const KDF_R: u32 = 8;
const KDF_P: u32 = 1;

pub const BLOCK_SIZE: usize = 16;

/// Filler used to right-pad a short IV seed.
const IV_FILLER: u8 = b'0';

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("ciphertext is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("ciphertext length {0} is not a positive multiple of the block size")]
    InvalidLength(usize),

    #[error("invalid padding after decryption (wrong key, IV or cipher profile?)")]
    InvalidPadding,

    #[error("decrypted payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("unknown cipher profile: {0}")]
    UnknownProfile(String),
}

/// Key size variant. Chosen once per deployment; the two are not interoperable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CipherProfile {
    Aes128Cbc,
    #[default]
    Aes256Cbc,
}

impl CipherProfile {
    pub fn key_len(self) -> usize {
        match self {
            CipherProfile::Aes128Cbc => 16,
            CipherProfile::Aes256Cbc => 32,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CipherProfile::Aes128Cbc => "aes-128-cbc",
            CipherProfile::Aes256Cbc => "aes-256-cbc",
        }
    }
}

impl FromStr for CipherProfile {
    type Err = CipherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-128-cbc" | "aes128" | "aes-128" => Ok(CipherProfile::Aes128Cbc),
            "aes-256-cbc" | "aes256" | "aes-256" => Ok(CipherProfile::Aes256Cbc),
            other => Err(CipherError::UnknownProfile(other.to_string())),
        }
    }
}

impl fmt::Display for CipherProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stretch `passphrase` into a key of the profile's length.
pub fn derive_key(
    passphrase: &str,
    profile: CipherProfile,
) -> Result<Zeroizing<Vec<u8>>, CipherError> {
    let params = scrypt::Params::new(KDF_LOG_N, KDF_R, KDF_P, profile.key_len())
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
    let mut key = Zeroizing::new(vec![0u8; profile.key_len()]);
    scrypt::scrypt(passphrase.as_bytes(), KDF_SALT, &params, &mut key)
        .map_err(|e| CipherError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Right-pad the seed with `'0'` to one block, truncating anything longer.
pub fn derive_iv(seed: &str) -> [u8; BLOCK_SIZE] {
    let mut iv = [IV_FILLER; BLOCK_SIZE];
    let bytes = seed.as_bytes();
    let n = bytes.len().min(BLOCK_SIZE);
    iv[..n].copy_from_slice(&bytes[..n]);
    iv
}

/// Stateless encrypt/decrypt under one key, IV and profile.
#[derive(Clone)]
pub struct PayloadCipher {
    profile: CipherProfile,
    key: Zeroizing<Vec<u8>>,
    iv: [u8; BLOCK_SIZE],
}

impl PayloadCipher {
    pub fn new(passphrase: &str, iv_seed: &str, profile: CipherProfile) -> Result<Self, CipherError> {
        Ok(Self {
            profile,
            key: derive_key(passphrase, profile)?,
            iv: derive_iv(iv_seed),
        })
    }

    pub fn profile(&self) -> CipherProfile {
        self.profile
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let data = plaintext.as_bytes();
        let ciphertext = match self.profile {
            CipherProfile::Aes128Cbc => Aes128CbcEnc::new_from_slices(&self.key, &self.iv)
                .map_err(|e| CipherError::KeyDerivation(e.to_string()))?
                .encrypt_padded_vec_mut::<Pkcs7>(data),
            CipherProfile::Aes256Cbc => Aes256CbcEnc::new_from_slices(&self.key, &self.iv)
                .map_err(|e| CipherError::KeyDerivation(e.to_string()))?
                .encrypt_padded_vec_mut::<Pkcs7>(data),
        };
        Ok(STANDARD.encode(ciphertext))
    }

    /// Serialize `value` to JSON, then encrypt it.
    pub fn encrypt_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, CipherError> {
        let json = serde_json::to_string(value)?;
        self.encrypt(&json)
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CipherError> {
        let ciphertext = STANDARD.decode(encoded.trim())?;
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::InvalidLength(ciphertext.len()));
        }

        let plaintext = match self.profile {
            CipherProfile::Aes128Cbc => Aes128CbcDec::new_from_slices(&self.key, &self.iv)
                .map_err(|e| CipherError::KeyDerivation(e.to_string()))?
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
            CipherProfile::Aes256Cbc => Aes256CbcDec::new_from_slices(&self.key, &self.iv)
                .map_err(|e| CipherError::KeyDerivation(e.to_string()))?
                .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext),
        }
        .map_err(|_| CipherError::InvalidPadding)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }

    pub fn decrypt_json<T: DeserializeOwned>(&self, encoded: &str) -> Result<T, CipherError> {
        let text = self.decrypt(encoded)?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl fmt::Debug for PayloadCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayloadCipher")
            .field("profile", &self.profile)
            .field("key", &"<redacted>")
            .finish()
    }
}
