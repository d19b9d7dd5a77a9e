//! Per-package key material: encryption key, MAC key, IV

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::{AES256_KEY_SIZE, HMAC_KEY_SIZE, IV_SIZE};

/// Fill `size` bytes from the OS CSPRNG.
pub fn generate_key(size: usize) -> CryptoResult<Vec<u8>> {
    let mut key = vec![0u8; size];
    OsRng.try_fill_bytes(&mut key)?;
    Ok(key)
}

/// Generate a random 128-bit CBC initialization vector.
pub fn generate_iv() -> CryptoResult<[u8; IV_SIZE]> {
    let mut iv = [0u8; IV_SIZE];
    OsRng.try_fill_bytes(&mut iv)?;
    Ok(iv)
}

/// Encryption key, MAC key and IV for exactly one encryption. Zeroized on drop.
pub struct KeyMaterial {
    encryption_key: [u8; AES256_KEY_SIZE],
    mac_key: [u8; HMAC_KEY_SIZE],
    iv: [u8; IV_SIZE],
}

impl KeyMaterial {
    /// Draw fresh, independent encryption and MAC keys plus an IV.
    pub fn generate() -> CryptoResult<Self> {
        let encryption_key = Zeroizing::new(generate_key(AES256_KEY_SIZE)?);
        let mac_key = Zeroizing::new(generate_key(HMAC_KEY_SIZE)?);
        let iv = generate_iv()?;
        Self::from_slices(&encryption_key, &mac_key, &iv)
    }

    pub fn from_parts(
        encryption_key: [u8; AES256_KEY_SIZE],
        mac_key: [u8; HMAC_KEY_SIZE],
        iv: [u8; IV_SIZE],
    ) -> Self {
        Self {
            encryption_key,
            mac_key,
            iv,
        }
    }

    /// Build from slices, rejecting anything but 32/32/16 bytes.
    pub fn from_slices(encryption_key: &[u8], mac_key: &[u8], iv: &[u8]) -> CryptoResult<Self> {
        Ok(Self {
            encryption_key: fixed_size(encryption_key, "encryption key")?,
            mac_key: fixed_size(mac_key, "MAC key")?,
            iv: fixed_size(iv, "IV")?,
        })
    }

    pub fn encryption_key(&self) -> &[u8; AES256_KEY_SIZE] {
        &self.encryption_key
    }

    pub fn mac_key(&self) -> &[u8; HMAC_KEY_SIZE] {
        &self.mac_key
    }

    pub fn iv(&self) -> &[u8; IV_SIZE] {
        &self.iv
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.mac_key.zeroize();
        self.iv.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("encryption_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .field("iv", &self.iv)
            .finish()
    }
}

pub(crate) fn fixed_size<const N: usize>(bytes: &[u8], what: &'static str) -> CryptoResult<[u8; N]> {
    <[u8; N]>::try_from(bytes).map_err(|_| CryptoError::InvalidParameterSize {
        what,
        expected: N,
        actual: bytes.len(),
    })
}
