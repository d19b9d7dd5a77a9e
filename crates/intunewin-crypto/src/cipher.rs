//! AES-256-CBC + HMAC-SHA256 authenticated encryption
//!
//! `encrypt` returns the parameters needed to publish the package
//! ([`EncryptionResult`]) and the encrypted blob:
//! ```text
//! [32 bytes: MAC][16 bytes: IV][N bytes: AES-256-CBC/PKCS#7 ciphertext]
//! MAC = HMAC-SHA256(mac_key, IV || ciphertext)
//! ```
//! The plaintext itself is only covered by `file_digest` (SHA-256).

use std::io::Read;

use aes::Aes256;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{fixed_size, KeyMaterial};
use crate::{AES256_KEY_SIZE, DIGEST_SIZE, HMAC_KEY_SIZE, HMAC_SIZE, IV_SIZE};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// Output of one encryption. Key fields are zeroized on drop.
pub struct EncryptionResult {
    pub encryption_key: [u8; AES256_KEY_SIZE],
    pub mac_key: [u8; HMAC_KEY_SIZE],
    pub iv: [u8; IV_SIZE],
    pub mac: [u8; HMAC_SIZE],
    /// SHA-256 of the plaintext
    pub file_digest: [u8; DIGEST_SIZE],
    /// Plaintext length before padding
    pub unencrypted_size: i64,
    pub ciphertext: Vec<u8>,
}

/// Base64 (standard alphabet, padded) view of an [`EncryptionResult`],
/// the form embedded in Detection.xml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEncryptionInfo {
    pub encryption_key: String,
    pub mac_key: String,
    pub iv: String,
    pub mac: String,
    pub file_digest: String,
    pub unencrypted_size: i64,
}

impl EncryptionResult {
    pub fn to_base64(&self) -> EncodedEncryptionInfo {
        EncodedEncryptionInfo {
            encryption_key: STANDARD.encode(self.encryption_key),
            mac_key: STANDARD.encode(self.mac_key),
            iv: STANDARD.encode(self.iv),
            mac: STANDARD.encode(self.mac),
            file_digest: STANDARD.encode(self.file_digest),
            unencrypted_size: self.unencrypted_size,
        }
    }
}

impl Drop for EncryptionResult {
    fn drop(&mut self) {
        self.encryption_key.zeroize();
        self.mac_key.zeroize();
    }
}

impl std::fmt::Debug for EncryptionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionResult")
            .field("encryption_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .field("iv", &self.iv)
            .field("mac", &self.mac)
            .field("file_digest", &self.file_digest)
            .field("unencrypted_size", &self.unencrypted_size)
            .field("ciphertext_len", &self.ciphertext.len())
            .finish()
    }
}

pub fn compute_sha256(data: &[u8]) -> [u8; DIGEST_SIZE] {
    Sha256::digest(data).into()
}

pub fn compute_hmac_sha256(key: &[u8], data: &[u8]) -> CryptoResult<[u8; HMAC_SIZE]> {
    hmac_sha256(key, &[data])
}

/// HMAC over the concatenation of `parts`, without building the concatenation.
fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> CryptoResult<[u8; HMAC_SIZE]> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).map_err(|_| CryptoError::InvalidParameterSize {
            what: "MAC key",
            expected: HMAC_KEY_SIZE,
            actual: key.len(),
        })?;
    for part in parts {
        mac.update(part);
    }
    Ok(mac.finalize().into_bytes().into())
}

/// AES-256-CBC with PKCS#7 padding.
///
/// Block-aligned input gains a full block of `0x10`, so the output is always
/// longer than the input and a multiple of 16 bytes.
pub fn encrypt_aes256_cbc(key: &[u8], iv: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let key: [u8; AES256_KEY_SIZE] = fixed_size(key, "encryption key")?;
    let key = Zeroizing::new(key);
    let iv: [u8; IV_SIZE] = fixed_size(iv, "IV")?;

    let encryptor = Aes256CbcEnc::new((&*key).into(), (&iv).into());
    Ok(encryptor.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
}

/// Encrypt with caller-supplied key material.
///
/// Returns the result record and the `MAC || IV || ciphertext` blob.
pub fn encrypt_with(
    material: KeyMaterial,
    plaintext: &[u8],
) -> CryptoResult<(EncryptionResult, Vec<u8>)> {
    let unencrypted_size =
        i64::try_from(plaintext.len()).map_err(|_| CryptoError::InvalidParameterSize {
            what: "plaintext",
            expected: i64::MAX as usize,
            actual: plaintext.len(),
        })?;

    let file_digest = compute_sha256(plaintext);
    let ciphertext = encrypt_aes256_cbc(material.encryption_key(), material.iv(), plaintext)?;
    let mac = hmac_sha256(
        material.mac_key(),
        &[material.iv().as_slice(), ciphertext.as_slice()],
    )?;

    let mut blob = Vec::with_capacity(HMAC_SIZE + IV_SIZE + ciphertext.len());
    blob.extend_from_slice(&mac);
    blob.extend_from_slice(material.iv());
    blob.extend_from_slice(&ciphertext);

    let result = EncryptionResult {
        encryption_key: *material.encryption_key(),
        mac_key: *material.mac_key(),
        iv: *material.iv(),
        mac,
        file_digest,
        unencrypted_size,
        ciphertext,
    };
    Ok((result, blob))
}

/// Encrypt `plaintext` under freshly generated key material.
pub fn encrypt(plaintext: &[u8]) -> CryptoResult<(EncryptionResult, Vec<u8>)> {
    encrypt_with(KeyMaterial::generate()?, plaintext)
}

/// Read all of `reader`, then [`encrypt`] it.
pub fn encrypt_reader<R: Read>(mut reader: R) -> CryptoResult<(EncryptionResult, Vec<u8>)> {
    let mut plaintext = Zeroizing::new(Vec::new());
    reader.read_to_end(&mut plaintext)?;
    encrypt(&plaintext)
}
