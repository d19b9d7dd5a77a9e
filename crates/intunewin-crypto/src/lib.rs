//! intunewin-crypto: authenticated encryption for `.intunewin` packages
//!
//! Scheme: AES-256-CBC (PKCS#7) then HMAC-SHA256, with independent keys.
//!
//! Encrypted blob layout (binary):
//! ```text
//! [32 bytes: HMAC-SHA256(mac_key, iv || ciphertext)][16 bytes: IV][N bytes: ciphertext]
//! ```
//!
//! Key material (encryption key, MAC key, IV) is generated fresh for every
//! package and published alongside the blob in Detection.xml, together with
//! a SHA-256 digest of the plaintext.

pub mod cipher;
pub mod error;
pub mod keys;

pub use cipher::{
    compute_hmac_sha256, compute_sha256, encrypt, encrypt_aes256_cbc, encrypt_reader, encrypt_with,
    EncodedEncryptionInfo, EncryptionResult,
};
pub use error::{CryptoError, CryptoResult};
pub use keys::{generate_iv, generate_key, KeyMaterial};

/// Size of an AES-256 key in bytes
pub const AES256_KEY_SIZE: usize = 32;

/// Size of the HMAC-SHA256 key in bytes
pub const HMAC_KEY_SIZE: usize = 32;

/// Size of an AES-CBC initialization vector
pub const IV_SIZE: usize = 16;

/// AES block size; ciphertext is always a multiple of this
pub const BLOCK_SIZE: usize = 16;

/// Size of an HMAC-SHA256 tag
pub const HMAC_SIZE: usize = 32;

/// Size of a SHA-256 digest
pub const DIGEST_SIZE: usize = 32;

/// Bytes preceding the ciphertext in the encrypted blob (MAC + IV)
pub const CONTAINER_HEADER_SIZE: usize = HMAC_SIZE + IV_SIZE;
