//! Block cipher primitive used by CTR_DRBG.
//!
//! The cipher is an external collaborator: the DRBG only needs a stateless
//! single-block encryption function under a 256-bit key.

mod aes256;

pub use aes256::Aes256Cipher;

/// Block length in bytes (128 bits).
pub const BLOCK_LEN: usize = 16;

/// Key length in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Stateless single-block encryption.
pub trait BlockCipher {
    /// Encrypts one block under `key`.
    fn encrypt_block(&self, key: &[u8; KEY_LEN], block: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN];
}
