//! AES-256 backed by the RustCrypto `aes` crate.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes256;

use super::{BlockCipher, BLOCK_LEN, KEY_LEN};

/// AES-256 single-block encryption.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256Cipher;

impl BlockCipher for Aes256Cipher {
    fn encrypt_block(&self, key: &[u8; KEY_LEN], block: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let cipher = Aes256::new(GenericArray::from_slice(key));
        let mut buf = GenericArray::clone_from_slice(block);
        cipher.encrypt_block(&mut buf);

        let mut out = [0u8; BLOCK_LEN];
        out.copy_from_slice(&buf);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fips197_aes256_vector() {
        // FIPS-197 Appendix C.3
        let key: [u8; KEY_LEN] = std::array::from_fn(|i| i as u8);
        let plaintext: [u8; BLOCK_LEN] = hex::decode("00112233445566778899aabbccddeeff")
            .unwrap()
            .try_into()
            .unwrap();

        let ciphertext = Aes256Cipher.encrypt_block(&key, &plaintext);

        assert_eq!(hex::encode(ciphertext), "8ea2b7ca516745bfeafc49904b496089");
    }
}
