//! CTR_DRBG over a 256-bit-key block cipher, without derivation function.
//!
//! Implements the update, instantiate, reseed and generate algorithms of
//! NIST SP 800-90A Section 10.2.1 for the AES-256 "no df" profile:
//!
//! | parameter               | value        |
//! |-------------------------|--------------|
//! | block length            | 128 bits     |
//! | key length              | 256 bits     |
//! | seed length             | 384 bits     |
//! | counter field length    | 128 bits     |
//! | reseed interval         | 2^48 calls   |
//! | max bits per request    | 32256        |
//!
//! Without a derivation function the entropy input must be exactly one seed
//! length, and personalization / additional input are XORed into the seed
//! material after zero padding.

use zeroize::{Zeroize, Zeroizing};

use super::algorithm::{bit_len, AlgorithmLimits, DrbgAlgorithm, Generated};
use super::{DrbgError, SecurityStrength, WorkingState};
use crate::cipher::{Aes256Cipher, BlockCipher, BLOCK_LEN, KEY_LEN};

/// Seed length in bytes: key length + block length.
pub const SEED_LEN: usize = KEY_LEN + BLOCK_LEN;

/// Maximum number of generate calls between reseeds.
pub const RESEED_INTERVAL: u64 = 1 << 48;

/// Maximum number of bits returned by a single generate call.
pub const MAX_BITS_PER_REQUEST: usize = 32_256;

/// CTR_DRBG with AES-256 and no derivation function.
pub type CtrDrbgAes256NoDf = CtrDrbg<Aes256Cipher>;

/// Key and counter register of a CTR_DRBG state.
#[derive(Clone, PartialEq, Eq)]
pub struct CtrValues {
    /// Cipher key.
    pub key: [u8; KEY_LEN],
    /// Counter block.
    pub v: [u8; BLOCK_LEN],
}

impl CtrValues {
    /// All-zero key and counter, the starting point of instantiation.
    pub fn zero() -> Self {
        Self {
            key: [0u8; KEY_LEN],
            v: [0u8; BLOCK_LEN],
        }
    }
}

impl Zeroize for CtrValues {
    fn zeroize(&mut self) {
        self.key.zeroize();
        self.v.zeroize();
    }
}

impl std::fmt::Debug for CtrValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtrValues").finish_non_exhaustive()
    }
}

/// Increments a 128-bit big-endian counter modulo 2^128.
#[inline]
pub fn increment_counter(v: &mut [u8; BLOCK_LEN]) {
    *v = u128::from_be_bytes(*v).wrapping_add(1).to_be_bytes();
}

/// CTR_DRBG algorithm over the block cipher `C`.
#[derive(Debug, Clone)]
pub struct CtrDrbg<C: BlockCipher = Aes256Cipher> {
    cipher: C,
    limits: AlgorithmLimits,
}

impl CtrDrbg<Aes256Cipher> {
    /// Creates CTR_DRBG over AES-256.
    pub fn new() -> Self {
        Self::with_cipher(Aes256Cipher)
    }
}

impl Default for CtrDrbg<Aes256Cipher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BlockCipher> CtrDrbg<C> {
    /// Creates the algorithm over a specific block cipher.
    pub fn with_cipher(cipher: C) -> Self {
        Self {
            cipher,
            limits: AlgorithmLimits {
                highest_supported_security_strength: SecurityStrength::Bits256,
                supports_prediction_resistance: true,
                seed_length: SEED_LEN * 8,
                min_entropy_length: SEED_LEN * 8,
                max_entropy_length: SEED_LEN * 8,
                max_personalization_string_length: SEED_LEN * 8,
                max_additional_input_length: SEED_LEN * 8,
                max_number_of_bits_per_request: MAX_BITS_PER_REQUEST,
                reseed_interval: RESEED_INTERVAL,
            },
        }
    }

    /// Overrides the reseed interval.
    ///
    /// Values above 2^48 are capped at 2^48.
    pub fn with_reseed_interval(mut self, reseed_interval: u64) -> Self {
        self.limits.reseed_interval = reseed_interval.min(RESEED_INTERVAL);
        self
    }

    /// CTR_DRBG_Update: derives a new key and counter from `provided_data`.
    pub fn update(&self, provided_data: &[u8; SEED_LEN], values: &CtrValues) -> CtrValues {
        let mut v = values.v;
        let mut temp = Zeroizing::new([0u8; SEED_LEN]);
        self.keystream(&values.key, &mut v, &mut temp[..]);
        v.zeroize();

        for (t, d) in temp.iter_mut().zip(provided_data) {
            *t ^= d;
        }

        let mut next = CtrValues::zero();
        next.key.copy_from_slice(&temp[..KEY_LEN]);
        next.v.copy_from_slice(&temp[KEY_LEN..]);
        next
    }

    /// Fills `out` with encryptions of successive counter values.
    ///
    /// The counter is incremented before every block; the final partial
    /// block, if any, is truncated.
    fn keystream(&self, key: &[u8; KEY_LEN], v: &mut [u8; BLOCK_LEN], out: &mut [u8]) {
        for chunk in out.chunks_mut(BLOCK_LEN) {
            increment_counter(v);
            let mut block = self.cipher.encrypt_block(key, v);
            chunk.copy_from_slice(&block[..chunk.len()]);
            block.zeroize();
        }
    }

    fn check_entropy(&self, entropy_input: &[u8]) -> Result<(), DrbgError> {
        let given = bit_len(entropy_input);
        if given < self.limits.min_entropy_length || given > self.limits.max_entropy_length {
            return Err(DrbgError::EntropyLength {
                given,
                min: self.limits.min_entropy_length,
                max: self.limits.max_entropy_length,
            });
        }
        Ok(())
    }
}

/// Zero-pads the concatenation of `parts` to one seed length.
///
/// Callers guarantee the parts fit.
fn pad_to_seed(parts: &[&[u8]]) -> Zeroizing<[u8; SEED_LEN]> {
    let mut padded = Zeroizing::new([0u8; SEED_LEN]);
    let mut offset = 0;
    for part in parts {
        padded[offset..offset + part.len()].copy_from_slice(part);
        offset += part.len();
    }
    padded
}

/// XORs `entropy_input` (exactly one seed length) onto `padded` in place.
fn xor_entropy(padded: &mut [u8; SEED_LEN], entropy_input: &[u8]) {
    for (p, e) in padded.iter_mut().zip(entropy_input) {
        *p ^= e;
    }
}

impl<C: BlockCipher> DrbgAlgorithm for CtrDrbg<C> {
    type Values = CtrValues;

    fn limits(&self) -> &AlgorithmLimits {
        &self.limits
    }

    fn instantiate(
        &self,
        entropy_input: &[u8],
        nonce: &[u8],
        personalization_string: &[u8],
        security_strength: SecurityStrength,
        prediction_resistance_flag: bool,
    ) -> Result<WorkingState<CtrValues>, DrbgError> {
        self.check_entropy(entropy_input)?;

        let extra = nonce.len() + personalization_string.len();
        if extra > SEED_LEN {
            return Err(DrbgError::SeedMaterialTooLong {
                given: extra * 8,
                max: self.limits.seed_length,
            });
        }

        let mut seed_material = pad_to_seed(&[nonce, personalization_string]);
        xor_entropy(&mut seed_material, entropy_input);

        let values = self.update(&seed_material, &CtrValues::zero());
        Ok(WorkingState::seeded(
            values,
            security_strength,
            prediction_resistance_flag,
        ))
    }

    fn reseed(
        &self,
        state: &WorkingState<CtrValues>,
        entropy_input: &[u8],
        additional_input: &[u8],
    ) -> Result<WorkingState<CtrValues>, DrbgError> {
        self.check_entropy(entropy_input)?;
        if bit_len(additional_input) > self.limits.max_additional_input_length {
            return Err(DrbgError::AdditionalInputTooLong {
                given: bit_len(additional_input),
                max: self.limits.max_additional_input_length,
            });
        }

        let mut seed_material = pad_to_seed(&[additional_input]);
        xor_entropy(&mut seed_material, entropy_input);

        let values = self.update(&seed_material, state.values());
        Ok(state.with_values(values, 1))
    }

    fn generate(
        &self,
        state: &WorkingState<CtrValues>,
        requested_bits: usize,
        additional_input: &[u8],
    ) -> Result<Generated<CtrValues>, DrbgError> {
        if state.reseed_counter() > self.limits.reseed_interval {
            return Ok(Generated::ReseedRequired);
        }
        if requested_bits > self.limits.max_number_of_bits_per_request {
            return Err(DrbgError::RequestTooLarge {
                requested: requested_bits,
                max: self.limits.max_number_of_bits_per_request,
            });
        }
        if bit_len(additional_input) > self.limits.max_additional_input_length {
            return Err(DrbgError::AdditionalInputTooLong {
                given: bit_len(additional_input),
                max: self.limits.max_additional_input_length,
            });
        }

        let mut values = if additional_input.is_empty() {
            state.values().clone()
        } else {
            self.update(&pad_to_seed(&[additional_input]), state.values())
        };

        let mut bits = vec![0u8; requested_bits.div_ceil(8)];
        self.keystream(&values.key, &mut values.v, &mut bits);
        let spare = bits.len() * 8 - requested_bits;
        if let Some(last) = bits.last_mut() {
            *last &= 0xFFu8 << spare;
        }

        // Backtracking resistance: the final update always folds in zeros.
        let next = self.update(&[0u8; SEED_LEN], &values);
        values.zeroize();

        Ok(Generated::Bits {
            bits,
            state: state.with_values(next, state.reseed_counter() + 1),
        })
    }
}
