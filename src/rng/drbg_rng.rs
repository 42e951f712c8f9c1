//! DRBG-backed random number generator.
//!
//! # Request Model
//!
//! Every fill request is split into generate calls of at most the
//! algorithm's maximum request size. Reseeding happens in two ways:
//! - Automatically inside the mechanism when the reseed interval runs out
//!   or prediction resistance is enabled
//! - Explicitly through [`DrbgRng::reseed`]

use rand_core::{CryptoRng, RngCore};

use crate::drbg::{CtrDrbgAes256NoDf, DrbgAlgorithm, DrbgError, DrbgMechanism, Handle, OsCtrDrbg};
use crate::source::{EntropySource, HealthTestedEntropy, NonceSource, OsEntropy, TimestampNonce};

/// A `RngCore` backed by one instantiation of a DRBG mechanism.
///
/// The generator owns the mechanism and the handle of its live state. The
/// state is uninstantiated when the generator is dropped.
pub struct DrbgRng<A: DrbgAlgorithm, E: EntropySource, N: NonceSource> {
    /// The mechanism holding the working state.
    mechanism: DrbgMechanism<A, E, N>,
    /// Handle returned by instantiate.
    handle: Handle,
    /// Strength requested on every generate call.
    security_strength: u32,
    /// Request prediction resistance on every generate call.
    prediction_resistance: bool,
    /// Total explicit reseeds performed.
    reseed_count: u64,
    /// Bytes generated since the last explicit reseed.
    bytes_since_reseed: u64,
}

impl DrbgRng<CtrDrbgAes256NoDf, HealthTestedEntropy<OsEntropy>, TimestampNonce> {
    /// Creates a generator over CTR_DRBG seeded from health-tested OS entropy.
    pub fn from_os_entropy(
        security_strength: u32,
        prediction_resistance: bool,
        personalization_string: &[u8],
    ) -> Result<Self, DrbgError> {
        Self::new(
            OsCtrDrbg::from_os_entropy(),
            security_strength,
            prediction_resistance,
            personalization_string,
        )
    }
}

impl<A, E, N> DrbgRng<A, E, N>
where
    A: DrbgAlgorithm,
    E: EntropySource,
    N: NonceSource,
{
    /// Instantiates `mechanism` and wraps the resulting state.
    pub fn new(
        mechanism: DrbgMechanism<A, E, N>,
        security_strength: u32,
        prediction_resistance: bool,
        personalization_string: &[u8],
    ) -> Result<Self, DrbgError> {
        let handle =
            mechanism.instantiate(security_strength, prediction_resistance, personalization_string)?;

        Ok(Self {
            mechanism,
            handle,
            security_strength,
            prediction_resistance,
            reseed_count: 0,
            bytes_since_reseed: 0,
        })
    }

    /// Fills `dest`, mixing `additional_input` into every generate call.
    pub fn fill_with_input(&mut self, dest: &mut [u8], additional_input: &[u8]) -> Result<(), DrbgError> {
        let max_bytes = self.mechanism.limits().max_number_of_bits_per_request / 8;

        for chunk in dest.chunks_mut(max_bytes.max(1)) {
            let bits = self.mechanism.generate(
                self.handle,
                chunk.len() * 8,
                self.security_strength,
                self.prediction_resistance,
                additional_input,
            )?;
            chunk.copy_from_slice(&bits);
            self.bytes_since_reseed += chunk.len() as u64;
        }
        Ok(())
    }

    /// Reseeds the underlying state with fresh entropy.
    pub fn reseed(&mut self, additional_input: &[u8]) -> Result<(), DrbgError> {
        self.mechanism
            .reseed(self.handle, self.prediction_resistance, additional_input)?;
        self.reseed_count += 1;
        self.bytes_since_reseed = 0;

        tracing::info!(
            handle = %self.handle,
            reseed_count = self.reseed_count,
            "DRBG generator reseeded"
        );
        Ok(())
    }

    /// Returns the number of explicit reseeds performed.
    pub fn reseed_count(&self) -> u64 {
        self.reseed_count
    }

    /// Returns bytes generated since the last explicit reseed.
    pub fn bytes_since_reseed(&self) -> u64 {
        self.bytes_since_reseed
    }

    /// Returns the handle of the wrapped state.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Returns the underlying mechanism.
    pub fn mechanism(&self) -> &DrbgMechanism<A, E, N> {
        &self.mechanism
    }
}

impl<A, E, N> RngCore for DrbgRng<A, E, N>
where
    A: DrbgAlgorithm,
    E: EntropySource,
    N: NonceSource,
{
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(e) = self.try_fill_bytes(dest) {
            panic!("DRBG generate failed: {}", e);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_with_input(dest, &[]).map_err(rand_core::Error::new)
    }
}

impl<A, E, N> CryptoRng for DrbgRng<A, E, N>
where
    A: DrbgAlgorithm,
    E: EntropySource,
    N: NonceSource,
{
}

impl<A: DrbgAlgorithm, E: EntropySource, N: NonceSource> Drop for DrbgRng<A, E, N> {
    fn drop(&mut self) {
        if let Err(e) = self.mechanism.uninstantiate(self.handle) {
            tracing::debug!(error = %e, "DRBG generator already uninstantiated");
        }
    }
}

impl<A: DrbgAlgorithm, E: EntropySource, N: NonceSource> std::fmt::Debug for DrbgRng<A, E, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrbgRng")
            .field("handle", &self.handle)
            .field("reseed_count", &self.reseed_count)
            .field("bytes_since_reseed", &self.bytes_since_reseed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drbg::ctr::SEED_LEN;
    use crate::drbg::CtrDrbg;
    use crate::source::{FixedEntropy, NoNonce};

    type FixedRng = DrbgRng<CtrDrbgAes256NoDf, FixedEntropy, NoNonce>;

    fn fixed_rng(inputs: Vec<Vec<u8>>) -> FixedRng {
        let mechanism = DrbgMechanism::new(CtrDrbg::new(), FixedEntropy::from_inputs(inputs), NoNonce);
        DrbgRng::new(mechanism, 256, false, &[]).unwrap()
    }

    #[test]
    fn test_from_os_entropy_generates() {
        let mut rng = DrbgRng::from_os_entropy(256, false, b"rng-test").unwrap();

        let mut buf = [0u8; 64];
        rng.fill_bytes(&mut buf);

        assert!(buf.iter().any(|&b| b != 0));
        assert_eq!(rng.bytes_since_reseed(), 64);
    }

    #[test]
    fn test_large_request_is_chunked() {
        let mut rng = fixed_rng(vec![vec![0x21; SEED_LEN]]);

        let mut buf = vec![0u8; 10_000];
        rng.try_fill_bytes(&mut buf).unwrap();

        // 4032 + 4032 + 1936 bytes.
        let stats = rng.mechanism().stats().unwrap();
        assert_eq!(stats.generate_requests, 3);
        assert_eq!(stats.bits_generated, 80_000);
        assert_eq!(rng.bytes_since_reseed(), 10_000);
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = fixed_rng(vec![vec![0x42; SEED_LEN]]);
        let mut b = fixed_rng(vec![vec![0x42; SEED_LEN]]);

        assert_eq!(a.next_u64(), b.next_u64());
        assert_eq!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn test_reseed_changes_output() {
        let mut a = fixed_rng(vec![vec![0x01; SEED_LEN], vec![0xAB; SEED_LEN]]);
        let mut b = fixed_rng(vec![vec![0x01; SEED_LEN]]);

        a.reseed(b"").unwrap();

        let mut out_a = [0u8; 32];
        let mut out_b = [0u8; 32];
        a.fill_bytes(&mut out_a);
        b.fill_bytes(&mut out_b);

        assert_ne!(out_a, out_b);
        assert_eq!(a.reseed_count(), 1);
        assert_eq!(a.bytes_since_reseed(), 32);
    }

    #[test]
    fn test_failed_reseed_surfaces_as_error() {
        let mut rng = fixed_rng(vec![vec![0x01; SEED_LEN]]);

        let err = rng.reseed(&[]).unwrap_err();

        assert!(matches!(err, DrbgError::Entropy(_)));
        assert_eq!(rng.reseed_count(), 0);
    }

    #[test]
    fn test_prediction_resistance_failure_maps_to_rand_error() {
        let mechanism = DrbgMechanism::new(
            CtrDrbg::new(),
            FixedEntropy::from_inputs([vec![0x07; SEED_LEN]]),
            NoNonce,
        );
        let mut rng = DrbgRng::new(mechanism, 256, true, &[]).unwrap();

        let mut buf = [0u8; 16];
        assert!(rng.try_fill_bytes(&mut buf).is_err());
    }

    #[test]
    fn test_additional_input_changes_output() {
        let mut plain = fixed_rng(vec![vec![0x42; SEED_LEN]]);
        let mut salted = fixed_rng(vec![vec![0x42; SEED_LEN]]);

        let mut out_plain = [0u8; 32];
        let mut out_salted = [0u8; 32];
        plain.fill_with_input(&mut out_plain, &[]).unwrap();
        salted.fill_with_input(&mut out_salted, b"request-1").unwrap();

        assert_ne!(out_plain, out_salted);
    }
}
