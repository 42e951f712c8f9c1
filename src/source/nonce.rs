//! Nonce sources for instantiation.
//!
//! A nonce must be unique within the cryptographic boundary; the DRBG does
//! not inspect or validate it.

use chrono::Utc;

/// Trait for nonce source implementations.
pub trait NonceSource {
    /// Returns the next nonce.
    fn get_nonce(&mut self) -> Vec<u8>;
}

impl<S: NonceSource + ?Sized> NonceSource for Box<S> {
    fn get_nonce(&mut self) -> Vec<u8> {
        (**self).get_nonce()
    }
}

/// Supplies an empty nonce.
///
/// CTR_DRBG without a derivation function does not need a nonce; published
/// test vectors are generated with an empty one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNonce;

impl NonceSource for NoNonce {
    fn get_nonce(&mut self) -> Vec<u8> {
        Vec::new()
    }
}

/// Timestamp plus sequence number nonce (SP 800-90A §8.6.7).
///
/// Layout: 8-byte big-endian UTC nanoseconds ‖ 8-byte big-endian sequence.
/// The sequence number increases on every call so two nonces taken within
/// the same clock tick still differ.
#[derive(Debug, Default)]
pub struct TimestampNonce {
    sequence: u64,
}

/// Length of a [`TimestampNonce`] value in bytes.
pub const TIMESTAMP_NONCE_LEN: usize = 16;

impl TimestampNonce {
    /// Creates a source whose sequence starts at 1.
    pub fn new() -> Self {
        Self::default()
    }
}

impl NonceSource for TimestampNonce {
    fn get_nonce(&mut self) -> Vec<u8> {
        let now = Utc::now();
        // Out-of-range timestamps (past year 2262) fall back to microseconds.
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros());
        self.sequence = self.sequence.wrapping_add(1);

        let mut nonce = Vec::with_capacity(TIMESTAMP_NONCE_LEN);
        nonce.extend_from_slice(&nanos.to_be_bytes());
        nonce.extend_from_slice(&self.sequence.to_be_bytes());
        nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_nonce_is_empty() {
        assert!(NoNonce.get_nonce().is_empty());
    }

    #[test]
    fn test_timestamp_nonce_is_unique() {
        let mut source = TimestampNonce::new();
        let first = source.get_nonce();
        let second = source.get_nonce();

        assert_eq!(first.len(), TIMESTAMP_NONCE_LEN);
        assert_ne!(first, second);
        assert_eq!(&second[8..], &2u64.to_be_bytes());
    }
}
