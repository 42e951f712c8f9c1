//! Entropy sources feeding instantiate and reseed.

use std::collections::VecDeque;

use rand_core::{OsRng, RngCore};
use thiserror::Error;
use zeroize::Zeroizing;

use crate::drbg::Status;

/// Errors reported by an entropy source.
///
/// The two variants carry different weight: `Unavailable` is transient and
/// may be retried by the caller, `Failed` means the source can no longer be
/// trusted and must surface as a catastrophic error.
#[derive(Debug, Clone, Error)]
pub enum EntropyError {
    /// Transient failure; the caller may retry.
    #[error("entropy currently unavailable: {0}")]
    Unavailable(String),
    /// Permanent failure; the source can no longer be trusted.
    #[error("entropy source failed: {0}")]
    Failed(String),
}

impl EntropyError {
    /// Maps the error onto the SP 800-90A status vocabulary.
    pub fn status(&self) -> Status {
        match self {
            EntropyError::Unavailable(_) => Status::ErrorFlag,
            EntropyError::Failed(_) => Status::CatastrophicErrorFlag,
        }
    }
}

/// Entropy input, zeroized when dropped.
pub type EntropyInput = Zeroizing<Vec<u8>>;

/// Trait for entropy source implementations.
pub trait EntropySource {
    /// Returns between `min_bits` and `max_bits` bits of entropy, as bytes.
    fn get_entropy(
        &mut self,
        min_bits: usize,
        max_bits: usize,
        prediction_resistance: bool,
    ) -> Result<EntropyInput, EntropyError>;
}

impl<S: EntropySource + ?Sized> EntropySource for Box<S> {
    fn get_entropy(
        &mut self,
        min_bits: usize,
        max_bits: usize,
        prediction_resistance: bool,
    ) -> Result<EntropyInput, EntropyError> {
        (**self).get_entropy(min_bits, max_bits, prediction_resistance)
    }
}

/// Entropy from the operating system's random source.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl OsEntropy {
    /// Creates the source.
    pub fn new() -> Self {
        Self
    }
}

impl EntropySource for OsEntropy {
    fn get_entropy(
        &mut self,
        min_bits: usize,
        _max_bits: usize,
        _prediction_resistance: bool,
    ) -> Result<EntropyInput, EntropyError> {
        let mut bytes = Zeroizing::new(vec![0u8; min_bits.div_ceil(8)]);
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| EntropyError::Unavailable(e.to_string()))?;
        Ok(bytes)
    }
}

/// Replays caller-supplied entropy inputs in order.
///
/// Intended for known-answer tests and reproducible runs; an exhausted
/// queue reports `Unavailable`.
#[derive(Default)]
pub struct FixedEntropy {
    inputs: VecDeque<Zeroizing<Vec<u8>>>,
}

impl FixedEntropy {
    /// Creates a source with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source that replays `inputs` in order.
    pub fn from_inputs<I, B>(inputs: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        Self {
            inputs: inputs.into_iter().map(|b| Zeroizing::new(b.into())).collect(),
        }
    }

    /// Queues another input.
    pub fn push(&mut self, input: impl Into<Vec<u8>>) {
        self.inputs.push_back(Zeroizing::new(input.into()));
    }

    /// Returns the number of queued inputs.
    pub fn remaining(&self) -> usize {
        self.inputs.len()
    }
}

impl std::fmt::Debug for FixedEntropy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedEntropy")
            .field("remaining", &self.inputs.len())
            .finish()
    }
}

impl EntropySource for FixedEntropy {
    fn get_entropy(
        &mut self,
        _min_bits: usize,
        _max_bits: usize,
        _prediction_resistance: bool,
    ) -> Result<EntropyInput, EntropyError> {
        self.inputs
            .pop_front()
            .ok_or_else(|| EntropyError::Unavailable("fixed entropy exhausted".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_entropy_returns_requested_length() {
        let mut source = OsEntropy::new();
        let input = source.get_entropy(384, 384, false).unwrap();

        assert_eq!(input.len(), 48);
        assert!(input.iter().any(|&b| b != 0));
    }

    #[test]
    fn test_fixed_entropy_replays_in_order() {
        let mut source = FixedEntropy::from_inputs([vec![1u8; 4], vec![2u8; 4]]);

        assert_eq!(source.get_entropy(32, 32, false).unwrap().as_slice(), &[1u8; 4]);
        assert_eq!(source.get_entropy(32, 32, false).unwrap().as_slice(), &[2u8; 4]);
        assert_eq!(source.remaining(), 0);
    }

    #[test]
    fn test_exhausted_fixed_entropy_is_transient() {
        let mut source = FixedEntropy::new();
        let err = source.get_entropy(384, 384, false).unwrap_err();

        assert!(matches!(err, EntropyError::Unavailable(_)));
        assert_eq!(err.status(), Status::ErrorFlag);
    }
}
