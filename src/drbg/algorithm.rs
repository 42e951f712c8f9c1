//! Capability interface shared by DRBG algorithms.
//!
//! The mechanism drives any algorithm through this trait; CTR_DRBG is one
//! implementation, Hash_DRBG or HMAC_DRBG would be others.

use zeroize::Zeroize;

use super::{DrbgError, SecurityStrength, WorkingState};

/// Fixed parameters of an algorithm profile. All lengths are in bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlgorithmLimits {
    /// Highest strength an instantiation may request.
    pub highest_supported_security_strength: SecurityStrength,
    /// Whether prediction resistance may be requested.
    pub supports_prediction_resistance: bool,
    /// Seed length.
    pub seed_length: usize,
    /// Shortest accepted entropy input.
    pub min_entropy_length: usize,
    /// Longest accepted entropy input.
    pub max_entropy_length: usize,
    /// Longest accepted personalization string.
    pub max_personalization_string_length: usize,
    /// Longest accepted additional input.
    pub max_additional_input_length: usize,
    /// Most bits one generate call may return.
    pub max_number_of_bits_per_request: usize,
    /// Generate calls allowed between reseeds.
    pub reseed_interval: u64,
}

/// Outcome of a successful call to [`DrbgAlgorithm::generate`].
pub enum Generated<V: Zeroize> {
    /// Output bits together with the state to commit.
    Bits {
        /// Output, leftmost bits first.
        bits: Vec<u8>,
        /// State to commit.
        state: WorkingState<V>,
    },
    /// The reseed interval is exhausted; the input state is unchanged.
    ReseedRequired,
}

impl<V: Zeroize> std::fmt::Debug for Generated<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generated::Bits { bits, state } => f
                .debug_struct("Bits")
                .field("len", &bits.len())
                .field("state", state)
                .finish(),
            Generated::ReseedRequired => f.write_str("ReseedRequired"),
        }
    }
}

/// A DRBG algorithm: pure transformations over a [`WorkingState`].
///
/// Implementations never mutate the state they are given; they return a new
/// one which the mechanism commits only after the whole operation succeeds.
pub trait DrbgAlgorithm {
    /// Algorithm-specific secret values (e.g. key and counter).
    type Values: Zeroize;

    /// Returns the algorithm's fixed parameters.
    fn limits(&self) -> &AlgorithmLimits;

    /// Builds the initial working state from seeding inputs.
    fn instantiate(
        &self,
        entropy_input: &[u8],
        nonce: &[u8],
        personalization_string: &[u8],
        security_strength: SecurityStrength,
        prediction_resistance_flag: bool,
    ) -> Result<WorkingState<Self::Values>, DrbgError>;

    /// Mixes fresh entropy into a state, resetting its reseed counter.
    fn reseed(
        &self,
        state: &WorkingState<Self::Values>,
        entropy_input: &[u8],
        additional_input: &[u8],
    ) -> Result<WorkingState<Self::Values>, DrbgError>;

    /// Produces `requested_bits` of output and the advanced state.
    fn generate(
        &self,
        state: &WorkingState<Self::Values>,
        requested_bits: usize,
        additional_input: &[u8],
    ) -> Result<Generated<Self::Values>, DrbgError>;
}

/// Length of a byte string in bits.
#[inline]
pub(crate) fn bit_len(bytes: &[u8]) -> usize {
    bytes.len() * 8
}
