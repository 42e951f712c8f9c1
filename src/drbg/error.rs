//! Status vocabulary and error types shared by the mechanism and algorithms.

use thiserror::Error;

use crate::source::EntropyError;

/// Status reported at every DRBG boundary.
///
/// Public operations return `Result`; [`DrbgError::status`] maps a failure
/// back onto this vocabulary for callers that need the SP 800-90A flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The operation completed.
    Success,
    /// Caller or input error, or transient entropy unavailability.
    ErrorFlag,
    /// The entropy source failed permanently. Must reach the caller.
    CatastrophicErrorFlag,
    /// Internal signal from an algorithm that its reseed interval is exhausted.
    ReseedRequired,
}

/// Errors returned by DRBG operations.
#[derive(Debug, Error)]
pub enum DrbgError {
    /// The handle does not name the live state.
    #[error("invalid or uninstantiated state handle")]
    InvalidHandle,

    /// Instantiate was called while a state is live.
    #[error("mechanism already holds a live instantiation")]
    AlreadyInstantiated,

    #[error("requested security strength {requested} exceeds the highest supported strength {highest}")]
    /// Requested strength above what the algorithm supports.
    StrengthUnsupported {
        /// Requested strength in bits.
        requested: u32,
        /// Highest supported strength in bits.
        highest: u32,
    },

    #[error("requested security strength {requested} exceeds the instantiated strength {instantiated}")]
    /// Generate asked for more strength than the state was instantiated with.
    StrengthExceedsInstance {
        /// Requested strength in bits.
        requested: u32,
        /// Strength of the live state in bits.
        instantiated: u32,
    },

    /// Prediction resistance requested from an algorithm without support.
    #[error("prediction resistance is not supported by this algorithm")]
    PredictionResistanceUnsupported,

    #[error("personalization string of {given} bits exceeds the maximum of {max} bits")]
    /// Personalization string longer than the algorithm allows.
    PersonalizationTooLong {
        /// Given length in bits.
        given: usize,
        /// Maximum length in bits.
        max: usize,
    },

    #[error("additional input of {given} bits exceeds the maximum of {max} bits")]
    /// Additional input longer than the algorithm allows.
    AdditionalInputTooLong {
        /// Given length in bits.
        given: usize,
        /// Maximum length in bits.
        max: usize,
    },

    #[error("request for {requested} bits exceeds the maximum of {max} bits per request")]
    /// More bits requested than one generate call may return.
    RequestTooLarge {
        /// Requested bits.
        requested: usize,
        /// Maximum bits per request.
        max: usize,
    },

    #[error("entropy input of {given} bits, expected between {min} and {max} bits")]
    /// Entropy input outside the accepted length range.
    EntropyLength {
        /// Given length in bits.
        given: usize,
        /// Minimum length in bits.
        min: usize,
        /// Maximum length in bits.
        max: usize,
    },

    #[error("nonce and personalization string ({given} bits) exceed the seed length of {max} bits")]
    /// Nonce and personalization string do not fit in one seed length.
    SeedMaterialTooLong {
        /// Combined length in bits.
        given: usize,
        /// Seed length in bits.
        max: usize,
    },

    /// The entropy source failed.
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// A thread panicked while holding the state lock.
    #[error("internal state lock poisoned")]
    Poisoned,

    /// The algorithm still required a reseed right after one.
    #[error("algorithm still requires a reseed immediately after reseeding")]
    ReseedIneffective,
}

impl DrbgError {
    /// Maps the error onto the SP 800-90A status vocabulary.
    pub fn status(&self) -> Status {
        match self {
            DrbgError::Entropy(e) => e.status(),
            DrbgError::Poisoned | DrbgError::ReseedIneffective => Status::CatastrophicErrorFlag,
            _ => Status::ErrorFlag,
        }
    }

    /// Returns true if the failure must never be retried automatically.
    pub fn is_catastrophic(&self) -> bool {
        self.status() == Status::CatastrophicErrorFlag
    }
}

/// Maps an operation result onto the status vocabulary.
pub fn status_of<T>(result: &Result<T, DrbgError>) -> Status {
    match result {
        Ok(_) => Status::Success,
        Err(e) => e.status(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_map_to_error_flag() {
        assert_eq!(DrbgError::InvalidHandle.status(), Status::ErrorFlag);
        assert_eq!(
            DrbgError::RequestTooLarge {
                requested: 40_000,
                max: 32_256
            }
            .status(),
            Status::ErrorFlag
        );
    }

    #[test]
    fn test_entropy_errors_keep_their_severity() {
        let transient = DrbgError::from(EntropyError::Unavailable("busy".into()));
        let permanent = DrbgError::from(EntropyError::Failed("stuck".into()));

        assert_eq!(transient.status(), Status::ErrorFlag);
        assert_eq!(permanent.status(), Status::CatastrophicErrorFlag);
        assert!(permanent.is_catastrophic());
    }

    #[test]
    fn test_status_of_result() {
        let ok: Result<(), DrbgError> = Ok(());
        let err: Result<(), DrbgError> = Err(DrbgError::Poisoned);

        assert_eq!(status_of(&ok), Status::Success);
        assert_eq!(status_of(&err), Status::CatastrophicErrorFlag);
    }
}
