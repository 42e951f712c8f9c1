//! Entropy and nonce sources.
//!
//! These are the external collaborators of the DRBG mechanism. The traits
//! define the contract; the provided implementations cover the operating
//! system source, replayed inputs for known-answer testing, continuous
//! health testing, and the nonce constructions of SP 800-90A §8.6.7.

mod entropy;
mod health;
mod nonce;

pub use entropy::{EntropyError, EntropyInput, EntropySource, FixedEntropy, OsEntropy};
pub use health::{
    HealthMetrics, HealthTestedEntropy, HealthThresholds, HealthViolation, MIN_HEALTH_CUTOFF,
};
pub use nonce::{NoNonce, NonceSource, TimestampNonce, TIMESTAMP_NONCE_LEN};
