//! CTR_DRBG Library
//!
//! A NIST SP 800-90A deterministic random bit generator: CTR_DRBG over
//! AES-256 without a derivation function, driven by the Instantiate /
//! Reseed / Generate / Uninstantiate mechanism state machine.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! entropy source ─┐
//!                 ├→ mechanism (validation, reseed protocol) → algorithm (CTR_DRBG)
//! nonce source ───┘          ↓                                      ↓
//!                        statistics → metrics               block cipher (AES-256)
//! ```
//!
//! # Design Principles
//!
//! - **Fail-closed**: Catastrophic entropy failures always reach the caller and are never retried
//! - **Commit on success**: A working state is replaced only after its operation fully succeeds
//! - **Uses standard primitives**: AES-256 from the RustCrypto `aes` crate
//! - **Secret hygiene**: Keys, counters and entropy are zeroized when dropped
//!
//! # Example
//!
//! ```no_run
//! use ctr_drbg::{drbg::OsCtrDrbg, Status};
//!
//! let drbg = OsCtrDrbg::from_os_entropy();
//! let handle = drbg.instantiate(256, false, b"my-app").unwrap();
//!
//! let bits = drbg.generate(handle, 512, 256, false, &[]).unwrap();
//! assert_eq!(bits.len(), 64);
//!
//! if let Err(e) = drbg.reseed(handle, false, b"context") {
//!     assert_ne!(e.status(), Status::Success);
//! }
//!
//! drbg.uninstantiate(handle).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod cipher;
pub mod config;
pub mod drbg;
pub mod metrics;
pub mod rng;
pub mod source;

// Re-export commonly used types at crate root
pub use config::{ConfigError, FileConfig};
pub use drbg::{
    CtrDrbg, CtrDrbgAes256NoDf, DrbgAlgorithm, DrbgError, DrbgMechanism, Handle, MechanismStats,
    OsCtrDrbg, SecurityStrength, Status,
};
pub use rng::DrbgRng;
pub use source::{EntropySource, FixedEntropy, HealthTestedEntropy, NonceSource, OsEntropy};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
