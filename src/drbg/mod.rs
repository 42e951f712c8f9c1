//! Deterministic random bit generator core.
//!
//! [`DrbgMechanism`] is the public state machine; it validates requests,
//! owns the working state and talks to the entropy and nonce sources.
//! Algorithms such as [`CtrDrbg`] only transform working states.

mod algorithm;
pub mod ctr;
mod error;
mod mechanism;
mod state;

pub use algorithm::{AlgorithmLimits, DrbgAlgorithm, Generated};
pub use ctr::{CtrDrbg, CtrDrbgAes256NoDf, CtrValues};
pub use error::{status_of, DrbgError, Status};
pub use mechanism::{DrbgMechanism, MechanismStats, OsCtrDrbg};
pub use state::{Handle, SecurityStrength, WorkingState};
