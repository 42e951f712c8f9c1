//! `rand_core` interface over a DRBG mechanism.
//!
//! This module lets an instantiated mechanism stand in wherever the
//! ecosystem expects an `RngCore + CryptoRng`.

mod drbg_rng;

pub use drbg_rng::DrbgRng;
