//! Prometheus metrics for DRBG monitoring.
//!
//! This module exposes the mechanism's activity counters in the Prometheus
//! text exposition format.
//!
//! # Metrics Exposed
//!
//! ## Mechanism Metrics
//! - `ctr_drbg_instantiated` - Whether a working state is live (1=yes, 0=no)
//! - `ctr_drbg_instantiations_total` - Successful instantiations
//! - `ctr_drbg_uninstantiations_total` - Successful uninstantiations
//! - `ctr_drbg_generate_requests_total` - Successful generate calls
//! - `ctr_drbg_bits_generated_total` - Bits returned to callers
//!
//! ## Reseed Metrics
//! - `ctr_drbg_explicit_reseeds_total` - Reseeds requested by the caller
//! - `ctr_drbg_automatic_reseeds_total` - Reseeds performed inside generate
//!
//! ## Failure Metrics
//! - `ctr_drbg_entropy_failures_total` - Operations failed by the entropy source
//! - `ctr_drbg_catastrophic_failures_total` - Operations failed catastrophically
//!
//! ## Entropy Health Metrics
//! - `ctr_drbg_entropy_healthy` - Health test status (1=healthy, 0=failed)
//! - `ctr_drbg_entropy_samples_total` - Byte samples run through the health tests
//!
//! # Example
//!
//! ```no_run
//! use ctr_drbg::drbg::OsCtrDrbg;
//! use ctr_drbg::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let drbg = OsCtrDrbg::from_os_entropy();
//! let handle = drbg.instantiate(256, false, b"example").unwrap();
//! drbg.generate(handle, 256, 256, false, &[]).unwrap();
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.update(&MetricsSnapshot::from_stats(&drbg.stats().unwrap(), None));
//! println!("{}", registry.encode().unwrap());
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
