//! Continuous health testing of entropy input.
//!
//! Wraps an [`EntropySource`] with the two SP 800-90B §4.4 continuous tests
//! run over byte samples. Behaviour is fail-closed: the first violation
//! latches the wrapper into a failed state and every later request reports
//! a permanent source failure.

use serde::{Deserialize, Serialize};

use super::entropy::{EntropyError, EntropyInput, EntropySource};

/// Smallest cutoff or window the health tests accept.
pub const MIN_HEALTH_CUTOFF: u32 = 2;

/// Cutoffs for the continuous health tests.
///
/// Defaults assume full-entropy bytes (H = 8 bits/sample) and a false
/// positive rate near 2^-40.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthThresholds {
    /// Repetition Count Test cutoff: consecutive identical samples that fail.
    pub rct_cutoff: u32,
    /// Adaptive Proportion Test window size in samples.
    pub apt_window: u32,
    /// Adaptive Proportion Test cutoff within one window.
    pub apt_cutoff: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            rct_cutoff: 6,
            apt_window: 512,
            apt_cutoff: 20,
        }
    }
}

/// Health test violation types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HealthViolation {
    /// The same sample repeated too many times in a row.
    #[error("repetition count test: sample {sample:#04x} repeated {run} times")]
    RepetitionCount {
        /// The repeated sample.
        sample: u8,
        /// Length of the run.
        run: u32,
    },

    /// One sample value dominated a window.
    #[error("adaptive proportion test: sample {sample:#04x} seen {count} times in window of {window}")]
    AdaptiveProportion {
        /// The over-represented sample.
        sample: u8,
        /// Occurrences within the window.
        count: u32,
        /// Window size.
        window: u32,
    },

    /// The source returned input of the wrong length.
    #[error("source returned {given} bits, expected between {min} and {max}")]
    Length {
        /// Returned length in bits.
        given: usize,
        /// Minimum length in bits.
        min: usize,
        /// Maximum length in bits.
        max: usize,
    },
}

/// Current health status of the wrapped source.
#[derive(Debug, Clone, Default)]
pub struct HealthMetrics {
    /// Whether the source is still trusted.
    pub is_healthy: bool,
    /// The violation that latched the failure, if any.
    pub violation: Option<HealthViolation>,
    /// Total byte samples tested.
    pub total_samples: u64,
    /// Total entropy requests served.
    pub total_requests: u64,
}

#[derive(Debug)]
struct RepetitionCountTest {
    cutoff: u32,
    last: Option<u8>,
    run: u32,
}

impl RepetitionCountTest {
    fn new(cutoff: u32) -> Self {
        Self {
            cutoff,
            last: None,
            run: 0,
        }
    }

    fn test(&mut self, sample: u8) -> Result<(), HealthViolation> {
        if self.last == Some(sample) {
            self.run += 1;
            if self.run >= self.cutoff {
                return Err(HealthViolation::RepetitionCount {
                    sample,
                    run: self.run,
                });
            }
        } else {
            self.last = Some(sample);
            self.run = 1;
        }
        Ok(())
    }
}

#[derive(Debug)]
struct AdaptiveProportionTest {
    window: u32,
    cutoff: u32,
    base: Option<u8>,
    count: u32,
    index: u32,
}

impl AdaptiveProportionTest {
    fn new(window: u32, cutoff: u32) -> Self {
        Self {
            window,
            cutoff,
            base: None,
            count: 0,
            index: 0,
        }
    }

    fn test(&mut self, sample: u8) -> Result<(), HealthViolation> {
        let Some(base) = self.base else {
            self.base = Some(sample);
            self.count = 1;
            self.index = 1;
            return Ok(());
        };

        if sample == base {
            self.count += 1;
            if self.count >= self.cutoff {
                return Err(HealthViolation::AdaptiveProportion {
                    sample,
                    count: self.count,
                    window: self.window,
                });
            }
        }

        self.index += 1;
        if self.index >= self.window {
            self.base = None;
        }
        Ok(())
    }
}

/// Entropy source guarded by continuous health tests.
pub struct HealthTestedEntropy<S> {
    inner: S,
    rct: RepetitionCountTest,
    apt: AdaptiveProportionTest,
    metrics: HealthMetrics,
}

impl<S: EntropySource> HealthTestedEntropy<S> {
    /// Wraps `inner` with the default thresholds.
    pub fn new(inner: S) -> Self {
        Self::with_thresholds(inner, HealthThresholds::default())
    }

    /// Wraps `inner` with custom thresholds.
    ///
    /// Values below [`MIN_HEALTH_CUTOFF`] are raised to it.
    pub fn with_thresholds(inner: S, thresholds: HealthThresholds) -> Self {
        let clamped = HealthThresholds {
            rct_cutoff: thresholds.rct_cutoff.max(MIN_HEALTH_CUTOFF),
            apt_window: thresholds.apt_window.max(MIN_HEALTH_CUTOFF),
            apt_cutoff: thresholds.apt_cutoff.max(MIN_HEALTH_CUTOFF),
        };
        if clamped != thresholds {
            tracing::warn!(
                requested = ?thresholds,
                applied = ?clamped,
                "Health test thresholds raised to the minimum"
            );
        }

        Self {
            inner,
            rct: RepetitionCountTest::new(clamped.rct_cutoff),
            apt: AdaptiveProportionTest::new(clamped.apt_window, clamped.apt_cutoff),
            metrics: HealthMetrics {
                is_healthy: true,
                ..Default::default()
            },
        }
    }

    /// Returns current health metrics.
    pub fn metrics(&self) -> &HealthMetrics {
        &self.metrics
    }

    /// Returns the wrapped source.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&mut self, input: &[u8], min_bits: usize, max_bits: usize) -> Result<(), HealthViolation> {
        let given = input.len() * 8;
        if given < min_bits || given > max_bits {
            return Err(HealthViolation::Length {
                given,
                min: min_bits,
                max: max_bits,
            });
        }

        for &sample in input {
            self.metrics.total_samples += 1;
            self.rct.test(sample)?;
            self.apt.test(sample)?;
        }
        Ok(())
    }
}

impl<S: EntropySource> EntropySource for HealthTestedEntropy<S> {
    fn get_entropy(
        &mut self,
        min_bits: usize,
        max_bits: usize,
        prediction_resistance: bool,
    ) -> Result<EntropyInput, EntropyError> {
        if let Some(violation) = &self.metrics.violation {
            return Err(EntropyError::Failed(violation.to_string()));
        }

        let input = self
            .inner
            .get_entropy(min_bits, max_bits, prediction_resistance)?;
        self.metrics.total_requests += 1;

        match self.check(&input, min_bits, max_bits) {
            Ok(()) => {
                tracing::trace!(
                    bytes = input.len(),
                    total_samples = self.metrics.total_samples,
                    "Entropy health check passed"
                );
                Ok(input)
            }
            Err(violation) => {
                // Fail-closed: never recovers without a new wrapper.
                tracing::error!(violation = %violation, "Entropy source failed health test");
                self.metrics.is_healthy = false;
                self.metrics.violation = Some(violation.clone());
                Err(EntropyError::Failed(violation.to_string()))
            }
        }
    }
}

impl<S> std::fmt::Debug for HealthTestedEntropy<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthTestedEntropy")
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FixedEntropy, OsEntropy};

    fn varied(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(17).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_starts_healthy_and_passes_varied_input() {
        let mut source = HealthTestedEntropy::new(FixedEntropy::from_inputs([varied(48, 3)]));
        assert!(source.metrics().is_healthy);

        let input = source.get_entropy(384, 384, false).unwrap();

        assert_eq!(input.len(), 48);
        assert_eq!(source.metrics().total_samples, 48);
    }

    #[test]
    fn test_os_entropy_passes() {
        let mut source = HealthTestedEntropy::new(OsEntropy::new());
        for _ in 0..100 {
            source.get_entropy(384, 384, false).unwrap();
        }
        assert!(source.metrics().is_healthy);
    }

    #[test]
    fn test_stuck_source_fails_repetition_count() {
        let mut source = HealthTestedEntropy::new(FixedEntropy::from_inputs([vec![0xAAu8; 48]]));

        let err = source.get_entropy(384, 384, false).unwrap_err();

        assert!(matches!(err, EntropyError::Failed(_)));
        assert!(matches!(
            source.metrics().violation,
            Some(HealthViolation::RepetitionCount { sample: 0xAA, run: 6 })
        ));
    }

    #[test]
    fn test_biased_source_fails_adaptive_proportion() {
        // Alternating pattern defeats the RCT but keeps the base value frequent.
        let biased: Vec<u8> = (0..48).map(|i| if i % 2 == 0 { 0x00 } else { i as u8 }).collect();
        let mut source = HealthTestedEntropy::new(FixedEntropy::from_inputs([biased]));

        let err = source.get_entropy(384, 384, false).unwrap_err();

        assert!(matches!(err, EntropyError::Failed(_)));
        assert!(matches!(
            source.metrics().violation,
            Some(HealthViolation::AdaptiveProportion { sample: 0x00, .. })
        ));
    }

    #[test]
    fn test_failure_is_latched() {
        let mut source = HealthTestedEntropy::new(FixedEntropy::from_inputs([
            vec![0u8; 48],
            varied(48, 1),
        ]));

        assert!(source.get_entropy(384, 384, false).is_err());
        let err = source.get_entropy(384, 384, false).unwrap_err();

        assert!(matches!(err, EntropyError::Failed(_)));
        assert!(!source.metrics().is_healthy);
        // The second input was never pulled from the inner source.
        assert_eq!(source.inner().remaining(), 1);
    }

    #[test]
    fn test_wrong_length_is_catastrophic() {
        let mut source = HealthTestedEntropy::new(FixedEntropy::from_inputs([varied(32, 5)]));

        let err = source.get_entropy(384, 384, false).unwrap_err();

        assert!(matches!(err, EntropyError::Failed(_)));
        assert!(matches!(
            source.metrics().violation,
            Some(HealthViolation::Length { given: 256, .. })
        ));
    }

    #[test]
    fn test_thresholds_below_minimum_are_raised() {
        let thresholds = HealthThresholds {
            rct_cutoff: 1,
            apt_window: 512,
            apt_cutoff: 20,
        };
        let mut source = HealthTestedEntropy::with_thresholds(
            FixedEntropy::from_inputs([varied(48, 9)]),
            thresholds,
        );

        // A cutoff of 1 would fail on the very first sample.
        assert!(source.get_entropy(384, 384, false).is_ok());
        assert_eq!(source.rct.cutoff, MIN_HEALTH_CUTOFF);
    }

    #[test]
    fn test_inner_transient_error_passes_through() {
        let mut source = HealthTestedEntropy::new(FixedEntropy::new());

        let err = source.get_entropy(384, 384, false).unwrap_err();

        assert!(matches!(err, EntropyError::Unavailable(_)));
        assert!(source.metrics().is_healthy);
    }
}
