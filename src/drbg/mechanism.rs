//! DRBG mechanism: the public Instantiate / Reseed / Generate / Uninstantiate
//! state machine of SP 800-90A Section 9.
//!
//! A mechanism owns exactly one working state slot. Applications needing
//! several independent generators create several mechanisms. All four
//! operations run as critical sections over that slot, so every generate
//! call observes the latest committed state and advances it exactly once.
//!
//! ```text
//! Uninstantiated --instantiate--> Active --uninstantiate--> Uninstantiated
//!                                   |  ^
//!                      reseed_required (transient flag, cleared by reseed)
//! ```

use std::sync::{Mutex, MutexGuard};

use zeroize::Zeroize;

use super::algorithm::{bit_len, AlgorithmLimits, DrbgAlgorithm, Generated};
use super::ctr::CtrDrbgAes256NoDf;
use super::{DrbgError, Handle, SecurityStrength, WorkingState};
use crate::source::{EntropySource, HealthTestedEntropy, NonceSource, OsEntropy, TimestampNonce};

/// Counters describing the mechanism's activity since construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MechanismStats {
    /// Whether a working state is currently live.
    pub instantiated: bool,
    /// Successful instantiations.
    pub instantiations: u64,
    /// Successful uninstantiations.
    pub uninstantiations: u64,
    /// Successful generate calls.
    pub generate_requests: u64,
    /// Total bits returned to callers.
    pub bits_generated: u64,
    /// Reseeds requested by the caller.
    pub explicit_reseeds: u64,
    /// Reseeds performed inside generate (interval or prediction resistance).
    pub automatic_reseeds: u64,
    /// Operations that failed because of the entropy source.
    pub entropy_failures: u64,
    /// Operations that failed with a catastrophic status.
    pub catastrophic_failures: u64,
}

struct Instance<V: Zeroize> {
    handle: Handle,
    state: WorkingState<V>,
}

struct Inner<V: Zeroize, E, N> {
    entropy: E,
    nonce: N,
    instance: Option<Instance<V>>,
    generation: u64,
    stats: MechanismStats,
}

impl<V: Zeroize, E, N> Inner<V, E, N> {
    fn instance_mut(&mut self, handle: Handle) -> Result<&mut Instance<V>, DrbgError> {
        match self.instance.as_mut() {
            Some(instance) if instance.handle == handle => Ok(instance),
            _ => Err(DrbgError::InvalidHandle),
        }
    }

    fn check_handle(&self, handle: Handle) -> Result<(), DrbgError> {
        match &self.instance {
            Some(instance) if instance.handle == handle => Ok(()),
            _ => Err(DrbgError::InvalidHandle),
        }
    }

    fn record_failure(&mut self, operation: &'static str, err: &DrbgError) {
        if matches!(err, DrbgError::Entropy(_)) {
            self.stats.entropy_failures += 1;
        }
        if err.is_catastrophic() {
            self.stats.catastrophic_failures += 1;
            tracing::error!(operation, error = %err, "DRBG operation failed catastrophically");
        } else {
            tracing::warn!(operation, error = %err, "DRBG operation rejected");
        }
    }
}

/// The DRBG mechanism over algorithm `A`, entropy source `E` and nonce source `N`.
pub struct DrbgMechanism<A: DrbgAlgorithm, E, N> {
    algorithm: A,
    inner: Mutex<Inner<A::Values, E, N>>,
}

/// CTR_DRBG (AES-256, no df) seeded from health-tested OS entropy.
pub type OsCtrDrbg = DrbgMechanism<CtrDrbgAes256NoDf, HealthTestedEntropy<OsEntropy>, TimestampNonce>;

impl OsCtrDrbg {
    /// Creates an uninstantiated mechanism backed by the operating system.
    pub fn from_os_entropy() -> Self {
        Self::new(
            CtrDrbgAes256NoDf::new(),
            HealthTestedEntropy::new(OsEntropy::new()),
            TimestampNonce::new(),
        )
    }
}

impl<A, E, N> DrbgMechanism<A, E, N>
where
    A: DrbgAlgorithm,
    E: EntropySource,
    N: NonceSource,
{
    /// Creates an uninstantiated mechanism.
    pub fn new(algorithm: A, entropy: E, nonce: N) -> Self {
        Self {
            algorithm,
            inner: Mutex::new(Inner {
                entropy,
                nonce,
                instance: None,
                generation: 0,
                stats: MechanismStats::default(),
            }),
        }
    }

    /// Returns the algorithm's fixed parameters.
    pub fn limits(&self) -> &AlgorithmLimits {
        self.algorithm.limits()
    }

    /// Returns a snapshot of the activity counters.
    pub fn stats(&self) -> Result<MechanismStats, DrbgError> {
        Ok(self.lock()?.stats.clone())
    }

    /// Runs `f` against the entropy source, e.g. to read its health metrics.
    pub fn inspect_entropy<R>(&self, f: impl FnOnce(&E) -> R) -> Result<R, DrbgError> {
        Ok(f(&self.lock()?.entropy))
    }

    /// Returns true while a working state is live.
    pub fn is_instantiated(&self) -> Result<bool, DrbgError> {
        Ok(self.lock()?.instance.is_some())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<A::Values, E, N>>, DrbgError> {
        self.inner.lock().map_err(|_| {
            tracing::error!("DRBG state lock poisoned");
            DrbgError::Poisoned
        })
    }

    /// Instantiates the mechanism and returns the handle of the new state.
    ///
    /// Parameter checks run before any entropy is consumed. The requested
    /// strength is rounded up to the nearest of {112, 128, 192, 256} and the
    /// entropy request is sized to the algorithm's seed length.
    pub fn instantiate(
        &self,
        requested_strength: u32,
        prediction_resistance_flag: bool,
        personalization_string: &[u8],
    ) -> Result<Handle, DrbgError> {
        let mut inner = self.lock()?;
        let result = self.instantiate_locked(
            &mut inner,
            requested_strength,
            prediction_resistance_flag,
            personalization_string,
        );
        if let Err(e) = &result {
            inner.record_failure("instantiate", e);
        }
        result
    }

    fn instantiate_locked(
        &self,
        inner: &mut Inner<A::Values, E, N>,
        requested_strength: u32,
        prediction_resistance_flag: bool,
        personalization_string: &[u8],
    ) -> Result<Handle, DrbgError> {
        let limits = self.algorithm.limits();
        let highest = limits.highest_supported_security_strength;

        if requested_strength > highest.bits() {
            return Err(DrbgError::StrengthUnsupported {
                requested: requested_strength,
                highest: highest.bits(),
            });
        }
        if prediction_resistance_flag && !limits.supports_prediction_resistance {
            return Err(DrbgError::PredictionResistanceUnsupported);
        }
        if bit_len(personalization_string) > limits.max_personalization_string_length {
            return Err(DrbgError::PersonalizationTooLong {
                given: bit_len(personalization_string),
                max: limits.max_personalization_string_length,
            });
        }
        let security_strength =
            SecurityStrength::round_up(requested_strength).ok_or(DrbgError::StrengthUnsupported {
                requested: requested_strength,
                highest: highest.bits(),
            })?;
        if inner.instance.is_some() {
            return Err(DrbgError::AlreadyInstantiated);
        }

        let entropy_input = inner.entropy.get_entropy(
            limits.min_entropy_length,
            limits.max_entropy_length,
            prediction_resistance_flag,
        )?;
        let nonce = inner.nonce.get_nonce();

        let state = self.algorithm.instantiate(
            &entropy_input,
            &nonce,
            personalization_string,
            security_strength,
            prediction_resistance_flag,
        )?;

        inner.generation += 1;
        let handle = Handle::new(inner.generation);
        inner.instance = Some(Instance { handle, state });
        inner.stats.instantiations += 1;
        inner.stats.instantiated = true;

        tracing::info!(
            %handle,
            security_strength = %security_strength,
            prediction_resistance = prediction_resistance_flag,
            "DRBG instantiated"
        );
        Ok(handle)
    }

    /// Reseeds the state named by `handle` with fresh entropy.
    pub fn reseed(
        &self,
        handle: Handle,
        prediction_resistance_request: bool,
        additional_input: &[u8],
    ) -> Result<(), DrbgError> {
        let mut inner = self.lock()?;
        let result = inner.check_handle(handle).and_then(|()| {
            self.reseed_locked(&mut inner, prediction_resistance_request, additional_input)
        });
        match &result {
            Ok(()) => inner.stats.explicit_reseeds += 1,
            Err(e) => inner.record_failure("reseed", e),
        }
        result
    }

    /// Reseeds the live state. The handle has already been validated.
    ///
    /// Commits the new state only once the entropy request and the
    /// algorithm have both succeeded.
    fn reseed_locked(
        &self,
        inner: &mut Inner<A::Values, E, N>,
        prediction_resistance_request: bool,
        additional_input: &[u8],
    ) -> Result<(), DrbgError> {
        let limits = self.algorithm.limits();
        if prediction_resistance_request && !limits.supports_prediction_resistance {
            return Err(DrbgError::PredictionResistanceUnsupported);
        }
        if bit_len(additional_input) > limits.max_additional_input_length {
            return Err(DrbgError::AdditionalInputTooLong {
                given: bit_len(additional_input),
                max: limits.max_additional_input_length,
            });
        }

        let entropy_input = inner.entropy.get_entropy(
            limits.min_entropy_length,
            limits.max_entropy_length,
            prediction_resistance_request,
        )?;

        let instance = inner.instance.as_mut().ok_or(DrbgError::InvalidHandle)?;
        let mut state = self
            .algorithm
            .reseed(&instance.state, &entropy_input, additional_input)?;
        state.reseed_required_flag = false;
        instance.state = state;

        tracing::debug!(handle = %instance.handle, "DRBG reseeded");
        Ok(())
    }

    /// Generates `requested_bits` pseudorandom bits.
    ///
    /// Reseeds transparently, at most once per call, when the algorithm
    /// reports its reseed interval exhausted or prediction resistance is
    /// requested. A failed reseed is returned as is and never retried.
    pub fn generate(
        &self,
        handle: Handle,
        requested_bits: usize,
        requested_strength: u32,
        prediction_resistance_request: bool,
        additional_input: &[u8],
    ) -> Result<Vec<u8>, DrbgError> {
        let mut inner = self.lock()?;
        let result = self.generate_locked(
            &mut inner,
            handle,
            requested_bits,
            requested_strength,
            prediction_resistance_request,
            additional_input,
        );
        match &result {
            Ok(_) => {
                inner.stats.generate_requests += 1;
                inner.stats.bits_generated += requested_bits as u64;
            }
            Err(e) => inner.record_failure("generate", e),
        }
        result
    }

    fn generate_locked(
        &self,
        inner: &mut Inner<A::Values, E, N>,
        handle: Handle,
        requested_bits: usize,
        requested_strength: u32,
        prediction_resistance_request: bool,
        additional_input: &[u8],
    ) -> Result<Vec<u8>, DrbgError> {
        let limits = self.algorithm.limits();
        let instance = inner.instance_mut(handle)?;

        if requested_bits > limits.max_number_of_bits_per_request {
            return Err(DrbgError::RequestTooLarge {
                requested: requested_bits,
                max: limits.max_number_of_bits_per_request,
            });
        }
        let instantiated = instance.state.security_strength().bits();
        if requested_strength > instantiated {
            return Err(DrbgError::StrengthExceedsInstance {
                requested: requested_strength,
                instantiated,
            });
        }
        if bit_len(additional_input) > limits.max_additional_input_length {
            return Err(DrbgError::AdditionalInputTooLong {
                given: bit_len(additional_input),
                max: limits.max_additional_input_length,
            });
        }
        if prediction_resistance_request && !limits.supports_prediction_resistance {
            return Err(DrbgError::PredictionResistanceUnsupported);
        }

        instance.state.reseed_required_flag = false;

        let mut prediction_resistance = prediction_resistance_request;
        let mut additional_input: &[u8] = additional_input;
        let mut reseeded = false;

        loop {
            let reseed_required = inner
                .instance
                .as_ref()
                .is_some_and(|i| i.state.reseed_required_flag());
            if reseed_required || prediction_resistance {
                if reseeded {
                    return Err(DrbgError::ReseedIneffective);
                }
                self.reseed_locked(inner, prediction_resistance, additional_input)?;
                inner.stats.automatic_reseeds += 1;
                tracing::info!(
                    %handle,
                    reseed_required,
                    prediction_resistance,
                    "DRBG reseeded automatically"
                );
                // Consumed by the reseed.
                additional_input = &[];
                reseeded = true;
            }

            let instance = inner.instance_mut(handle)?;
            match self
                .algorithm
                .generate(&instance.state, requested_bits, additional_input)?
            {
                Generated::Bits { bits, state } => {
                    instance.state = state;
                    tracing::debug!(
                        %handle,
                        bits = requested_bits,
                        reseed_counter = instance.state.reseed_counter(),
                        "DRBG generated"
                    );
                    return Ok(bits);
                }
                Generated::ReseedRequired => {
                    instance.state.reseed_required_flag = true;
                    if instance.state.prediction_resistance_flag() {
                        prediction_resistance = true;
                    }
                    tracing::debug!(%handle, "DRBG reseed interval exhausted");
                }
            }
        }
    }

    /// Erases the state named by `handle`; the handle is invalid afterwards.
    pub fn uninstantiate(&self, handle: Handle) -> Result<(), DrbgError> {
        let mut inner = self.lock()?;
        if let Err(e) = inner.check_handle(handle) {
            inner.record_failure("uninstantiate", &e);
            return Err(e);
        }

        if let Some(mut instance) = inner.instance.take() {
            instance.state.erase();
        }
        inner.stats.uninstantiations += 1;
        inner.stats.instantiated = false;

        tracing::info!(%handle, "DRBG uninstantiated");
        Ok(())
    }
}

impl<A: DrbgAlgorithm, E, N> std::fmt::Debug for DrbgMechanism<A, E, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrbgMechanism")
            .field("limits", self.algorithm.limits())
            .finish_non_exhaustive()
    }
}
