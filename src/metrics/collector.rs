//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

use crate::drbg::MechanismStats;
use crate::source::HealthMetrics;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// Registration or encoding failed.
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of mechanism state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
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
    /// Reseeds performed inside generate.
    pub automatic_reseeds: u64,
    /// Operations failed by the entropy source.
    pub entropy_failures: u64,
    /// Operations failed catastrophically.
    pub catastrophic_failures: u64,
    /// Health test status, if the entropy source is health tested.
    pub entropy_healthy: Option<bool>,
    /// Byte samples run through the health tests.
    pub entropy_samples: u64,
}

/// Prometheus metrics registry for DRBG monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    // Mechanism metrics
    instantiated: IntGauge,
    instantiations_total: IntCounter,
    uninstantiations_total: IntCounter,
    generate_requests_total: IntCounter,
    bits_generated_total: IntCounter,

    // Reseed metrics
    explicit_reseeds_total: IntCounter,
    automatic_reseeds_total: IntCounter,

    // Failure metrics
    entropy_failures_total: IntCounter,
    catastrophic_failures_total: IntCounter,

    // Entropy health metrics
    entropy_healthy: IntGauge,
    entropy_samples_total: IntCounter,
}

/// Advances a counter to `target`; counters never move backwards.
fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all DRBG metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let instantiated = IntGauge::new(
            "ctr_drbg_instantiated",
            "Whether a working state is live (1=yes, 0=no)",
        )?;
        let instantiations_total = IntCounter::new(
            "ctr_drbg_instantiations_total",
            "Total number of successful instantiations",
        )?;
        let uninstantiations_total = IntCounter::new(
            "ctr_drbg_uninstantiations_total",
            "Total number of successful uninstantiations",
        )?;
        let generate_requests_total = IntCounter::new(
            "ctr_drbg_generate_requests_total",
            "Total number of successful generate calls",
        )?;
        let bits_generated_total = IntCounter::new(
            "ctr_drbg_bits_generated_total",
            "Total pseudorandom bits returned to callers",
        )?;

        let explicit_reseeds_total = IntCounter::new(
            "ctr_drbg_explicit_reseeds_total",
            "Total number of reseeds requested by the caller",
        )?;
        let automatic_reseeds_total = IntCounter::new(
            "ctr_drbg_automatic_reseeds_total",
            "Total number of reseeds performed inside generate",
        )?;

        let entropy_failures_total = IntCounter::new(
            "ctr_drbg_entropy_failures_total",
            "Total number of operations failed by the entropy source",
        )?;
        let catastrophic_failures_total = IntCounter::new(
            "ctr_drbg_catastrophic_failures_total",
            "Total number of operations failed with a catastrophic error",
        )?;

        let entropy_healthy = IntGauge::new(
            "ctr_drbg_entropy_healthy",
            "Entropy health test status (1=healthy, 0=failed)",
        )?;
        let entropy_samples_total = IntCounter::new(
            "ctr_drbg_entropy_samples_total",
            "Total byte samples run through the entropy health tests",
        )?;

        registry.register(Box::new(instantiated.clone()))?;
        registry.register(Box::new(instantiations_total.clone()))?;
        registry.register(Box::new(uninstantiations_total.clone()))?;
        registry.register(Box::new(generate_requests_total.clone()))?;
        registry.register(Box::new(bits_generated_total.clone()))?;
        registry.register(Box::new(explicit_reseeds_total.clone()))?;
        registry.register(Box::new(automatic_reseeds_total.clone()))?;
        registry.register(Box::new(entropy_failures_total.clone()))?;
        registry.register(Box::new(catastrophic_failures_total.clone()))?;
        registry.register(Box::new(entropy_healthy.clone()))?;
        registry.register(Box::new(entropy_samples_total.clone()))?;

        Ok(Self {
            registry,
            instantiated,
            instantiations_total,
            uninstantiations_total,
            generate_requests_total,
            bits_generated_total,
            explicit_reseeds_total,
            automatic_reseeds_total,
            entropy_failures_total,
            catastrophic_failures_total,
            entropy_healthy,
            entropy_samples_total,
        })
    }

    /// Updates all metrics from a snapshot of mechanism state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.instantiated.set(i64::from(snapshot.instantiated));
        advance(&self.instantiations_total, snapshot.instantiations);
        advance(&self.uninstantiations_total, snapshot.uninstantiations);
        advance(&self.generate_requests_total, snapshot.generate_requests);
        advance(&self.bits_generated_total, snapshot.bits_generated);

        advance(&self.explicit_reseeds_total, snapshot.explicit_reseeds);
        advance(&self.automatic_reseeds_total, snapshot.automatic_reseeds);

        advance(&self.entropy_failures_total, snapshot.entropy_failures);
        advance(&self.catastrophic_failures_total, snapshot.catastrophic_failures);

        // Only health-tested sources report these.
        if let Some(healthy) = snapshot.entropy_healthy {
            self.entropy_healthy.set(i64::from(healthy));
        }
        advance(&self.entropy_samples_total, snapshot.entropy_samples);
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl MetricsSnapshot {
    /// Creates a snapshot from mechanism statistics and, when available,
    /// the entropy source's health metrics.
    pub fn from_stats(stats: &MechanismStats, health: Option<&HealthMetrics>) -> Self {
        Self {
            instantiated: stats.instantiated,
            instantiations: stats.instantiations,
            uninstantiations: stats.uninstantiations,
            generate_requests: stats.generate_requests,
            bits_generated: stats.bits_generated,
            explicit_reseeds: stats.explicit_reseeds,
            automatic_reseeds: stats.automatic_reseeds,
            entropy_failures: stats.entropy_failures,
            catastrophic_failures: stats.catastrophic_failures,
            entropy_healthy: health.map(|h| h.is_healthy),
            entropy_samples: health.map_or(0, |h| h.total_samples),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let stats = MechanismStats {
            instantiated: true,
            instantiations: 1,
            generate_requests: 5,
            bits_generated: 5 * 256,
            automatic_reseeds: 2,
            ..Default::default()
        };
        let health = HealthMetrics {
            is_healthy: true,
            total_samples: 144,
            ..Default::default()
        };

        registry.update(&MetricsSnapshot::from_stats(&stats, Some(&health)));

        let output = registry.encode().unwrap();
        assert!(output.contains("ctr_drbg_instantiated 1"));
        assert!(output.contains("ctr_drbg_generate_requests_total 5"));
        assert!(output.contains("ctr_drbg_bits_generated_total 1280"));
        assert!(output.contains("ctr_drbg_automatic_reseeds_total 2"));
        assert!(output.contains("ctr_drbg_entropy_healthy 1"));
        assert!(output.contains("ctr_drbg_entropy_samples_total 144"));
    }

    #[test]
    fn test_counters_never_decrease() {
        let registry = MetricsRegistry::new().unwrap();

        registry.update(&MetricsSnapshot {
            generate_requests: 10,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            generate_requests: 4,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("ctr_drbg_generate_requests_total 10"));
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("ctr_drbg_instantiated"));
        assert!(output.contains("ctr_drbg_explicit_reseeds_total"));
        assert!(output.contains("ctr_drbg_catastrophic_failures_total"));
    }
}
