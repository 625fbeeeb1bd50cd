//! Metrics registry for address generation and provisioning.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::histogram::{Histogram, CHECK_COUNT_BUCKETS};
use crate::naming::Variant;

/// Central registry for all staffmail metrics.
#[derive(Default)]
pub struct MetricsRegistry {
    pub generator: Arc<GeneratorMetrics>,
    pub provision: Arc<ProvisionMetrics>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            generator: Arc::new(GeneratorMetrics::new()),
            provision: Arc::new(ProvisionMetrics::default()),
        }
    }

    /// Formats all metrics in Prometheus exposition format.
    pub fn format_prometheus(&self) -> String {
        let mut output = String::with_capacity(4096);
        output.push_str(&self.generator.format_prometheus());
        output.push_str(&self.provision.format_prometheus());
        output
    }
}

/// Outcomes of generation runs.
pub struct GeneratorMetrics {
    pub first_choice_total: AtomicU64,
    pub second_choice_total: AtomicU64,
    pub suffixed_total: AtomicU64,
    pub exhausted_total: AtomicU64,
    pub invalid_input_total: AtomicU64,
    pub oracle_errors_total: AtomicU64,
    /// Oracle checks needed per successful or exhausted run
    pub checks: Histogram,
    /// Oracle round-trip latency in microseconds
    pub oracle_latency_us: Histogram,
}

impl Default for GeneratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorMetrics {
    pub fn new() -> Self {
        Self {
            first_choice_total: AtomicU64::new(0),
            second_choice_total: AtomicU64::new(0),
            suffixed_total: AtomicU64::new(0),
            exhausted_total: AtomicU64::new(0),
            invalid_input_total: AtomicU64::new(0),
            oracle_errors_total: AtomicU64::new(0),
            checks: Histogram::with_buckets(CHECK_COUNT_BUCKETS),
            oracle_latency_us: Histogram::new(),
        }
    }

    #[inline]
    pub fn record_success(&self, variant: Variant, checks: usize) {
        let counter = match variant {
            Variant::Initials(1) => &self.first_choice_total,
            Variant::Initials(_) => &self.second_choice_total,
            Variant::Suffixed(_) => &self.suffixed_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.checks.observe(checks as u64);
    }

    #[inline]
    pub fn record_exhausted(&self, checks: usize) {
        self.exhausted_total.fetch_add(1, Ordering::Relaxed);
        self.checks.observe(checks as u64);
    }

    #[inline]
    pub fn record_invalid_input(&self) {
        self.invalid_input_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_oracle_error(&self) {
        self.oracle_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_oracle_latency(&self, latency_us: u64) {
        self.oracle_latency_us.observe(latency_us);
    }

    pub fn generations_total(&self) -> u64 {
        self.first_choice_total.load(Ordering::Relaxed)
            + self.second_choice_total.load(Ordering::Relaxed)
            + self.suffixed_total.load(Ordering::Relaxed)
            + self.exhausted_total.load(Ordering::Relaxed)
    }

    pub fn format_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        let _ = writeln!(
            output,
            "# HELP staffmail_generations_total Completed generation runs by outcome"
        );
        let _ = writeln!(output, "# TYPE staffmail_generations_total counter");
        for (outcome, counter) in [
            ("first_choice", &self.first_choice_total),
            ("second_choice", &self.second_choice_total),
            ("suffixed", &self.suffixed_total),
            ("exhausted", &self.exhausted_total),
        ] {
            let _ = writeln!(
                output,
                "staffmail_generations_total{{outcome=\"{}\"}} {}",
                outcome,
                counter.load(Ordering::Relaxed)
            );
        }

        let _ = writeln!(
            output,
            "# HELP staffmail_invalid_names_total Names rejected before any oracle check"
        );
        let _ = writeln!(output, "# TYPE staffmail_invalid_names_total counter");
        let _ = writeln!(
            output,
            "staffmail_invalid_names_total {}",
            self.invalid_input_total.load(Ordering::Relaxed)
        );

        let _ = writeln!(
            output,
            "# HELP staffmail_oracle_errors_total Existence checks that failed"
        );
        let _ = writeln!(output, "# TYPE staffmail_oracle_errors_total counter");
        let _ = writeln!(
            output,
            "staffmail_oracle_errors_total {}",
            self.oracle_errors_total.load(Ordering::Relaxed)
        );

        output.push_str(&self.checks.format_prometheus(
            "staffmail_generation_checks",
            "Existence checks needed per generation run",
        ));
        output.push_str(&self.oracle_latency_us.format_prometheus(
            "staffmail_oracle_latency_us",
            "Existence check latency in microseconds",
        ));

        output
    }
}

/// Claim and rollback counters.
#[derive(Default)]
pub struct ProvisionMetrics {
    pub claims_total: AtomicU64,
    pub claim_conflicts_total: AtomicU64,
    pub contended_total: AtomicU64,
    pub rollbacks_total: AtomicU64,
    pub releases_total: AtomicU64,
}

impl ProvisionMetrics {
    #[inline]
    pub fn record_claim(&self) {
        self.claims_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_conflict(&self) {
        self.claim_conflicts_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_contended(&self) {
        self.contended_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_rollback(&self) {
        self.rollbacks_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_release(&self) {
        self.releases_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn format_prometheus(&self) -> String {
        let mut output = String::with_capacity(1024);

        for (name, help, counter) in [
            (
                "staffmail_claims_total",
                "Addresses claimed in the directory",
                &self.claims_total,
            ),
            (
                "staffmail_claim_conflicts_total",
                "Claims rejected because the address was taken in the meantime",
                &self.claim_conflicts_total,
            ),
            (
                "staffmail_claim_contended_total",
                "Provisioning runs that gave up after repeated conflicts",
                &self.contended_total,
            ),
            (
                "staffmail_rollbacks_total",
                "Claims released after a dependent step failed",
                &self.rollbacks_total,
            ),
            (
                "staffmail_releases_total",
                "Addresses released on request",
                &self.releases_total,
            ),
        ] {
            let _ = writeln!(output, "# HELP {} {}", name, help);
            let _ = writeln!(output, "# TYPE {} counter", name);
            let _ = writeln!(output, "{} {}", name, counter.load(Ordering::Relaxed));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_counted_by_variant() {
        let m = GeneratorMetrics::new();
        m.record_success(Variant::Initials(1), 1);
        m.record_success(Variant::Initials(2), 2);
        m.record_success(Variant::Suffixed(10), 11);
        m.record_exhausted(100);

        assert_eq!(m.first_choice_total.load(Ordering::Relaxed), 1);
        assert_eq!(m.second_choice_total.load(Ordering::Relaxed), 1);
        assert_eq!(m.suffixed_total.load(Ordering::Relaxed), 1);
        assert_eq!(m.generations_total(), 4);
        assert_eq!(m.checks.sum(), 114);
    }

    #[test]
    fn registry_renders_all_families() {
        let registry = MetricsRegistry::new();
        registry.generator.record_success(Variant::Initials(1), 1);
        registry.provision.record_claim();

        let output = registry.format_prometheus();
        assert!(output.contains("staffmail_generations_total{outcome=\"first_choice\"} 1"));
        assert!(output.contains("staffmail_generation_checks_count 1"));
        assert!(output.contains("staffmail_claims_total 1"));
        assert!(output.contains("# TYPE staffmail_rollbacks_total counter"));
    }
}
