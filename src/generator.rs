//! Collision-free mailbox generation.
//!
//! Candidates are tried in a fixed order and the first one the oracle reports
//! as free wins:
//!
//! 1. one initial + surname (`jperez` for Juan Pérez)
//! 2. two initials + surname (`juperez`)
//! 3. two initials + surname + `2..=99` (`juperez2`, ..., `juperez99`)
//!
//! "Two initials" means the first two letters of the first given name, so
//! José Pérez escalates to `joperez`.
//!
//! Checks are strictly sequential. The result is a hint, not a reservation:
//! persistence must still enforce uniqueness (see [`crate::provisioning`]).

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::contracts::{ExistenceOracle, GenerationError};
use crate::metrics::GeneratorMetrics;
use crate::naming::{Candidate, CandidatePlan, PersonName, Variant, MAX_SUFFIX, MIN_SUFFIX};

/// An address that tested free at the moment it was returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedAddress {
    pub local_part: String,
    pub domain: String,
    pub variant: Variant,
    /// Oracle calls made to find it
    pub checks: usize,
}

impl GeneratedAddress {
    pub fn address(&self) -> String {
        format!("{}@{}", self.local_part, self.domain)
    }
}

impl fmt::Display for GeneratedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

/// Generates a unique address for `name` in `domain`.
///
/// Shorthand for [`AddressGenerator::generate`] without metrics.
pub async fn generate_unique_local_part<O: ExistenceOracle>(
    name: &PersonName,
    domain: &str,
    oracle: &O,
) -> Result<GeneratedAddress, GenerationError<O::Error>> {
    AddressGenerator::new(domain).generate(name, oracle).await
}

/// Generator bound to one mail domain.
#[derive(Clone)]
pub struct AddressGenerator {
    domain: String,
    metrics: Option<Arc<GeneratorMetrics>>,
}

impl AddressGenerator {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into().trim().to_lowercase(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<GeneratorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Every candidate `generate` could try for `name`, in escalation order.
    /// No oracle is consulted.
    pub fn candidates(&self, name: &PersonName) -> Result<Vec<Candidate>, String> {
        Ok(self.plan(name)?.iter().collect())
    }

    fn plan(&self, name: &PersonName) -> Result<CandidatePlan, String> {
        self.check_domain()?;
        let normalized = name.validate()?;
        Ok(CandidatePlan::new(&normalized))
    }

    fn check_domain(&self) -> Result<(), String> {
        if self.domain.is_empty() {
            return Err("domain must not be empty".into());
        }
        if self.domain.contains('@') || self.domain.chars().any(char::is_whitespace) {
            return Err(format!("invalid domain '{}'", self.domain));
        }
        Ok(())
    }

    /// Walks the escalation order and returns the first free candidate.
    ///
    /// # Errors
    /// - `InvalidInput` if the domain is empty or malformed, or the name has
    ///   no usable characters; no oracle call is made
    /// - `Oracle` with the oracle's own error, as soon as any check fails
    /// - `Exhausted` once every candidate tested as taken
    pub async fn generate<O: ExistenceOracle>(
        &self,
        name: &PersonName,
        oracle: &O,
    ) -> Result<GeneratedAddress, GenerationError<O::Error>> {
        let plan = match self.plan(name) {
            Ok(plan) => plan,
            Err(msg) => {
                self.record(|m| m.record_invalid_input());
                tracing::debug!(
                    given_name = %name.given_name,
                    surname = %name.surname,
                    domain = %self.domain,
                    "Rejected input"
                );
                return Err(GenerationError::InvalidInput(msg));
            }
        };

        let mut checks = 0usize;

        if !plan.first().is_empty()
            && !self.is_taken(oracle, plan.first(), &mut checks).await?
        {
            return Ok(self.accept(plan.first(), Variant::Initials(1), checks));
        }

        // No two-initial form can be built: the one-initial address is the
        // last resort and is returned without another check.
        if plan.second().is_empty() {
            return Ok(self.accept(plan.first(), Variant::Initials(1), checks));
        }

        if !plan.second_repeats_first()
            && !self.is_taken(oracle, plan.second(), &mut checks).await?
        {
            return Ok(self.accept(plan.second(), Variant::Initials(2), checks));
        }

        for suffix in MIN_SUFFIX..=MAX_SUFFIX {
            let local = plan.suffixed(suffix);
            if !self.is_taken(oracle, &local, &mut checks).await? {
                return Ok(self.accept(&local, Variant::Suffixed(suffix), checks));
            }
        }

        self.record(|m| m.record_exhausted(checks));
        tracing::warn!(
            base = %plan.second(),
            domain = %self.domain,
            checks,
            "Every candidate address is taken"
        );
        Err(GenerationError::Exhausted {
            base: plan.second().to_string(),
            checks,
        })
    }

    async fn is_taken<O: ExistenceOracle>(
        &self,
        oracle: &O,
        local: &str,
        checks: &mut usize,
    ) -> Result<bool, GenerationError<O::Error>> {
        let address = format!("{}@{}", local, self.domain);
        let start = Instant::now();
        *checks += 1;

        match oracle.exists(&address).await {
            Ok(taken) => {
                self.record(|m| m.record_oracle_latency(start.elapsed().as_micros() as u64));
                tracing::debug!(address = %address, taken, "Checked candidate");
                Ok(taken)
            }
            Err(e) => {
                self.record(|m| m.record_oracle_error());
                tracing::warn!(address = %address, error = %e, "Existence check failed");
                Err(GenerationError::Oracle(e))
            }
        }
    }

    fn accept(&self, local: &str, variant: Variant, checks: usize) -> GeneratedAddress {
        self.record(|m| m.record_success(variant, checks));
        tracing::info!(
            local_part = %local,
            domain = %self.domain,
            %variant,
            checks,
            "Generated address"
        );
        GeneratedAddress {
            local_part: local.to_string(),
            domain: self.domain.clone(),
            variant,
            checks,
        }
    }

    #[inline]
    fn record(&self, f: impl FnOnce(&GeneratorMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}
