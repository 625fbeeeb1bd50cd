//! Turning generated addresses into claimed ones.
//!
//! Generation only observes the directory, so two concurrent runs for the
//! same name can pick the same address. The directory's `claim` settles the
//! race: the loser regenerates against the updated directory.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use crate::contracts::{
    AddressDirectory, AddressRecord, DirectoryError, GenerationError, ProvisionError,
};
use crate::generator::{AddressGenerator, GeneratedAddress};
use crate::metrics::ProvisionMetrics;
use crate::naming::PersonName;
use crate::storage::{DirectoryOracle, RetryConfig, RetryingOracle};

/// Provisioning configuration.
#[derive(Debug, Clone)]
pub struct ProvisionConfig {
    /// Generate-then-claim rounds before giving up on a contended name.
    pub max_claim_attempts: usize,
    /// Backoff for transient directory read failures during generation.
    pub retry: RetryConfig,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            max_claim_attempts: 5,
            retry: RetryConfig::default(),
        }
    }
}

impl ProvisionConfig {
    /// Reads `STAFFMAIL_MAX_CLAIM_ATTEMPTS` (default: 5, minimum: 1) and the
    /// oracle retry variables read by [`RetryConfig::from_env`].
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_claim_attempts: std::env::var("STAFFMAIL_MAX_CLAIM_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(default.max_claim_attempts),
            retry: RetryConfig::from_env(),
        }
    }
}

pub struct Provisioner<D: AddressDirectory> {
    directory: Arc<D>,
    oracle: RetryingOracle<DirectoryOracle<D>>,
    generator: AddressGenerator,
    config: ProvisionConfig,
    metrics: Option<Arc<ProvisionMetrics>>,
}

impl<D: AddressDirectory> Provisioner<D> {
    pub fn new(directory: Arc<D>, generator: AddressGenerator, config: ProvisionConfig) -> Self {
        Self {
            oracle: RetryingOracle::new(
                DirectoryOracle::new(Arc::clone(&directory)),
                config.retry.clone(),
            ),
            directory,
            generator,
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ProvisionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    pub fn generator(&self) -> &AddressGenerator {
        &self.generator
    }

    /// Address that would be assigned right now. Nothing is claimed.
    pub async fn suggest(
        &self,
        name: &PersonName,
    ) -> Result<GeneratedAddress, GenerationError<DirectoryError>> {
        self.generator.generate(name, &self.oracle).await
    }

    /// Generates and claims an address for `owner`.
    ///
    /// A claim lost to a concurrent caller triggers a fresh generation, up to
    /// `max_claim_attempts` rounds.
    pub async fn provision(
        &self,
        name: &PersonName,
        owner: &str,
    ) -> Result<AddressRecord, ProvisionError> {
        let attempts = self.config.max_claim_attempts.max(1);

        for attempt in 1..=attempts {
            let generated = self.suggest(name).await?;
            let address = generated.address();

            match self.directory.claim(&address, owner) {
                Ok(record) => {
                    self.record(|m| m.record_claim());
                    tracing::info!(address = %record.address, owner, attempt, "Claimed address");
                    return Ok(record);
                }
                Err(DirectoryError::AlreadyClaimed(_)) => {
                    self.record(|m| m.record_conflict());
                    tracing::debug!(address = %address, attempt, "Lost claim race, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.record(|m| m.record_contended());
        tracing::warn!(
            given_name = %name.given_name,
            surname = %name.surname,
            attempts,
            "Giving up on contended name"
        );
        Err(ProvisionError::Contended { attempts })
    }

    /// Provisions an address, then runs a dependent step with the record
    /// (creating the staff profile, for instance).
    ///
    /// If the step fails the claim is released before the error is returned.
    pub async fn provision_with<F, Fut, T, E>(
        &self,
        name: &PersonName,
        owner: &str,
        step: F,
    ) -> Result<(AddressRecord, T), ProvisionError>
    where
        F: FnOnce(AddressRecord) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let record = self.provision(name, owner).await?;

        match step(record.clone()).await {
            Ok(value) => Ok((record, value)),
            Err(e) => {
                self.record(|m| m.record_rollback());
                match self.directory.release(&record.address) {
                    Ok(_) => {
                        tracing::warn!(
                            address = %record.address,
                            error = %e,
                            "Dependent step failed, claim released"
                        );
                    }
                    Err(release_err) => {
                        tracing::error!(
                            address = %record.address,
                            error = %e,
                            release_error = %release_err,
                            "Dependent step failed and the claim could not be released"
                        );
                    }
                }
                Err(ProvisionError::Dependent(e.to_string()))
            }
        }
    }

    /// Releases a claimed address. Returns false if it was not claimed.
    pub fn release(&self, address: &str) -> Result<bool, DirectoryError> {
        let released = self.directory.release(address)?;
        if released {
            self.record(|m| m.record_release());
            tracing::info!(address, "Released address");
        }
        Ok(released)
    }

    #[inline]
    fn record(&self, f: impl FnOnce(&ProvisionMetrics)) {
        if let Some(metrics) = &self.metrics {
            f(metrics);
        }
    }
}
