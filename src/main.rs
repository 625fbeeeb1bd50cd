use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use staffmail::api::{start_server, AppState, ServerConfig};
use staffmail::contracts::AddressDirectory;
use staffmail::generator::AddressGenerator;
use staffmail::metrics::MetricsRegistry;
use staffmail::provisioning::{ProvisionConfig, Provisioner};
use staffmail::storage::{InMemoryDirectory, RocksDbDirectory};

const DEFAULT_DOMAIN: &str = "municipalidad.example";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("staffmail=info".parse()?))
        .init();

    tracing::info!("staffmail starting...");

    let domain = std::env::var("STAFFMAIL_DOMAIN").unwrap_or_else(|_| DEFAULT_DOMAIN.into());
    let server = ServerConfig::from_env();
    let provision = ProvisionConfig::from_env();
    tracing::info!(
        domain = %domain,
        max_claim_attempts = provision.max_claim_attempts,
        "Loaded configuration"
    );

    match std::env::var("STAFFMAIL_DATA_DIR").ok() {
        Some(data_dir) => {
            let directory = RocksDbDirectory::open(&data_dir)?;
            run(directory, domain, provision, server).await
        }
        None => {
            tracing::warn!("STAFFMAIL_DATA_DIR not set, claims are kept in memory only");
            run(InMemoryDirectory::new(), domain, provision, server).await
        }
    }
}

async fn run<D: AddressDirectory + 'static>(
    directory: D,
    domain: String,
    provision: ProvisionConfig,
    server: ServerConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let metrics = Arc::new(MetricsRegistry::new());
    let generator = AddressGenerator::new(domain).with_metrics(Arc::clone(&metrics.generator));
    let provisioner = Provisioner::new(Arc::new(directory), generator, provision)
        .with_metrics(Arc::clone(&metrics.provision));

    let state = Arc::new(AppState::new(provisioner, metrics));

    start_server(server, state, shutdown_signal()).await?;

    tracing::info!("staffmail stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
