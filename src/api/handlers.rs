use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::contracts::{
    AddressDirectory, AddressRecord, DirectoryError, GenerationError, ProvisionError,
};
use crate::metrics::MetricsRegistry;
use crate::naming::{Candidate, PersonName, Variant};
use crate::provisioning::Provisioner;

/// Application state shared across handlers.
pub struct AppState<D: AddressDirectory> {
    pub provisioner: Provisioner<D>,
    pub metrics: Arc<MetricsRegistry>,
    pub start_time: Instant,
}

impl<D: AddressDirectory> AppState<D> {
    pub fn new(provisioner: Provisioner<D>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            provisioner,
            metrics,
            start_time: Instant::now(),
        }
    }
}

/// Request body for provisioning.
#[derive(Debug, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub surname: String,
    pub owner: String,
}

/// Response for the suggest endpoint.
#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub address: String,
    pub local_part: String,
    pub domain: String,
    pub variant: Variant,
    pub checks: usize,
}

/// Response for the candidates endpoint.
#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub domain: String,
    pub candidates: Vec<CandidateEntry>,
}

#[derive(Debug, Serialize)]
pub struct CandidateEntry {
    pub address: String,
    pub local_part: String,
    pub variant: Variant,
}

impl CandidateEntry {
    fn new(candidate: Candidate, domain: &str) -> Self {
        Self {
            address: candidate.address(domain),
            local_part: candidate.local_part,
            variant: candidate.variant,
        }
    }
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// API error type.
pub enum ApiError {
    Generation(GenerationError<DirectoryError>),
    Provision(ProvisionError),
    Directory(DirectoryError),
    NotFound(String),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Generation(e) | ApiError::Provision(ProvisionError::Generation(e)) => {
                match e {
                    GenerationError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                    GenerationError::Exhausted { .. } => {
                        (StatusCode::CONFLICT, "GENERATION_EXHAUSTED")
                    }
                    GenerationError::Oracle(_) => (StatusCode::BAD_GATEWAY, "ORACLE_FAILURE"),
                }
            }
            ApiError::Provision(ProvisionError::Contended { .. }) => {
                (StatusCode::CONFLICT, "CLAIM_CONTENDED")
            }
            ApiError::Provision(ProvisionError::Directory(e)) | ApiError::Directory(e) => match e {
                DirectoryError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                DirectoryError::AlreadyClaimed(_) => (StatusCode::CONFLICT, "CLAIM_CONTENDED"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            },
            ApiError::Provision(ProvisionError::Dependent(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
            }
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "ADDRESS_NOT_FOUND"),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Generation(e) => e.to_string(),
            ApiError::Provision(e) => e.to_string(),
            ApiError::Directory(e) => e.to_string(),
            ApiError::NotFound(address) => format!("Address not found: {}", address),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, error = %self.message(), "Request failed");
        }
        let body = ErrorResponse {
            error: self.message(),
            code: code.into(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<GenerationError<DirectoryError>> for ApiError {
    fn from(e: GenerationError<DirectoryError>) -> Self {
        ApiError::Generation(e)
    }
}

impl From<ProvisionError> for ApiError {
    fn from(e: ProvisionError) -> Self {
        ApiError::Provision(e)
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        ApiError::Directory(e)
    }
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy"
    }))
}

/// Response for stats endpoint.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_secs: f64,
    pub domain: String,
    pub generations: GenerationStats,
    pub claims: ClaimStats,
}

#[derive(Debug, Serialize)]
pub struct GenerationStats {
    pub total: u64,
    pub first_choice: u64,
    pub second_choice: u64,
    pub suffixed: u64,
    pub exhausted: u64,
    pub invalid_input: u64,
    pub oracle_errors: u64,
    pub avg_checks: f64,
}

#[derive(Debug, Serialize)]
pub struct ClaimStats {
    pub total: u64,
    pub conflicts: u64,
    pub contended: u64,
    pub rollbacks: u64,
    pub releases: u64,
}

/// GET /stats
pub async fn get_stats<D: AddressDirectory>(
    State(state): State<Arc<AppState<D>>>,
) -> impl IntoResponse {
    let generator = &state.metrics.generator;
    let provision = &state.metrics.provision;

    let checks_count = generator.checks.count();
    let avg_checks = if checks_count > 0 {
        generator.checks.sum() as f64 / checks_count as f64
    } else {
        0.0
    };

    Json(StatsResponse {
        uptime_secs: state.start_time.elapsed().as_secs_f64(),
        domain: state.provisioner.generator().domain().to_string(),
        generations: GenerationStats {
            total: generator.generations_total(),
            first_choice: generator.first_choice_total.load(Ordering::Relaxed),
            second_choice: generator.second_choice_total.load(Ordering::Relaxed),
            suffixed: generator.suffixed_total.load(Ordering::Relaxed),
            exhausted: generator.exhausted_total.load(Ordering::Relaxed),
            invalid_input: generator.invalid_input_total.load(Ordering::Relaxed),
            oracle_errors: generator.oracle_errors_total.load(Ordering::Relaxed),
            avg_checks,
        },
        claims: ClaimStats {
            total: provision.claims_total.load(Ordering::Relaxed),
            conflicts: provision.claim_conflicts_total.load(Ordering::Relaxed),
            contended: provision.contended_total.load(Ordering::Relaxed),
            rollbacks: provision.rollbacks_total.load(Ordering::Relaxed),
            releases: provision.releases_total.load(Ordering::Relaxed),
        },
    })
}

/// GET /metrics
/// Prometheus exposition format.
pub async fn get_metrics<D: AddressDirectory>(
    State(state): State<Arc<AppState<D>>>,
) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.format_prometheus(),
    )
}

/// POST /addresses/suggest
/// Returns the address the next provisioning would pick. Nothing is claimed.
pub async fn suggest_address<D: AddressDirectory>(
    State(state): State<Arc<AppState<D>>>,
    Json(name): Json<PersonName>,
) -> Result<Json<SuggestResponse>, ApiError> {
    let generated = state.provisioner.suggest(&name).await?;

    Ok(Json(SuggestResponse {
        address: generated.address(),
        local_part: generated.local_part,
        domain: generated.domain,
        variant: generated.variant,
        checks: generated.checks,
    }))
}

/// POST /addresses/candidates
/// Lists every address generation could try for a name, in order. The
/// directory is not consulted.
pub async fn list_candidates<D: AddressDirectory>(
    State(state): State<Arc<AppState<D>>>,
    Json(name): Json<PersonName>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let generator = state.provisioner.generator();
    let candidates = generator
        .candidates(&name)
        .map_err(|msg| ApiError::Generation(GenerationError::InvalidInput(msg)))?;
    let domain = generator.domain();

    Ok(Json(CandidatesResponse {
        domain: domain.to_string(),
        candidates: candidates
            .into_iter()
            .map(|c| CandidateEntry::new(c, domain))
            .collect(),
    }))
}

/// POST /addresses
/// Generates and claims an address.
pub async fn provision_address<D: AddressDirectory>(
    State(state): State<Arc<AppState<D>>>,
    Json(request): Json<ProvisionRequest>,
) -> Result<(StatusCode, Json<AddressRecord>), ApiError> {
    let name = PersonName::new(request.given_name, request.surname);
    let record = state.provisioner.provision(&name, &request.owner).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /addresses/{address}
pub async fn get_address<D: AddressDirectory>(
    State(state): State<Arc<AppState<D>>>,
    Path(address): Path<String>,
) -> Result<Json<AddressRecord>, ApiError> {
    state
        .provisioner
        .directory()
        .get(&address)?
        .map(Json)
        .ok_or(ApiError::NotFound(address))
}

/// DELETE /addresses/{address}
pub async fn release_address<D: AddressDirectory>(
    State(state): State<Arc<AppState<D>>>,
    Path(address): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.provisioner.release(&address)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_match_statuses() {
        let cases = [
            (
                ApiError::Generation(GenerationError::InvalidInput("x".into())),
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
            ),
            (
                ApiError::Generation(GenerationError::Exhausted {
                    base: "lurojas".into(),
                    checks: 100,
                }),
                StatusCode::CONFLICT,
                "GENERATION_EXHAUSTED",
            ),
            (
                ApiError::Generation(GenerationError::Oracle(DirectoryError::RocksDb(
                    "io".into(),
                ))),
                StatusCode::BAD_GATEWAY,
                "ORACLE_FAILURE",
            ),
            (
                ApiError::Provision(ProvisionError::Contended { attempts: 5 }),
                StatusCode::CONFLICT,
                "CLAIM_CONTENDED",
            ),
            (
                ApiError::Directory(DirectoryError::InvalidAddress("x".into())),
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
            ),
            (
                ApiError::NotFound("x@example.org".into()),
                StatusCode::NOT_FOUND,
                "ADDRESS_NOT_FOUND",
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_and_code(), (status, code));
        }
    }
}
