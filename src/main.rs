mod catalog;
mod dataset;
mod http;
mod metrics;
mod models;
mod pipeline;
mod pricing;
mod shop;
mod store;
#[cfg(test)]
mod testing;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use dataset::{Dataset, ExportStage};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use models::{
    ApiError, DatasetSummary, MessageResponse, PhaseReport, PriceUpdateRequest,
    StatusUpdateRequest,
};
use pipeline::{Pipeline, PipelineError, PipelineErrorKind, process_log_layer};
use serde::Deserialize;
use serde_json::json;
use shop::{CredentialOverrides, ShopCredentials, ShopSession};
use std::{net::SocketAddr, sync::Arc};
use store::DatasetStore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const DEFAULT_PROCESS_LOG: &str = "upload_log_with_status.txt";

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(target = "gtinsync.api", "server crashed: {err}");
    }
}

async fn run() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    let _guard = init_tracing();

    let prometheus_handle = PrometheusBuilder::new().install_recorder()?;
    let state = AppState {
        pipeline: Arc::new(Pipeline::from_env()?),
        datasets: DatasetStore::default(),
        prometheus_handle,
    };

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    info!(target = "gtinsync.api", "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state).into_make_service()).await?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    datasets: DatasetStore,
    prometheus_handle: PrometheusHandle,
}

fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_headers(Any)
        .allow_methods(Any)
        .allow_origin(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/datasets", post(create_dataset))
        .route("/datasets/{id}", get(get_dataset).delete(delete_dataset))
        .route("/datasets/{id}/scrape", post(scrape_dataset))
        .route("/datasets/{id}/upload", post(upload_dataset))
        .route("/datasets/{id}/export", get(export_dataset))
        .route("/products/{id}/price", post(update_price))
        .route("/products/{id}/status", post(update_status))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_from_env()))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "gtin-sync",
    }))
}

async fn metrics_endpoint(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.prometheus_handle.render(),
    )
        .into_response()
}

fn body_limit_from_env() -> usize {
    std::env::var("REQUEST_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(8 * 1024 * 1024)
}

/// Load a GTIN sheet.
///
/// - Method: `POST`
/// - Path: `/datasets`
/// - Body: CSV text with at least the input columns
/// - Response: `201` with a `DatasetSummary`
async fn create_dataset(
    State(state): State<AppState>,
    body: String,
) -> Result<(StatusCode, Json<DatasetSummary>), AppError> {
    crate::metrics::inc_requests("/datasets");
    let dataset = Dataset::from_csv(&body)
        .map_err(|err| PipelineError::invalid_input("dataset", err.to_string()))?;
    let id = state.datasets.insert(dataset).await;

    let entry = state.datasets.get(id).await.ok_or_else(|| unknown_dataset(id))?;
    let entry = entry.lock().await;
    info!(
        target = "gtinsync.api",
        dataset_id = %id,
        rows = entry.dataset.len(),
        "dataset loaded"
    );
    Ok((
        StatusCode::CREATED,
        Json(DatasetSummary::new(id, entry.created_at, &entry.dataset)),
    ))
}

async fn get_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DatasetSummary>, AppError> {
    let id = parse_dataset_id(&id)?;
    let entry = state.datasets.get(id).await.ok_or_else(|| unknown_dataset(id))?;
    let entry = entry.lock().await;
    Ok(Json(DatasetSummary::new(id, entry.created_at, &entry.dataset)))
}

async fn delete_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_dataset_id(&id)?;
    if state.datasets.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(unknown_dataset(id).into())
    }
}

/// Phase 1: catalog lookup, scrape and pricing for every row.
///
/// Blocks until the pass is done; a second call on the same dataset waits
/// for the first and then re-scrapes.
async fn scrape_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PhaseReport>, AppError> {
    crate::metrics::inc_requests("/datasets/scrape");
    let id = parse_dataset_id(&id)?;
    let entry = state.datasets.get(id).await.ok_or_else(|| unknown_dataset(id))?;
    let mut entry = entry.lock().await;
    info!(target = "gtinsync.api", dataset_id = %id, "scrape started");
    let report = state.pipeline.scrape(&mut entry.dataset).await;
    Ok(Json(report))
}

/// Phase 2: create one store product per row.
///
/// The optional JSON body carries `shop_url`, `api_version` and
/// `api_token`; anything left out falls back to the environment.
async fn upload_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<PhaseReport>, AppError> {
    crate::metrics::inc_requests("/datasets/upload");
    let id = parse_dataset_id(&id)?;
    let overrides = parse_overrides(&body)?;
    let entry = state.datasets.get(id).await.ok_or_else(|| unknown_dataset(id))?;
    let mut entry = entry.lock().await;
    info!(target = "gtinsync.api", dataset_id = %id, "upload started");
    let report = state
        .pipeline
        .upload_with_credentials(&overrides, &mut entry.dataset)
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    #[serde(default = "default_export_stage")]
    stage: ExportStage,
}

fn default_export_stage() -> ExportStage {
    ExportStage::Uploaded
}

async fn export_dataset(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let id = parse_dataset_id(&id)?;
    let entry = state.datasets.get(id).await.ok_or_else(|| unknown_dataset(id))?;
    let entry = entry.lock().await;

    let ready = match query.stage {
        ExportStage::Scraped => entry.dataset.is_scraped(),
        ExportStage::Uploaded => entry.dataset.is_uploaded(),
    };
    if !ready {
        return Err(PipelineError::conflict("export", "phase has not run for this dataset").into());
    }

    let csv = entry
        .dataset
        .to_csv(query.stage)
        .map_err(|err| PipelineError::internal("export", err.to_string()))?;
    let disposition = format!("attachment; filename=\"{}\"", query.stage.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response())
}

/// Set the price of every variant of an existing product.
///
/// Store-side outcomes, including "not found", come back as a `200` with a
/// human-readable `message`.
async fn update_price(
    Path(id): Path<String>,
    Json(request): Json<PriceUpdateRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    crate::metrics::inc_requests("/products/price");
    let product_id = parse_product_id(&id)?;
    let session = open_session(&request.credentials)?;
    let message = shop::update_product_price(&session, product_id, request.price).await;
    Ok(Json(MessageResponse { message }))
}

async fn update_status(
    Path(id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    crate::metrics::inc_requests("/products/status");
    let product_id = parse_product_id(&id)?;
    let session = open_session(&request.credentials)?;
    let message = shop::deactivate_product(&session, product_id, request.status).await;
    Ok(Json(MessageResponse { message }))
}

fn open_session(overrides: &CredentialOverrides) -> Result<ShopSession, PipelineError> {
    let credentials = ShopCredentials::resolve(overrides)
        .map_err(|err| PipelineError::invalid_input("credentials", err.to_string()))?;
    Ok(ShopSession::open(credentials))
}

fn parse_overrides(body: &[u8]) -> Result<CredentialOverrides, PipelineError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CredentialOverrides::default());
    }
    serde_json::from_slice(body)
        .map_err(|err| PipelineError::invalid_input("credentials", err.to_string()))
}

fn parse_dataset_id(raw: &str) -> Result<Uuid, PipelineError> {
    Uuid::parse_str(raw).map_err(|_| PipelineError::invalid_input("datasets", "invalid_dataset_id"))
}

fn parse_product_id(raw: &str) -> Result<i64, PipelineError> {
    raw.trim()
        .parse()
        .map_err(|_| PipelineError::invalid_input("products", "invalid_product_id"))
}

fn unknown_dataset(id: Uuid) -> PipelineError {
    PipelineError::not_found("datasets", format!("no dataset with id {id}"))
}

#[derive(Debug)]
enum AppError {
    Pipeline(PipelineError),
}

impl From<PipelineError> for AppError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Pipeline(err) => {
                let status = match err.kind() {
                    PipelineErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                    PipelineErrorKind::NotFound => StatusCode::NOT_FOUND,
                    PipelineErrorKind::Conflict => StatusCode::CONFLICT,
                    PipelineErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let payload = ApiError {
                    error: err.stage().to_string(),
                    detail: Some(err.detail().to_string()),
                };
                (status, Json(payload)).into_response()
            }
        }
    }
}

/// Console output follows `RUST_LOG`; per-row upload outcomes are also
/// appended to the process log file. The returned guard flushes that file
/// and must outlive the server.
fn init_tracing() -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    let path = std::env::var("PROCESS_LOG_PATH")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PROCESS_LOG.to_string());
    let path = std::path::Path::new(&path);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let file = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| DEFAULT_PROCESS_LOG.into());
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_filter(filter))
        .with(process_log_layer(writer))
        .try_init();
    guard
}
