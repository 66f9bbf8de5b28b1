use crate::catalog::{Catalog, CatalogError, HttpFetcher, PageFetcher, config::SCRAPE_DELAY};
use crate::dataset::{Dataset, Row, UploadStatus};
use crate::models::{PhaseReport, RowWarning};
use crate::pricing;
use crate::shop::{
    CredentialOverrides, ProductDraft, ShopCredentials, ShopSession, Storefront, upload_product,
};
use chrono::Utc;
use std::{collections::HashMap, time::Instant};
use thiserror::Error;
use tokio::time::{Duration, sleep};
use tracing::{Level, Subscriber, error, info, warn};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{self, MakeWriter},
    registry::LookupSpan,
};

/// Target of the append-only per-row upload log.
pub const PROCESS_LOG_TARGET: &str = "gtinsync.process";

/// Plain-text layer that writes only the per-row upload lines to `writer`.
pub fn process_log_layer<S, W>(writer: W) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(Targets::new().with_target(PROCESS_LOG_TARGET, Level::INFO))
}

pub struct Pipeline<F = HttpFetcher> {
    catalog: Catalog<F>,
    config: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause after every scraped row, whatever its outcome.
    pub row_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            row_delay: *SCRAPE_DELAY,
        }
    }
}

impl Pipeline<HttpFetcher> {
    pub fn from_env() -> Result<Self, PipelineError> {
        let catalog =
            Catalog::from_env().map_err(|err| PipelineError::internal("catalog", err.to_string()))?;
        Ok(Self::new(catalog, PipelineConfig::default()))
    }
}

impl<F: PageFetcher> Pipeline<F> {
    pub fn new(catalog: Catalog<F>, config: PipelineConfig) -> Self {
        Self { catalog, config }
    }

    /// Phase 1: look up, scrape and price every row in order.
    ///
    /// Catalog failures never stop the pass; they become warnings and leave
    /// the row's link, description or image empty.
    pub async fn scrape(&self, dataset: &mut Dataset) -> PhaseReport {
        let started = Instant::now();
        let mut links: HashMap<String, Option<String>> = HashMap::new();
        let mut warnings = Vec::new();
        let mut succeeded = 0;

        for (idx, row) in dataset.rows_mut().iter_mut().enumerate() {
            let gtin = row.gtin.trim().to_string();

            let cached = links.get(&gtin).cloned();
            let link = match cached {
                Some(link) => link,
                None => {
                    let link = match self.catalog.product_link(&gtin).await {
                        Ok(link) => link,
                        Err(err) => {
                            let message = format!("Error fetching data for GTIN {gtin}: {err}");
                            record_warning(&mut warnings, idx, &gtin, message);
                            None
                        }
                    };
                    links.insert(gtin.clone(), link.clone());
                    link
                }
            };

            let (description, image_url) = match link.as_deref() {
                Some(link) => match self.catalog.product_details(link).await {
                    Ok(details) => (Some(details.description), details.image_url),
                    Err(err) => {
                        let message = details_warning(link, &err);
                        record_warning(&mut warnings, idx, &gtin, message);
                        (None, None)
                    }
                },
                None => (None, None),
            };

            let enriched = description.is_some();
            if enriched {
                succeeded += 1;
            }
            crate::metrics::row_outcome("scrape", if enriched { "enriched" } else { "empty" });

            row.link = link;
            row.description = description;
            row.image_url = image_url;
            row.selling_price = pricing::selling_price(row.cost);

            if !self.config.row_delay.is_zero() {
                sleep(self.config.row_delay).await;
            }
        }

        dataset.mark_scraped();
        finish_report("scrape", dataset.len(), succeeded, warnings, started)
    }

    /// Phase 2 against the live store. Credentials are resolved only once
    /// the dataset is known to be scraped; the session is released when this
    /// returns, on success or failure.
    pub async fn upload_with_credentials(
        &self,
        overrides: &CredentialOverrides,
        dataset: &mut Dataset,
    ) -> Result<PhaseReport, PipelineError> {
        ensure_scraped(dataset)?;
        let credentials = ShopCredentials::resolve(overrides)
            .map_err(|err| PipelineError::invalid_input("credentials", err.to_string()))?;
        let session = ShopSession::open(credentials);
        self.upload(&session, dataset).await
    }

    /// Phase 2: create one product per row and record its id or failure.
    pub async fn upload<S: Storefront>(
        &self,
        storefront: &S,
        dataset: &mut Dataset,
    ) -> Result<PhaseReport, PipelineError> {
        ensure_scraped(dataset)?;
        let started = Instant::now();

        for row in dataset.rows_mut() {
            if row.upload_status.is_none() {
                row.upload_status = Some(UploadStatus::Pending);
            }
        }

        let mut warnings = Vec::new();
        let mut succeeded = 0;
        for (idx, row) in dataset.rows_mut().iter_mut().enumerate() {
            let draft = draft_from_row(row);
            match upload_product(storefront, &draft).await {
                Ok(product_id) => {
                    info!(
                        target: PROCESS_LOG_TARGET,
                        "Successfully uploaded: {}, Product ID: {}", row.name, product_id
                    );
                    row.product_id = Some(product_id.to_string());
                    row.upload_status = Some(UploadStatus::Active);
                    succeeded += 1;
                    crate::metrics::row_outcome("upload", "active");
                }
                Err(err) => {
                    error!(
                        target: PROCESS_LOG_TARGET,
                        "Failed to upload product {}: {}", row.name, err
                    );
                    row.upload_status = Some(UploadStatus::Failed(err.to_string()));
                    warnings.push(RowWarning {
                        row: idx,
                        gtin: row.gtin.clone(),
                        message: err.to_string(),
                    });
                    crate::metrics::row_outcome("upload", "failed");
                }
            }
        }

        dataset.mark_uploaded();
        Ok(finish_report(
            "upload",
            dataset.len(),
            succeeded,
            warnings,
            started,
        ))
    }
}

fn ensure_scraped(dataset: &Dataset) -> Result<(), PipelineError> {
    if dataset.is_scraped() {
        Ok(())
    } else {
        Err(PipelineError::conflict(
            "upload",
            "dataset has not been scraped yet",
        ))
    }
}

/// Fills the gaps a row may have after scraping with upload-safe defaults.
fn draft_from_row(row: &Row) -> ProductDraft {
    ProductDraft {
        name: row.name.clone(),
        description: row.description.clone().unwrap_or_default(),
        price: row.selling_price.unwrap_or(0.0),
        image_url: row.image_url.clone().filter(|src| !src.is_empty()),
        sku: row.gtin.trim().to_string(),
        inventory: row.inventory.unwrap_or(0),
    }
}

fn details_warning(link: &str, err: &CatalogError) -> String {
    format!("Error fetching product details for URL {link}: {err}")
}

fn record_warning(warnings: &mut Vec<RowWarning>, row: usize, gtin: &str, message: String) {
    warn!(target = "gtinsync.pipeline", row, gtin, "{message}");
    warnings.push(RowWarning {
        row,
        gtin: gtin.to_string(),
        message,
    });
}

fn finish_report(
    phase: &'static str,
    rows: usize,
    succeeded: usize,
    warnings: Vec<RowWarning>,
    started: Instant,
) -> PhaseReport {
    let elapsed_ms = started.elapsed().as_millis();
    crate::metrics::phase_elapsed(phase, elapsed_ms);
    info!(
        target = "gtinsync.pipeline",
        phase,
        rows,
        succeeded,
        warnings = warnings.len(),
        elapsed_ms = elapsed_ms as u64,
        "phase finished"
    );
    PhaseReport {
        phase,
        rows,
        succeeded,
        failed: rows - succeeded,
        warnings,
        elapsed_ms,
        finished_at: Utc::now(),
    }
}

#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {message}")]
pub struct PipelineError {
    stage: &'static str,
    message: String,
    kind: PipelineErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    Internal,
}

impl PipelineError {
    pub fn invalid_input(stage: &'static str, message: impl Into<String>) -> Self {
        Self::with_kind(stage, message, PipelineErrorKind::InvalidInput)
    }

    pub fn not_found(stage: &'static str, message: impl Into<String>) -> Self {
        Self::with_kind(stage, message, PipelineErrorKind::NotFound)
    }

    pub fn conflict(stage: &'static str, message: impl Into<String>) -> Self {
        Self::with_kind(stage, message, PipelineErrorKind::Conflict)
    }

    pub fn internal(stage: &'static str, message: impl Into<String>) -> Self {
        Self::with_kind(stage, message, PipelineErrorKind::Internal)
    }

    fn with_kind(stage: &'static str, message: impl Into<String>, kind: PipelineErrorKind) -> Self {
        Self {
            stage,
            message: message.into(),
            kind,
        }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn kind(&self) -> PipelineErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.message
    }
}
