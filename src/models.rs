use crate::dataset::{Dataset, Row};
use crate::shop::{CredentialOverrides, ProductStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A problem with one row that did not stop the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    pub row: usize,
    pub gtin: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: &'static str,
    pub rows: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub warnings: Vec<RowWarning>,
    pub elapsed_ms: u128,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub rows: usize,
    pub columns: Vec<String>,
    pub scraped: bool,
    pub uploaded: bool,
    pub preview: Vec<Row>,
}

impl DatasetSummary {
    pub fn new(id: Uuid, created_at: DateTime<Utc>, dataset: &Dataset) -> Self {
        Self {
            id,
            created_at,
            rows: dataset.len(),
            columns: dataset.headers().to_vec(),
            scraped: dataset.is_scraped(),
            uploaded: dataset.is_uploaded(),
            preview: dataset.rows().iter().take(PREVIEW_ROWS).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceUpdateRequest {
    pub price: f64,
    #[serde(flatten)]
    pub credentials: CredentialOverrides,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(flatten)]
    pub credentials: CredentialOverrides,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
