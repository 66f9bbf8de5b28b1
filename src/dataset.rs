use serde::{Deserialize, Serialize, Serializer};
use std::{collections::HashMap, fmt, str::FromStr};
use thiserror::Error;

const BOM: char = '\u{FEFF}';

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Missing columns: [{}]", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: invalid {column} value `{value}`")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("export failed: {0}")]
    Export(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Gtin,
    Name,
    Brand,
    Category,
    Cost,
    Inventory,
    Link,
    Description,
    ImageUrl,
    SellingPrice,
    ProductId,
    UploadStatus,
}

impl Column {
    const REQUIRED: [Column; 6] = [
        Column::Gtin,
        Column::Name,
        Column::Brand,
        Column::Category,
        Column::Cost,
        Column::Inventory,
    ];
    const SCRAPED: [Column; 4] = [
        Column::Link,
        Column::Description,
        Column::ImageUrl,
        Column::SellingPrice,
    ];
    const UPLOADED: [Column; 2] = [Column::ProductId, Column::UploadStatus];

    fn header(self) -> &'static str {
        match self {
            Column::Gtin => "GTIN",
            Column::Name => "Name",
            Column::Brand => "Brand",
            Column::Category => "Category",
            Column::Cost => "€ Price inc. shipping",
            Column::Inventory => "Inventory",
            Column::Link => "Link",
            Column::Description => "Description",
            Column::ImageUrl => "Image_URL",
            Column::SellingPrice => "Selling Price",
            Column::ProductId => "Product ID",
            Column::UploadStatus => "Upload Status",
        }
    }

    fn from_header(header: &str) -> Option<Self> {
        Self::REQUIRED
            .iter()
            .chain(Self::SCRAPED.iter())
            .chain(Self::UPLOADED.iter())
            .copied()
            .find(|column| column.header() == header)
    }
}

/// Outcome of pushing a row to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Active,
    Failed(String),
    /// Status text from an imported sheet that this service did not write.
    Other(String),
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Pending => f.write_str("Pending"),
            UploadStatus::Active => f.write_str("Active"),
            UploadStatus::Failed(reason) => write!(f, "Failed: {reason}"),
            UploadStatus::Other(text) => f.write_str(text),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw {
            "Pending" => UploadStatus::Pending,
            "Active" => UploadStatus::Active,
            other => match other.strip_prefix("Failed:") {
                Some(reason) => UploadStatus::Failed(reason.trim_start().to_string()),
                None => UploadStatus::Other(other.to_string()),
            },
        })
    }
}

impl Serialize for UploadStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    pub gtin: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub cost: Option<f64>,
    pub inventory: Option<i64>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub selling_price: Option<f64>,
    pub product_id: Option<String>,
    pub upload_status: Option<UploadStatus>,
    #[serde(flatten)]
    pub extra: HashMap<String, String>,
}

impl Row {
    fn cell(&self, header: &str) -> String {
        let Some(column) = Column::from_header(header) else {
            return self.extra.get(header).cloned().unwrap_or_default();
        };
        match column {
            Column::Gtin => self.gtin.clone(),
            Column::Name => self.name.clone(),
            Column::Brand => self.brand.clone(),
            Column::Category => self.category.clone(),
            Column::Cost => format_float(self.cost),
            Column::Inventory => self.inventory.map(|v| v.to_string()).unwrap_or_default(),
            Column::Link => self.link.clone().unwrap_or_default(),
            Column::Description => self.description.clone().unwrap_or_default(),
            Column::ImageUrl => self.image_url.clone().unwrap_or_default(),
            Column::SellingPrice => format_float(self.selling_price),
            Column::ProductId => self.product_id.clone().unwrap_or_default(),
            Column::UploadStatus => self
                .upload_status
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }

    fn set_cell(&mut self, row: usize, header: &str, raw: &str) -> Result<(), DatasetError> {
        let Some(column) = Column::from_header(header) else {
            self.extra.insert(header.to_string(), raw.to_string());
            return Ok(());
        };
        let text = non_empty(raw);
        match column {
            Column::Gtin => self.gtin = raw.trim().to_string(),
            Column::Name => self.name = raw.to_string(),
            Column::Brand => self.brand = raw.to_string(),
            Column::Category => self.category = raw.to_string(),
            Column::Cost => self.cost = parse_float(row, column, raw)?,
            Column::Inventory => self.inventory = parse_count(row, raw)?,
            Column::Link => self.link = text,
            Column::Description => self.description = text,
            Column::ImageUrl => self.image_url = text,
            Column::SellingPrice => self.selling_price = parse_float(row, column, raw)?,
            Column::ProductId => self.product_id = text,
            Column::UploadStatus => {
                self.upload_status = text.map(|s| s.parse().unwrap_or(UploadStatus::Pending))
            }
        }
        Ok(())
    }
}

/// Which table to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    Scraped,
    Uploaded,
}

impl ExportStage {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportStage::Scraped => "scraped_data.csv",
            ExportStage::Uploaded => "uploaded_data.csv",
        }
    }

    fn columns(self) -> &'static [Column] {
        match self {
            ExportStage::Scraped => &Column::SCRAPED,
            ExportStage::Uploaded => &[
                Column::Link,
                Column::Description,
                Column::ImageUrl,
                Column::SellingPrice,
                Column::ProductId,
                Column::UploadStatus,
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Row>,
    has_bom: bool,
    scraped: bool,
    uploaded: bool,
}

impl Dataset {
    /// Reads a CSV table, failing before any row is parsed when a required
    /// column is missing.
    pub fn from_csv(text: &str) -> Result<Self, DatasetError> {
        let has_bom = text.starts_with(BOM);
        let text = text.trim_start_matches(BOM);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let missing: Vec<String> = Column::REQUIRED
            .iter()
            .map(|column| column.header())
            .filter(|name| !headers.iter().any(|h| h == name))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns(missing));
        }

        let mut rows = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let mut row = Row::default();
            for (pos, header) in headers.iter().enumerate() {
                row.set_cell(idx, header, record.get(pos).unwrap_or(""))?;
            }
            rows.push(row);
        }

        let has_all = |columns: &[Column]| {
            columns
                .iter()
                .all(|column| headers.iter().any(|h| h == column.header()))
        };
        let scraped = has_all(&Column::SCRAPED);
        let uploaded = scraped && has_all(&Column::UPLOADED);

        Ok(Self {
            headers,
            rows,
            has_bom,
            scraped,
            uploaded,
        })
    }

    /// Writes the table for `stage`: the input columns in their original
    /// order followed by any derived columns the input did not already carry.
    pub fn to_csv(&self, stage: ExportStage) -> Result<String, DatasetError> {
        let mut columns = self.headers.clone();
        for column in stage.columns() {
            if !columns.iter().any(|h| h == column.header()) {
                columns.push(column.header().to_string());
            }
        }

        let mut buffer = Vec::new();
        if self.has_bom {
            buffer.extend_from_slice(BOM.to_string().as_bytes());
        }
        let mut writer = csv::WriterBuilder::new().from_writer(buffer);
        writer.write_record(&columns)?;
        for row in &self.rows {
            writer.write_record(columns.iter().map(|h| row.cell(h)))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| DatasetError::Export(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| DatasetError::Export(err.to_string()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_scraped(&self) -> bool {
        self.scraped
    }

    pub fn is_uploaded(&self) -> bool {
        self.uploaded
    }

    pub(crate) fn mark_scraped(&mut self) {
        self.scraped = true;
    }

    pub(crate) fn mark_uploaded(&mut self) {
        self.uploaded = true;
    }
}

fn non_empty(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn parse_float(row: usize, column: Column, raw: &str) -> Result<Option<f64>, DatasetError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    // NaN and infinities are blanks as far as pricing is concerned
    trimmed
        .parse::<f64>()
        .map(|value| value.is_finite().then_some(value))
        .map_err(|_| DatasetError::InvalidValue {
            row,
            column: column.header(),
            value: raw.to_string(),
        })
}

// Spreadsheets with gaps often export counts as `3.0`.
fn parse_count(row: usize, raw: &str) -> Result<Option<i64>, DatasetError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(count) = trimmed.parse::<i64>() {
        return Ok(Some(count));
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_nan() => Ok(None),
        Ok(value) if value.fract() == 0.0 => Ok(Some(value as i64)),
        _ => Err(DatasetError::InvalidValue {
            row,
            column: Column::Inventory.header(),
            value: raw.to_string(),
        }),
    }
}

fn format_float(value: Option<f64>) -> String {
    value.map(|v| format!("{v:?}")).unwrap_or_default()
}
