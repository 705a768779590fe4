//! Google Sheets backed wardrobe and history stores.

use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    auth::{SPREADSHEETS_SCOPE, ServiceAccountKey},
    config::{Config, Credentials},
    error::HttpError,
    model::{HistoryRecord, WardrobeItem},
    retry::{RetryPolicy, with_retry},
    store::{HistoryStore, WardrobeStore},
};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

pub const WARDROBE_SHEET: &str = "Wardrobe Catalogue";
pub const HISTORY_SHEET: &str = "History";

#[derive(Debug, Clone)]
pub struct SheetsClient {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    access_token: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    title: String,
    #[serde(default)]
    sheet_id: i64,
}

impl SheetsClient {
    pub fn new(
        http: Client,
        spreadsheet_id: impl Into<String>,
        access_token: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url: SHEETS_API_BASE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            access_token: access_token.into(),
            retry,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Authenticate with the service account from the credentials and open the configured spreadsheet.
    pub async fn connect(config: &Config, credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http.timeout())
            .build()
            .context("Failed to build HTTP client for Google Sheets")?;

        let key = ServiceAccountKey::from_json(&credentials.google_service_account)?;
        let retry = config.http.retry_policy();
        let token = key.access_token(&http, SPREADSHEETS_SCOPE, retry).await?;

        Ok(Self::new(http, config.spreadsheet_id.clone(), token, retry))
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/{}", self.base_url, self.spreadsheet_id)
    }

    /// Values URL for a whole tab, or for `cells` (A1 notation) within it.
    fn range_url(&self, sheet: &str, cells: Option<&str>) -> String {
        let mut range = format!("'{}'", sheet.replace('\'', "''"));
        if let Some(cells) = cells {
            range.push('!');
            range.push_str(cells);
        }
        format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(&range))
    }

    async fn check(response: Response, what: &'static str) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read {what} response body"))?;

        if !status.is_success() {
            return Err(HttpError::new(what, status, &body).into());
        }

        Ok(body)
    }

    async fn sheet_properties(&self) -> Result<Vec<SheetProperties>> {
        let url = self.spreadsheet_url();
        let url = url.as_str();

        let body = with_retry(self.retry, "spreadsheet metadata", move || async move {
            let res = self
                .http
                .get(url)
                .bearer_auth(&self.access_token)
                .query(&[("fields", "sheets.properties(title,sheetId)")])
                .send()
                .await
                .context("Failed to send spreadsheet metadata request")?;
            Self::check(res, "Sheets metadata").await
        })
        .await?;

        let meta: SpreadsheetMeta =
            serde_json::from_str(&body).context("Failed to parse spreadsheet metadata JSON")?;

        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Titles of every tab in the spreadsheet.
    pub async fn sheet_titles(&self) -> Result<Vec<String>> {
        Ok(self
            .sheet_properties()
            .await?
            .into_iter()
            .map(|p| p.title)
            .collect())
    }

    /// Numeric id of the tab called `title`, if there is one.
    async fn find_sheet(&self, title: &str) -> Result<Option<i64>> {
        Ok(self
            .sheet_properties()
            .await?
            .into_iter()
            .find(|p| p.title == title)
            .map(|p| p.sheet_id))
    }

    /// All cell values of a tab as text, row by row.
    pub async fn read_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        self.read_range(sheet, None).await
    }

    async fn read_range(&self, sheet: &str, cells: Option<&str>) -> Result<Vec<Vec<String>>> {
        let url = self.range_url(sheet, cells);
        let url = url.as_str();

        let body = with_retry(self.retry, "sheet read", move || async move {
            let res = self
                .http
                .get(url)
                .bearer_auth(&self.access_token)
                .send()
                .await
                .with_context(|| format!("Failed to send read request for sheet '{sheet}'"))?;
            Self::check(res, "Sheets read").await
        })
        .await?;

        let range: ValueRange = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse values of sheet '{sheet}'"))?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn batch_update(&self, request: Value, what: &str) -> Result<()> {
        let url = format!("{}:batchUpdate", self.spreadsheet_url());
        let body = json!({ "requests": [request] });

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {what}"))?;

        Self::check(res, "Sheets batchUpdate").await?;
        Ok(())
    }

    pub async fn add_sheet(&self, title: &str) -> Result<()> {
        self.batch_update(
            json!({ "addSheet": { "properties": { "title": title } } }),
            &format!("create sheet '{title}'"),
        )
        .await
    }

    /// Shift every row of the tab down by one, leaving row 1 empty.
    async fn insert_first_row(&self, sheet_id: i64) -> Result<()> {
        self.batch_update(
            json!({
                "insertDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": 0,
                        "endIndex": 1
                    },
                    "inheritFromBefore": false
                }
            }),
            "insert a header row",
        )
        .await
    }

    /// Overwrite the cells starting at `cells` with one row.
    async fn write_row(&self, sheet: &str, cells: &str, row: &[String]) -> Result<()> {
        let url = self.range_url(sheet, Some(cells));
        let body = json!({ "values": [row] });

        let res = self
            .http
            .put(&url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW")])
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send update request for sheet '{sheet}'"))?;

        Self::check(res, "Sheets update").await?;
        Ok(())
    }

    /// Append a row below the last non-empty row of the tab.
    pub async fn append_row(&self, sheet: &str, row: &[String]) -> Result<()> {
        let url = format!("{}:append", self.range_url(sheet, None));
        let body = json!({ "values": [row] });

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to send append request for sheet '{sheet}'"))?;

        Self::check(res, "Sheets append").await?;
        Ok(())
    }

    /// Make sure the history tab exists and starts with the header row.
    async fn prepare_history_sheet(&self) -> Result<()> {
        let header = history_header();

        let Some(sheet_id) = self.find_sheet(HISTORY_SHEET).await? else {
            tracing::info!(sheet = HISTORY_SHEET, "history sheet missing, creating it");
            self.add_sheet(HISTORY_SHEET).await?;
            return self.append_row(HISTORY_SHEET, &header).await;
        };

        let first = self.read_range(HISTORY_SHEET, Some("1:1")).await?;
        match first.first() {
            None => {
                tracing::info!(sheet = HISTORY_SHEET, "history sheet is blank, writing header");
                self.append_row(HISTORY_SHEET, &header).await
            }
            Some(row) if is_history_header(row) => Ok(()),
            Some(_) => {
                tracing::warn!(sheet = HISTORY_SHEET, "history sheet has no header row, inserting one");
                self.insert_first_row(sheet_id).await?;
                self.write_row(HISTORY_SHEET, "A1", &header).await
            }
        }
    }
}

fn history_header() -> Vec<String> {
    HistoryRecord::HEADER.iter().map(|h| h.to_string()).collect()
}

/// Row 1 counts as the header when it has a `Date` column heading.
fn is_history_header(row: &[String]) -> bool {
    row.iter().any(|cell| cell.trim().eq_ignore_ascii_case(HistoryRecord::HEADER[0]))
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Turn header + data rows into one map per row, keyed by trimmed header name.
/// Short rows leave their trailing columns out.
fn rows_to_records(rows: &[Vec<String>]) -> Vec<HashMap<&str, &str>> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };
    let header: Vec<&str> = header.iter().map(|h| h.trim()).collect();
    keyed_by(&header, data)
}

fn keyed_by<'a>(header: &[&'a str], data: &'a [Vec<String>]) -> Vec<HashMap<&'a str, &'a str>> {
    data.iter()
        .map(|row| {
            header
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (*h, v.as_str()))
                .collect()
        })
        .collect()
}

fn field(record: &HashMap<&str, &str>, name: &str) -> Option<String> {
    record
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn wardrobe_from_rows(rows: &[Vec<String>]) -> Vec<WardrobeItem> {
    rows_to_records(rows)
        .iter()
        .filter_map(|record| {
            let name = field(record, "Item")?;
            Some(WardrobeItem {
                name,
                category: field(record, "Category").unwrap_or_default(),
                pillar: field(record, "Pillar"),
                description: field(record, "Description"),
                quantity: WardrobeItem::parse_quantity(record.get("Quantity").copied()),
            })
        })
        .collect()
}

/// History rows keyed by the header row. A tab that lost its header is read
/// in canonical column order instead.
fn history_from_rows(rows: &[Vec<String>]) -> Vec<HistoryRecord> {
    let records = match rows.first() {
        Some(first) if !is_history_header(first) => keyed_by(&HistoryRecord::HEADER, rows),
        _ => rows_to_records(rows),
    };

    records
        .iter()
        .map(|record| {
            let get = |name| field(record, name).unwrap_or_default();
            HistoryRecord {
                date: get("Date"),
                top: get("Top"),
                bottom: get("Bottom"),
                shoes: get("Shoes"),
                outer: get("Outer"),
                accessory: get("Accessory"),
            }
        })
        .collect()
}

#[async_trait]
impl WardrobeStore for SheetsClient {
    #[tracing::instrument(skip(self))]
    async fn wardrobe(&self) -> Result<Vec<WardrobeItem>> {
        let rows = self.read_rows(WARDROBE_SHEET).await?;
        Ok(wardrobe_from_rows(&rows))
    }
}

#[async_trait]
impl HistoryStore for SheetsClient {
    /// Read-only: a missing tab is just an empty history.
    #[tracing::instrument(skip(self))]
    async fn history(&self) -> Result<Vec<HistoryRecord>> {
        if self.find_sheet(HISTORY_SHEET).await?.is_none() {
            tracing::debug!(sheet = HISTORY_SHEET, "no history sheet yet");
            return Ok(Vec::new());
        }

        let rows = self.read_rows(HISTORY_SHEET).await?;
        Ok(history_from_rows(&rows))
    }

    #[tracing::instrument(skip(self, record), fields(date = %record.date))]
    async fn append(&self, record: &HistoryRecord) -> Result<()> {
        self.prepare_history_sheet().await?;
        self.append_row(HISTORY_SHEET, &record.to_row()).await
    }
}
