//! Google Sheets API v4 — spreadsheet metadata, sheet CRUD, and cell values.
//!
//! Covers the handful of operations the pipelines use: spreadsheet get,
//! addSheet/deleteSheet via batchUpdate, and values get/update/batchUpdate.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::GoogleApiError;

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

/// Per-sheet metadata from the spreadsheet get call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// One contiguous range of cells for a values write.
///
/// Cells are raw JSON values: strings stay strings, and a literal number is
/// written as a number (the projector writes 0 for blank cells).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    pub range: String,
    pub values: Vec<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,
}

impl ValueRange {
    pub fn rows(range: impl Into<String>, values: Vec<Vec<serde_json::Value>>) -> Self {
        Self {
            range: range.into(),
            values,
            major_dimension: Some("ROWS".to_string()),
        }
    }
}

/// How the API should render cell values on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRender {
    /// Return formula text instead of the computed value.
    Formula,
    FormattedValue,
}

impl ValueRender {
    fn as_param(self) -> &'static str {
        match self {
            ValueRender::Formula => "FORMULA",
            ValueRender::FormattedValue => "FORMATTED_VALUE",
        }
    }
}

/// How the API should interpret written values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueInput {
    /// Store as-is, no parsing.
    Raw,
    /// Parse as if typed into the UI (formulas become formulas).
    UserEntered,
}

impl ValueInput {
    fn as_param(self) -> &'static str {
        match self {
            ValueInput::Raw => "RAW",
            ValueInput::UserEntered => "USER_ENTERED",
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Thin typed client over the Sheets v4 REST surface.
///
/// One instance per run: bearer token + spreadsheet id. Errors are not
/// retried; the first failed call aborts the pipeline.
pub struct SheetsClient {
    http: reqwest::Client,
    access_token: String,
    spreadsheet_id: String,
}

impl SheetsClient {
    pub fn new(access_token: impl Into<String>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: access_token.into(),
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/{}{}", SHEETS_BASE_URL, self.spreadsheet_id, suffix)
    }

    /// Fetch sheet metadata for the spreadsheet.
    pub async fn sheet_properties(&self) -> Result<Vec<SheetProperties>, GoogleApiError> {
        let resp = self
            .http
            .get(self.url(""))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body: SpreadsheetResponse = resp.json().await?;
        Ok(body.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Look up a sheet id by title. `None` if no such sheet.
    pub async fn sheet_id(&self, title: &str) -> Result<Option<i64>, GoogleApiError> {
        let sheets = self.sheet_properties().await?;
        Ok(sheets
            .into_iter()
            .find(|p| p.title == title)
            .map(|p| p.sheet_id))
    }

    pub async fn sheet_exists(&self, title: &str) -> Result<bool, GoogleApiError> {
        Ok(self.sheet_id(title).await?.is_some())
    }

    /// Create a new sheet, optionally sized to (rows, columns).
    pub async fn add_sheet(
        &self,
        title: &str,
        grid: Option<(usize, usize)>,
    ) -> Result<(), GoogleApiError> {
        let mut properties = json!({ "title": title });
        if let Some((rows, cols)) = grid {
            properties["gridProperties"] = json!({
                "rowCount": rows,
                "columnCount": cols,
            });
        }
        let body = json!({
            "requests": [{ "addSheet": { "properties": properties } }]
        });
        self.batch_update(&body).await
    }

    /// Delete a sheet by id. Destructive, no backup.
    pub async fn delete_sheet(&self, sheet_id: i64) -> Result<(), GoogleApiError> {
        let body = json!({
            "requests": [{ "deleteSheet": { "sheetId": sheet_id } }]
        });
        self.batch_update(&body).await
    }

    async fn batch_update(&self, body: &serde_json::Value) -> Result<(), GoogleApiError> {
        let resp = self
            .http
            .post(self.url(":batchUpdate"))
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Read a range of values. Non-string cells are stringified.
    pub async fn values_get(
        &self,
        range: &str,
        render: ValueRender,
    ) -> Result<Vec<Vec<String>>, GoogleApiError> {
        let resp = self
            .http
            .get(self.url(&format!("/values/{}", encode_range(range))))
            .bearer_auth(&self.access_token)
            .query(&[("valueRenderOption", render.as_param())])
            .send()
            .await?;
        let resp = check_status(resp).await?;
        let body: ValuesResponse = resp.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }

    /// Write a single range of values.
    pub async fn values_update(
        &self,
        range: &str,
        input: ValueInput,
        values: Vec<Vec<serde_json::Value>>,
    ) -> Result<(), GoogleApiError> {
        let resp = self
            .http
            .put(self.url(&format!("/values/{}", encode_range(range))))
            .bearer_auth(&self.access_token)
            .query(&[("valueInputOption", input.as_param())])
            .json(&json!({ "range": range, "values": values }))
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    /// Write many ranges in one call.
    pub async fn values_batch_update(
        &self,
        input: ValueInput,
        data: Vec<ValueRange>,
    ) -> Result<(), GoogleApiError> {
        let body = json!({
            "valueInputOption": input.as_param(),
            "data": data,
        });
        let resp = self
            .http
            .post(self.url("/values:batchUpdate"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dimension probes
    // ------------------------------------------------------------------

    /// Occupied row count: non-empty rows of column A.
    pub async fn occupied_rows(&self, sheet: &str) -> Result<usize, GoogleApiError> {
        let values = self
            .values_get(&format!("{}!A:A", sheet), ValueRender::FormattedValue)
            .await?;
        Ok(values.len())
    }

    /// Width of a given 1-based row.
    pub async fn row_width(&self, sheet: &str, row: usize) -> Result<usize, GoogleApiError> {
        let values = self
            .values_get(&format!("{}!{}:{}", sheet, row, row), ValueRender::FormattedValue)
            .await?;
        Ok(values.first().map(|r| r.len()).unwrap_or(0))
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GoogleApiError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::AuthExpired);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Percent-encode the characters in an A1 range that are unsafe in a URL
/// path (sheet names may contain spaces).
fn encode_range(range: &str) -> String {
    range.replace('%', "%25").replace(' ', "%20")
}
