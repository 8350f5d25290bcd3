use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::{quote_title, Record, Row, SheetGateway, Worksheet};
use crate::{
    auth::{fetch_access_token, AccessToken, ServiceAccountKey},
    config::SheetsConfig,
    error::ApiError,
};

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
    #[serde(default)]
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct AppendResponse {
    updates: AppendUpdates,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppendUpdates {
    updated_range: String,
}

/// Google Sheets v4 client bound to one spreadsheet.
pub struct GoogleSheets {
    http: reqwest::Client,
    config: SheetsConfig,
}

impl GoogleSheets {
    pub fn new(config: SheetsConfig) -> anyhow::Result<Self> {
        if config.sheet_id.trim().is_empty() {
            anyhow::bail!("spreadsheet id is empty");
        }
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| ApiError::Config(format!("invalid sheets api base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Config("sheets api base cannot hold a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn spreadsheet_url(&self, suffix: &str) -> Result<Url, ApiError> {
        let id = format!("{}{suffix}", self.config.sheet_id);
        self.url(&["spreadsheets", &id])
    }

    fn values_url(&self, range: &str) -> Result<Url, ApiError> {
        self.url(&["spreadsheets", &self.config.sheet_id, "values", range])
    }

    fn values_batch_url(&self) -> Result<Url, ApiError> {
        self.url(&["spreadsheets", &self.config.sheet_id, "values:batchUpdate"])
    }

    async fn first_sheet(&self, token: &AccessToken) -> Result<SheetProperties, ApiError> {
        let meta = self
            .http
            .get(self.spreadsheet_url("")?)
            .query(&[("fields", "sheets.properties")])
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<SpreadsheetMeta>()
            .await?;

        meta.sheets
            .into_iter()
            .map(|s| s.properties)
            .min_by_key(|p| p.index)
            .ok_or_else(|| ApiError::Remote("spreadsheet has no worksheets".into()))
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// First row number of an A1 range such as `Sheet1!A5:D6`.
fn start_row(range: &str) -> Option<usize> {
    let cells = range.rsplit_once('!').map_or(range, |(_, cells)| cells);
    let first = cells.split(':').next()?;
    first
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .parse()
        .ok()
}

#[async_trait]
impl SheetGateway for GoogleSheets {
    async fn authenticate(&self) -> Result<AccessToken, ApiError> {
        let key = ServiceAccountKey::from_file(&self.config.credentials_path).await?;
        fetch_access_token(&self.http, &key).await
    }

    #[instrument(skip_all, fields(sheet_id = %self.config.sheet_id))]
    async fn list_rows(&self, token: &AccessToken) -> Result<Worksheet, ApiError> {
        let props = self.first_sheet(token).await?;

        let range = self
            .http
            .get(self.values_url(&quote_title(&props.title))?)
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json::<ValueRange>()
            .await?;

        let mut values = range.values.into_iter();
        let headers: Vec<String> = values
            .next()
            .map(|h| h.into_iter().map(cell_text).collect())
            .unwrap_or_default();

        let rows: Vec<Row> = values
            .enumerate()
            .filter_map(|(i, cells)| {
                let mut cells: Vec<String> = cells.into_iter().map(cell_text).collect();
                if cells.iter().all(|c| c.is_empty()) {
                    return None;
                }
                cells.resize(headers.len().max(cells.len()), String::new());
                Some(Row {
                    number: i + 2,
                    values: cells,
                })
            })
            .collect();

        debug!(title = %props.title, columns = headers.len(), rows = rows.len(), "worksheet loaded");
        Ok(Worksheet {
            sheet_id: props.sheet_id,
            title: props.title,
            headers,
            rows,
        })
    }

    #[instrument(skip_all, fields(sheet_id = %self.config.sheet_id, count = records.len()))]
    async fn append_rows(
        &self,
        token: &AccessToken,
        sheet: &Worksheet,
        records: &[Record],
    ) -> Result<Vec<Row>, ApiError> {
        let values = records
            .iter()
            .map(|r| sheet.row_values(r))
            .collect::<Result<Vec<_>, _>>()?;

        let append = format!("{}:append", quote_title(&sheet.title));
        let resp = self
            .http
            .post(self.values_url(&append)?)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&token.access_token)
            .json(&json!({ "majorDimension": "ROWS", "values": values }))
            .send()
            .await?
            .error_for_status()?
            .json::<AppendResponse>()
            .await?;

        let first = start_row(&resp.updates.updated_range).ok_or_else(|| {
            ApiError::Remote(format!(
                "unexpected append range `{}`",
                resp.updates.updated_range
            ))
        })?;
        debug!(range = %resp.updates.updated_range, "rows appended");

        Ok(values
            .into_iter()
            .enumerate()
            .map(|(i, values)| Row {
                number: first + i,
                values,
            })
            .collect())
    }

    #[instrument(skip_all, fields(sheet_id = %self.config.sheet_id, row = row.number))]
    async fn update_row(
        &self,
        token: &AccessToken,
        sheet: &Worksheet,
        row: &Row,
        changes: &Record,
    ) -> Result<(), ApiError> {
        if changes.is_empty() {
            return Ok(());
        }
        let data = changes
            .iter()
            .map(|(column, value)| {
                Ok(json!({ "range": sheet.cell_range(row, column)?, "values": [[value]] }))
            })
            .collect::<Result<Vec<_>, ApiError>>()?;

        self.http
            .post(self.values_batch_url()?)
            .bearer_auth(&token.access_token)
            .json(&json!({ "valueInputOption": "RAW", "data": data }))
            .send()
            .await?
            .error_for_status()?;
        debug!(cells = changes.len(), "row updated");
        Ok(())
    }

    #[instrument(skip_all, fields(sheet_id = %self.config.sheet_id, row = row.number))]
    async fn delete_row(
        &self,
        token: &AccessToken,
        sheet: &Worksheet,
        row: &Row,
    ) -> Result<(), ApiError> {
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet.sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row.number - 1,
                        "endIndex": row.number,
                    }
                }
            }]
        });

        self.http
            .post(self.spreadsheet_url(":batchUpdate")?)
            .bearer_auth(&token.access_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        debug!("row deleted");
        Ok(())
    }
}
