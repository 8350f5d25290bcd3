pub mod google;
pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::{auth::AccessToken, error::ApiError};

pub use google::GoogleSheets;
pub use memory::MemorySheet;

/// Cell values keyed by header name.
pub type Record = BTreeMap<String, String>;

/// One data row. `number` is the 1-based sheet row; the header is row 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub number: usize,
    pub values: Vec<String>,
}

/// Header and data rows of a single worksheet, loaded for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub sheet_id: i64,
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Worksheet {
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    pub fn get<'a>(&self, row: &'a Row, column: &str) -> Option<&'a str> {
        self.column_index(column)
            .and_then(|i| row.values.get(i))
            .map(String::as_str)
    }

    /// Overwrites the given columns of `row`, leaving the others alone.
    pub fn assign(&self, row: &mut Row, record: &Record) -> Result<(), ApiError> {
        row.values.resize(self.headers.len(), String::new());
        for (column, value) in record {
            let i = self.column_index(column).ok_or_else(|| {
                ApiError::Config(format!("column `{column}` is not in the worksheet header"))
            })?;
            row.values[i] = value.clone();
        }
        Ok(())
    }

    /// Lays a record out in header order, blank for missing columns.
    pub fn row_values(&self, record: &Record) -> Result<Vec<String>, ApiError> {
        let mut row = Row {
            number: 0,
            values: Vec::new(),
        };
        self.assign(&mut row, record)?;
        Ok(row.values)
    }

    /// A1 reference of the cell at `column` in `row`.
    pub fn cell_range(&self, row: &Row, column: &str) -> Result<String, ApiError> {
        let i = self.column_index(column).ok_or_else(|| {
            ApiError::Config(format!("column `{column}` is not in the worksheet header"))
        })?;
        Ok(format!(
            "{}!{}{}",
            quote_title(&self.title),
            column_letter(i),
            row.number
        ))
    }
}

/// Zero-based column index to its A1 letter (0 -> A, 26 -> AA).
pub fn column_letter(mut index: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

pub fn quote_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Row-level access to the backing spreadsheet.
///
/// Implementations hold no state between requests: every request authenticates
/// and reloads the worksheet before reading or writing it.
#[async_trait]
pub trait SheetGateway: Send + Sync {
    async fn authenticate(&self) -> Result<AccessToken, ApiError>;

    /// Loads header and data rows of the first worksheet.
    async fn list_rows(&self, token: &AccessToken) -> Result<Worksheet, ApiError>;

    /// Appends records in order after the last row and returns the new rows.
    async fn append_rows(
        &self,
        token: &AccessToken,
        sheet: &Worksheet,
        records: &[Record],
    ) -> Result<Vec<Row>, ApiError>;

    /// Writes only the cells named in `changes`; the rest of the row is untouched.
    async fn update_row(
        &self,
        token: &AccessToken,
        sheet: &Worksheet,
        row: &Row,
        changes: &Record,
    ) -> Result<(), ApiError>;

    async fn delete_row(
        &self,
        token: &AccessToken,
        sheet: &Worksheet,
        row: &Row,
    ) -> Result<(), ApiError>;
}

/// Authenticates and loads the worksheet in one go.
pub async fn open(gateway: &dyn SheetGateway) -> Result<(AccessToken, Worksheet), ApiError> {
    let token = gateway.authenticate().await?;
    let sheet = gateway.list_rows(&token).await?;
    Ok((token, sheet))
}
