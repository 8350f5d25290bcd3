use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Record, Row, SheetGateway, Worksheet};
use crate::{auth::AccessToken, error::ApiError};

/// A worksheet held in process memory.
///
/// Row numbers behave like a real sheet: deleting a row shifts the ones below
/// it up by one.
pub struct MemorySheet {
    table: RwLock<Worksheet>,
}

impl MemorySheet {
    pub fn new(headers: Vec<String>) -> Self {
        Self::with_rows(headers, Vec::new())
    }

    pub fn with_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| Row {
                number: i + 2,
                values,
            })
            .collect();
        Self {
            table: RwLock::new(Worksheet {
                sheet_id: 0,
                title: "Sheet1".into(),
                headers,
                rows,
            }),
        }
    }
}

#[async_trait]
impl SheetGateway for MemorySheet {
    async fn authenticate(&self) -> Result<AccessToken, ApiError> {
        Ok(AccessToken::bearer("memory"))
    }

    async fn list_rows(&self, _token: &AccessToken) -> Result<Worksheet, ApiError> {
        Ok(self.table.read().await.clone())
    }

    async fn append_rows(
        &self,
        _token: &AccessToken,
        _sheet: &Worksheet,
        records: &[Record],
    ) -> Result<Vec<Row>, ApiError> {
        let mut table = self.table.write().await;
        let mut created = Vec::with_capacity(records.len());
        for record in records {
            let row = Row {
                number: table.rows.last().map_or(2, |r| r.number + 1),
                values: table.row_values(record)?,
            };
            table.rows.push(row.clone());
            created.push(row);
        }
        debug!(count = created.len(), "rows appended");
        Ok(created)
    }

    async fn update_row(
        &self,
        _token: &AccessToken,
        _sheet: &Worksheet,
        row: &Row,
        changes: &Record,
    ) -> Result<(), ApiError> {
        let mut table = self.table.write().await;
        let pos = table
            .rows
            .iter()
            .position(|r| r.number == row.number)
            .ok_or_else(|| ApiError::Remote(format!("row {} no longer exists", row.number)))?;
        let mut target = table.rows[pos].clone();
        table.assign(&mut target, changes)?;
        table.rows[pos] = target;
        Ok(())
    }

    async fn delete_row(
        &self,
        _token: &AccessToken,
        _sheet: &Worksheet,
        row: &Row,
    ) -> Result<(), ApiError> {
        let mut table = self.table.write().await;
        let pos = table
            .rows
            .iter()
            .position(|r| r.number == row.number)
            .ok_or_else(|| ApiError::Remote(format!("row {} no longer exists", row.number)))?;
        table.rows.remove(pos);
        for r in table.rows.iter_mut().skip(pos) {
            r.number -= 1;
        }
        Ok(())
    }
}
