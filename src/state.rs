use crate::config::{AppConfig, Backend};
use crate::sheets::{GoogleSheets, MemorySheet, SheetGateway};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sheets: Arc<dyn SheetGateway>,
}

impl AppState {
    pub fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let sheets = match config.backend {
            Backend::Google => {
                Arc::new(GoogleSheets::new(config.sheets.clone())?) as Arc<dyn SheetGateway>
            }
            Backend::Memory => {
                let c = &config.columns;
                Arc::new(MemorySheet::new(vec![
                    c.id.clone(),
                    c.first_name.clone(),
                    c.last_name.clone(),
                    c.email.clone(),
                ])) as Arc<dyn SheetGateway>
            }
        };

        tracing::info!(backend = ?config.backend, sheet_id = %config.sheets.sheet_id, "spreadsheet gateway ready");
        Ok(Self { config, sheets })
    }

    pub fn from_parts(config: Arc<AppConfig>, sheets: Arc<dyn SheetGateway>) -> Self {
        Self { config, sheets }
    }
}
