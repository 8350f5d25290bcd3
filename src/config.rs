use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CREDENTIALS_PATH: &str = "./client_secret.json";
pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Worksheet header names for each user field.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ColumnMap {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: "id".into(),
            first_name: "firstName".into(),
            last_name: "lastName".into(),
            email: "email".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Google,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    pub sheet_id: String,
    pub credentials_path: PathBuf,
    pub api_base: String,
    pub timeout: Duration,
}

/// `SHEETS_TIMEOUT_SECS`: unset means 30 seconds; zero or garbage is an error.
pub fn parse_timeout(raw: Option<&str>) -> anyhow::Result<Duration> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    };
    let secs = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("SHEETS_TIMEOUT_SECS `{raw}` is not a number of seconds"))?;
    if secs == 0 {
        anyhow::bail!("SHEETS_TIMEOUT_SECS must be greater than zero");
    }
    Ok(Duration::from_secs(secs))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: Backend,
    pub sheets: SheetsConfig,
    pub columns: ColumnMap,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match std::env::var("SHEET_BACKEND")
            .unwrap_or_else(|_| "google".into())
            .to_lowercase()
            .as_str()
        {
            "google" => Backend::Google,
            "memory" => Backend::Memory,
            other => anyhow::bail!("unsupported SHEET_BACKEND `{other}`, use `google` or `memory`"),
        };

        // The in-memory backend has no spreadsheet to bind to.
        let sheet_id = match backend {
            Backend::Google => std::env::var("SHEET_ID")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .context("SHEET_ID must be set")?,
            Backend::Memory => std::env::var("SHEET_ID").unwrap_or_else(|_| "memory".into()),
        };

        let sheets = SheetsConfig {
            sheet_id,
            credentials_path: std::env::var("GOOGLE_CREDENTIALS_PATH")
                .unwrap_or_else(|_| DEFAULT_CREDENTIALS_PATH.into())
                .into(),
            api_base: std::env::var("SHEETS_API_BASE")
                .unwrap_or_else(|_| DEFAULT_SHEETS_API_BASE.into()),
            timeout: parse_timeout(std::env::var("SHEETS_TIMEOUT_SECS").ok().as_deref())?,
        };

        let defaults = ColumnMap::default();
        let columns = ColumnMap {
            id: std::env::var("COLUMN_ID").unwrap_or(defaults.id),
            first_name: std::env::var("COLUMN_FIRST_NAME").unwrap_or(defaults.first_name),
            last_name: std::env::var("COLUMN_LAST_NAME").unwrap_or(defaults.last_name),
            email: std::env::var("COLUMN_EMAIL").unwrap_or(defaults.email),
        };

        Ok(Self {
            backend,
            sheets,
            columns,
        })
    }
}
