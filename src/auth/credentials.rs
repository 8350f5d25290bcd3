use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::ApiError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

/// The fields of a Google service-account key file this service uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(input: &str) -> Result<Self, ApiError> {
        let key: Self = serde_json::from_str(input)
            .map_err(|e| ApiError::Config(format!("malformed service account key: {e}")))?;

        for (name, value) in [
            ("client_email", &key.client_email),
            ("private_key", &key.private_key),
            ("private_key_id", &key.private_key_id),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::Config(format!("service account key has empty {name}")));
            }
        }
        Ok(key)
    }

    pub async fn from_file(path: &Path) -> Result<Self, ApiError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            ApiError::Config(format!("cannot read credentials {}: {e}", path.display()))
        })?;
        let key = Self::from_json(&text)?;
        debug!(client_email = %key.client_email, "service account key loaded");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FIXTURE: &str = include_str!("../../fixtures/service_account.json");

    #[test]
    fn parses_fixture_key() {
        let key = ServiceAccountKey::from_json(FIXTURE).expect("fixture parses");
        assert!(key.client_email.ends_with("iam.gserviceaccount.com"));
        assert_eq!(key.private_key_id, "0123456789abcdef");
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn missing_fields_are_config_errors() {
        let err = ServiceAccountKey::from_json(r#"{"client_email":"a@b.c"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));

        let err = ServiceAccountKey::from_json(
            r#"{"client_email":"a@b.c","private_key":"","private_key_id":"k"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("private_key"));
    }

    #[tokio::test]
    async fn reads_key_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();

        let key = ServiceAccountKey::from_file(file.path()).await.unwrap();
        assert_eq!(key.private_key_id, "0123456789abcdef");
    }

    #[tokio::test]
    async fn unreadable_file_is_config_error() {
        let err = ServiceAccountKey::from_file(Path::new("./does-not-exist.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
