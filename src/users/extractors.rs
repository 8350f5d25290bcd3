use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON body whose parse failures become `400` validation errors.
///
/// Unlike `axum::Json` it does not insist on a `Content-Type` header.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Validation(format!("malformed JSON body: {e}")))?;
        Ok(JsonBody(value))
    }
}
