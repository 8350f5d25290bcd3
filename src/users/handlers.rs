use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateUsersRequest, MessageResponse, PartialUser, User},
    extractors::JsonBody,
    services,
};
use crate::{error::ApiError, state::AppState};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users).post(create_users).fallback(hello),
        )
        .route(
            "/users/:id",
            get(get_user)
                .put(update_user)
                .patch(update_user)
                .delete(delete_user)
                .fallback(hello),
        )
}

/// Answer for every method/path pair without a route.
pub async fn hello() -> Json<MessageResponse> {
    Json(MessageResponse::new("Hello"))
}

#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, ApiError> {
    let users = services::list_users(state.sheets.as_ref(), &state.config.columns).await?;
    Ok(Json(users))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = services::get_user(state.sheets.as_ref(), &state.config.columns, &id).await?;
    Ok(Json(user))
}

#[instrument(skip(state, body))]
pub async fn create_users(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<CreateUsersRequest>,
) -> Result<Json<Vec<User>>, ApiError> {
    let created =
        services::create_users(state.sheets.as_ref(), &state.config.columns, &body.users).await?;
    Ok(Json(created))
}

#[instrument(skip(state, patch))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<PartialUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    services::update_user(state.sheets.as_ref(), &state.config.columns, &id, &patch).await?;
    Ok(Json(MessageResponse::new(format!("{id} updated"))))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    services::delete_user(state.sheets.as_ref(), &state.config.columns, &id).await?;
    Ok(Json(MessageResponse::new(format!("{id} has been deleted"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_with_camel_case_keys() {
        let user = User {
            id: 1,
            first_name: "Alif".into(),
            last_name: "Baa".into(),
            email: "alif@example.com".into(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 1,
                "firstName": "Alif",
                "lastName": "Baa",
                "email": "alif@example.com"
            })
        );
    }

    #[test]
    fn partial_user_rejects_unknown_fields() {
        let res = serde_json::from_str::<PartialUser>(r#"{"ID": 3}"#);
        assert!(res.is_err());
        let patch: PartialUser = serde_json::from_str(r#"{"lastName": "Q"}"#).unwrap();
        assert_eq!(patch.last_name.as_deref(), Some("Q"));
        assert!(patch.first_name.is_none());
    }
}
