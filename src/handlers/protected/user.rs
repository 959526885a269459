use axum::extract::State;
use axum::Extension;
use serde::Deserialize;

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::handlers::body::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Document;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PasswordChange {
    pub password: Option<String>,
}

/// POST /user/api/info - empty body returns the caller; otherwise the first user matching every field
pub async fn user_info(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(equals): JsonBody<Document>,
) -> ApiResult<Document> {
    let info = state.users.user_info(&current, equals).await?;
    Ok(ApiResponse::success(info))
}

/// GET /user/api/logOut
pub async fn logout(State(state): State<AppState>, Extension(current): Extension<CurrentUser>) -> ApiResult<&'static str> {
    state.users.logout(&current).await?;
    Ok(ApiResponse::success("Logged out"))
}

/// PUT /user/api/current/update - returns the fields actually written
pub async fn update_current(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(fields): JsonBody<Document>,
) -> ApiResult<Document> {
    let applied = state.users.update_current(&current, fields).await?;
    Ok(ApiResponse::success(applied))
}

/// PUT /user/api/current/update/password
pub async fn update_current_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    JsonBody(change): JsonBody<PasswordChange>,
) -> ApiResult<&'static str> {
    state.users.update_current_password(&current, change.password).await?;
    Ok(ApiResponse::success("Password updated"))
}
