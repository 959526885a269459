use axum::extract::State;

use crate::app::AppState;
use crate::handlers::body::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{AuthPayload, Credentials};

/// POST /user/api/login - `{username, password, rememberMe?}` → `{token, userInfo}`
pub async fn login(State(state): State<AppState>, JsonBody(credentials): JsonBody<Credentials>) -> ApiResult<AuthPayload> {
    let payload = state.users.login(credentials).await?;
    Ok(ApiResponse::success(payload))
}

/// POST /user/api/register - creates the account and logs it in
pub async fn register(
    State(state): State<AppState>,
    JsonBody(credentials): JsonBody<Credentials>,
) -> ApiResult<AuthPayload> {
    let payload = state.users.register(credentials).await?;
    Ok(ApiResponse::created(payload))
}
