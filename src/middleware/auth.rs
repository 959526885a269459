use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::app::AppState;
use crate::error::ApiError;

/// Session middleware for protected routes: the bearer token must verify and the
/// session cache must still hold the caller. Inserts `CurrentUser` into the request.
pub async fn require_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let current = state.users.authenticate(&token).await?;

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Like `require_session`, but anonymous callers and stale tokens pass through without a `CurrentUser`
pub async fn optional_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Ok(token) = extract_jwt_from_headers(&headers) {
        match state.users.authenticate(&token).await {
            Ok(current) => {
                request.extensions_mut().insert(current);
            }
            Err(e) => debug!("Treating caller as anonymous: {}", e),
        }
    }

    next.run(request).await
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
