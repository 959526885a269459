use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::config;

/// GET / - service banner and endpoint map
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Blog API (Rust)",
            "version": env!("CARGO_PKG_VERSION"),
            "environment": format!("{:?}", config::config().environment),
            "endpoints": {
                "user": "/user/api/{login,register} (public), /user/api/{info,logOut,current/update,current/update/password} (session)",
                "blog": "/blog/api/{list,list/:userId,info} (public), /blog/api/{add,update,delete} (session)",
                "upload": "/upload/api/{avatar,images} (session)",
                "files": "/public/*",
            }
        }
    }))
}

/// GET /health - reports whether the document store answers
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let backend = state.store.backend();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": backend
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database": backend
                    }
                })),
            )
        }
    }
}
