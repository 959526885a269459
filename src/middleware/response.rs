use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::ApiError;

/// Successful handler output, rendered as `{ "success": true, "data": .., "message"? }`.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status: StatusCode,
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            status: StatusCode::OK,
            message: None,
        }
    }

    /// 201 for anything that minted a new identifier or session.
    pub fn created(data: T) -> Self {
        Self {
            data,
            status: StatusCode::CREATED,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn envelope(&self) -> Result<Value, serde_json::Error> {
        let mut body = json!({
            "success": true,
            "data": serde_json::to_value(&self.data)?,
        });
        if let Some(message) = &self.message {
            body["message"] = Value::String(message.clone());
        }
        Ok(body)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match self.envelope() {
            Ok(body) => (self.status, Json(body)).into_response(),
            Err(e) => ApiError::internal(format!("response serialization: {}", e)).into_response(),
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
