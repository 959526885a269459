use axum::extract::State;
use axum::Extension;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::database::parse_identifier;
use crate::handlers::body::{FormBody, JsonBody};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Document;

const COVER_FIELD: &str = "cover";

/// POST /blog/api/add - JSON or multipart; a multipart file named `cover` becomes the cover image
pub async fn add_blog(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    mut form: FormBody,
) -> ApiResult<Value> {
    let cover = form.take_file(COVER_FIELD);
    let id = state.blogs.add_blog(&current, form.fields, cover).await?;
    Ok(ApiResponse::created(json!({ "id": id })).with_message("Blog created"))
}

/// PUT /blog/api/update - body carries the `id`; returns the fields written
pub async fn update_blog(State(state): State<AppState>, mut form: FormBody) -> ApiResult<Document> {
    let cover = form.take_file(COVER_FIELD);
    let applied = state.blogs.update_blog(form.fields, cover).await?;
    Ok(ApiResponse::success(applied))
}

/// POST /blog/api/delete - `{id}`; deleting a missing post still succeeds
pub async fn delete_blog(State(state): State<AppState>, JsonBody(body): JsonBody<Document>) -> ApiResult<Value> {
    let id = body.get("id").and_then(parse_identifier);
    state.blogs.delete_blog(id).await?;
    Ok(ApiResponse::success(Value::Null))
}
