use axum::extract::{Path, Query, State};
use axum::Extension;
use serde::Deserialize;
use serde_json::Value;

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::database::parse_identifier;
use crate::filter::FilterSpec;
use crate::handlers::body::JsonBody;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::{Document, Page};

#[derive(Debug, Deserialize)]
pub struct InfoQuery {
    pub id: Option<String>,
}

/// POST /blog/api/list - paged listing, newest first unless the body sorts otherwise
pub async fn blog_list(
    State(state): State<AppState>,
    current: Option<Extension<CurrentUser>>,
    JsonBody(spec): JsonBody<FilterSpec>,
) -> ApiResult<Page<Document>> {
    let current = current.map(|Extension(user)| user);
    let page = state.blogs.query_blog_page(current.as_ref(), &spec).await?;
    Ok(ApiResponse::success(page))
}

/// POST /blog/api/list/:userId
pub async fn somebody_blog_list(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    JsonBody(spec): JsonBody<FilterSpec>,
) -> ApiResult<Page<Document>> {
    let page = state.blogs.somebody_blog_list(Some(&user_id), &spec).await?;
    Ok(ApiResponse::success(page))
}

/// GET /blog/api/info?id=
pub async fn blog_info(State(state): State<AppState>, Query(query): Query<InfoQuery>) -> ApiResult<Document> {
    let id = query.id.map(Value::from).as_ref().and_then(parse_identifier);
    let blog = state.blogs.blog_info(id).await?;
    Ok(ApiResponse::success(blog))
}
