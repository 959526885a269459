use axum::extract::State;
use axum::Extension;

use crate::app::AppState;
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::body::FormBody;
use crate::middleware::{ApiResponse, ApiResult};

/// POST /upload/api/avatar - multipart, the first file replaces the caller's avatar
pub async fn change_avatar(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    form: FormBody,
) -> ApiResult<String> {
    let upload = form
        .into_uploads()
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    let url = state.uploads.change_avatar(&current, upload).await?;
    Ok(ApiResponse::success(url))
}

/// POST /upload/api/images - multipart, every file is stored; URLs come back in upload order
pub async fn upload_images(State(state): State<AppState>, form: FormBody) -> ApiResult<Vec<String>> {
    let urls = state.uploads.upload_images(form.into_uploads()).await?;
    Ok(ApiResponse::success(urls))
}
