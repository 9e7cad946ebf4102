//! Recording HTTP Handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;

use super::upload::read_upload_form;
use crate::infrastructure::http::dto::{ApiResponse, RecordingResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 保存麦克风录音到录音库
///
/// 表单字段：file, prefix（可选）
pub async fn save_recording(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<RecordingResponse>>, ApiError> {
    let mut form = read_upload_form(multipart, &state.uploads).await?;
    let file = form.take_file()?;

    let saved = state
        .recordings
        .save(file.path(), form.text("prefix"))
        .await?;

    Ok(Json(ApiResponse::success(saved.into())))
}

/// 列出已保存的录音（最新在前）
pub async fn list_recordings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<RecordingResponse>>>, ApiError> {
    let recordings = state.recordings.list().await?;
    Ok(Json(ApiResponse::success(
        recordings.into_iter().map(RecordingResponse::from).collect(),
    )))
}
