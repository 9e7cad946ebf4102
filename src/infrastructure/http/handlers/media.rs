//! Media HTTP Handlers

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::sync::Arc;

use super::upload::read_upload_form;
use crate::infrastructure::http::dto::{file_name, ApiResponse, ExtractResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 截取预览：从上传的视频中截取片段并保存到输出目录
///
/// 表单字段：file, start, end
pub async fn extract_clip(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ExtractResponse>>, ApiError> {
    let mut form = read_upload_form(multipart, &state.uploads).await?;
    let file = form.take_file()?;
    let start_sec = form.seconds("start")?;
    let end_sec = form.seconds("end")?;

    let clip = state
        .pipeline
        .extract(file.path(), start_sec, end_sec)
        .await?;
    let (duration_sec, sample_rate, channels) =
        (clip.duration_sec(), clip.sample_rate(), clip.channels());
    let saved = clip.persist_into(&state.uploads.output_dir).await?;

    Ok(Json(ApiResponse::success(ExtractResponse {
        output_path: saved.display().to_string(),
        file_name: file_name(&saved),
        start_sec,
        end_sec,
        duration_sec,
        sample_rate,
        channels,
    })))
}
