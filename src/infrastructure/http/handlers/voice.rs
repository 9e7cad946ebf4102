//! Voice HTTP Handlers

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::upload::read_upload_form;
use crate::application::{
    CheckVoices, CreateVoiceFromVideo, DeleteVoice, EngineError, GetVoice, ListVoices,
    RegisterVoiceUpload,
};
use crate::domain::voice::SourceType;
use crate::infrastructure::http::dto::{
    ApiResponse, CheckResponse, DeleteVoiceRequest, Empty, GetVoiceRequest, VoiceResponse,
};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 上传 / 录制音色
///
/// 表单字段：name, file, notes?, overwrite?, source_type?（uploaded | recorded）
pub async fn upload_voice(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<VoiceResponse>>, ApiError> {
    let mut form = read_upload_form(multipart, &state.uploads).await?;
    let file = form.take_file()?;

    let source_type = match form.text("source_type") {
        None => SourceType::Uploaded,
        Some(raw) => raw
            .parse::<SourceType>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
    };

    let command = RegisterVoiceUpload {
        name: form.required("name")?.to_string(),
        audio_path: file.path().to_path_buf(),
        original_name: file.original_name().to_string(),
        source_type,
        notes: form.text("notes").map(str::to_string),
        overwrite: form.flag("overwrite"),
    };

    let profile = state.register_upload_handler.handle(command).await?;
    Ok(Json(ApiResponse::success(VoiceResponse::from(&profile))))
}

/// 从视频片段创建音色
///
/// 表单字段：name, file, start, end, notes?, overwrite?
pub async fn create_voice_from_video(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<VoiceResponse>>, ApiError> {
    let mut form = read_upload_form(multipart, &state.uploads).await?;
    let file = form.take_file()?;

    let command = CreateVoiceFromVideo {
        name: form.required("name")?.to_string(),
        video_path: file.path().to_path_buf(),
        original_name: file.original_name().to_string(),
        start_sec: form.seconds("start")?,
        end_sec: form.seconds("end")?,
        notes: form.text("notes").map(str::to_string),
        overwrite: form.flag("overwrite"),
    };

    let profile = state.create_from_video_handler.handle(command).await?;
    Ok(Json(ApiResponse::success(VoiceResponse::from(&profile))))
}

/// 获取音色列表（按名称排序）
pub async fn list_voices(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Vec<VoiceResponse>>> {
    let profiles = state.list_voices_handler.handle(ListVoices).await;
    Json(ApiResponse::success(
        profiles.iter().map(VoiceResponse::from).collect(),
    ))
}

/// 获取音色详情
pub async fn get_voice(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GetVoiceRequest>,
) -> Result<Json<ApiResponse<VoiceResponse>>, ApiError> {
    let profile = state
        .get_voice_handler
        .handle(GetVoice { name: req.name })
        .await?;
    Ok(Json(ApiResponse::success(VoiceResponse::from(&profile))))
}

/// 删除音色（元数据与音频文件一起删除）
pub async fn delete_voice(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteVoiceRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_voice_handler
        .handle(DeleteVoice { name: req.name })
        .await?;
    Ok(Json(ApiResponse::ok()))
}

/// 元数据与磁盘一致性检查
pub async fn check_voices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<CheckResponse>>, ApiError> {
    let report = state.check_voices_handler.handle(CheckVoices).await?;
    Ok(Json(ApiResponse::success(CheckResponse::from(report))))
}

/// 下载音色参考音频
pub async fn download_voice_audio(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError> {
    let profile = state
        .get_voice_handler
        .handle(GetVoice { name: name.clone() })
        .await?;

    let file = tokio::fs::File::open(profile.audio_path())
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ApiError::Engine(EngineError::io(format!(
                "audio file for voice '{}' is missing; run a registry check",
                profile.name()
            ))),
            _ => ApiError::Engine(e.into()),
        })?;
    let file_size = file
        .metadata()
        .await
        .map_err(|e| ApiError::Engine(e.into()))?
        .len();

    let stream = ReaderStream::new(file);
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/wav")
        .header(header::CONTENT_LENGTH, file_size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.wav\"", profile.name()),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::Engine(EngineError::io(e.to_string())))
}
