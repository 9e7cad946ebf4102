//! Synthesis HTTP Handlers

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::infrastructure::http::dto::{ApiResponse, SynthesizeRequest, SynthesizeResponse};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

/// 合成语音，返回输出文件路径
pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SynthesizeRequest>,
) -> Result<Json<ApiResponse<SynthesizeResponse>>, ApiError> {
    let outcome = state.dispatcher.synthesize(&req.text, &req.voice).await?;
    Ok(Json(ApiResponse::success(SynthesizeResponse::from(outcome))))
}
