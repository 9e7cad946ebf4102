//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                   GET   健康检查（含模型可用性）
//! - /api/voice/list             GET   列出所有音色
//! - /api/voice/get              POST  获取音色详情
//! - /api/voice/upload           POST  上传 / 录制音色（multipart）
//! - /api/voice/from_video       POST  从视频片段创建音色（multipart）
//! - /api/voice/delete           POST  删除音色
//! - /api/voice/check            GET   元数据与磁盘一致性检查
//! - /api/voice/audio/:name      GET   下载参考音频
//! - /api/synthesize             POST  合成语音
//! - /api/recording/save         POST  保存录音（multipart）
//! - /api/recording/list         GET   列出已保存的录音
//! - /api/media/extract          POST  截取预览（multipart）

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/voice", voice_routes())
        .route("/synthesize", post(handlers::synthesize))
        .nest("/recording", recording_routes())
        .route("/media/extract", post(handlers::extract_clip))
}

/// Recording 路由
fn recording_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/save", post(handlers::save_recording))
        .route("/list", get(handlers::list_recordings))
}

/// Voice 路由
fn voice_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/list", get(handlers::list_voices))
        .route("/get", post(handlers::get_voice))
        .route("/upload", post(handlers::upload_voice))
        .route("/from_video", post(handlers::create_voice_from_video))
        .route("/delete", post(handlers::delete_voice))
        .route("/check", get(handlers::check_voices))
        .route("/audio/:name", get(handlers::download_voice_audio))
}
