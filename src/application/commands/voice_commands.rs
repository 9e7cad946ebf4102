//! Voice Commands

use std::path::PathBuf;

use crate::domain::voice::SourceType;

/// 上传或录制的参考音频入库
#[derive(Debug, Clone)]
pub struct RegisterVoiceUpload {
    pub name: String,
    /// 暂存目录中的音频文件
    pub audio_path: PathBuf,
    /// 客户端提供的原始文件名，仅用于审计
    pub original_name: String,
    /// Uploaded 或 Recorded
    pub source_type: SourceType,
    pub notes: Option<String>,
    pub overwrite: bool,
}

/// 从视频截取片段创建音色
#[derive(Debug, Clone)]
pub struct CreateVoiceFromVideo {
    pub name: String,
    /// 暂存目录中的视频文件
    pub video_path: PathBuf,
    pub original_name: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub notes: Option<String>,
    pub overwrite: bool,
}

/// 删除音色命令
#[derive(Debug, Clone)]
pub struct DeleteVoice {
    pub name: String,
}
