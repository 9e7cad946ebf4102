//! Media Transcoder Port - 外部转码进程抽象
//!
//! 从任意容器（视频或音频）中截取时间区间，输出单声道 16-bit PCM WAV

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 转码错误
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("transcoder is not available: {0}")]
    Unavailable(String),

    #[error("transcoder timed out after {}s and was terminated", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("unsupported media format: {0}")]
    UnsupportedFormat(String),

    #[error("corrupt or unreadable media: {0}")]
    CorruptInput(String),

    #[error("transcoder exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("IO error: {0}")]
    Io(String),
}

/// 媒体容器信息
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    /// 容器总时长（秒）
    pub duration_sec: f64,
    /// 容器格式名，如 "mov,mp4,m4a,3gp,3g2,mj2"
    pub format_name: String,
    pub has_audio: bool,
    pub has_video: bool,
}

/// 单次截取任务
#[derive(Debug, Clone)]
pub struct ExtractJob {
    /// 已通过路径安全检查的源文件
    pub source: PathBuf,
    pub start_sec: f64,
    /// None 表示截取到结尾
    pub duration_sec: Option<f64>,
    pub sample_rate: u32,
    pub channels: u16,
    /// 输出 WAV 路径（位于 work_dir 内）
    pub output: PathBuf,
    /// 进程工作目录，隔离在私有临时目录中
    pub work_dir: PathBuf,
}

/// Media Transcoder Port
#[async_trait]
pub trait MediaTranscoderPort: Send + Sync {
    /// 读取容器元数据
    async fn probe(&self, source: &Path) -> Result<MediaInfo, TranscodeError>;

    /// 执行截取并写出 `job.output`
    ///
    /// 实现必须带墙钟超时，超时后终止进程
    async fn extract(&self, job: &ExtractJob) -> Result<(), TranscodeError>;
}
