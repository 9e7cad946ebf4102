//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::TargetFormat;
use crate::domain::audio::DurationBounds;

const MIB: u64 = 1024 * 1024;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 存储目录
    #[serde(default)]
    pub storage: StorageConfig,

    /// 音色入库门限
    #[serde(default)]
    pub profile: ProfileConfig,

    /// 外部转码与截取限制
    #[serde(default)]
    pub media: MediaConfig,

    /// 合成模型配置
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,

    /// 请求体上限（需大于 media.max_upload_bytes，留出 multipart 开销）
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5060
}

fn default_max_body_bytes() -> usize {
    110 * MIB as usize
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 规范参考音频目录（仅注册表写入）
    #[serde(default = "default_voices_dir")]
    pub voices_dir: PathBuf,

    /// 元数据文件
    #[serde(default = "default_registry_file")]
    pub registry_file: PathBuf,

    /// 合成输出与截取预览
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 上传暂存区，截取流水线只接受该目录内的源文件
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// 转码临时目录
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// 保存的录音
    #[serde(default = "default_recordings_dir")]
    pub recordings_dir: PathBuf,
}

fn default_voices_dir() -> PathBuf {
    PathBuf::from("data/voices")
}

fn default_registry_file() -> PathBuf {
    PathBuf::from("data/voices.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data/outputs")
}

fn default_staging_dir() -> PathBuf {
    PathBuf::from("data/uploads")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("data/tmp")
}

fn default_recordings_dir() -> PathBuf {
    PathBuf::from("data/recordings")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            voices_dir: default_voices_dir(),
            registry_file: default_registry_file(),
            output_dir: default_output_dir(),
            staging_dir: default_staging_dir(),
            temp_dir: default_temp_dir(),
            recordings_dir: default_recordings_dir(),
        }
    }
}

impl StorageConfig {
    /// 启动时需要存在的目录
    pub fn directories(&self) -> Vec<&PathBuf> {
        vec![
            &self.voices_dir,
            &self.output_dir,
            &self.staging_dir,
            &self.temp_dir,
            &self.recordings_dir,
        ]
    }
}

/// 音色入库门限
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_min_duration")]
    pub min_duration_sec: f64,

    #[serde(default = "default_max_duration")]
    pub max_duration_sec: f64,

    /// 静音判定阈值（归一化幅度 RMS）
    #[serde(default = "default_silence_floor")]
    pub silence_rms_floor: f32,
}

fn default_min_duration() -> f64 {
    3.0
}

fn default_max_duration() -> f64 {
    30.0
}

fn default_silence_floor() -> f32 {
    0.005
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            min_duration_sec: default_min_duration(),
            max_duration_sec: default_max_duration(),
            silence_rms_floor: default_silence_floor(),
        }
    }
}

impl ProfileConfig {
    pub fn duration_bounds(&self) -> DurationBounds {
        DurationBounds::new(self.min_duration_sec, self.max_duration_sec)
    }
}

/// 转码与截取配置
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// 单次进程调用超时（秒）
    #[serde(default = "default_process_timeout")]
    pub process_timeout_secs: u64,

    #[serde(default = "default_min_duration")]
    pub min_segment_sec: f64,

    #[serde(default = "default_max_duration")]
    pub max_segment_sec: f64,

    /// 上传文件最大大小（字节），默认 100MB
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    /// 源文件最大时长（秒）
    #[serde(default = "default_max_source_duration")]
    pub max_source_duration_sec: f64,

    #[serde(default = "default_target_sample_rate")]
    pub target_sample_rate: u32,

    #[serde(default = "default_target_channels")]
    pub target_channels: u16,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_process_timeout() -> u64 {
    120
}

fn default_max_upload_bytes() -> u64 {
    100 * MIB
}

fn default_max_source_duration() -> f64 {
    300.0 // 5 分钟
}

fn default_target_sample_rate() -> u32 {
    24000
}

fn default_target_channels() -> u16 {
    1
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            process_timeout_secs: default_process_timeout(),
            min_segment_sec: default_min_duration(),
            max_segment_sec: default_max_duration(),
            max_upload_bytes: default_max_upload_bytes(),
            max_source_duration_sec: default_max_source_duration(),
            target_sample_rate: default_target_sample_rate(),
            target_channels: default_target_channels(),
        }
    }
}

impl MediaConfig {
    pub fn segment_bounds(&self) -> DurationBounds {
        DurationBounds::new(self.min_segment_sec, self.max_segment_sec)
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }

    pub fn target(&self) -> TargetFormat {
        TargetFormat {
            sample_rate: self.target_sample_rate,
            channels: self.target_channels,
        }
    }
}

/// 合成模型配置
#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// 模型服务基础 URL
    #[serde(default = "default_synthesis_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_synthesis_timeout")]
    pub timeout_secs: u64,

    /// 模型同时处理的请求数
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// 模型失败时生成提示音
    #[serde(default)]
    pub fallback_enabled: bool,
}

fn default_synthesis_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_synthesis_timeout() -> u64 {
    300
}

fn default_max_concurrent() -> usize {
    1
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            url: default_synthesis_url(),
            timeout_secs: default_synthesis_timeout(),
            max_concurrent: default_max_concurrent(),
            fallback_enabled: false,
        }
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5060);
        assert_eq!(config.synthesis.url, "http://localhost:8000");
        assert_eq!(config.storage.registry_file, PathBuf::from("data/voices.json"));
        assert_eq!(config.storage.recordings_dir, PathBuf::from("data/recordings"));
        assert!(config
            .storage
            .directories()
            .contains(&&PathBuf::from("data/recordings")));
        assert_eq!(config.media.max_upload_bytes, 100 * 1024 * 1024);
        assert!(!config.synthesis.fallback_enabled);
    }

    #[test]
    fn test_server_addr() {
        let config = ServerConfig::default();
        assert_eq!(config.addr(), "0.0.0.0:5060");
    }

    #[test]
    fn test_derived_values() {
        let config = AppConfig::default();
        assert!(config.profile.duration_bounds().contains(3.0));
        assert!(config.profile.duration_bounds().contains(30.0));
        assert_eq!(config.media.process_timeout(), Duration::from_secs(120));
        assert_eq!(
            config.media.target(),
            TargetFormat {
                sample_rate: 24000,
                channels: 1
            }
        );
        assert!(config.server.max_body_bytes as u64 > config.media.max_upload_bytes);
    }
}
