//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VOICEBANK_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VOICEBANK_SERVER__PORT=8080`
/// - `VOICEBANK_SYNTHESIS__URL=http://tts-server:8000`
/// - `VOICEBANK_MEDIA__PROCESS_TIMEOUT_SECS=60`
/// - `VOICEBANK_STORAGE__VOICES_DIR=/data/voices`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 5060)?
        .set_default("server.max_body_bytes", 110_u64 * 1024 * 1024)?
        .set_default("storage.voices_dir", "data/voices")?
        .set_default("storage.registry_file", "data/voices.json")?
        .set_default("storage.output_dir", "data/outputs")?
        .set_default("storage.staging_dir", "data/uploads")?
        .set_default("storage.temp_dir", "data/tmp")?
        .set_default("storage.recordings_dir", "data/recordings")?
        .set_default("profile.min_duration_sec", 3.0)?
        .set_default("profile.max_duration_sec", 30.0)?
        .set_default("profile.silence_rms_floor", 0.005)?
        .set_default("media.ffmpeg_path", "ffmpeg")?
        .set_default("media.ffprobe_path", "ffprobe")?
        .set_default("media.process_timeout_secs", 120)?
        .set_default("media.min_segment_sec", 3.0)?
        .set_default("media.max_segment_sec", 30.0)?
        .set_default("media.max_upload_bytes", 100_u64 * 1024 * 1024)?
        .set_default("media.max_source_duration_sec", 300.0)?
        .set_default("media.target_sample_rate", 24000)?
        .set_default("media.target_channels", 1)?
        .set_default("synthesis.url", "http://localhost:8000")?
        .set_default("synthesis.timeout_secs", 300)?
        .set_default("synthesis.max_concurrent", 1)?
        .set_default("synthesis.fallback_enabled", false)?
        .set_default("log.level", "info")?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: VOICEBANK_SYNTHESIS__URL=http://tts-server:8000
    // 注意: 环境变量名会被转换为小写
    builder = builder.add_source(
        Environment::with_prefix("VOICEBANK")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("Server port cannot be 0"));
    }

    if config.synthesis.url.trim().is_empty() {
        return Err(invalid("Synthesis URL cannot be empty"));
    }
    if config.synthesis.max_concurrent == 0 {
        return Err(invalid("synthesis.max_concurrent must be at least 1"));
    }

    let bounds = [
        (
            "profile duration",
            config.profile.min_duration_sec,
            config.profile.max_duration_sec,
        ),
        (
            "segment duration",
            config.media.min_segment_sec,
            config.media.max_segment_sec,
        ),
    ];
    for (what, min, max) in bounds {
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 {
            return Err(invalid(format!(
                "{} bounds must be positive numbers (got {} to {})",
                what, min, max
            )));
        }
        if min > max {
            return Err(invalid(format!(
                "{} minimum ({}) is greater than maximum ({})",
                what, min, max
            )));
        }
    }

    if !(config.profile.silence_rms_floor > 0.0) {
        return Err(invalid("profile.silence_rms_floor must be positive"));
    }

    if config.media.target_sample_rate == 0 {
        return Err(invalid("media.target_sample_rate cannot be 0"));
    }
    if !(1..=2).contains(&config.media.target_channels) {
        return Err(invalid(format!(
            "media.target_channels must be 1 or 2 (got {})",
            config.media.target_channels
        )));
    }
    if config.media.process_timeout_secs == 0 {
        return Err(invalid("media.process_timeout_secs cannot be 0"));
    }
    if config.media.max_upload_bytes == 0 || !(config.media.max_source_duration_sec > 0.0) {
        return Err(invalid("upload size and source duration limits must be positive"));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Voices Directory: {:?}", config.storage.voices_dir);
    tracing::info!("Registry File: {:?}", config.storage.registry_file);
    tracing::info!("Output Directory: {:?}", config.storage.output_dir);
    tracing::info!("Staging Directory: {:?}", config.storage.staging_dir);
    tracing::info!("Recordings Directory: {:?}", config.storage.recordings_dir);
    tracing::info!(
        "Profile Duration: {}s - {}s (silence floor {})",
        config.profile.min_duration_sec,
        config.profile.max_duration_sec,
        config.profile.silence_rms_floor
    );
    tracing::info!(
        "Segment Duration: {}s - {}s, max source {}s, max upload {} bytes",
        config.media.min_segment_sec,
        config.media.max_segment_sec,
        config.media.max_source_duration_sec,
        config.media.max_upload_bytes
    );
    tracing::info!(
        "Transcoder: {:?} / {:?} (timeout {}s)",
        config.media.ffmpeg_path,
        config.media.ffprobe_path,
        config.media.process_timeout_secs
    );
    tracing::info!(
        "Target Format: {} Hz, {} channel(s)",
        config.media.target_sample_rate,
        config.media.target_channels
    );
    tracing::info!("Synthesis URL: {}", config.synthesis.url);
    tracing::info!("Synthesis Timeout: {}s", config.synthesis.timeout_secs);
    tracing::info!("Synthesis Fallback: {}", config.synthesis.fallback_enabled);
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_synthesis_url() {
        let mut config = AppConfig::default();
        config.synthesis.url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_inverted_bounds() {
        let mut config = AppConfig::default();
        config.profile.min_duration_sec = 40.0;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.media.min_segment_sec = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_bad_target_format() {
        let mut config = AppConfig::default();
        config.media.target_channels = 6;
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.media.target_sample_rate = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_timeout() {
        let mut config = AppConfig::default();
        config.media.process_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voicebank.toml");
        std::fs::write(
            &path,
            "[media]\nprocess_timeout_secs = 45\nmax_segment_sec = 20.0\n\n[synthesis]\nfallback_enabled = true\n",
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.media.process_timeout_secs, 45);
        assert_eq!(config.media.max_segment_sec, 20.0);
        assert!(config.synthesis.fallback_enabled);
        // 未设置的字段保持默认值
        assert_eq!(config.media.min_segment_sec, 3.0);
        assert_eq!(config.server.port, 5060);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voicebank.toml");
        std::fs::write(&path, "[profile]\nmin_duration_sec = 50.0\n").unwrap();
        assert!(matches!(
            load_config_from_path(Some(&path)),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
