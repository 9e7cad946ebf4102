//! Voicebank - 语音克隆音色管理引擎
//!
//! 启动顺序：配置 -> 日志 -> 存储目录 -> 适配器 -> 音色库 -> HTTP

use std::sync::Arc;

use voicebank::application::{
    DispatcherConfig, ExtractionConfig, MediaExtractionPipeline, RecordingLibrary,
    SynthesisDispatcher, VoiceRegistryPort,
};
use voicebank::config::{load_config, print_config};
use voicebank::infrastructure::adapters::{
    FfmpegTranscoder, FfmpegTranscoderConfig, HttpSynthesisClient, HttpSynthesisClientConfig,
    ToneFallback, WavCodec,
};
use voicebank::infrastructure::http::{AppState, HttpServer, ServerConfig, UploadConfig};
use voicebank::infrastructure::persistence::{FileVoiceRegistry, RegistryConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},voicebank={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Voicebank - voice profile engine");
    print_config(&config);

    // 确保存储目录存在
    for dir in config.storage.directories() {
        tokio::fs::create_dir_all(dir).await?;
    }

    let codec = Arc::new(WavCodec::new());

    let transcoder = Arc::new(FfmpegTranscoder::new(FfmpegTranscoderConfig {
        ffmpeg_path: config.media.ffmpeg_path.clone(),
        ffprobe_path: config.media.ffprobe_path.clone(),
        timeout: config.media.process_timeout(),
    }));

    let registry = Arc::new(
        FileVoiceRegistry::open(
            RegistryConfig {
                voices_dir: config.storage.voices_dir.clone(),
                registry_file: config.storage.registry_file.clone(),
                duration_bounds: config.profile.duration_bounds(),
                silence_rms_floor: config.profile.silence_rms_floor,
            },
            codec.clone(),
        )
        .await?,
    );

    // 启动时只报告不一致，不自动修复
    match registry.reconcile().await {
        Ok(report) if report.is_clean() => {
            tracing::info!(voices = registry.list().await.len(), "Voice registry loaded");
        }
        Ok(report) => {
            tracing::warn!(
                missing = ?report.missing,
                empty = ?report.empty,
                stray = ?report.stray,
                leftovers = ?report.leftovers,
                "Voice registry is out of sync with the voices directory"
            );
        }
        Err(e) => tracing::warn!(error = %e, "Voice registry check failed"),
    }

    let pipeline = Arc::new(MediaExtractionPipeline::new(
        transcoder,
        codec.clone(),
        ExtractionConfig {
            staging_dir: config.storage.staging_dir.clone(),
            temp_dir: config.storage.temp_dir.clone(),
            segment_bounds: config.media.segment_bounds(),
            profile_bounds: config.profile.duration_bounds(),
            max_upload_bytes: config.media.max_upload_bytes,
            max_source_duration_sec: config.media.max_source_duration_sec,
            target: config.media.target(),
            silence_rms_floor: config.profile.silence_rms_floor,
        },
    ));

    // 创建 HTTP 模型客户端
    let model = Arc::new(HttpSynthesisClient::new(HttpSynthesisClientConfig {
        base_url: config.synthesis.url.clone(),
        timeout_secs: config.synthesis.timeout_secs,
        max_concurrent: config.synthesis.max_concurrent,
    })?);

    let mut dispatcher = SynthesisDispatcher::new(
        registry.clone(),
        model,
        codec,
        DispatcherConfig {
            output_dir: config.storage.output_dir.clone(),
            timeout: config.synthesis.timeout(),
        },
    );
    if config.synthesis.fallback_enabled {
        tracing::info!("Tone fallback enabled for synthesis failures");
        dispatcher = dispatcher.with_fallback(Arc::new(ToneFallback::new()));
    }

    let state = AppState::new(
        registry,
        pipeline,
        Arc::new(dispatcher),
        Arc::new(RecordingLibrary::new(config.storage.recordings_dir.clone())),
        UploadConfig {
            staging_dir: config.storage.staging_dir.clone(),
            output_dir: config.storage.output_dir.clone(),
            max_upload_bytes: config.media.max_upload_bytes,
        },
    );

    let server = HttpServer::new(ServerConfig::from(&config.server), state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
