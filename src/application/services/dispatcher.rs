//! Synthesis Dispatcher - 合成调度
//!
//! 文本 + 音色名 → 查注册表 → 调用模型 → 写出唯一命名的 WAV。
//! 模型调用期间不持有任何锁；并发度只受模型自身容量限制。

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::application::error::EngineError;
use crate::application::ports::{
    AudioCodecPort, ModelError, SynthesisModelPort, SynthesisRequest, VoiceRegistryPort,
};
use crate::domain::audio::Waveform;

/// 调度器配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub output_dir: PathBuf,
    /// 单次模型调用的墙钟超时
    pub timeout: Duration,
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub output_path: PathBuf,
    /// 注册表中的音色名（保留注册时的大小写）
    pub voice: String,
    /// 是否由降级路径生成
    pub degraded: bool,
    pub duration_sec: f64,
    pub sample_rate: u32,
}

/// 合成调度器
pub struct SynthesisDispatcher {
    registry: Arc<dyn VoiceRegistryPort>,
    model: Arc<dyn SynthesisModelPort>,
    fallback: Option<Arc<dyn SynthesisModelPort>>,
    codec: Arc<dyn AudioCodecPort>,
    config: DispatcherConfig,
}

impl SynthesisDispatcher {
    pub fn new(
        registry: Arc<dyn VoiceRegistryPort>,
        model: Arc<dyn SynthesisModelPort>,
        codec: Arc<dyn AudioCodecPort>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            model,
            fallback: None,
            codec,
            config,
        }
    }

    /// 启用降级合成路径
    pub fn with_fallback(mut self, fallback: Arc<dyn SynthesisModelPort>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub async fn model_healthy(&self) -> bool {
        self.model.health_check().await
    }

    pub async fn synthesize(
        &self,
        text: &str,
        voice_name: &str,
    ) -> Result<SynthesisOutcome, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyInput);
        }

        let profile = self
            .registry
            .lookup(voice_name)
            .await
            .ok_or_else(|| EngineError::NotFound(voice_name.to_string()))?;

        let request = SynthesisRequest {
            text: text.to_string(),
            voice_name: profile.name().to_string(),
            reference_audio: profile.audio_path().to_path_buf(),
        };

        let started = std::time::Instant::now();
        let (wave, degraded) = match self.call_model(request.clone()).await {
            Ok(wave) => (wave, false),
            Err(err) => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!(
                        voice = %profile.name(),
                        model = %self.model.name(),
                        error = %err,
                        fallback = %fallback.name(),
                        "Synthesis model failed, using degraded fallback"
                    );
                    (fallback.synthesize(request).await?, true)
                }
                None => {
                    tracing::error!(
                        voice = %profile.name(),
                        model = %self.model.name(),
                        error = %err,
                        "Synthesis failed"
                    );
                    return Err(err.into());
                }
            },
        };

        let output_path = self.write_output(&wave).await?;

        tracing::info!(
            voice = %profile.name(),
            chars = text.chars().count(),
            output = %output_path.display(),
            degraded,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Synthesis complete"
        );

        Ok(SynthesisOutcome {
            output_path,
            voice: profile.name().to_string(),
            degraded,
            duration_sec: wave.duration_sec(),
            sample_rate: wave.sample_rate,
        })
    }

    async fn call_model(&self, request: SynthesisRequest) -> Result<Waveform, ModelError> {
        // 排队等容量不计入超时，超时只终止正在运行的调用
        let _permit = self.model.reserve().await?;
        let wave = match tokio::time::timeout(self.config.timeout, self.model.synthesize(request))
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ModelError::Timeout(self.config.timeout.as_secs())),
        };

        if wave.samples.is_empty() || wave.sample_rate == 0 || wave.channels == 0 {
            return Err(ModelError::InvalidResponse(
                "model returned an empty waveform".to_string(),
            ));
        }
        Ok(wave)
    }

    /// `tts_<时间戳>_<随机>.wav`，create_new 保证不覆盖已有文件
    async fn write_output(&self, wave: &Waveform) -> Result<PathBuf, EngineError> {
        let codec = self.codec.clone();
        let wave = wave.clone();
        let bytes = tokio::task::spawn_blocking(move || codec.encode_wav(&wave))
            .await
            .map_err(|e| EngineError::io(format!("encode task failed: {}", e)))??;

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let path = output_file_name(&self.config.output_dir);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| {
                EngineError::io(format!("cannot create {}: {}", path.display(), e))
            })?;

        let written = async {
            file.write_all(&bytes).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = written {
            drop(file);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(EngineError::io(format!(
                "failed to write {}: {}",
                path.display(),
                e
            )));
        }

        Ok(path)
    }
}

fn output_file_name(dir: &Path) -> PathBuf {
    dir.join(format!(
        "tts_{}_{}.wav",
        Utc::now().format("%Y%m%d_%H%M%S"),
        &Uuid::new_v4().simple().to_string()[..8]
    ))
}
