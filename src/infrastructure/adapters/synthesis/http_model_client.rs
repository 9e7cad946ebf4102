//! HTTP Synthesis Client - 调用外部合成模型 HTTP 服务
//!
//! 实现 SynthesisModelPort trait
//!
//! 外部模型 API:
//! POST {base_url}/api/tts/infer
//! Request: {"text": "...", "voice_ref": "/abs/path/to/reference.wav"}  (JSON)
//! Response: audio/wav binary, metadata in headers

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::application::ports::{
    AudioCodecPort, ModelError, ModelPermit, SynthesisModelPort, SynthesisRequest,
};
use crate::domain::audio::Waveform;
use crate::infrastructure::adapters::codec::WavCodec;

/// 推理请求体 (JSON)
#[derive(Debug, Serialize)]
struct InferHttpRequest<'a> {
    text: &'a str,
    /// 参考音频路径，模型服务与本进程共享文件系统
    voice_ref: String,
}

/// HTTP 合成客户端配置
#[derive(Debug, Clone)]
pub struct HttpSynthesisClientConfig {
    /// 模型服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 模型自身可同时处理的请求数
    pub max_concurrent: usize,
}

impl Default for HttpSynthesisClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 300,
            max_concurrent: 1,
        }
    }
}

impl HttpSynthesisClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP 合成客户端
pub struct HttpSynthesisClient {
    client: Client,
    config: HttpSynthesisClientConfig,
    /// 模型容量限制，超出的请求在此排队
    capacity: Arc<Semaphore>,
    codec: WavCodec,
}

impl HttpSynthesisClient {
    pub fn new(config: HttpSynthesisClientConfig) -> Result<Self, ModelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let capacity = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

        Ok(Self {
            client,
            config,
            capacity,
            codec: WavCodec::new(),
        })
    }

    fn infer_url(&self) -> String {
        format!("{}/api/tts/infer", self.config.base_url.trim_end_matches('/'))
    }

    fn health_url(&self) -> String {
        format!("{}/health", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SynthesisModelPort for HttpSynthesisClient {
    async fn reserve(&self) -> Result<ModelPermit, ModelError> {
        let permit = self
            .capacity
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ModelError::Service(format!("model capacity closed: {}", e)))?;
        Ok(ModelPermit::from_semaphore(permit))
    }

    async fn synthesize(&self, request: SynthesisRequest) -> Result<Waveform, ModelError> {
        let body = InferHttpRequest {
            text: &request.text,
            voice_ref: request.reference_audio.to_string_lossy().into_owned(),
        };

        tracing::debug!(
            url = %self.infer_url(),
            text_len = request.text.len(),
            voice = %request.voice_name,
            "Sending synthesis request"
        );

        let response = self
            .client
            .post(self.infer_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.config.timeout_secs)
                } else if e.is_connect() {
                    ModelError::Network(format!("Cannot connect to synthesis model: {}", e))
                } else {
                    ModelError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::Service(format!("HTTP {}: {}", status, error_text)));
        }

        let session_id = response
            .headers()
            .get("X-TTS-Session-Id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let audio_data = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout(self.config.timeout_secs)
                } else {
                    ModelError::InvalidResponse(format!("Failed to read audio: {}", e))
                }
            })?;

        let codec = self.codec;
        let wave = tokio::task::spawn_blocking(move || codec.decode(&audio_data, Some("wav")))
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("decode task failed: {}", e)))?
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            session_id = %session_id,
            voice = %request.voice_name,
            duration_sec = wave.duration_sec(),
            sample_rate = wave.sample_rate,
            "Synthesis model returned audio"
        );

        Ok(wave)
    }

    fn name(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> bool {
        match self
            .client
            .get(self.health_url())
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
