//! Synthesis Model Port - 语音合成模型抽象
//!
//! 模型本身是不透明函数：文本 + 参考音频 → 波形

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::OwnedSemaphorePermit;

use crate::domain::audio::Waveform;

/// 模型错误
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}s")]
    Timeout(u64),

    #[error("Service error: {0}")]
    Service(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的文本
    pub text: String,
    /// 音色名称（用于日志和追踪）
    pub voice_name: String,
    /// 注册表返回的参考音频路径
    pub reference_audio: PathBuf,
}

/// 模型容量占用凭证，drop 时归还
#[derive(Debug, Default)]
pub struct ModelPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl ModelPermit {
    /// 不限容量的模型使用的空凭证
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn from_semaphore(permit: OwnedSemaphorePermit) -> Self {
        Self {
            _permit: Some(permit),
        }
    }
}

/// Synthesis Model Port
#[async_trait]
pub trait SynthesisModelPort: Send + Sync {
    /// 等待模型空闲容量；排队时间不计入调用超时
    async fn reserve(&self) -> Result<ModelPermit, ModelError> {
        Ok(ModelPermit::unlimited())
    }

    /// 执行合成，可能耗时很长；调用方应先持有 [`ModelPermit`]
    async fn synthesize(&self, request: SynthesisRequest) -> Result<Waveform, ModelError>;

    /// 模型名称（日志用）
    fn name(&self) -> &str;

    /// 检查模型是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
