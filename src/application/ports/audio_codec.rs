//! Audio Codec Port - 波形编解码抽象
//!
//! 解码任意受支持的音频字节为 f32 波形，编码为 16-bit PCM WAV

use thiserror::Error;

use crate::domain::audio::Waveform;

/// 编解码错误
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Encoding error: {0}")]
    Encode(String),
}

/// Audio Codec Port
///
/// CPU 密集但不阻塞在 I/O 上，异步调用方需自行放入 `spawn_blocking`
pub trait AudioCodecPort: Send + Sync {
    /// 解码音频数据
    ///
    /// `extension_hint` 为可选的扩展名（如 "wav"），帮助探测容器
    fn decode(&self, data: &[u8], extension_hint: Option<&str>) -> Result<Waveform, CodecError>;

    /// 编码为 16-bit PCM WAV
    fn encode_wav(&self, wave: &Waveform) -> Result<Vec<u8>, CodecError>;
}
