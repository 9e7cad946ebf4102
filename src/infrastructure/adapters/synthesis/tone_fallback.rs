//! Tone Fallback - 降级合成路径
//!
//! 模型不可用时生成一段正弦提示音，仅在显式配置后启用

use async_trait::async_trait;

use crate::application::ports::{ModelError, SynthesisModelPort, SynthesisRequest};
use crate::domain::audio::Waveform;

const TONE_SAMPLE_RATE: u32 = 22050;
const TONE_AMPLITUDE: f32 = 0.2;

/// 正弦提示音生成器
///
/// 时长 = clamp(字符数 / 18, 1, 6) 秒，频率 = 440 + (字符数 % 5) * 55 Hz
#[derive(Debug, Clone, Copy, Default)]
pub struct ToneFallback;

impl ToneFallback {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, text: &str) -> Waveform {
        let chars = text.chars().count();
        let duration = (chars as f64 / 18.0).clamp(1.0, 6.0);
        let frequency = 440.0 + (chars % 5) as f64 * 55.0;
        let frames = (TONE_SAMPLE_RATE as f64 * duration) as usize;

        let samples = (0..frames)
            .map(|i| {
                let t = i as f64 / TONE_SAMPLE_RATE as f64;
                TONE_AMPLITUDE * (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
            })
            .collect();

        Waveform::mono(samples, TONE_SAMPLE_RATE)
    }
}

#[async_trait]
impl SynthesisModelPort for ToneFallback {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<Waveform, ModelError> {
        Ok(self.render(&request.text))
    }

    fn name(&self) -> &str {
        "tone-fallback"
    }
}
