//! Audio Quality Analyzer
//!
//! 纯函数：给定波形，返回时长、RMS 能量与静音判定。无 I/O，无共享状态。
//! 调用方据此决定是否拒绝入库（静音 / 时长越界）。

use thiserror::Error;

use super::Waveform;

/// 峰值超过该值视为削波（只告警，不拒绝）
pub const CLIPPING_PEAK: f32 = 0.99;

/// 分析输入错误
#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("audio buffer is empty")]
    EmptyBuffer,

    #[error("sample count {samples} is not a multiple of channel count {channels}")]
    ChannelMismatch { samples: usize, channels: u16 },

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// 分析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioAnalysis {
    pub duration_sec: f64,
    /// 全缓冲区 RMS，单位与归一化幅度相同
    pub rms_energy: f32,
    pub peak: f32,
    pub is_silent: bool,
    pub is_clipping: bool,
}

/// 音频时长区间（闭区间，边界值可接受）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBounds {
    pub min_sec: f64,
    pub max_sec: f64,
}

impl DurationBounds {
    pub fn new(min_sec: f64, max_sec: f64) -> Self {
        Self { min_sec, max_sec }
    }

    pub fn contains(&self, duration_sec: f64) -> bool {
        duration_sec >= self.min_sec && duration_sec <= self.max_sec
    }
}

/// 计算 RMS 能量
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt() as f32
}

/// 计算峰值幅度
pub fn calculate_peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

/// 分析波形
///
/// `silence_rms_floor` 与波形幅度同单位（例如 0.01 即满幅的 1%）
pub fn analyze(wave: &Waveform, silence_rms_floor: f32) -> Result<AudioAnalysis, AnalysisError> {
    if wave.sample_rate == 0 {
        return Err(AnalysisError::InvalidSampleRate(wave.sample_rate));
    }
    if wave.channels == 0 || wave.samples.len() % wave.channels as usize != 0 {
        return Err(AnalysisError::ChannelMismatch {
            samples: wave.samples.len(),
            channels: wave.channels,
        });
    }
    if wave.samples.is_empty() {
        return Err(AnalysisError::EmptyBuffer);
    }

    let rms_energy = calculate_rms(&wave.samples);
    let peak = calculate_peak(&wave.samples);

    Ok(AudioAnalysis {
        duration_sec: wave.duration_sec(),
        rms_energy,
        peak,
        is_silent: rms_energy < silence_rms_floor,
        is_clipping: peak > CLIPPING_PEAK,
    })
}
