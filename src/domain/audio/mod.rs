//! Audio Context - 波形与质量分析

mod quality;
mod waveform;

pub use quality::{
    analyze, calculate_peak, calculate_rms, AnalysisError, AudioAnalysis, DurationBounds,
    CLIPPING_PEAK,
};
pub use waveform::Waveform;
