//! Audio Context - 解码后的 PCM 波形

/// 交错存储的 f32 PCM 波形，幅度归一化到 [-1.0, 1.0]
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self::new(samples, sample_rate, 1)
    }

    /// 每声道样本数
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// 多声道取平均下混为单声道
    pub fn to_mono(&self) -> Waveform {
        if self.channels <= 1 {
            return Waveform::mono(self.samples.clone(), self.sample_rate);
        }
        let channels = self.channels as usize;
        let samples = self
            .samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        Waveform::mono(samples, self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let wave = Waveform::mono(vec![0.0; 24000 * 2], 24000);
        assert_eq!(wave.frames(), 48000);
        assert!((wave.duration_sec() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_downmix_averages_channels() {
        let stereo = Waveform::new(vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0], 8000, 2);
        let mono = stereo.to_mono();
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples, vec![0.5, 0.5, 0.0]);
        assert!((mono.duration_sec() - stereo.duration_sec()).abs() < 1e-12);
    }
}
