//! 测试辅助：WAV fixture 与脚本化的转码器

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::ports::{
    AudioCodecPort, ExtractJob, MediaInfo, MediaTranscoderPort, TranscodeError,
};
use crate::domain::audio::Waveform;
use crate::infrastructure::adapters::WavCodec;

pub fn tone_wave(seconds: f64, sample_rate: u32, channels: u16) -> Waveform {
    let frames = (seconds * sample_rate as f64).round() as usize;
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let v = 0.3 * (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sample_rate as f32).sin();
        for _ in 0..channels {
            samples.push(v);
        }
    }
    Waveform::new(samples, sample_rate, channels)
}

pub fn silence_wave(seconds: f64, sample_rate: u32) -> Waveform {
    let frames = (seconds * sample_rate as f64).round() as usize;
    Waveform::mono(vec![0.0; frames], sample_rate)
}

pub fn wav_bytes(wave: &Waveform) -> Vec<u8> {
    WavCodec::new().encode_wav(wave).unwrap()
}

pub fn write_tone_wav(path: &Path, seconds: f64, sample_rate: u32, channels: u16) {
    std::fs::write(path, wav_bytes(&tone_wave(seconds, sample_rate, channels))).unwrap();
}

pub fn write_silence_wav(path: &Path, seconds: f64, sample_rate: u32) {
    std::fs::write(path, wav_bytes(&silence_wave(seconds, sample_rate))).unwrap();
}

/// 截取时的行为
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExtractBehavior {
    /// 写出请求时长的正弦音
    Tone,
    /// 写出全零音频
    Silence,
    /// 进程超时
    Timeout,
    /// 输入损坏
    Corrupt,
}

/// 进程内的转码器替身：记录调用，不启动任何外部进程
pub struct ScriptedTranscoder {
    media: MediaInfo,
    behavior: ExtractBehavior,
    probes: AtomicUsize,
    jobs: Mutex<Vec<ExtractJob>>,
}

impl ScriptedTranscoder {
    pub fn video(duration_sec: f64) -> Self {
        Self::with_behavior(duration_sec, ExtractBehavior::Tone)
    }

    pub fn with_behavior(duration_sec: f64, behavior: ExtractBehavior) -> Self {
        Self {
            media: MediaInfo {
                duration_sec,
                format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
                has_audio: true,
                has_video: true,
            },
            behavior,
            probes: AtomicUsize::new(0),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn without_audio(mut self) -> Self {
        self.media.has_audio = false;
        self
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn extract_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn jobs(&self) -> Vec<ExtractJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTranscoderPort for ScriptedTranscoder {
    async fn probe(&self, _source: &Path) -> Result<MediaInfo, TranscodeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.media.clone())
    }

    async fn extract(&self, job: &ExtractJob) -> Result<(), TranscodeError> {
        self.jobs.lock().unwrap().push(job.clone());

        let seconds = job
            .duration_sec
            .unwrap_or(self.media.duration_sec - job.start_sec);
        let wave = match self.behavior {
            ExtractBehavior::Tone => tone_wave(seconds, job.sample_rate, job.channels),
            ExtractBehavior::Silence => silence_wave(seconds, job.sample_rate),
            ExtractBehavior::Timeout => {
                return Err(TranscodeError::Timeout(std::time::Duration::from_secs(120)))
            }
            ExtractBehavior::Corrupt => {
                return Err(TranscodeError::CorruptInput(
                    "Invalid data found when processing input".to_string(),
                ))
            }
        };
        tokio::fs::write(&job.output, wav_bytes(&wave))
            .await
            .map_err(|e| TranscodeError::Io(e.to_string()))
    }
}
