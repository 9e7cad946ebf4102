//! WAV Codec - 基于 symphonia 的音频编解码器
//!
//! 支持：
//! - symphonia 可探测的容器解码为 f32 交错波形（WAV / FLAC / OGG Vorbis）
//! - f32 波形编码为 16-bit PCM WAV

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioCodecPort, CodecError};
use crate::domain::audio::Waveform;

/// WAV 编解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct WavCodec;

impl WavCodec {
    pub fn new() -> Self {
        Self
    }
}

impl AudioCodecPort for WavCodec {
    fn decode(&self, data: &[u8], extension_hint: Option<&str>) -> Result<Waveform, CodecError> {
        if data.is_empty() {
            return Err(CodecError::Decode("audio data is empty".to_string()));
        }

        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension(extension_hint.unwrap_or("wav"));

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::Decode(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| CodecError::Decode("No audio track found".to_string()))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CodecError::Decode("Unknown sample rate".to_string()))?;

        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| CodecError::Decode("Unknown channel count".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CodecError::Decode(format!("Decoder creation failed: {}", e)))?;

        let track_id = track.id;
        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(CodecError::Decode(format!("Packet read error: {}", e)));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
                Err(e) => return Err(CodecError::Decode(e.to_string())),
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        Ok(Waveform::new(samples, sample_rate, channels))
    }

    fn encode_wav(&self, wave: &Waveform) -> Result<Vec<u8>, CodecError> {
        if wave.channels == 0 || wave.sample_rate == 0 {
            return Err(CodecError::Encode(format!(
                "invalid format: {} channels at {} Hz",
                wave.channels, wave.sample_rate
            )));
        }

        let bits_per_sample: u16 = 16;
        let num_channels = wave.channels;
        let sample_rate = wave.sample_rate;
        let byte_rate = sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
        let block_align = num_channels * (bits_per_sample / 8);

        let data_size = wave.samples.len() * 2;
        if data_size > (u32::MAX - 36) as usize {
            return Err(CodecError::Encode("audio too long for WAV".to_string()));
        }
        let file_size = 36 + data_size;

        let mut wav = Vec::with_capacity(44 + data_size);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());

        for &s in &wave.samples {
            let sample = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            wav.extend_from_slice(&sample.to_le_bytes());
        }

        Ok(wav)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(seconds: f64, sample_rate: u32, channels: u16) -> Waveform {
        let frames = (seconds * sample_rate as f64) as usize;
        let mut samples = Vec::with_capacity(frames * channels as usize);
        for i in 0..frames {
            let v = 0.25 * (2.0 * std::f32::consts::PI * 330.0 * i as f32 / sample_rate as f32).sin();
            for _ in 0..channels {
                samples.push(v);
            }
        }
        Waveform::new(samples, sample_rate, channels)
    }

    #[test]
    fn test_encoded_wav_decodes_with_same_format() {
        let codec = WavCodec::new();
        let original = tone(1.5, 44100, 2);

        let bytes = codec.encode_wav(&original).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(bytes.len(), 44 + original.samples.len() * 2);

        let decoded = codec.decode(&bytes, Some("wav")).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.frames(), original.frames());
        // 16-bit 量化误差
        let max_err = decoded
            .samples
            .iter()
            .zip(&original.samples)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0f32, f32::max);
        assert!(max_err < 1e-3);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let codec = WavCodec::new();
        assert!(codec.decode(b"", None).is_err());
        assert!(codec.decode(b"definitely not a riff file", Some("wav")).is_err());
    }

    #[test]
    fn test_encode_rejects_zero_channels() {
        let codec = WavCodec::new();
        assert!(codec
            .encode_wav(&Waveform::new(vec![0.0; 4], 16000, 0))
            .is_err());
    }
}
