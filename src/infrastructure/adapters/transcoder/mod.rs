//! Transcoder Adapter - 外部 ffmpeg 进程

mod ffmpeg_transcoder;

pub use ffmpeg_transcoder::{FfmpegTranscoder, FfmpegTranscoderConfig};
