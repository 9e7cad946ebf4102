//! FFmpeg Transcoder - 调用外部 ffmpeg / ffprobe 进程
//!
//! 实现 MediaTranscoderPort：
//! - probe: ffprobe 读取容器时长与流类型
//! - extract: ffmpeg 截取区间并输出 pcm_s16le WAV
//!
//! 每次调用都带墙钟超时；超时后 future 被丢弃，`kill_on_drop` 终止子进程。

use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

use crate::application::ports::{ExtractJob, MediaInfo, MediaTranscoderPort, TranscodeError};

/// FFmpeg 转码器配置
#[derive(Debug, Clone)]
pub struct FfmpegTranscoderConfig {
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// 单次进程调用的墙钟超时
    pub timeout: Duration,
}

impl Default for FfmpegTranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            timeout: Duration::from_secs(120),
        }
    }
}

impl FfmpegTranscoderConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// FFmpeg 转码器
pub struct FfmpegTranscoder {
    config: FfmpegTranscoderConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: FfmpegTranscoderConfig) -> Self {
        Self { config }
    }

    /// 运行外部进程并收集输出
    async fn run(
        &self,
        program: &Path,
        args: Vec<OsString>,
        work_dir: Option<&Path>,
    ) -> Result<Output, TranscodeError> {
        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = work_dir {
            command.current_dir(dir);
        }

        tracing::debug!(program = %program.display(), args = ?args, "Spawning transcoder");

        let child = command.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                TranscodeError::Unavailable(format!(
                    "cannot run '{}' ({}). Ensure ffmpeg is installed and on PATH",
                    program.display(),
                    e
                ))
            }
            _ => TranscodeError::Io(format!("failed to spawn '{}': {}", program.display(), e)),
        })?;

        match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(TranscodeError::Io(format!(
                "failed to wait for '{}': {}",
                program.display(),
                e
            ))),
            Err(_) => {
                tracing::warn!(
                    program = %program.display(),
                    timeout_secs = self.config.timeout.as_secs_f64(),
                    "Transcoder timed out, killing process"
                );
                Err(TranscodeError::Timeout(self.config.timeout))
            }
        }
    }
}

/// 构造 ffmpeg 截取参数
fn extract_args(job: &ExtractJob) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error"]
        .iter()
        .map(OsString::from)
        .collect();

    args.push("-ss".into());
    args.push(format!("{:.3}", job.start_sec).into());
    args.push("-i".into());
    args.push(job.source.as_os_str().to_owned());
    if let Some(duration) = job.duration_sec {
        args.push("-t".into());
        args.push(format!("{:.3}", duration).into());
    }
    for arg in ["-vn", "-acodec", "pcm_s16le", "-ar"] {
        args.push(arg.into());
    }
    args.push(job.sample_rate.to_string().into());
    args.push("-ac".into());
    args.push(job.channels.to_string().into());
    for arg in ["-f", "wav", "-y"] {
        args.push(arg.into());
    }
    args.push(job.output.as_os_str().to_owned());
    args
}

/// 根据 stderr 对失败进行分类
fn classify_failure(code: Option<i32>, stderr: &str) -> TranscodeError {
    let lower = stderr.to_ascii_lowercase();
    let detail = stderr.trim().lines().last().unwrap_or_default().to_string();

    const CORRUPT: &[&str] = &[
        "invalid data found when processing input",
        "moov atom not found",
        "could not find codec parameters",
        "error while decoding",
        "truncated",
    ];
    const UNSUPPORTED: &[&str] = &[
        "does not contain any stream",
        "matches no streams",
        "unknown format",
        "unsupported codec",
        "decoder not found",
        "not supported",
    ];

    if CORRUPT.iter().any(|p| lower.contains(p)) {
        TranscodeError::CorruptInput(detail)
    } else if UNSUPPORTED.iter().any(|p| lower.contains(p)) {
        TranscodeError::UnsupportedFormat(detail)
    } else {
        TranscodeError::Failed {
            code,
            stderr: stderr.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

/// 解析 `ffprobe -of json` 输出
fn parse_probe_output(stdout: &[u8]) -> Result<MediaInfo, TranscodeError> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| TranscodeError::CorruptInput(format!("unreadable ffprobe output: {}", e)))?;

    let format = probe
        .format
        .ok_or_else(|| TranscodeError::UnsupportedFormat("no container format detected".into()))?;

    let duration_sec = format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .ok_or_else(|| TranscodeError::CorruptInput("container has no duration".into()))?;

    let has_stream = |kind: &str| {
        probe
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some(kind))
    };

    Ok(MediaInfo {
        duration_sec,
        format_name: format.format_name.unwrap_or_default(),
        has_audio: has_stream("audio"),
        has_video: has_stream("video"),
    })
}

#[async_trait]
impl MediaTranscoderPort for FfmpegTranscoder {
    async fn probe(&self, source: &Path) -> Result<MediaInfo, TranscodeError> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format=duration,format_name:stream=codec_type".into(),
            "-of".into(),
            "json".into(),
            source.as_os_str().to_owned(),
        ];

        let output = self.run(&self.config.ffprobe_path, args, None).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(output.status.code(), &stderr));
        }

        parse_probe_output(&output.stdout)
    }

    async fn extract(&self, job: &ExtractJob) -> Result<(), TranscodeError> {
        let output = self
            .run(&self.config.ffmpeg_path, extract_args(job), Some(&job.work_dir))
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                source = %job.source.display(),
                status = ?output.status.code(),
                stderr = %stderr.trim(),
                "ffmpeg extraction failed"
            );
            return Err(classify_failure(output.status.code(), &stderr));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(work_dir: &Path) -> ExtractJob {
        ExtractJob {
            source: PathBuf::from("/data/uploads/talk.mp4"),
            start_sec: 23.5,
            duration_sec: Some(9.3),
            sample_rate: 24000,
            channels: 1,
            output: work_dir.join("out.wav"),
            work_dir: work_dir.to_path_buf(),
        }
    }

    #[test]
    fn test_extract_args() {
        let args: Vec<String> = extract_args(&job(Path::new("/tmp/x")))
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let joined = args.join(" ");
        assert!(joined.contains("-ss 23.500 -i /data/uploads/talk.mp4 -t 9.300"));
        assert!(joined.contains("-acodec pcm_s16le -ar 24000 -ac 1"));
        assert_eq!(args.last().unwrap(), "/tmp/x/out.wav");
    }

    #[test]
    fn test_extract_args_without_duration() {
        let mut j = job(Path::new("/tmp/x"));
        j.duration_sec = None;
        let args: Vec<String> = extract_args(&j)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(!args.contains(&"-t".to_string()));
    }

    #[test]
    fn test_classify_failure() {
        assert!(matches!(
            classify_failure(Some(1), "talk.mp4: Invalid data found when processing input"),
            TranscodeError::CorruptInput(_)
        ));
        assert!(matches!(
            classify_failure(Some(1), "Output file #0 does not contain any stream"),
            TranscodeError::UnsupportedFormat(_)
        ));
        assert!(matches!(
            classify_failure(Some(255), "something else"),
            TranscodeError::Failed { code: Some(255), .. }
        ));
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [{"codec_type": "video"}, {"codec_type": "audio"}],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "40.000000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration_sec - 40.0).abs() < 1e-9);
        assert!(info.has_audio);
        assert!(info.has_video);
    }

    #[test]
    fn test_parse_probe_without_duration_is_corrupt() {
        let json = br#"{"streams": [], "format": {"format_name": "wav"}}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(TranscodeError::CorruptInput(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = FfmpegTranscoder::new(FfmpegTranscoderConfig {
            ffmpeg_path: dir.path().join("no-such-ffmpeg"),
            ffprobe_path: dir.path().join("no-such-ffprobe"),
            timeout: Duration::from_secs(5),
        });

        let err = transcoder.extract(&job(dir.path())).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Unavailable(_)));

        let err = transcoder.probe(Path::new("/x.mp4")).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_process_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("slow-ffmpeg.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let transcoder = FfmpegTranscoder::new(
            FfmpegTranscoderConfig {
                ffmpeg_path: script,
                ..Default::default()
            }
            .with_timeout(Duration::from_millis(200)),
        );

        let started = std::time::Instant::now();
        let err = transcoder.extract(&job(dir.path())).await.unwrap_err();
        assert!(matches!(err, TranscodeError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
