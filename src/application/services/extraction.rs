//! Media Extraction Pipeline - 媒体截取流水线
//!
//! 流程：区间校验 → 路径安全检查 → 文件大小 → ffprobe → 私有临时目录内截取
//! → 解码分析（静音 / 时长门限）。
//!
//! 每次调用的临时目录由 [`ExtractedClip`] 持有，任何退出路径上随 drop 删除。

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

use crate::application::error::EngineError;
use crate::application::ports::{AudioCodecPort, ExtractJob, MediaInfo, MediaTranscoderPort};
use crate::domain::audio::{analyze, AudioAnalysis, DurationBounds};
use crate::domain::voice::TrimRange;

/// 截取流水线配置
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// 允许作为输入的上传暂存目录
    pub staging_dir: PathBuf,
    /// 每次调用的私有临时目录建在这里
    pub temp_dir: PathBuf,
    pub segment_bounds: DurationBounds,
    pub profile_bounds: DurationBounds,
    pub max_upload_bytes: u64,
    pub max_source_duration_sec: f64,
    pub target: TargetFormat,
    pub silence_rms_floor: f32,
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for TargetFormat {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            channels: 1,
        }
    }
}

/// 截取结果
///
/// 文件位于私有临时目录中，drop 时连同目录一起删除。
#[derive(Debug)]
pub struct ExtractedClip {
    path: PathBuf,
    analysis: AudioAnalysis,
    format: TargetFormat,
    trim_range: Option<TrimRange>,
    _dir: TempDir,
}

impl ExtractedClip {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn duration_sec(&self) -> f64 {
        self.analysis.duration_sec
    }

    pub fn analysis(&self) -> &AudioAnalysis {
        &self.analysis
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    /// 整段转码时为 None
    pub fn trim_range(&self) -> Option<TrimRange> {
        self.trim_range
    }

    /// 保存到输出目录（`clip_<时间戳>_<随机>.wav`），临时目录随后删除
    pub async fn persist_into(self, output_dir: &Path) -> Result<PathBuf, EngineError> {
        tokio::fs::create_dir_all(output_dir).await?;
        let target = output_dir.join(format!(
            "clip_{}_{}.wav",
            Utc::now().format("%Y%m%d_%H%M%S"),
            &Uuid::new_v4().simple().to_string()[..8]
        ));

        // 临时目录可能在另一个文件系统上
        if tokio::fs::rename(&self.path, &target).await.is_err() {
            if let Err(e) = tokio::fs::copy(&self.path, &target).await {
                let _ = tokio::fs::remove_file(&target).await;
                return Err(EngineError::io(format!(
                    "failed to save clip to {}: {}",
                    target.display(),
                    e
                )));
            }
        }

        tracing::info!(path = %target.display(), "Extracted clip saved");
        Ok(target)
    }
}

/// 媒体截取流水线
pub struct MediaExtractionPipeline {
    transcoder: Arc<dyn MediaTranscoderPort>,
    codec: Arc<dyn AudioCodecPort>,
    config: ExtractionConfig,
}

impl MediaExtractionPipeline {
    pub fn new(
        transcoder: Arc<dyn MediaTranscoderPort>,
        codec: Arc<dyn AudioCodecPort>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            transcoder,
            codec,
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// 按配置的目标格式截取
    pub async fn extract(
        &self,
        source: &Path,
        start_sec: f64,
        end_sec: f64,
    ) -> Result<ExtractedClip, EngineError> {
        self.extract_as(source, start_sec, end_sec, self.config.target)
            .await
    }

    /// 截取 `[start_sec, end_sec)` 并输出单声道 / 双声道 16-bit PCM WAV
    pub async fn extract_as(
        &self,
        source: &Path,
        start_sec: f64,
        end_sec: f64,
        target: TargetFormat,
    ) -> Result<ExtractedClip, EngineError> {
        let range = TrimRange::new(start_sec, end_sec)?;
        let segment = range.duration_sec();
        let bounds = self.config.segment_bounds;
        if !bounds.contains(segment) {
            return Err(EngineError::validation(format!(
                "selected segment is {:.2}s; it must be between {:.1}s and {:.1}s",
                segment, bounds.min_sec, bounds.max_sec
            )));
        }
        check_target(target)?;

        let source = self.admit_source(source).await?;
        let info = self.probe_source(&source).await?;
        if range.end_sec > info.duration_sec {
            return Err(EngineError::validation(format!(
                "segment end ({:.2}s) is beyond the end of the source ({:.2}s)",
                range.end_sec, info.duration_sec
            )));
        }

        let clip = self
            .run_extraction(&source, range.start_sec, Some(segment), target)
            .await?;

        tracing::info!(
            source = %source.display(),
            start_sec = range.start_sec,
            end_sec = range.end_sec,
            duration_sec = clip.analysis.duration_sec,
            sample_rate = target.sample_rate,
            "Segment extracted"
        );

        Ok(ExtractedClip {
            trim_range: Some(range),
            ..clip
        })
    }

    /// 整段转码为目标格式（用于非 WAV 上传 / 录音）
    pub async fn normalize(&self, source: &Path) -> Result<ExtractedClip, EngineError> {
        let source = self.admit_source(source).await?;
        let info = self.probe_source(&source).await?;

        // 整段转码前就能判定过长的音频
        let bounds = self.config.profile_bounds;
        if info.duration_sec > bounds.max_sec {
            return Err(EngineError::validation(format!(
                "audio is {:.2}s long; reference audio must be between {:.1}s and {:.1}s",
                info.duration_sec, bounds.min_sec, bounds.max_sec
            )));
        }

        let clip = self
            .run_extraction(&source, 0.0, None, self.config.target)
            .await?;

        tracing::info!(
            source = %source.display(),
            duration_sec = clip.analysis.duration_sec,
            "Audio normalized"
        );
        Ok(clip)
    }

    /// 路径必须落在暂存目录内，且大小不超限
    async fn admit_source(&self, source: &Path) -> Result<PathBuf, EngineError> {
        let staging = tokio::fs::canonicalize(&self.config.staging_dir)
            .await
            .map_err(|e| {
                EngineError::io(format!(
                    "staging directory {} is not accessible: {}",
                    self.config.staging_dir.display(),
                    e
                ))
            })?;

        let resolved = match tokio::fs::canonicalize(source).await {
            Ok(p) => p,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::validation(format!(
                    "source file not found: {}",
                    source.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if !resolved.starts_with(&staging) {
            tracing::warn!(
                source = %source.display(),
                resolved = %resolved.display(),
                "Rejected source outside staging area"
            );
            return Err(EngineError::validation(format!(
                "source path {} is outside the upload area",
                source.display()
            )));
        }

        let meta = tokio::fs::metadata(&resolved).await?;
        if !meta.is_file() {
            return Err(EngineError::validation(format!(
                "source {} is not a regular file",
                source.display()
            )));
        }
        if meta.len() > self.config.max_upload_bytes {
            return Err(EngineError::validation(format!(
                "file is too large ({:.1} MB); the limit is {:.1} MB",
                meta.len() as f64 / MIB,
                self.config.max_upload_bytes as f64 / MIB
            )));
        }

        Ok(resolved)
    }

    async fn probe_source(&self, source: &Path) -> Result<MediaInfo, EngineError> {
        let info = self.transcoder.probe(source).await?;
        tracing::debug!(
            source = %source.display(),
            duration_sec = info.duration_sec,
            format = %info.format_name,
            "Probed source"
        );

        if info.duration_sec > self.config.max_source_duration_sec {
            return Err(EngineError::validation(format!(
                "source duration ({:.1}s) exceeds the {:.1}s limit",
                info.duration_sec, self.config.max_source_duration_sec
            )));
        }
        if !info.has_audio {
            return Err(EngineError::validation(format!(
                "{} has no audio track",
                source.display()
            )));
        }
        Ok(info)
    }

    /// 在私有临时目录中运行转码，然后解码分析
    async fn run_extraction(
        &self,
        source: &Path,
        start_sec: f64,
        duration_sec: Option<f64>,
        target: TargetFormat,
    ) -> Result<ExtractedClip, EngineError> {
        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix("extract-")
            .tempdir_in(&self.config.temp_dir)?;
        let output = dir
            .path()
            .join(format!("{}.wav", Uuid::new_v4().simple()));

        let job = ExtractJob {
            source: source.to_path_buf(),
            start_sec,
            duration_sec,
            sample_rate: target.sample_rate,
            channels: target.channels,
            output: output.clone(),
            work_dir: dir.path().to_path_buf(),
        };
        self.transcoder.extract(&job).await?;

        let data = tokio::fs::read(&output).await.map_err(|e| {
            EngineError::io(format!("transcoder produced no readable output: {}", e))
        })?;

        let codec = self.codec.clone();
        let floor = self.config.silence_rms_floor;
        let analysis = tokio::task::spawn_blocking(move || {
            let wave = codec.decode(&data, Some("wav"))?.to_mono();
            Ok::<_, EngineError>(analyze(&wave, floor)?)
        })
        .await
        .map_err(|e| EngineError::io(format!("analysis task failed: {}", e)))??;

        if analysis.is_silent {
            return Err(EngineError::validation(format!(
                "extracted audio appears to be silent (RMS {:.4}); choose a segment with clear speech",
                analysis.rms_energy
            )));
        }
        let bounds = self.config.profile_bounds;
        if !bounds.contains(analysis.duration_sec) {
            return Err(EngineError::validation(format!(
                "audio is {:.2}s long; reference audio must be between {:.1}s and {:.1}s",
                analysis.duration_sec, bounds.min_sec, bounds.max_sec
            )));
        }

        Ok(ExtractedClip {
            path: output,
            analysis,
            format: target,
            trim_range: None,
            _dir: dir,
        })
    }
}

const MIB: f64 = 1024.0 * 1024.0;

fn check_target(target: TargetFormat) -> Result<(), EngineError> {
    if target.sample_rate == 0 || !(1..=2).contains(&target.channels) {
        return Err(EngineError::validation(format!(
            "unsupported target format: {} Hz, {} channels",
            target.sample_rate, target.channels
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::ProcessErrorKind;
    use crate::infrastructure::adapters::WavCodec;
    use crate::test_support::{ExtractBehavior, ScriptedTranscoder};
    use tempfile::tempdir;

    struct Fixture {
        root: TempDir,
        transcoder: Arc<ScriptedTranscoder>,
        pipeline: MediaExtractionPipeline,
    }

    impl Fixture {
        fn new(transcoder: ScriptedTranscoder) -> Self {
            Self::with_limit(transcoder, 100 * 1024 * 1024)
        }

        fn with_limit(transcoder: ScriptedTranscoder, max_upload_bytes: u64) -> Self {
            let root = tempdir().unwrap();
            std::fs::create_dir_all(root.path().join("uploads")).unwrap();
            std::fs::create_dir_all(root.path().join("tmp")).unwrap();
            let transcoder = Arc::new(transcoder);
            let pipeline = MediaExtractionPipeline::new(
                transcoder.clone(),
                Arc::new(WavCodec::new()),
                ExtractionConfig {
                    staging_dir: root.path().join("uploads"),
                    temp_dir: root.path().join("tmp"),
                    segment_bounds: DurationBounds::new(3.0, 30.0),
                    profile_bounds: DurationBounds::new(3.0, 30.0),
                    max_upload_bytes,
                    max_source_duration_sec: 300.0,
                    target: TargetFormat::default(),
                    silence_rms_floor: 0.005,
                },
            );
            Self {
                root,
                transcoder,
                pipeline,
            }
        }

        fn upload(&self, name: &str, size: usize) -> PathBuf {
            let path = self.root.path().join("uploads").join(name);
            std::fs::write(&path, vec![0u8; size]).unwrap();
            path
        }

        fn temp_entries(&self) -> usize {
            std::fs::read_dir(self.root.path().join("tmp"))
                .unwrap()
                .count()
        }
    }

    #[tokio::test]
    async fn test_extract_segment_from_video() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0));
        let source = fx.upload("talk.mp4", 1024);

        let clip = fx.pipeline.extract(&source, 23.5, 32.8).await.unwrap();
        assert!((clip.duration_sec() - 9.3).abs() < 0.01);
        assert_eq!(clip.sample_rate(), 24000);
        assert_eq!(clip.channels(), 1);
        assert_eq!(clip.trim_range(), Some(TrimRange::new(23.5, 32.8).unwrap()));
        assert!(clip.path().exists());

        let job = &fx.transcoder.jobs()[0];
        assert_eq!(job.start_sec, 23.5);
        assert!((job.duration_sec.unwrap() - 9.3).abs() < 1e-9);
        assert!(job.output.starts_with(&job.work_dir));
        assert!(job.work_dir.starts_with(fx.root.path().join("tmp")));
    }

    #[tokio::test]
    async fn test_short_segment_is_rejected_before_transcoding() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0));
        let source = fx.upload("talk.mp4", 1024);

        let err = fx.pipeline.extract(&source, 5.0, 6.5).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("1.50s"));
        assert_eq!(fx.transcoder.probe_count(), 0);
        assert_eq!(fx.transcoder.extract_count(), 0);
    }

    #[tokio::test]
    async fn test_segment_bounds_are_inclusive() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0));
        let source = fx.upload("talk.mp4", 1024);

        assert!(fx.pipeline.extract(&source, 0.0, 3.0).await.is_ok());
        assert!(fx.pipeline.extract(&source, 10.0, 40.0).await.is_ok());
        assert!(fx.pipeline.extract(&source, 9.0, 40.0).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_ranges() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0));
        let source = fx.upload("talk.mp4", 1024);

        for (start, end) in [(-1.0, 5.0), (10.0, 10.0), (12.0, 8.0), (f64::NAN, 5.0)] {
            assert!(matches!(
                fx.pipeline.extract(&source, start, end).await,
                Err(EngineError::Validation(_))
            ));
        }
        // 超出源时长
        let err = fx.pipeline.extract(&source, 35.0, 45.0).await.unwrap_err();
        assert!(err.to_string().contains("beyond the end"));
        assert_eq!(fx.transcoder.extract_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_never_invokes_process() {
        let fx = Fixture::with_limit(ScriptedTranscoder::video(40.0), 1000);
        let source = fx.upload("big.mp4", 1001);

        let err = fx.pipeline.extract(&source, 0.0, 10.0).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert_eq!(fx.transcoder.probe_count(), 0);
        assert_eq!(fx.transcoder.extract_count(), 0);
    }

    #[tokio::test]
    async fn test_overlong_source_is_rejected_after_probe() {
        let fx = Fixture::new(ScriptedTranscoder::video(412.0));
        let source = fx.upload("lecture.mp4", 1024);

        let err = fx.pipeline.extract(&source, 0.0, 10.0).await.unwrap_err();
        assert!(err.to_string().contains("412.0s"));
        assert_eq!(fx.transcoder.probe_count(), 1);
        assert_eq!(fx.transcoder.extract_count(), 0);
    }

    #[tokio::test]
    async fn test_source_without_audio_is_rejected() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0).without_audio());
        let source = fx.upload("screen.mp4", 1024);
        let err = fx.pipeline.extract(&source, 0.0, 10.0).await.unwrap_err();
        assert!(err.to_string().contains("no audio"));
    }

    #[tokio::test]
    async fn test_path_outside_staging_is_rejected() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0));
        let outside = fx.root.path().join("secret.mp4");
        std::fs::write(&outside, b"x").unwrap();

        let escaped = fx.root.path().join("uploads/../secret.mp4");
        for path in [outside.as_path(), escaped.as_path()] {
            let err = fx.pipeline.extract(path, 0.0, 10.0).await.unwrap_err();
            assert!(err.to_string().contains("outside the upload area"));
        }

        let missing = fx.root.path().join("uploads/missing.mp4");
        assert!(matches!(
            fx.pipeline.extract(&missing, 0.0, 10.0).await,
            Err(EngineError::Validation(_))
        ));
        assert_eq!(fx.transcoder.probe_count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_escape_is_rejected() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0));
        let outside = fx.root.path().join("secret.mp4");
        std::fs::write(&outside, b"x").unwrap();
        let link = fx.root.path().join("uploads/innocent.mp4");
        std::os::unix::fs::symlink(&outside, &link).unwrap();

        assert!(fx.pipeline.extract(&link, 0.0, 10.0).await.is_err());
        assert_eq!(fx.transcoder.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_no_temp_files_left_on_any_path() {
        let ok = Fixture::new(ScriptedTranscoder::video(40.0));
        let source = ok.upload("talk.mp4", 1024);
        let before = ok.temp_entries();
        let clip = ok.pipeline.extract(&source, 1.0, 6.0).await.unwrap();
        assert_eq!(ok.temp_entries(), before + 1);
        drop(clip);
        assert_eq!(ok.temp_entries(), before);

        for behavior in [
            ExtractBehavior::Silence,
            ExtractBehavior::Timeout,
            ExtractBehavior::Corrupt,
        ] {
            let fx = Fixture::new(ScriptedTranscoder::with_behavior(40.0, behavior));
            let source = fx.upload("talk.mp4", 1024);
            let before = fx.temp_entries();
            assert!(fx.pipeline.extract(&source, 1.0, 6.0).await.is_err());
            assert_eq!(fx.temp_entries(), before, "{:?}", behavior);
        }
    }

    #[tokio::test]
    async fn test_failures_are_classified() {
        let fx = Fixture::new(ScriptedTranscoder::with_behavior(40.0, ExtractBehavior::Timeout));
        let source = fx.upload("talk.mp4", 1024);
        let err = fx.pipeline.extract(&source, 1.0, 6.0).await.unwrap_err();
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Timeout));

        let fx = Fixture::new(ScriptedTranscoder::with_behavior(40.0, ExtractBehavior::Corrupt));
        let source = fx.upload("talk.mp4", 1024);
        let err = fx.pipeline.extract(&source, 1.0, 6.0).await.unwrap_err();
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::CorruptInput));

        let fx = Fixture::new(ScriptedTranscoder::with_behavior(40.0, ExtractBehavior::Silence));
        let source = fx.upload("talk.mp4", 1024);
        let err = fx.pipeline.extract(&source, 1.0, 6.0).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref m) if m.contains("silent")));
    }

    #[tokio::test]
    async fn test_repeated_extraction_is_stable() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0));
        let source = fx.upload("talk.mp4", 1024);

        let a = fx.pipeline.extract(&source, 23.5, 32.8).await.unwrap();
        let b = fx.pipeline.extract(&source, 23.5, 32.8).await.unwrap();
        assert_eq!(a.duration_sec(), b.duration_sec());
        assert_eq!(a.sample_rate(), b.sample_rate());
        assert_ne!(a.path(), b.path());
    }

    #[tokio::test]
    async fn test_normalize_full_length() {
        let fx = Fixture::new(ScriptedTranscoder::video(12.0));
        let source = fx.upload("memo.m4a", 1024);

        let clip = fx.pipeline.normalize(&source).await.unwrap();
        assert!((clip.duration_sec() - 12.0).abs() < 0.01);
        assert!(clip.trim_range().is_none());
        assert_eq!(fx.transcoder.jobs()[0].duration_sec, None);
    }

    #[tokio::test]
    async fn test_normalize_rejects_overlong_audio_before_transcoding() {
        let fx = Fixture::new(ScriptedTranscoder::video(45.0));
        let source = fx.upload("memo.m4a", 1024);

        let err = fx.pipeline.normalize(&source).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("between 3.0s and 30.0s"));
        assert_eq!(fx.transcoder.extract_count(), 0);
        assert_eq!(fx.temp_entries(), 0);
    }

    #[tokio::test]
    async fn test_persist_clip_for_preview() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0));
        let source = fx.upload("talk.mp4", 1024);
        let clip = fx.pipeline.extract(&source, 2.0, 7.0).await.unwrap();

        let outputs = fx.root.path().join("outputs");
        let saved = clip.persist_into(&outputs).await.unwrap();
        assert!(saved.exists());
        let name = saved.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("clip_") && name.ends_with(".wav"));
        assert_eq!(fx.temp_entries(), 0);
    }
}
