//! Voice Command Handlers

use std::path::Path;
use std::sync::Arc;

use crate::application::commands::{CreateVoiceFromVideo, DeleteVoice, RegisterVoiceUpload};
use crate::application::error::EngineError;
use crate::application::ports::{RegisterVoice, VoiceRegistryPort};
use crate::application::services::MediaExtractionPipeline;
use crate::domain::voice::{SourceType, TrimRange, VoiceName, VoiceProfile, VoiceSource};

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

// ============================================================================
// RegisterVoiceUpload
// ============================================================================

/// RegisterVoiceUpload Handler
///
/// WAV 直接入库；其他容器先整段转码为目标格式
pub struct RegisterVoiceUploadHandler {
    registry: Arc<dyn VoiceRegistryPort>,
    pipeline: Arc<MediaExtractionPipeline>,
}

impl RegisterVoiceUploadHandler {
    pub fn new(
        registry: Arc<dyn VoiceRegistryPort>,
        pipeline: Arc<MediaExtractionPipeline>,
    ) -> Self {
        Self { registry, pipeline }
    }

    pub async fn handle(&self, command: RegisterVoiceUpload) -> Result<VoiceProfile, EngineError> {
        let source = match command.source_type {
            SourceType::Uploaded => VoiceSource::uploaded(&command.original_name),
            SourceType::Recorded => VoiceSource::recorded(&command.original_name),
            SourceType::Video => {
                return Err(EngineError::validation(
                    "video sources must be registered with a trim range",
                ))
            }
        };
        // 名称先校验，避免无效名称白白转码
        VoiceName::new(&command.name)?;

        let needs_transcode =
            !is_wav(&command.audio_path) && !is_wav(Path::new(&command.original_name));

        let clip = if needs_transcode {
            tracing::debug!(
                name = %command.name,
                file = %command.original_name,
                "Normalizing non-WAV upload"
            );
            Some(self.pipeline.normalize(&command.audio_path).await?)
        } else {
            None
        };
        let audio_path = clip
            .as_ref()
            .map(|c| c.path().to_path_buf())
            .unwrap_or_else(|| command.audio_path.clone());

        let profile = self
            .registry
            .register(RegisterVoice {
                name: command.name,
                audio_path,
                source,
                notes: command.notes,
                overwrite: command.overwrite,
            })
            .await?;

        Ok(profile)
    }
}

// ============================================================================
// CreateVoiceFromVideo
// ============================================================================

/// CreateVoiceFromVideo Handler: Extract → Register
pub struct CreateVoiceFromVideoHandler {
    registry: Arc<dyn VoiceRegistryPort>,
    pipeline: Arc<MediaExtractionPipeline>,
}

impl CreateVoiceFromVideoHandler {
    pub fn new(
        registry: Arc<dyn VoiceRegistryPort>,
        pipeline: Arc<MediaExtractionPipeline>,
    ) -> Self {
        Self { registry, pipeline }
    }

    pub async fn handle(&self, command: CreateVoiceFromVideo) -> Result<VoiceProfile, EngineError> {
        VoiceName::new(&command.name)?;
        let range = TrimRange::new(command.start_sec, command.end_sec)?;

        // 截取结果在本函数结束时随 clip 一起删除
        let clip = self
            .pipeline
            .extract(&command.video_path, range.start_sec, range.end_sec)
            .await?;

        let profile = self
            .registry
            .register(RegisterVoice {
                name: command.name,
                audio_path: clip.path().to_path_buf(),
                source: VoiceSource::video(command.original_name, range),
                notes: command.notes,
                overwrite: command.overwrite,
            })
            .await?;

        tracing::info!(
            voice = %profile.name(),
            start_sec = range.start_sec,
            end_sec = range.end_sec,
            "Voice created from video"
        );

        Ok(profile)
    }
}

// ============================================================================
// DeleteVoice
// ============================================================================

/// DeleteVoice Handler
pub struct DeleteVoiceHandler {
    registry: Arc<dyn VoiceRegistryPort>,
}

impl DeleteVoiceHandler {
    pub fn new(registry: Arc<dyn VoiceRegistryPort>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, command: DeleteVoice) -> Result<VoiceProfile, EngineError> {
        self.registry.delete(&command.name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::{ExtractionConfig, TargetFormat};
    use crate::domain::audio::DurationBounds;
    use crate::infrastructure::adapters::WavCodec;
    use crate::infrastructure::persistence::{FileVoiceRegistry, RegistryConfig};
    use crate::test_support::{write_tone_wav, ExtractBehavior, ScriptedTranscoder};
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    struct Fixture {
        root: TempDir,
        transcoder: Arc<ScriptedTranscoder>,
        registry: Arc<FileVoiceRegistry>,
        pipeline: Arc<MediaExtractionPipeline>,
    }

    impl Fixture {
        async fn new(transcoder: ScriptedTranscoder) -> Self {
            let root = tempdir().unwrap();
            for dir in ["uploads", "tmp"] {
                std::fs::create_dir_all(root.path().join(dir)).unwrap();
            }
            let codec = Arc::new(WavCodec::new());
            let transcoder = Arc::new(transcoder);
            let registry = Arc::new(
                FileVoiceRegistry::open(
                    RegistryConfig {
                        voices_dir: root.path().join("voices"),
                        registry_file: root.path().join("voices.json"),
                        duration_bounds: DurationBounds::new(3.0, 30.0),
                        silence_rms_floor: 0.005,
                    },
                    codec.clone(),
                )
                .await
                .unwrap(),
            );
            let pipeline = Arc::new(MediaExtractionPipeline::new(
                transcoder.clone(),
                codec,
                ExtractionConfig {
                    staging_dir: root.path().join("uploads"),
                    temp_dir: root.path().join("tmp"),
                    segment_bounds: DurationBounds::new(3.0, 30.0),
                    profile_bounds: DurationBounds::new(3.0, 30.0),
                    max_upload_bytes: 100 * 1024 * 1024,
                    max_source_duration_sec: 300.0,
                    target: TargetFormat::default(),
                    silence_rms_floor: 0.005,
                },
            ));
            Self {
                root,
                transcoder,
                registry,
                pipeline,
            }
        }

        fn staged(&self, name: &str) -> PathBuf {
            self.root.path().join("uploads").join(name)
        }

        fn temp_entries(&self) -> usize {
            std::fs::read_dir(self.root.path().join("tmp")).unwrap().count()
        }

        fn video_handler(&self) -> CreateVoiceFromVideoHandler {
            CreateVoiceFromVideoHandler::new(self.registry.clone(), self.pipeline.clone())
        }

        fn upload_handler(&self) -> RegisterVoiceUploadHandler {
            RegisterVoiceUploadHandler::new(self.registry.clone(), self.pipeline.clone())
        }
    }

    fn from_video(name: &str, path: PathBuf, start: f64, end: f64) -> CreateVoiceFromVideo {
        CreateVoiceFromVideo {
            name: name.to_string(),
            video_path: path,
            original_name: "talk.mp4".to_string(),
            start_sec: start,
            end_sec: end,
            notes: None,
            overwrite: false,
        }
    }

    #[tokio::test]
    async fn test_create_voice_from_video() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0)).await;
        let video = fx.staged("talk.mp4");
        std::fs::write(&video, b"mp4").unwrap();

        let profile = fx
            .video_handler()
            .handle(from_video("John_Professional", video, 23.5, 32.8))
            .await
            .unwrap();

        assert_eq!(profile.source_type(), SourceType::Video);
        assert_eq!(profile.sample_rate(), 24000);
        assert!((profile.duration_sec() - 9.3).abs() < 0.01);

        let found = fx.registry.lookup("John_Professional").await.unwrap();
        let range = found.trim_range().unwrap();
        assert_eq!((range.start_sec, range.end_sec), (23.5, 32.8));
        assert_eq!(fx.temp_entries(), 0);
    }

    #[tokio::test]
    async fn test_failed_extraction_writes_no_metadata() {
        let fx = Fixture::new(ScriptedTranscoder::with_behavior(40.0, ExtractBehavior::Silence)).await;
        let video = fx.staged("talk.mp4");
        std::fs::write(&video, b"mp4").unwrap();

        let err = fx
            .video_handler()
            .handle(from_video("Quiet", video.clone(), 1.0, 8.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(fx.registry.list().await.is_empty());
        assert_eq!(fx.temp_entries(), 0);

        // 名称无效时不启动转码
        assert!(fx
            .video_handler()
            .handle(from_video("bad name!", video, 1.0, 8.0))
            .await
            .is_err());
        assert_eq!(fx.transcoder.extract_count(), 1);
    }

    #[tokio::test]
    async fn test_existing_name_keeps_extracted_clip_out() {
        let fx = Fixture::new(ScriptedTranscoder::video(40.0)).await;
        let video = fx.staged("talk.mp4");
        std::fs::write(&video, b"mp4").unwrap();

        fx.video_handler()
            .handle(from_video("Anna", video.clone(), 1.0, 8.0))
            .await
            .unwrap();
        let err = fx
            .video_handler()
            .handle(from_video("anna", video, 10.0, 20.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyExists(_)));
        assert_eq!(fx.temp_entries(), 0);
        let kept = fx.registry.lookup("Anna").await.unwrap();
        assert_eq!(kept.trim_range().unwrap().start_sec, 1.0);
    }

    #[tokio::test]
    async fn test_wav_upload_skips_transcoder() {
        let fx = Fixture::new(ScriptedTranscoder::video(0.0)).await;
        let upload = fx.staged("f3a9.bin");
        write_tone_wav(&upload, 7.0, 44100, 1);

        let profile = fx
            .upload_handler()
            .handle(RegisterVoiceUpload {
                name: "Daniel".to_string(),
                audio_path: upload,
                original_name: "daniel.wav".to_string(),
                source_type: SourceType::Uploaded,
                notes: None,
                overwrite: false,
            })
            .await
            .unwrap();

        assert_eq!(profile.source_file(), "daniel.wav");
        assert_eq!(profile.sample_rate(), 44100);
        assert_eq!(fx.transcoder.probe_count(), 0);
        assert_eq!(fx.registry.list().await, vec!["Daniel".to_string()]);
    }

    #[tokio::test]
    async fn test_recording_in_other_container_is_normalized() {
        let fx = Fixture::new(ScriptedTranscoder::video(6.0)).await;
        let upload = fx.staged("rec.webm");
        std::fs::write(&upload, b"webm").unwrap();

        let profile = fx
            .upload_handler()
            .handle(RegisterVoiceUpload {
                name: "Mic".to_string(),
                audio_path: upload,
                original_name: "recording.webm".to_string(),
                source_type: SourceType::Recorded,
                notes: Some("desk mic".to_string()),
                overwrite: false,
            })
            .await
            .unwrap();

        assert_eq!(profile.source_type(), SourceType::Recorded);
        assert_eq!(profile.sample_rate(), 24000);
        assert_eq!(fx.transcoder.extract_count(), 1);
        assert_eq!(fx.temp_entries(), 0);
    }

    #[tokio::test]
    async fn test_upload_rejects_video_source_type() {
        let fx = Fixture::new(ScriptedTranscoder::video(6.0)).await;
        let err = fx
            .upload_handler()
            .handle(RegisterVoiceUpload {
                name: "X".to_string(),
                audio_path: fx.staged("x.wav"),
                original_name: "x.wav".to_string(),
                source_type: SourceType::Video,
                notes: None,
                overwrite: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let fx = Fixture::new(ScriptedTranscoder::video(0.0)).await;
        let upload = fx.staged("daniel.wav");
        write_tone_wav(&upload, 5.0, 24000, 1);
        fx.upload_handler()
            .handle(RegisterVoiceUpload {
                name: "Daniel".to_string(),
                audio_path: upload,
                original_name: "daniel.wav".to_string(),
                source_type: SourceType::Uploaded,
                notes: None,
                overwrite: false,
            })
            .await
            .unwrap();

        let handler = DeleteVoiceHandler::new(fx.registry.clone());
        let delete = || DeleteVoice {
            name: "Daniel".to_string(),
        };
        assert!(handler.handle(delete()).await.is_ok());
        for _ in 0..2 {
            assert!(matches!(
                handler.handle(delete()).await,
                Err(EngineError::NotFound(_))
            ));
        }
    }
}
