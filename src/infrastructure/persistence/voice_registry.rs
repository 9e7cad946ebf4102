//! File Voice Registry - 文件系统音色注册表
//!
//! 管理目录 `voices_dir` 下每个音色一个规范 WAV（单声道 16-bit PCM），
//! 元数据由 [`JsonProfileStore`] 原子持久化。
//!
//! 解码、分析、编码都在锁外完成；检查存在性、放置文件、写元数据、
//! 持久化在同一个写锁内完成，任一步失败都回滚到调用前的状态。
//! 提交段在独立任务中运行，调用方被取消时照样跑完。

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::profile_store::JsonProfileStore;
use crate::application::error::EngineError;
use crate::application::ports::{AudioCodecPort, ReconcileReport, RegisterVoice, VoiceRegistryPort};
use crate::domain::audio::{analyze, DurationBounds};
use crate::domain::voice::{VoiceName, VoiceProfile};

/// 暂存、备份、删除中间文件的后缀
const PART_SUFFIX: &str = "wav.part";
const BACKUP_SUFFIX: &str = "bak";
const TRASH_SUFFIX: &str = "deleted";

/// 注册表配置
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub voices_dir: PathBuf,
    pub registry_file: PathBuf,
    pub duration_bounds: DurationBounds,
    pub silence_rms_floor: f32,
}

/// 已通过质量门限、等待放置的规范音频
struct PreparedAudio {
    bytes: Vec<u8>,
    duration_sec: f64,
    sample_rate: u32,
}

/// 管理目录内的暂存文件，未提交时随 drop 删除
struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    async fn write(dir: &Path, bytes: &[u8]) -> Result<Self, EngineError> {
        let path = dir.join(format!(".{}.{}", Uuid::new_v4().simple(), PART_SUFFIX));
        let staged = Self { path, armed: true };
        tokio::fs::write(&staged.path, bytes).await.map_err(|e| {
            EngineError::io(format!(
                "failed to stage audio in {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(staged)
    }

    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// 写锁保护的共享状态，提交任务持有它的 Arc
struct RegistryState {
    voices_dir: PathBuf,
    store: JsonProfileStore,
    entries: RwLock<BTreeMap<String, VoiceProfile>>,
}

/// 文件系统音色注册表
pub struct FileVoiceRegistry {
    state: Arc<RegistryState>,
    codec: Arc<dyn AudioCodecPort>,
    duration_bounds: DurationBounds,
    silence_rms_floor: f32,
}

impl FileVoiceRegistry {
    /// 打开注册表；元数据文件不存在时从空表开始
    pub async fn open(
        config: RegistryConfig,
        codec: Arc<dyn AudioCodecPort>,
    ) -> Result<Self, EngineError> {
        tokio::fs::create_dir_all(&config.voices_dir)
            .await
            .map_err(|e| {
                EngineError::io(format!(
                    "cannot create voices directory {}: {}",
                    config.voices_dir.display(),
                    e
                ))
            })?;

        let store = JsonProfileStore::new(&config.registry_file);
        let entries = store.load().await?;

        tracing::info!(
            voices = entries.len(),
            voices_dir = %config.voices_dir.display(),
            registry_file = %config.registry_file.display(),
            "Voice registry opened"
        );

        Ok(Self {
            state: Arc::new(RegistryState {
                voices_dir: config.voices_dir,
                store,
                entries: RwLock::new(entries),
            }),
            codec,
            duration_bounds: config.duration_bounds,
            silence_rms_floor: config.silence_rms_floor,
        })
    }

    pub fn voices_dir(&self) -> &Path {
        &self.state.voices_dir
    }

    pub fn duration_bounds(&self) -> DurationBounds {
        self.duration_bounds
    }

    /// 解码 → 下混 → 质量门限 → 规范编码
    async fn prepare_audio(&self, path: &Path) -> Result<PreparedAudio, EngineError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::validation(format!(
                    "audio file not found: {}",
                    path.display()
                )))
            }
            Err(e) => {
                return Err(EngineError::io(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        let hint = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let codec = self.codec.clone();
        let floor = self.silence_rms_floor;
        let (analysis, wave, bytes) = tokio::task::spawn_blocking(move || {
            let wave = codec.decode(&data, hint.as_deref())?.to_mono();
            let analysis = analyze(&wave, floor)?;
            let bytes = codec.encode_wav(&wave)?;
            Ok::<_, EngineError>((analysis, wave, bytes))
        })
        .await
        .map_err(|e| EngineError::io(format!("audio preparation task failed: {}", e)))??;

        if analysis.is_silent {
            return Err(EngineError::validation(format!(
                "audio appears to be silent (RMS {:.4} is below {:.4}); choose a segment with clear speech",
                analysis.rms_energy, floor
            )));
        }
        if !self.duration_bounds.contains(analysis.duration_sec) {
            return Err(EngineError::validation(format!(
                "audio is {:.2}s long; reference audio must be between {:.1}s and {:.1}s",
                analysis.duration_sec, self.duration_bounds.min_sec, self.duration_bounds.max_sec
            )));
        }
        if analysis.is_clipping {
            tracing::warn!(
                path = %path.display(),
                peak = analysis.peak,
                "Reference audio is clipping, cloning quality may suffer"
            );
        }

        Ok(PreparedAudio {
            bytes,
            duration_sec: analysis.duration_sec,
            sample_rate: wave.sample_rate,
        })
    }
}

/// 在独立任务中运行提交段；调用方 future 被丢弃不会中断它
async fn run_detached<T, F>(commit: F) -> Result<T, EngineError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, EngineError>> + Send + 'static,
{
    tokio::spawn(commit)
        .await
        .map_err(|e| EngineError::io(format!("registry commit task failed: {}", e)))?
}

/// 回滚用的 rename，失败只记录日志
async fn restore(from: &Path, to: &Path) {
    if let Err(e) = tokio::fs::rename(from, to).await {
        tracing::error!(
            from = %from.display(),
            to = %to.display(),
            error = %e,
            "Rollback failed, registry directory needs reconciliation"
        );
    }
}

/// 为现有文件建立备份，原路径保持可读；硬链接不可用时复制
async fn backup_in_place(path: &Path, backup: &Path) -> std::io::Result<()> {
    match tokio::fs::hard_link(path, backup).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Hard link failed, copying backup");
            tokio::fs::copy(path, backup).await.map(|_| ())
        }
    }
}

impl RegistryState {
    fn side_path(&self, key: &str, suffix: &str) -> PathBuf {
        self.voices_dir
            .join(format!(".{}.{}.{}", key, Uuid::new_v4().simple(), suffix))
    }

    async fn commit_register(
        self: Arc<Self>,
        key: String,
        profile: VoiceProfile,
        audio: Vec<u8>,
        overwrite: bool,
    ) -> Result<VoiceProfile, EngineError> {
        // 暂存在锁外进行
        let staged = StagedFile::write(&self.voices_dir, &audio).await?;
        drop(audio);

        let final_path = profile.audio_path().to_path_buf();
        let mut entries = self.entries.write().await;

        let previous = entries.get(&key).cloned();
        if let Some(existing) = &previous {
            if !overwrite {
                return Err(EngineError::AlreadyExists(existing.name().to_string()));
            }
            tracing::warn!(
                voice = %profile.name(),
                previous = %existing.name(),
                "Overwriting existing voice"
            );
        }

        // 旧文件留在原处，rename 原子替换；备份只用于回滚
        let backup = match &previous {
            Some(existing) if tokio::fs::try_exists(existing.audio_path()).await.unwrap_or(false) => {
                let backup = self.side_path(&key, BACKUP_SUFFIX);
                backup_in_place(existing.audio_path(), &backup).await?;
                Some((backup, existing.audio_path().to_path_buf()))
            }
            _ => None,
        };

        if let Err(e) = tokio::fs::rename(&staged.path, &final_path).await {
            if let Some((backup, _)) = &backup {
                let _ = tokio::fs::remove_file(backup).await;
            }
            return Err(EngineError::io(format!(
                "failed to place audio at {}: {}",
                final_path.display(),
                e
            )));
        }
        staged.commit();

        let mut next = entries.clone();
        next.insert(key, profile.clone());
        if let Err(e) = self.store.save(&next).await {
            match &backup {
                Some((backup, original)) => restore(backup, original).await,
                None => {
                    let _ = tokio::fs::remove_file(&final_path).await;
                }
            }
            tracing::error!(voice = %profile.name(), error = %e, "Failed to persist registry");
            return Err(e.into());
        }
        *entries = next;
        drop(entries);

        if let Some((backup, _)) = backup {
            let _ = tokio::fs::remove_file(backup).await;
        }

        tracing::info!(
            voice = %profile.name(),
            source_type = %profile.source_type(),
            duration_sec = profile.duration_sec(),
            sample_rate = profile.sample_rate(),
            "Voice registered"
        );
        Ok(profile)
    }

    async fn commit_delete(
        self: Arc<Self>,
        key: String,
        name: String,
    ) -> Result<VoiceProfile, EngineError> {
        let mut entries = self.entries.write().await;
        let profile = entries
            .get(&key)
            .cloned()
            .ok_or(EngineError::NotFound(name))?;

        let trash = self.side_path(&key, TRASH_SUFFIX);
        let moved = match tokio::fs::rename(profile.audio_path(), &trash).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    voice = %profile.name(),
                    path = %profile.audio_path().display(),
                    "Audio file already missing, removing metadata only"
                );
                false
            }
            Err(e) => {
                return Err(EngineError::io(format!(
                    "failed to remove {}: {}",
                    profile.audio_path().display(),
                    e
                )))
            }
        };

        let mut next = entries.clone();
        next.remove(&key);
        if let Err(e) = self.store.save(&next).await {
            if moved {
                restore(&trash, profile.audio_path()).await;
            }
            return Err(e.into());
        }
        *entries = next;
        drop(entries);

        if moved {
            let _ = tokio::fs::remove_file(&trash).await;
        }

        tracing::info!(voice = %profile.name(), "Voice deleted");
        Ok(profile)
    }
}

/// 注册表自己的中间文件（暂存、备份、待删）
fn is_leftover(file_name: &str) -> bool {
    file_name.starts_with('.')
        && [PART_SUFFIX, BACKUP_SUFFIX, TRASH_SUFFIX]
            .iter()
            .any(|suffix| file_name.ends_with(&format!(".{}", suffix)))
}

#[async_trait]
impl VoiceRegistryPort for FileVoiceRegistry {
    async fn register(&self, request: RegisterVoice) -> Result<VoiceProfile, EngineError> {
        let name = VoiceName::new(&request.name)?;
        request.source.validate()?;

        let prepared = self.prepare_audio(&request.audio_path).await?;

        let key = name.key();
        let final_path = self.state.voices_dir.join(name.file_name());
        let profile = VoiceProfile::new(
            name,
            final_path,
            request.source,
            prepared.duration_sec,
            prepared.sample_rate,
            request.notes,
        )?;

        run_detached(
            self.state
                .clone()
                .commit_register(key, profile, prepared.bytes, request.overwrite),
        )
        .await
    }

    async fn lookup(&self, name: &str) -> Option<VoiceProfile> {
        let key = VoiceName::new(name).ok()?.key();
        self.state.entries.read().await.get(&key).cloned()
    }

    async fn list(&self) -> Vec<String> {
        self.state
            .entries
            .read()
            .await
            .values()
            .map(|p| p.name().to_string())
            .collect()
    }

    async fn profiles(&self) -> Vec<VoiceProfile> {
        self.state.entries.read().await.values().cloned().collect()
    }

    async fn delete(&self, name: &str) -> Result<VoiceProfile, EngineError> {
        let key = VoiceName::new(name)
            .map_err(|_| EngineError::NotFound(name.to_string()))?
            .key();
        run_detached(self.state.clone().commit_delete(key, name.to_string())).await
    }

    async fn reconcile(&self) -> Result<ReconcileReport, EngineError> {
        let entries = self.state.entries.read().await;
        let mut report = ReconcileReport::default();
        let mut known: HashSet<PathBuf> = HashSet::new();

        for profile in entries.values() {
            known.insert(profile.audio_path().to_path_buf());
            match tokio::fs::metadata(profile.audio_path()).await {
                Ok(meta) if meta.len() == 0 => report.empty.push(profile.name().to_string()),
                Ok(_) => {}
                Err(_) => report.missing.push(profile.name().to_string()),
            }
        }

        let mut dir = tokio::fs::read_dir(&self.state.voices_dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with('.') {
                if is_leftover(&file_name) {
                    report.leftovers.push(path);
                }
                continue;
            }
            let is_wav = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
            if is_wav && !known.contains(&path) {
                report.stray.push(path);
            }
        }
        report.stray.sort();
        report.leftovers.sort();

        if !report.is_clean() {
            tracing::warn!(
                missing = report.missing.len(),
                empty = report.empty.len(),
                stray = report.stray.len(),
                leftovers = report.leftovers.len(),
                "Voice registry is out of sync with disk"
            );
        }
        Ok(report)
    }
}
