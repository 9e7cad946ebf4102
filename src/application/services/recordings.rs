//! Recording Library - 录音库
//!
//! 麦克风录音从暂存区复制到 `recordings_dir`，命名为 `<前缀>_<时间戳>.<扩展名>`，
//! 供之后注册音色时复用。列表按修改时间倒序。

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::application::error::EngineError;

/// 可保存的录音格式
const RECORDING_EXTENSIONS: &[&str] = &["wav", "mp3", "ogg", "flac", "webm", "m4a"];

const DEFAULT_PREFIX: &str = "recording";

/// 已保存的录音
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecording {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

/// 录音库
pub struct RecordingLibrary {
    dir: PathBuf,
}

impl RecordingLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 复制录音到录音库，源文件保持不动
    pub async fn save(
        &self,
        source: &Path,
        prefix: Option<&str>,
    ) -> Result<SavedRecording, EngineError> {
        let extension = recording_extension(source)?;

        let mut input = match tokio::fs::File::open(source).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(EngineError::validation(format!(
                    "recording not found: {}",
                    source.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if input.metadata().await?.len() == 0 {
            return Err(EngineError::validation("recording is empty"));
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let stem = format!(
            "{}_{}",
            sanitize_prefix(prefix),
            Utc::now().format("%Y%m%d_%H%M%S")
        );
        let (path, mut output) = self.create_unique(&stem, &extension).await?;

        let copied = async {
            tokio::io::copy(&mut input, &mut output).await?;
            output.flush().await?;
            output.sync_all().await
        }
        .await;
        if let Err(e) = copied {
            drop(output);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(EngineError::io(format!(
                "failed to save recording to {}: {}",
                path.display(),
                e
            )));
        }

        let recording = describe(&path).await?;
        tracing::info!(
            source = %source.display(),
            path = %recording.path.display(),
            bytes = recording.size_bytes,
            "Recording saved"
        );
        Ok(recording)
    }

    /// 已保存的录音，最新的在前；目录不存在时为空
    pub async fn list(&self) -> Result<Vec<SavedRecording>, EngineError> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut recordings = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() || !has_recording_extension(&path) {
                continue;
            }
            recordings.push(describe(&path).await?);
        }
        recordings.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(recordings)
    }

    /// 同一秒内重复保存时追加随机后缀
    async fn create_unique(
        &self,
        stem: &str,
        extension: &str,
    ) -> Result<(PathBuf, tokio::fs::File), EngineError> {
        let mut path = self.dir.join(format!("{}.{}", stem, extension));
        for _ in 0..4 {
            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    path = self.dir.join(format!(
                        "{}_{}.{}",
                        stem,
                        &Uuid::new_v4().simple().to_string()[..4],
                        extension
                    ));
                }
                Err(e) => {
                    return Err(EngineError::io(format!(
                        "cannot create {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
        Err(EngineError::io(format!(
            "could not find a free file name for {} in {}",
            stem,
            self.dir.display()
        )))
    }
}

/// 只保留字母数字、`-`、`_`；清理后为空则用默认前缀
fn sanitize_prefix(prefix: Option<&str>) -> String {
    let cleaned: String = prefix
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(48)
        .collect();
    if cleaned.is_empty() {
        DEFAULT_PREFIX.to_string()
    } else {
        cleaned
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn has_recording_extension(path: &Path) -> bool {
    extension_of(path).is_some_and(|e| RECORDING_EXTENSIONS.contains(&e.as_str()))
}

fn recording_extension(source: &Path) -> Result<String, EngineError> {
    let extension = extension_of(source).unwrap_or_default();
    if RECORDING_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(EngineError::validation(format!(
            "unsupported recording format '{}'; expected one of {}",
            extension,
            RECORDING_EXTENSIONS.join(", ")
        )))
    }
}

async fn describe(path: &Path) -> Result<SavedRecording, EngineError> {
    let meta = tokio::fs::metadata(path).await?;
    let modified = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    Ok(SavedRecording {
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        path: path.to_path_buf(),
        size_bytes: meta.len(),
        modified,
    })
}
