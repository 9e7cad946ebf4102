//! JSON Profile Store - 元数据持久化
//!
//! 整个元数据表存为单个 JSON 文件，每次变更都写临时文件后原子替换：
//! 中途崩溃只会留下未替换的临时文件，已提交的条目不受影响。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::application::error::EngineError;
use crate::domain::voice::VoiceProfile;

/// 当前存储格式版本
const STORE_VERSION: u32 = 1;

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("corrupted metadata store {path}: {message}")]
    Corrupted { path: PathBuf, message: String },
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::Io(err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoreFile {
    version: u32,
    voices: BTreeMap<String, VoiceProfile>,
}

/// JSON 元数据存储，键为折叠后的音色名
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, e: impl std::fmt::Display) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        }
    }

    fn corrupted(&self, message: impl Into<String>) -> StoreError {
        StoreError::Corrupted {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    /// 加载元数据表；文件不存在视为空注册表
    pub async fn load(&self) -> Result<BTreeMap<String, VoiceProfile>, StoreError> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No metadata store yet, starting empty");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let file: StoreFile =
            serde_json::from_slice(&data).map_err(|e| self.corrupted(e.to_string()))?;

        if file.version != STORE_VERSION {
            return Err(self.corrupted(format!(
                "unsupported store version {} (expected {})",
                file.version, STORE_VERSION
            )));
        }

        for (key, profile) in &file.voices {
            profile
                .validate()
                .map_err(|e| self.corrupted(e.to_string()))?;
            if *key != profile.name().key() {
                return Err(self.corrupted(format!(
                    "entry key '{}' does not match voice name '{}'",
                    key,
                    profile.name()
                )));
            }
        }

        Ok(file.voices)
    }

    /// 写临时文件 → fsync → 原子替换
    pub async fn save(&self, voices: &BTreeMap<String, VoiceProfile>) -> Result<(), StoreError> {
        let file = StoreFile {
            version: STORE_VERSION,
            voices: voices.clone(),
        };
        let data = serde_json::to_vec_pretty(&file).map_err(|e| self.io_error(e))?;

        let store = self.clone();
        tokio::task::spawn_blocking(move || store.replace_blocking(&data))
            .await
            .map_err(|e| self.io_error(format!("persist task failed: {}", e)))?
    }

    fn replace_blocking(&self, data: &[u8]) -> Result<(), StoreError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| self.io_error(e))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".voices-")
            .suffix(".json.tmp")
            .tempfile_in(&parent)
            .map_err(|e| self.io_error(e))?;
        tmp.write_all(data).map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        // 目录项落盘（best effort）
        #[cfg(unix)]
        if let Ok(dir) = std::fs::File::open(&parent) {
            let _ = dir.sync_all();
        }

        Ok(())
    }
}
