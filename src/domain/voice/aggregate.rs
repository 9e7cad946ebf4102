//! Voice Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{SourceType, TrimRange, VoiceError, VoiceName};

/// 参考音频的来源描述（注册时由调用方提供）
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSource {
    pub source_type: SourceType,
    /// 原始文件名，仅用于审计
    pub source_file: String,
    pub trim_range: Option<TrimRange>,
}

impl VoiceSource {
    pub fn uploaded(source_file: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::Uploaded,
            source_file: source_file.into(),
            trim_range: None,
        }
    }

    pub fn recorded(source_file: impl Into<String>) -> Self {
        Self {
            source_type: SourceType::Recorded,
            source_file: source_file.into(),
            trim_range: None,
        }
    }

    pub fn video(source_file: impl Into<String>, trim_range: TrimRange) -> Self {
        Self {
            source_type: SourceType::Video,
            source_file: source_file.into(),
            trim_range: Some(trim_range),
        }
    }

    /// trim_range 当且仅当来源为视频时存在
    pub fn validate(&self) -> Result<(), VoiceError> {
        match (self.source_type, self.trim_range) {
            (SourceType::Video, None) => Err(VoiceError::InvalidProfile(
                "video sources require a trim range".to_string(),
            )),
            (SourceType::Recorded | SourceType::Uploaded, Some(_)) => {
                Err(VoiceError::InvalidProfile(format!(
                    "{} sources cannot carry a trim range",
                    self.source_type
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Voice Profile 聚合根
///
/// 不变量:
/// - 每个 profile 有且只有一个 audio_path，指向注册表管理目录中的规范 WAV
/// - duration_sec 在注册时处于配置的时长区间内
/// - profile 只能被整体覆盖，不能局部修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceProfile {
    name: VoiceName,
    audio_path: PathBuf,
    source_type: SourceType,
    source_file: String,
    trim_range: Option<TrimRange>,
    duration_sec: f64,
    sample_rate: u32,
    created_at: DateTime<Utc>,
    notes: Option<String>,
}

impl VoiceProfile {
    pub fn new(
        name: VoiceName,
        audio_path: PathBuf,
        source: VoiceSource,
        duration_sec: f64,
        sample_rate: u32,
        notes: Option<String>,
    ) -> Result<Self, VoiceError> {
        source.validate()?;
        let profile = Self {
            name,
            audio_path,
            source_type: source.source_type,
            source_file: source.source_file,
            trim_range: source.trim_range,
            duration_sec,
            sample_rate,
            created_at: Utc::now(),
            notes: notes.filter(|n| !n.trim().is_empty()),
        };
        profile.validate()?;
        Ok(profile)
    }

    /// 校验结构性不变量（反序列化后同样需要调用）
    pub fn validate(&self) -> Result<(), VoiceError> {
        VoiceSource {
            source_type: self.source_type,
            source_file: self.source_file.clone(),
            trim_range: self.trim_range,
        }
        .validate()?;

        if !(self.duration_sec.is_finite() && self.duration_sec > 0.0) {
            return Err(VoiceError::InvalidProfile(format!(
                "'{}' has invalid duration {}",
                self.name, self.duration_sec
            )));
        }
        if self.sample_rate == 0 {
            return Err(VoiceError::InvalidProfile(format!(
                "'{}' has zero sample rate",
                self.name
            )));
        }
        if self.audio_path.as_os_str().is_empty() {
            return Err(VoiceError::InvalidProfile(format!(
                "'{}' has no audio path",
                self.name
            )));
        }
        Ok(())
    }

    // Getters
    pub fn name(&self) -> &VoiceName {
        &self.name
    }

    pub fn audio_path(&self) -> &Path {
        &self.audio_path
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn trim_range(&self) -> Option<TrimRange> {
        self.trim_range
    }

    pub fn duration_sec(&self) -> f64 {
        self.duration_sec
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }
}
