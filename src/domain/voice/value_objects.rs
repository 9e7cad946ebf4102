//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};

use super::VoiceError;

/// 音色名称最大长度
pub const MAX_NAME_LEN: usize = 64;

/// 音色名称
///
/// 不变量:
/// - 仅包含 ASCII 字母、数字、`-`、`_`
/// - 长度 1..=64
/// - 身份比较忽略大小写（`key()`），展示保留原始大小写
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoiceName(String);

impl VoiceName {
    pub fn new(name: impl AsRef<str>) -> Result<Self, VoiceError> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(VoiceError::InvalidName("voice name is required".to_string()));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(VoiceError::InvalidName(format!(
                "voice name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(VoiceError::InvalidName(format!(
                "'{}' contains disallowed character {:?} (use letters, digits, '-' or '_')",
                name, bad
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 注册表主键：ASCII 小写折叠后的名称，同时用作磁盘文件名
    pub fn key(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    /// 磁盘上的规范文件名
    pub fn file_name(&self) -> String {
        format!("{}.wav", self.key())
    }
}

impl TryFrom<String> for VoiceName {
    type Error = VoiceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VoiceName> for String {
    fn from(name: VoiceName) -> Self {
        name.0
    }
}

impl std::fmt::Display for VoiceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 参考音频来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// 麦克风录制
    Recorded,
    /// 直接上传的音频
    Uploaded,
    /// 从视频中截取
    Video,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Recorded => "recorded",
            SourceType::Uploaded => "uploaded",
            SourceType::Video => "video",
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recorded" => Ok(SourceType::Recorded),
            "uploaded" => Ok(SourceType::Uploaded),
            "video" => Ok(SourceType::Video),
            other => Err(VoiceError::InvalidProfile(format!(
                "unknown source type '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 视频截取区间（秒）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrimRange {
    pub start_sec: f64,
    pub end_sec: f64,
}

impl TrimRange {
    /// 创建截取区间，要求 `0 <= start < end` 且均为有限值
    pub fn new(start_sec: f64, end_sec: f64) -> Result<Self, VoiceError> {
        if !start_sec.is_finite() || !end_sec.is_finite() {
            return Err(VoiceError::InvalidTrimRange(
                "trim bounds must be finite numbers".to_string(),
            ));
        }
        if start_sec < 0.0 {
            return Err(VoiceError::InvalidTrimRange(format!(
                "start ({:.2}s) must not be negative",
                start_sec
            )));
        }
        if start_sec >= end_sec {
            return Err(VoiceError::InvalidTrimRange(format!(
                "start ({:.2}s) must be before end ({:.2}s)",
                start_sec, end_sec
            )));
        }
        Ok(Self { start_sec, end_sec })
    }

    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }
}
