//! 应用层错误定义
//!
//! 统一的引擎错误分类：调用方据此决定重试还是直接展示给用户

use thiserror::Error;

use crate::application::ports::{CodecError, ModelError, TranscodeError};
use crate::domain::audio::AnalysisError;
use crate::domain::voice::VoiceError;

/// 外部进程错误子类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessErrorKind {
    /// 可执行文件不存在或无法启动
    Unavailable,
    /// 超过墙钟超时，进程已被终止
    Timeout,
    /// 容器/编码不受支持
    UnsupportedFormat,
    /// 输入文件损坏
    CorruptInput,
    /// 其他非零退出
    Failed,
}

impl ProcessErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessErrorKind::Unavailable => "process-not-available",
            ProcessErrorKind::Timeout => "timeout",
            ProcessErrorKind::UnsupportedFormat => "unsupported-format",
            ProcessErrorKind::CorruptInput => "corrupt-input",
            ProcessErrorKind::Failed => "process-failed",
        }
    }
}

impl std::fmt::Display for ProcessErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 引擎错误
#[derive(Debug, Error)]
pub enum EngineError {
    /// 名称、时长、大小、格式等校验失败
    #[error("{0}")]
    Validation(String),

    /// 合成文本为空
    #[error("input text cannot be empty")]
    EmptyInput,

    /// 音色不存在
    #[error("voice not found: {0}")]
    NotFound(String),

    /// 音色已存在且未要求覆盖
    #[error("voice already exists: {0} (pass overwrite to replace it)")]
    AlreadyExists(String),

    /// 外部转码进程失败
    #[error("{kind}: {message}")]
    Process {
        kind: ProcessErrorKind,
        message: String,
    },

    /// 外部合成模型失败
    #[error("synthesis model error: {0}")]
    Model(String),

    /// 磁盘、权限、元数据损坏等
    #[error("io error: {0}")]
    Io(String),
}

impl EngineError {
    /// 稳定的错误分类字符串
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation-error",
            EngineError::EmptyInput => "empty-input",
            EngineError::NotFound(_) => "not-found",
            EngineError::AlreadyExists(_) => "already-exists",
            EngineError::Process { .. } => "process-error",
            EngineError::Model(_) => "model-error",
            EngineError::Io(_) => "io-error",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn process(kind: ProcessErrorKind, message: impl Into<String>) -> Self {
        Self::Process {
            kind,
            message: message.into(),
        }
    }

    pub fn process_kind(&self) -> Option<ProcessErrorKind> {
        match self {
            EngineError::Process { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<VoiceError> for EngineError {
    fn from(err: VoiceError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<AnalysisError> for EngineError {
    fn from(err: AnalysisError) -> Self {
        Self::Validation(format!("audio could not be analyzed: {}", err))
    }
}

impl From<CodecError> for EngineError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decode(msg) => {
                Self::Validation(format!("unsupported or corrupt audio (expected WAV): {}", msg))
            }
            CodecError::Encode(msg) => Self::Io(format!("failed to encode audio: {}", msg)),
        }
    }
}

impl From<TranscodeError> for EngineError {
    fn from(err: TranscodeError) -> Self {
        let kind = match &err {
            TranscodeError::Unavailable(_) => ProcessErrorKind::Unavailable,
            TranscodeError::Timeout(_) => ProcessErrorKind::Timeout,
            TranscodeError::UnsupportedFormat(_) => ProcessErrorKind::UnsupportedFormat,
            TranscodeError::CorruptInput(_) => ProcessErrorKind::CorruptInput,
            TranscodeError::Failed { .. } => ProcessErrorKind::Failed,
            TranscodeError::Io(msg) => return Self::Io(msg.clone()),
        };
        Self::process(kind, err.to_string())
    }
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Timeout(secs) => Self::process(
                ProcessErrorKind::Timeout,
                format!("synthesis model did not answer within {}s", secs),
            ),
            other => Self::Model(other.to_string()),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_kinds_are_distinct() {
        assert_eq!(EngineError::NotFound("x".into()).kind(), "not-found");
        assert_eq!(EngineError::EmptyInput.kind(), "empty-input");
        assert_eq!(
            EngineError::from(TranscodeError::Unavailable("ffmpeg".into())).kind(),
            "process-error"
        );
    }

    #[test]
    fn test_transcode_errors_keep_sub_kind() {
        let err = EngineError::from(TranscodeError::Timeout(Duration::from_secs(120)));
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Timeout));

        let err = EngineError::from(TranscodeError::Unavailable("ffmpeg".into()));
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Unavailable));
        assert!(err.to_string().contains("ffmpeg"));
    }

    #[test]
    fn test_model_timeout_is_process_timeout() {
        let err = EngineError::from(ModelError::Timeout(300));
        assert_eq!(err.process_kind(), Some(ProcessErrorKind::Timeout));
        let err = EngineError::from(ModelError::Service("CUDA OOM".into()));
        assert_eq!(err.kind(), "model-error");
        assert!(err.to_string().contains("CUDA OOM"));
    }
}
