//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（VoiceRegistry、MediaTranscoder、SynthesisModel、AudioCodec）
//! - services: 媒体截取流水线与合成调度
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 引擎错误分类

pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;

// Re-exports
pub use commands::{
    handlers::{CreateVoiceFromVideoHandler, DeleteVoiceHandler, RegisterVoiceUploadHandler},
    CreateVoiceFromVideo, DeleteVoice, RegisterVoiceUpload,
};

pub use error::{EngineError, ProcessErrorKind};

pub use ports::{
    AudioCodecPort, CodecError, ExtractJob, MediaInfo, MediaTranscoderPort, ModelError,
    ModelPermit,
    ReconcileReport, RegisterVoice, SynthesisModelPort, SynthesisRequest, TranscodeError,
    VoiceRegistryPort,
};

pub use queries::{
    handlers::{CheckVoicesHandler, GetVoiceHandler, ListVoicesHandler},
    CheckVoices, GetVoice, ListVoices,
};

pub use services::{
    DispatcherConfig, ExtractedClip, ExtractionConfig, MediaExtractionPipeline, RecordingLibrary,
    SavedRecording, SynthesisDispatcher, SynthesisOutcome, TargetFormat,
};
