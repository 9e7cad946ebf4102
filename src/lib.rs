//! Voicebank - 语音克隆音色管理引擎
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Audio: 波形与音质分析（时长、静音检测）
//! - Voice: 音色档案与命名规则
//!
//! 应用层 (application/):
//! - Ports: 端口定义（AudioCodec, MediaTranscoder, SynthesisModel, VoiceRegistry）
//! - Services: 截取管线、合成调度
//! - Commands / Queries: CQRS 处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API
//! - Persistence: 文件音色库（JSON 元数据 + WAV）
//! - Adapters: WAV 编解码、FFmpeg、HTTP 模型客户端

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;

pub use config::{load_config, AppConfig};
