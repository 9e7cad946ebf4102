//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Voice Context: 音色名称与 profile 元数据
//! - Audio Context: 波形与质量分析

pub mod audio;
pub mod voice;
