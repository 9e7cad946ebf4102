//! Voice Registry Port - 音色注册表抽象
//!
//! 注册表是音色元数据与音频文件的唯一写入者

use async_trait::async_trait;
use std::path::PathBuf;

use crate::application::error::EngineError;
use crate::domain::voice::{VoiceProfile, VoiceSource};

/// 注册请求
#[derive(Debug, Clone)]
pub struct RegisterVoice {
    pub name: String,
    /// 候选音频（WAV），注册表会复制为规范格式，不会移动或删除它
    pub audio_path: PathBuf,
    pub source: VoiceSource,
    pub notes: Option<String>,
    /// 显式覆盖同名音色
    pub overwrite: bool,
}

/// 一致性检查报告
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    /// 元数据存在但音频文件缺失
    pub missing: Vec<String>,
    /// 音频文件为空
    pub empty: Vec<String>,
    /// 管理目录中没有对应元数据的 WAV 文件
    pub stray: Vec<PathBuf>,
    /// 中断的提交留下的暂存 / 备份 / 待删文件
    pub leftovers: Vec<PathBuf>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.empty.is_empty()
            && self.stray.is_empty()
            && self.leftovers.is_empty()
    }
}

/// Voice Registry Port
#[async_trait]
pub trait VoiceRegistryPort: Send + Sync {
    /// 注册（或显式覆盖）音色，文件放置 / 元数据写入 / 持久化在同一互斥区内完成
    async fn register(&self, request: RegisterVoice) -> Result<VoiceProfile, EngineError>;

    /// 按名称查找（大小写不敏感）
    async fn lookup(&self, name: &str) -> Option<VoiceProfile>;

    /// 按名称排序的音色名列表
    async fn list(&self) -> Vec<String>;

    /// 按名称排序的全部 profile 快照
    async fn profiles(&self) -> Vec<VoiceProfile>;

    /// 同时删除元数据与音频文件
    async fn delete(&self, name: &str) -> Result<VoiceProfile, EngineError>;

    /// 检查元数据与磁盘文件是否一致（只报告，不修复）
    async fn reconcile(&self) -> Result<ReconcileReport, EngineError>;
}
