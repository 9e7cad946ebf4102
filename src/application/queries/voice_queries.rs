//! Voice Queries

/// 获取音色详情查询（名称大小写不敏感）
#[derive(Debug, Clone)]
pub struct GetVoice {
    pub name: String,
}

/// 列出所有音色查询
#[derive(Debug, Clone)]
pub struct ListVoices;

/// 元数据与磁盘一致性检查
#[derive(Debug, Clone)]
pub struct CheckVoices;
