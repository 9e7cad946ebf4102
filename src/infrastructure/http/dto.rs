//! Data Transfer Objects

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::application::{ReconcileReport, SavedRecording, SynthesisOutcome};
use crate::domain::voice::VoiceProfile;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(Empty {}),
        }
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// ============================================================================
// Voice DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GetVoiceRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteVoiceRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct TrimRangeDto {
    pub start_sec: f64,
    pub end_sec: f64,
}

#[derive(Debug, Serialize)]
pub struct VoiceResponse {
    pub name: String,
    pub audio_path: String,
    pub source_type: String,
    pub source_file: String,
    pub trim_range: Option<TrimRangeDto>,
    pub duration_sec: f64,
    pub sample_rate: u32,
    pub created_at: String,
    pub notes: Option<String>,
}

impl From<&VoiceProfile> for VoiceResponse {
    fn from(profile: &VoiceProfile) -> Self {
        Self {
            name: profile.name().to_string(),
            audio_path: profile.audio_path().display().to_string(),
            source_type: profile.source_type().to_string(),
            source_file: profile.source_file().to_string(),
            trim_range: profile.trim_range().map(|r| TrimRangeDto {
                start_sec: r.start_sec,
                end_sec: r.end_sec,
            }),
            duration_sec: profile.duration_sec(),
            sample_rate: profile.sample_rate(),
            created_at: profile.created_at().to_rfc3339(),
            notes: profile.notes().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub clean: bool,
    pub missing: Vec<String>,
    pub empty: Vec<String>,
    pub stray: Vec<String>,
    pub leftovers: Vec<String>,
}

impl From<ReconcileReport> for CheckResponse {
    fn from(report: ReconcileReport) -> Self {
        Self {
            clean: report.is_clean(),
            stray: report
                .stray
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            leftovers: report
                .leftovers
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
            missing: report.missing,
            empty: report.empty,
        }
    }
}

// ============================================================================
// Synthesis DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
    pub voice: String,
}

#[derive(Debug, Serialize)]
pub struct SynthesizeResponse {
    pub output_path: String,
    pub file_name: String,
    pub voice: String,
    pub degraded: bool,
    pub duration_sec: f64,
    pub sample_rate: u32,
}

impl From<SynthesisOutcome> for SynthesizeResponse {
    fn from(outcome: SynthesisOutcome) -> Self {
        Self {
            file_name: file_name(&outcome.output_path),
            output_path: outcome.output_path.display().to_string(),
            voice: outcome.voice,
            degraded: outcome.degraded,
            duration_sec: outcome.duration_sec,
            sample_rate: outcome.sample_rate,
        }
    }
}

// ============================================================================
// Recording DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RecordingResponse {
    pub path: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub modified_at: String,
}

impl From<SavedRecording> for RecordingResponse {
    fn from(recording: SavedRecording) -> Self {
        Self {
            path: recording.path.display().to_string(),
            file_name: recording.file_name,
            size_bytes: recording.size_bytes,
            modified_at: recording.modified.to_rfc3339(),
        }
    }
}

// ============================================================================
// Media DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub output_path: String,
    pub file_name: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub duration_sec: f64,
    pub sample_rate: u32,
    pub channels: u16,
}
