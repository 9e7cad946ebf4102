//! Multipart 上传暂存
//!
//! 文件字段以随机名写入暂存目录，[`StagedUpload`] drop 时删除。

use axum::extract::Multipart;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::UploadConfig;

/// 暂存目录中的上传文件
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    original_name: String,
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload");
            }
        }
    }
}

/// 解析后的表单
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    pub file: Option<StagedUpload>,
}

impl UploadForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("'{}' is required", name)))
    }

    pub fn flag(&self, name: &str) -> bool {
        matches!(
            self.text(name).map(|v| v.to_ascii_lowercase()).as_deref(),
            Some("true" | "1" | "yes" | "on")
        )
    }

    pub fn seconds(&self, name: &str) -> Result<f64, ApiError> {
        let raw = self.required(name)?;
        raw.parse::<f64>()
            .map_err(|_| ApiError::BadRequest(format!("'{}' must be a number of seconds", name)))
    }

    pub fn take_file(&mut self) -> Result<StagedUpload, ApiError> {
        self.file
            .take()
            .ok_or_else(|| ApiError::BadRequest("a 'file' upload is required".to_string()))
    }
}

/// 仅保留短小的字母数字扩展名
fn safe_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

/// 读取 multipart：文本字段收集，`file` 字段流式写入暂存目录
pub async fn read_upload_form(
    mut multipart: Multipart,
    config: &UploadConfig,
) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        ApiError::BadRequest(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name != "file" {
            let value = field.text().await.map_err(|e| {
                ApiError::BadRequest(format!("Failed to read '{}': {}", field_name, e))
            })?;
            form.fields.insert(field_name, value);
            continue;
        }

        let original_name = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload".to_string());
        let path = config.staging_dir.join(format!(
            "upload-{}.{}",
            Uuid::new_v4().simple(),
            safe_extension(&original_name)
        ));

        tokio::fs::create_dir_all(&config.staging_dir)
            .await
            .map_err(|e| ApiError::Engine(e.into()))?;
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ApiError::Engine(e.into()))?;
        // 先建守卫，后续任何错误都会删除半成品
        let staged = StagedUpload {
            path,
            original_name,
        };

        let mut written: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
        {
            written += chunk.len() as u64;
            if written > config.max_upload_bytes {
                return Err(ApiError::BadRequest(format!(
                    "file is too large; the limit is {:.1} MB",
                    config.max_upload_bytes as f64 / (1024.0 * 1024.0)
                )));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| ApiError::Engine(e.into()))?;
        }
        file.flush().await.map_err(|e| ApiError::Engine(e.into()))?;

        if written == 0 {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }

        tracing::debug!(
            file = %staged.original_name,
            path = %staged.path.display(),
            bytes = written,
            "Upload staged"
        );
        form.file = Some(staged);
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_extension() {
        assert_eq!(safe_extension("talk.MP4"), "mp4");
        assert_eq!(safe_extension("voice.wav"), "wav");
        assert_eq!(safe_extension("noext"), "bin");
        assert_eq!(safe_extension("../../etc/passwd"), "bin");
        assert_eq!(safe_extension("x.w/av"), "bin");
        assert_eq!(safe_extension("a.verylongext"), "bin");
    }

    #[test]
    fn test_staged_upload_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload-x.wav");
        std::fs::write(&path, b"data").unwrap();
        drop(StagedUpload {
            path: path.clone(),
            original_name: "x.wav".to_string(),
        });
        assert!(!path.exists());
    }
}
