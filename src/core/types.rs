use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{Result, UploadError};
use crate::utils::guess_mime;

/// 待上传的文件：二进制内容加元信息
///
/// 身份键是 `(name, last_modified)` 组合，同一批次内要求唯一，
/// 重复由调用方负责。
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// 原始文件名（含扩展名）
    pub name: String,
    /// MIME 类型，如 `image/png`
    pub mime: String,
    /// 文件内容
    pub bytes: Bytes,
    /// 最后修改时间（毫秒时间戳）
    pub last_modified: i64,
}

impl UploadFile {
    pub fn new(
        name: impl Into<String>,
        mime: impl Into<String>,
        bytes: Bytes,
        last_modified: i64,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
            last_modified,
        }
    }

    /// 从磁盘读取一个文件，MIME 按扩展名猜测
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(UploadError::Param(format!(
                "Not a file: {}",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::Param("Can't read filename".to_string()))?
            .to_string();

        let last_modified = metadata
            .modified()
            .ok()
            .map(|time| DateTime::<Utc>::from(time).timestamp_millis())
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        let bytes = tokio::fs::read(path).await?;

        Ok(Self {
            mime: guess_mime(path).to_string(),
            name,
            bytes: Bytes::from(bytes),
            last_modified,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// 上传成功后的规范图片记录，入库后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 客户端生成的唯一 ID
    pub id: String,
    /// 展示名（去掉扩展名的文件名）
    pub name: String,
    /// 文件格式，小写
    #[serde(rename = "type")]
    pub file_type: String,
    /// 远端返回的 HTTPS 地址
    pub url: String,
    /// 像素宽度，客户端测量
    pub width: u32,
    /// 像素高度，客户端测量
    pub height: u32,
    /// 完成时间（毫秒时间戳）
    pub date: i64,
}

/// 单个文件的失败详情
#[derive(Debug, Clone)]
pub struct FailedUpload {
    pub file: UploadFile,
    pub error_message: String,
}

/// 一次批量上传的最终结果
///
/// `success`/`failed` 按完成顺序排列，不保证与提交顺序一致。
/// 完成时满足 `success_count + failed_count == total`。
#[derive(Debug, Default)]
pub struct BatchResult {
    pub total: usize,
    pub success: Vec<ImageRecord>,
    pub failed: Vec<FailedUpload>,
    pub success_count: usize,
    pub failed_count: usize,
}

/// 批量上传过程中的进度快照
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    /// 已结算（成功或失败）的文件数
    pub current: usize,
    /// 文件总数
    pub total: usize,
    /// 成功数
    pub success: usize,
    /// 失败数
    pub failed: usize,
    /// 最近一次更新进度的文件名
    pub current_file_name: String,
    /// 按文件大小加权的总体进度 [0, 100]
    pub percent: f64,
    /// 速度（字节/秒），只计入已结算文件的字节
    pub speed: f64,
    /// 预计剩余时间，速度为 0 时为零
    pub remaining_time: Duration,
}

pub type ProgressCallback = Arc<dyn Fn(ProgressSnapshot) + Send + Sync>;
