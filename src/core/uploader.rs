use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use image::ImageReader;
use uuid::Uuid;

use super::errors::{Result, UploadError};
use super::types::{ImageRecord, UploadFile};

/// 远端图床的网络缝隙
///
/// 只负责把文件交给远端并返回 location，响应规范化、尺寸测量都在
/// [`ImageUploader`] 里做。测试里用脚本化的实现替换。
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<String>;
}

/// 单文件上传器
///
/// 把一次远端上传规范化成 [`ImageRecord`]：协议改写成 https、
/// 客户端测量尺寸、派生展示名、生成 ID 和时间戳。
/// 测不出尺寸的图片按上传失败处理，不产生残缺记录。
/// 本层不做重试，失败即终态。
pub struct ImageUploader {
    host: Arc<dyn ImageHost>,
}

impl ImageUploader {
    pub fn new(host: Arc<dyn ImageHost>) -> Self {
        Self { host }
    }

    pub async fn upload(&self, file: &UploadFile) -> Result<ImageRecord> {
        let location = self.host.upload(file).await?;
        let url = normalize_url(&location);

        let (width, height) = measure_dimensions(&file.bytes)?;

        let file_type = file_type_of(file);
        let name = display_name(&file.name, &file_type);

        Ok(ImageRecord {
            id: Uuid::new_v4().to_string(),
            name,
            file_type,
            url,
            width,
            height,
            date: Utc::now().timestamp_millis(),
        })
    }
}

/// 远端偶尔返回 http 地址，统一改写成 https
fn normalize_url(location: &str) -> String {
    match location.strip_prefix("http:") {
        Some(rest) => format!("https:{rest}"),
        None => location.to_string(),
    }
}

/// MIME 子类型作为文件格式，取不到时退回扩展名
fn file_type_of(file: &UploadFile) -> String {
    file.mime
        .split_once('/')
        .map(|(_, subtype)| subtype.to_ascii_lowercase())
        .or_else(|| {
            Path::new(&file.name)
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase())
        })
        .unwrap_or_default()
}

/// 展示名：原始文件名去掉 `.{type}` 后缀
fn display_name(file_name: &str, file_type: &str) -> String {
    if !file_type.is_empty() {
        if let Some(stem) = file_name.strip_suffix(&format!(".{file_type}")) {
            return stem.to_string();
        }
    }

    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(|stem| stem.to_string())
        .unwrap_or_else(|| file_name.to_string())
}

/// 从本地字节测量图片尺寸，只读头部不做完整解码
fn measure_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| UploadError::Measure(err.to_string()))?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| UploadError::Measure(err.to_string()))?;

    if width == 0 || height == 0 {
        return Err(UploadError::Measure("zero-sized image".to_string()));
    }

    Ok((width, height))
}
