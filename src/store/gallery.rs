use std::path::{Path, PathBuf};
use chrono::Local;
use serde_json::Value;
use thiserror::Error;

use crate::core::ImageRecord;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type Result<T, E = GalleryError> = std::result::Result<T, E>;

/// 本地图库
///
/// 所有上传成功的图片记录落在一个 JSON 文件里。写操作只改内存，
/// 调用方在合适的时机 `save` 落盘。
#[derive(Debug)]
pub struct Gallery {
    path: PathBuf,
    images: Vec<ImageRecord>,
}

impl Gallery {
    /// 打开图库文件，不存在时从空库开始
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let images = if path.exists() {
            let data = tokio::fs::read_to_string(&path).await?;
            serde_json::from_str(&data)?
        } else {
            Vec::new()
        };

        Ok(Self { path, images })
    }

    /// 落盘
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_string_pretty(&self.images)?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    /// 写入一条记录，同 ID 覆盖
    pub fn put(&mut self, record: ImageRecord) {
        match self.images.iter_mut().find(|img| img.id == record.id) {
            Some(existing) => *existing = record,
            None => self.images.push(record),
        }
    }

    /// 批量写入，同 ID 覆盖，返回写入条数
    pub fn bulk_put(&mut self, records: Vec<ImageRecord>) -> usize {
        let count = records.len();
        for record in records {
            self.put(record);
        }
        count
    }

    /// 按 ID 删除，命中返回 true
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.images.len();
        self.images.retain(|img| img.id != id);
        self.images.len() != before
    }

    /// 全量导出，最新的排前面
    pub fn to_array(&self) -> Vec<ImageRecord> {
        let mut images = self.images.clone();
        images.sort_by(|a, b| b.date.cmp(&a.date));
        images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// 导出成 JSON 文本
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_array())?)
    }

    /// 默认导出文件名，带当天日期
    pub fn default_export_name() -> String {
        format!("king3图床数据-{}.json", Local::now().format("%Y-%m-%d"))
    }

    /// 从 JSON 文本导入
    ///
    /// 先整体校验每条记录都带 id/name/url 再入库，坏数据不会写进
    /// 一半。返回导入条数。
    pub fn import_json(&mut self, json: &str) -> Result<usize> {
        let values: Vec<Value> = serde_json::from_str(json)?;

        for (index, value) in values.iter().enumerate() {
            let valid = value.is_object()
                && ["id", "name", "url"]
                    .iter()
                    .all(|field| value.get(field).is_some_and(|v| v.is_string()));
            if !valid {
                return Err(GalleryError::InvalidRecord(format!(
                    "entry {index} is missing id/name/url"
                )));
            }
        }

        let records: Vec<ImageRecord> = serde_json::from_value(Value::Array(values))?;
        Ok(self.bulk_put(records))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: &str, date: i64) -> ImageRecord {
        ImageRecord {
            id: id.to_string(),
            name: name.to_string(),
            file_type: "png".to_string(),
            url: format!("https://example.com/{name}.png"),
            width: 100,
            height: 80,
            date,
        }
    }

    #[test]
    fn put_upserts_by_id() {
        let mut gallery = Gallery {
            path: PathBuf::new(),
            images: Vec::new(),
        };

        gallery.put(record("a", "first", 1));
        gallery.put(record("a", "renamed", 2));
        gallery.put(record("b", "second", 3));

        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery.to_array()[1].name, "renamed");
    }

    #[test]
    fn to_array_is_newest_first() {
        let mut gallery = Gallery {
            path: PathBuf::new(),
            images: Vec::new(),
        };
        gallery.bulk_put(vec![record("a", "old", 1), record("b", "new", 9)]);

        let images = gallery.to_array();
        assert_eq!(images[0].id, "b");
        assert_eq!(images[1].id, "a");
    }

    #[test]
    fn import_rejects_incomplete_entries() {
        let mut gallery = Gallery {
            path: PathBuf::new(),
            images: Vec::new(),
        };

        let err = gallery
            .import_json(r#"[{"id": "a", "name": "cat"}]"#)
            .unwrap_err();
        assert!(matches!(err, GalleryError::InvalidRecord(_)));
        // 校验失败时什么都不写
        assert!(gallery.is_empty());
    }

    #[test]
    fn export_import_round_trip() {
        let mut gallery = Gallery {
            path: PathBuf::new(),
            images: Vec::new(),
        };
        gallery.bulk_put(vec![record("a", "one", 1), record("b", "two", 2)]);

        let json = gallery.export_json().unwrap();
        let mut other = Gallery {
            path: PathBuf::new(),
            images: Vec::new(),
        };
        assert_eq!(other.import_json(&json).unwrap(), 2);
        assert_eq!(other.to_array(), gallery.to_array());
    }
}
