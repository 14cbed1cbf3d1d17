use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::Certificate;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 客户端配置
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// 接口基地址
    pub api_base: String,
    /// 批量上传并发数
    pub concurrency: usize,
    /// 本地图库文件
    pub gallery_path: PathBuf,
    /// 登录凭证（扫码登录后写回）
    pub sessdata: Option<String>,
    pub bili_jct: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://api.bilibili.com/x/king-images".to_string(),
            concurrency: 3,
            gallery_path: PathBuf::from("gallery.json"),
            sessdata: None,
            bili_jct: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let data = toml::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// 两个凭证字段都在时才算有凭证
    pub fn certificate(&self) -> Option<Certificate> {
        match (&self.sessdata, &self.bili_jct) {
            (Some(sessdata), Some(bili_jct)) => {
                Some(Certificate::new(sessdata.clone(), bili_jct.clone()))
            }
            _ => None,
        }
    }

    pub fn set_certificate(&mut self, certificate: &Certificate) {
        self.sessdata = Some(certificate.sessdata.clone());
        self.bili_jct = Some(certificate.bili_jct.clone());
    }
}
