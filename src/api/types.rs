use serde::{Deserialize, Serialize};

use crate::core::{Result, UploadError};

/// 远端接口的统一响应壳，`code == 0` 为成功
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 成功时取出 data，失败时带出 code 和 message
    pub fn into_data(self) -> Result<T> {
        if self.code != 0 {
            return Err(UploadError::Api {
                code: self.code,
                message: self.message,
            });
        }
        self.data
            .ok_or_else(|| UploadError::InvalidResponse("response has no data".to_string()))
    }
}

/// 图片上传接口的响应体
#[derive(Debug, Clone, Deserialize)]
pub struct UploadData {
    pub location: String,
}

/// 用户空间信息
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceInfo {
    pub face: String,
    pub mid: u64,
    pub name: String,
    #[serde(default)]
    pub sign: String,
}

/// 登录二维码
#[derive(Debug, Clone, Deserialize)]
pub struct QrcodeData {
    pub url: String,
    pub qrcode_key: String,
}

/// 二维码轮询结果，`code` 是内层状态码
#[derive(Debug, Clone, Deserialize)]
pub struct QrcodePoll {
    pub code: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub message: String,
}

/// 登录凭证，对应远端账号的两个 cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub sessdata: String,
    pub bili_jct: String,
}

impl Certificate {
    pub fn new(sessdata: impl Into<String>, bili_jct: impl Into<String>) -> Self {
        Self {
            sessdata: sessdata.into(),
            bili_jct: bili_jct.into(),
        }
    }

    pub fn cookie_header(&self) -> String {
        format!("SESSDATA={}; bili_jct={}", self.sessdata, self.bili_jct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_data_maps_nonzero_code_to_api_error() {
        let response: ApiResponse<UploadData> = serde_json::from_str(
            r#"{"code": -101, "message": "账号未登录", "data": null}"#,
        )
        .unwrap();

        match response.into_data() {
            Err(UploadError::Api { code, message }) => {
                assert_eq!(code, -101);
                assert_eq!(message, "账号未登录");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn into_data_requires_payload() {
        let response: ApiResponse<UploadData> =
            serde_json::from_str(r#"{"code": 0, "message": ""}"#).unwrap();
        assert!(matches!(
            response.into_data(),
            Err(UploadError::InvalidResponse(_))
        ));
    }

    #[test]
    fn cookie_header_carries_both_credentials() {
        let certificate = Certificate::new("abc", "def");
        assert_eq!(certificate.cookie_header(), "SESSDATA=abc; bili_jct=def");
    }
}
