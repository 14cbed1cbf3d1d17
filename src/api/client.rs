use std::time::Duration;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};

use super::types::{ApiResponse, Certificate, QrcodeData, QrcodePoll, SpaceInfo, UploadData};
use crate::core::{ImageHost, Result, UploadError, UploadFile};

/// 请求超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 各接口路径
const UPLOAD_PATH: &str = "/image/upload";
const SPACE_INFO_PATH: &str = "/space/info";
const QRCODE_GENERATE_PATH: &str = "/qrcode/generate";
const QRCODE_POLL_PATH: &str = "/qrcode/poll";

/// 远端图床客户端
///
/// 持有 HTTP 客户端、接口基地址和可选的登录凭证。凭证以 Cookie 头
/// 附带，写操作同时带上 `csrf` 表单字段。
#[derive(Debug, Clone)]
pub struct BiliClient {
    client: Client,
    base_url: String,
    certificate: Option<Certificate>,
}

impl BiliClient {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            certificate: None,
        }
    }

    pub fn with_certificate(mut self, certificate: Certificate) -> Self {
        self.certificate = Some(certificate);
        self
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    pub fn set_certificate(&mut self, certificate: Option<Certificate>) {
        self.certificate = certificate;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_cookie(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.certificate {
            Some(certificate) => request.header("Cookie", certificate.cookie_header()),
            None => request,
        }
    }

    /// 上传一张图片，返回远端的 location
    ///
    /// multipart 表单，文件在固定的 `file` 字段下。不改写协议也不测
    /// 尺寸，那些是上层 `ImageUploader` 的事。
    pub async fn upload_image(&self, file: &UploadFile) -> Result<String> {
        let part = Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;

        let mut form = Form::new().part("file", part);
        if let Some(certificate) = &self.certificate {
            form = form.text("csrf", certificate.bili_jct.clone());
        }

        let response = self
            .with_cookie(self.client.post(self.url(UPLOAD_PATH)))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::server_error(
                status.as_u16(),
                format!("Upload failed with status {status}"),
            ));
        }

        let body: ApiResponse<UploadData> = response.json().await?;
        Ok(body.into_data()?.location)
    }

    /// 拉取当前账号的空间信息，用于校验凭证
    pub async fn get_space_info(&self) -> Result<SpaceInfo> {
        let response = self
            .with_cookie(self.client.get(self.url(SPACE_INFO_PATH)))
            .send()
            .await?;

        let body: ApiResponse<SpaceInfo> = response.json().await?;
        body.into_data()
    }

    /// 申请登录二维码
    pub async fn generate_qrcode(&self) -> Result<QrcodeData> {
        let response = self.client.get(self.url(QRCODE_GENERATE_PATH)).send().await?;
        let body: ApiResponse<QrcodeData> = response.json().await?;
        body.into_data()
    }

    /// 轮询二维码扫码状态
    pub async fn poll_qrcode(&self, qrcode_key: &str) -> Result<QrcodePoll> {
        let response = self
            .client
            .get(self.url(QRCODE_POLL_PATH))
            .query(&[("qrcode_key", qrcode_key)])
            .send()
            .await?;

        let body: ApiResponse<QrcodePoll> = response.json().await?;
        body.into_data()
    }
}

#[async_trait]
impl ImageHost for BiliClient {
    async fn upload(&self, file: &UploadFile) -> Result<String> {
        self.upload_image(file).await
    }
}
