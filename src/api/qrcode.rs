use std::time::{Duration, Instant};
use url::Url;

use super::client::BiliClient;
use super::types::Certificate;
use crate::core::Result;

/// 二维码有效期 3 分钟，过期需要重新申请
const QRCODE_TTL: Duration = Duration::from_secs(180);
/// 轮询间隔
const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// 远端轮询接口的内层状态码
const CODE_CONFIRMED: i64 = 0;
const CODE_EXPIRED: i64 = 86038;
const CODE_SCANNED: i64 = 86090;
const CODE_WAITING: i64 = 86101;

/// 一次轮询观察到的扫码状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrcodeStatus {
    /// 手机端已确认，凭证已从确认 URL 里解出
    Confirmed(Certificate),
    /// 已扫描，等待手机端确认
    Scanned,
    /// 尚未扫描
    Waiting,
    /// 二维码已失效（远端判定或本地超时）
    Expired,
}

/// 扫码登录流程
///
/// `begin` 申请二维码，之后反复 `poll` 直到确认或过期。
/// 确认 URL 的 query 里带着 `SESSDATA` 和 `bili_jct` 两个凭证。
pub struct QrcodeLogin<'a> {
    client: &'a BiliClient,
    qrcode_key: String,
    qrcode_url: String,
    created_at: Instant,
}

impl<'a> QrcodeLogin<'a> {
    pub async fn begin(client: &'a BiliClient) -> Result<QrcodeLogin<'a>> {
        let qrcode = client.generate_qrcode().await?;
        Ok(Self {
            client,
            qrcode_key: qrcode.qrcode_key,
            qrcode_url: qrcode.url,
            created_at: Instant::now(),
        })
    }

    /// 要展示给用户扫的二维码内容
    pub fn qrcode_url(&self) -> &str {
        &self.qrcode_url
    }

    pub async fn poll(&self) -> Result<QrcodeStatus> {
        if self.created_at.elapsed() > QRCODE_TTL {
            return Ok(QrcodeStatus::Expired);
        }

        let poll = self.client.poll_qrcode(&self.qrcode_key).await?;
        let status = match poll.code {
            CODE_CONFIRMED => match extract_credentials(&poll.url) {
                Some(certificate) => QrcodeStatus::Confirmed(certificate),
                None => {
                    tracing::warn!(url = %poll.url, "confirm URL carries no credentials");
                    QrcodeStatus::Expired
                }
            },
            CODE_EXPIRED => QrcodeStatus::Expired,
            CODE_SCANNED => QrcodeStatus::Scanned,
            CODE_WAITING => QrcodeStatus::Waiting,
            other => {
                tracing::warn!(code = other, message = %poll.message, "unknown qrcode status");
                QrcodeStatus::Waiting
            }
        };

        Ok(status)
    }

    /// 轮询到底：确认时返回凭证，过期返回 None
    pub async fn wait(&self) -> Result<Option<Certificate>> {
        loop {
            match self.poll().await? {
                QrcodeStatus::Confirmed(certificate) => return Ok(Some(certificate)),
                QrcodeStatus::Expired => return Ok(None),
                QrcodeStatus::Scanned | QrcodeStatus::Waiting => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }
}

/// 从确认 URL 的 query 里解出登录凭证
fn extract_credentials(confirm_url: &str) -> Option<Certificate> {
    let parsed = Url::parse(confirm_url).ok()?;

    let mut sessdata = None;
    let mut bili_jct = None;
    for (key, value) in parsed.query_pairs() {
        match key.as_ref() {
            "SESSDATA" => sessdata = Some(value.into_owned()),
            "bili_jct" => bili_jct = Some(value.into_owned()),
            _ => {}
        }
    }

    Some(Certificate {
        sessdata: sessdata?,
        bili_jct: bili_jct?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_extracted_from_confirm_url() {
        let certificate = extract_credentials(
            "https://passport.example.com/crossDomain?DedeUserID=1&SESSDATA=abc%2C123&bili_jct=def456",
        )
        .unwrap();
        assert_eq!(certificate.sessdata, "abc,123");
        assert_eq!(certificate.bili_jct, "def456");
    }

    #[test]
    fn missing_credentials_yield_none() {
        assert!(extract_credentials("https://example.com/?SESSDATA=only").is_none());
        assert!(extract_credentials("not a url").is_none());
    }
}
