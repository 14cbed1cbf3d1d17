use crate::api::{BiliClient, Certificate, SpaceInfo};
use crate::core::{ImageRecord, Result, UploadError};

/// 当前登录用户的展示信息
#[derive(Debug, Clone, PartialEq)]
pub struct UserInfo {
    pub avatar: String,
    pub mid: u64,
    pub name: String,
    pub sign: String,
}

impl From<SpaceInfo> for UserInfo {
    fn from(info: SpaceInfo) -> Self {
        Self {
            avatar: info.face,
            mid: info.mid,
            name: info.name,
            sign: info.sign,
        }
    }
}

/// 会话状态容器
///
/// 显式传引用给用到的地方，进程启动时初始化、登出时整体清空，
/// 不用全局可变状态。
#[derive(Debug, Default)]
pub struct Session {
    certificate: Option<Certificate>,
    user_info: Option<UserInfo>,
    /// 本次会话里最近上传的图片
    recent: Vec<ImageRecord>,
}

impl Session {
    pub fn new(certificate: Option<Certificate>) -> Self {
        Self {
            certificate,
            user_info: None,
            recent: Vec::new(),
        }
    }

    pub fn logged_in(&self) -> bool {
        self.user_info.is_some() || self.certificate.is_some()
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    pub fn user_info(&self) -> Option<&UserInfo> {
        self.user_info.as_ref()
    }

    pub fn login(&mut self, certificate: Certificate) {
        self.certificate = Some(certificate);
        self.user_info = None;
    }

    pub fn logout(&mut self) {
        self.certificate = None;
        self.user_info = None;
        self.recent.clear();
    }

    /// 用远端校验凭证并补全用户信息
    ///
    /// 远端判定凭证无效时清掉本地状态并返回 `Ok(false)`，
    /// 网络类错误原样上抛，不动现有凭证。
    pub async fn init(&mut self, client: &BiliClient) -> Result<bool> {
        if self.user_info.is_some() {
            return Ok(true);
        }
        if self.certificate.is_none() {
            return Ok(false);
        }

        match client.get_space_info().await {
            Ok(info) => {
                self.user_info = Some(info.into());
                Ok(true)
            }
            Err(UploadError::Api { code, message }) => {
                tracing::info!(code, %message, "credentials rejected, clearing session");
                self.logout();
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    pub fn push_recent(&mut self, records: impl IntoIterator<Item = ImageRecord>) {
        self.recent.extend(records);
    }

    pub fn recent(&self) -> &[ImageRecord] {
        &self.recent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_and_logout_lifecycle() {
        let mut session = Session::new(None);
        assert!(!session.logged_in());

        session.login(Certificate::new("sess", "jct"));
        assert!(session.logged_in());
        assert_eq!(session.certificate().unwrap().sessdata, "sess");

        session.push_recent([ImageRecord {
            id: "1".to_string(),
            name: "cat".to_string(),
            file_type: "png".to_string(),
            url: "https://example.com/cat.png".to_string(),
            width: 1,
            height: 1,
            date: 0,
        }]);
        assert_eq!(session.recent().len(), 1);

        session.logout();
        assert!(!session.logged_in());
        assert!(session.recent().is_empty());
    }
}
