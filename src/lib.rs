pub mod api;
pub mod config;
pub mod core;
pub mod store;
pub mod utils;

// 重新导出核心类型
pub use crate::core::{
    BatchResult,
    BatchUploader,
    FailedUpload,
    ImageHost,
    ImageRecord,
    ImageUploader,
    ProgressCallback,
    ProgressSnapshot,
    Result,
    UploadError,
    UploadFile,
};

pub use api::{BiliClient, Certificate, QrcodeLogin, QrcodeStatus};
pub use config::Config;
pub use store::{Gallery, Session};
