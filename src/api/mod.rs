mod client;
mod qrcode;
mod types;

pub use client::BiliClient;
pub use qrcode::{QrcodeLogin, QrcodeStatus};
pub use types::{ApiResponse, Certificate, QrcodeData, QrcodePoll, SpaceInfo, UploadData};
