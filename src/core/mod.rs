mod batch;
mod errors;
mod progress;
mod types;
mod uploader;

pub use batch::BatchUploader;
pub use errors::{Result, UploadError};
pub use types::{
    BatchResult,
    FailedUpload,
    ImageRecord,
    ProgressCallback,
    ProgressSnapshot,
    UploadFile,
};
pub use uploader::{ImageHost, ImageUploader};
