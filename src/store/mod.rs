mod gallery;
mod user;

pub use gallery::{Gallery, GalleryError};
pub use user::{Session, UserInfo};
