//! Storage backends for captured screenshots
//!
//! One backend is active per process, chosen by [`StorageSelector`] from
//! [`StorageConfig`]. Both variants take the same [`UploadTarget`] and
//! return a publicly resolvable URL.

pub mod backend;
pub mod cloudinary;
pub mod error;
pub mod naming;
pub mod s3;
pub mod selector;

pub use backend::{ImageSource, StorageBackend, UploadResult, UploadTarget};
pub use cloudinary::{CloudinaryBackend, CloudinaryConfig, DEFAULT_CLOUDINARY_API_BASE};
pub use error::{StorageError, StorageResult};
pub use naming::name_hint_from_url;
pub use s3::{S3CdnBackend, S3Config, S3Settings};
pub use selector::{StorageConfig, StorageProvider, StorageSelector, DEFAULT_UPLOAD_TIMEOUT};
