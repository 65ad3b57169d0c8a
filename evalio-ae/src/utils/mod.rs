//! Utility modules for evalio-ae

pub mod db_retry;
pub mod uploads;

pub use db_retry::retry_on_lock;
pub use uploads::{discard_upload, is_supported_audio, stored_file_name};
