//! Upload module
//!
//! Sends the local image to the annotation service as multipart form data.

mod client;
mod types;

pub use client::UploadClient;
pub use types::UploadError;
