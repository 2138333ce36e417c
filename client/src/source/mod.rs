//! Source resolution module
//!
//! This module provides:
//! - `ImageReference` for the locators handed over by the UI
//! - `ContentResolver` trait for opening content-provider locators
//! - `SourceResolver` which materializes a reference as a `LocalImageFile`

mod resolver;
mod types;

pub use resolver::{ContentResolver, ContentStream, SourceResolver};
pub use types::{ImageReference, LocalImageFile, ResolveError};
