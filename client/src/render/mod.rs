//! Annotation rendering module
//!
//! This module provides:
//! - `Annotator` which decodes the photo and draws rings and labels
//! - `RenderedImage`, the RGBA result handed to the UI

pub mod annotator;
mod glyphs;
mod types;

pub use annotator::Annotator;
pub use types::{RenderError, RenderedImage};
