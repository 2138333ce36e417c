//! Starmark Client Library
//!
//! Resolves a user-selected photo to a local file, uploads it to the star
//! annotation service, parses the returned labels and draws them onto a copy
//! of the photo. The `pipeline` module sequences those stages for a UI.

pub mod annotation;
pub mod config;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod upload;

mod test_utils;

// Re-export commonly used types
pub use annotation::{AnnotationRecord, AnnotationSet, ParseError, RecordError, ResponseParser};
pub use config::Config;
pub use pipeline::{
    Orchestrator, PipelineResult, PipelineState, Stage, StageError, UiEvent, UiHandle,
};
pub use render::{Annotator, RenderError, RenderedImage};
pub use source::{ContentResolver, ImageReference, LocalImageFile, ResolveError, SourceResolver};
pub use upload::{UploadClient, UploadError};
