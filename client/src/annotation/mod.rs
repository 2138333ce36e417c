//! Annotation module
//!
//! Typed star annotations and the parser for the service response.

pub mod parser;
pub mod types;

pub use parser::ResponseParser;
pub use types::{AnnotationRecord, AnnotationSet, ParseError, RecordError};
