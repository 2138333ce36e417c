//! Annotation types and error definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::{ErrorCause, Stage, StageFailure};

/// Errors that can occur when decoding the service response
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Response is not valid JSON")]
    Malformed(#[source] serde_json::Error),

    #[error("Response is not a JSON object (found {0})")]
    NotAnObject(&'static str),

    #[error("Response has no `stars` field")]
    MissingStars,

    #[error("Response field `stars` is not an array (found {0})")]
    StarsNotArray(&'static str),

    #[error("Star entry {index} is invalid")]
    InvalidEntry {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Star entry {index} has an empty name")]
    EmptyLabel { index: usize },
}

impl StageFailure for ParseError {
    const STAGE: Stage = Stage::Parse;

    fn kind(&self) -> &'static str {
        match self {
            ParseError::Malformed(_) => "Malformed",
            ParseError::NotAnObject(_) => "NotAnObject",
            ParseError::MissingStars => "MissingStars",
            ParseError::StarsNotArray(_) => "StarsNotArray",
            ParseError::InvalidEntry { .. } => "InvalidEntry",
            ParseError::EmptyLabel { .. } => "EmptyLabel",
        }
    }

    fn fault(&self) -> Option<ErrorCause> {
        match self {
            ParseError::Malformed(source) | ParseError::InvalidEntry { source, .. } => Some(
                ErrorCause::new(format!("json/{:?}", source.classify()), source),
            ),
            _ => None,
        }
    }
}

/// Why a record cannot be built or serialized
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("Annotation label is empty")]
    EmptyLabel,

    #[error("Annotation coordinates must be finite (x={x}, y={y})")]
    NonFiniteCoordinate { x: f32, y: f32 },
}

/// A named point in image pixel coordinates
///
/// Coordinates are not checked against the image size; points outside the
/// canvas are legal and simply render partly or wholly off-screen. A valid
/// record has a non-empty label and finite coordinates; only valid records
/// survive a trip through [`AnnotationSet::to_json`] and the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(rename = "name")]
    pub label: String,
    pub x: f32,
    pub y: f32,
}

impl AnnotationRecord {
    /// Build a record without validation; see [`AnnotationRecord::try_new`]
    pub fn new(label: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            label: label.into(),
            x,
            y,
        }
    }

    /// Build a record, rejecting empty labels and non-finite coordinates
    pub fn try_new(label: impl Into<String>, x: f32, y: f32) -> Result<Self, RecordError> {
        let record = Self::new(label, x, y);
        record.validate()?;
        Ok(record)
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.label.is_empty() {
            return Err(RecordError::EmptyLabel);
        }
        if !self.x.is_finite() || !self.y.is_finite() {
            return Err(RecordError::NonFiniteCoordinate {
                x: self.x,
                y: self.y,
            });
        }
        Ok(())
    }
}

/// Annotation records in server response order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationSet {
    #[serde(rename = "stars")]
    records: Vec<AnnotationRecord>,
}

impl AnnotationSet {
    pub fn new(records: Vec<AnnotationRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnnotationRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[AnnotationRecord] {
        &self.records
    }

    /// Serialize using the service's response schema
    ///
    /// Fails on invalid records instead of writing JSON the parser would
    /// reject (a NaN coordinate would otherwise come out as `null`).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        for (index, record) in self.records.iter().enumerate() {
            record.validate().map_err(|e| {
                <serde_json::Error as serde::ser::Error>::custom(format!("star {index}: {e}"))
            })?;
        }
        serde_json::to_string(self)
    }
}

impl From<Vec<AnnotationRecord>> for AnnotationSet {
    fn from(records: Vec<AnnotationRecord>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a AnnotationRecord;
    type IntoIter = std::slice::Iter<'a, AnnotationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
