//! Source-related types and error definitions

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::pipeline::{ErrorCause, Stage, StageFailure};

/// Errors that can occur while turning a reference into a local file
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Local image is not readable: {path:?}")]
    NotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Local image is not a regular file: {0:?}")]
    NotAFile(PathBuf),

    #[error("No content resolver registered for scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("Unable to open input stream for {reference}")]
    Open {
        reference: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create temporary file in {dir:?}")]
    CreateTemp {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Copy from {reference} was interrupted")]
    Copy {
        reference: String,
        #[source]
        source: std::io::Error,
    },
}

impl StageFailure for ResolveError {
    const STAGE: Stage = Stage::Resolve;

    fn kind(&self) -> &'static str {
        match self {
            ResolveError::NotReadable { .. } => "NotReadable",
            ResolveError::NotAFile(_) => "NotAFile",
            ResolveError::UnsupportedScheme(_) => "UnsupportedScheme",
            ResolveError::Open { .. } => "Open",
            ResolveError::CreateTemp { .. } => "CreateTemp",
            ResolveError::Copy { .. } => "Copy",
        }
    }

    fn fault(&self) -> Option<ErrorCause> {
        match self {
            ResolveError::NotReadable { source, .. }
            | ResolveError::Open { source, .. }
            | ResolveError::CreateTemp { source, .. }
            | ResolveError::Copy { source, .. } => Some(ErrorCause::io(source)),
            ResolveError::NotAFile(_) | ResolveError::UnsupportedScheme(_) => None,
        }
    }
}

/// Opaque locator for user-selected image content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// Path on the local filesystem (`file://` URI or bare path)
    File(PathBuf),
    /// Bytes piped on standard input (`-`)
    Stdin,
    /// Content-provider locator such as `content://media/external/images/42`
    Content { scheme: String, uri: String },
}

impl ImageReference {
    /// Classify a locator string
    pub fn parse(locator: &str) -> Self {
        if locator == "-" {
            return ImageReference::Stdin;
        }
        if let Some(path) = locator.strip_prefix("file://") {
            return ImageReference::File(PathBuf::from(path));
        }
        if let Some((scheme, _)) = locator.split_once("://")
            && is_scheme(scheme)
        {
            return ImageReference::Content {
                scheme: scheme.to_ascii_lowercase(),
                uri: locator.to_string(),
            };
        }
        ImageReference::File(PathBuf::from(locator))
    }

    /// URI scheme of the reference
    pub fn scheme(&self) -> &str {
        match self {
            ImageReference::File(_) => "file",
            ImageReference::Stdin => "stdin",
            ImageReference::Content { scheme, .. } => scheme,
        }
    }
}

/// RFC 3986: ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )
fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageReference::File(path) => write!(f, "file://{}", path.display()),
            ImageReference::Stdin => f.write_str("stdin"),
            ImageReference::Content { uri, .. } => f.write_str(uri),
        }
    }
}

/// A readable image file owned by one pipeline invocation
///
/// Temporary copies are removed when the value is dropped. Files the user
/// pointed at directly are never touched.
#[derive(Debug)]
pub struct LocalImageFile {
    path: PathBuf,
    temporary: bool,
}

impl LocalImageFile {
    pub(crate) fn borrowed(path: PathBuf) -> Self {
        Self {
            path,
            temporary: false,
        }
    }

    pub(crate) fn temporary(path: PathBuf) -> Self {
        Self {
            path,
            temporary: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name sent with the upload
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image.jpg".to_string())
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

impl Drop for LocalImageFile {
    fn drop(&mut self) {
        if !self.temporary {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed temporary image {:?}", self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary image {:?}: {}", self.path, e),
        }
    }
}
