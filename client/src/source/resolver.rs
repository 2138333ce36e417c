//! Materializes image references as local files

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::SourceConfig;

use super::types::{ImageReference, LocalImageFile, ResolveError};

/// Byte stream handed out by a [`ContentResolver`]
pub type ContentStream = Box<dyn AsyncRead + Send + Unpin>;

/// Opens content-provider references for one URI scheme
#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Open a readable byte stream for the reference
    async fn open(&self, reference: &ImageReference) -> std::io::Result<ContentStream>;
}

/// Opens the process's standard input
struct StdinResolver;

#[async_trait]
impl ContentResolver for StdinResolver {
    async fn open(&self, _reference: &ImageReference) -> std::io::Result<ContentStream> {
        Ok(Box::new(tokio::io::stdin()))
    }
}

/// Turns image references into files readable for the rest of a run
pub struct SourceResolver {
    temp_dir: PathBuf,
    resolvers: HashMap<String, Arc<dyn ContentResolver>>,
    stdin: Arc<dyn ContentResolver>,
}

impl SourceResolver {
    pub fn new(config: &SourceConfig) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            resolvers: HashMap::new(),
            stdin: Arc::new(StdinResolver),
        }
    }

    /// Replace the source read for `-` references
    pub fn with_stdin(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.stdin = resolver;
        self
    }

    /// Register the resolver used for `scheme://` references
    pub fn with_resolver(
        mut self,
        scheme: impl Into<String>,
        resolver: Arc<dyn ContentResolver>,
    ) -> Self {
        self.resolvers
            .insert(scheme.into().to_ascii_lowercase(), resolver);
        self
    }

    /// Resolve a reference to a local file
    ///
    /// Local paths are returned as-is. Everything else is copied into a fresh
    /// temporary file that is removed once the returned value is dropped.
    pub async fn resolve(&self, reference: &ImageReference) -> Result<LocalImageFile, ResolveError> {
        match reference {
            ImageReference::File(path) => {
                let metadata =
                    tokio::fs::metadata(path)
                        .await
                        .map_err(|source| ResolveError::NotReadable {
                            path: path.clone(),
                            source,
                        })?;
                if !metadata.is_file() {
                    return Err(ResolveError::NotAFile(path.clone()));
                }
                debug!("Using local image {:?} ({} bytes)", path, metadata.len());
                Ok(LocalImageFile::borrowed(path.clone()))
            }
            ImageReference::Stdin => {
                let stream = self.stdin.open(reference).await.map_err(|source| {
                    ResolveError::Open {
                        reference: reference.to_string(),
                        source,
                    }
                })?;
                self.copy_to_temp(reference, stream).await
            }
            ImageReference::Content { scheme, .. } => {
                let resolver = self
                    .resolvers
                    .get(scheme)
                    .ok_or_else(|| ResolveError::UnsupportedScheme(scheme.clone()))?;
                let stream = resolver
                    .open(reference)
                    .await
                    .map_err(|source| ResolveError::Open {
                        reference: reference.to_string(),
                        source,
                    })?;
                self.copy_to_temp(reference, stream).await
            }
        }
    }

    /// Copy the stream into a uniquely named temporary file
    async fn copy_to_temp(
        &self,
        reference: &ImageReference,
        mut stream: ContentStream,
    ) -> Result<LocalImageFile, ResolveError> {
        let create_error = |source| ResolveError::CreateTemp {
            dir: self.temp_dir.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.temp_dir)
            .await
            .map_err(create_error)?;

        let path = self
            .temp_dir
            .join(format!("selected_image_{}.jpg", Uuid::new_v4().simple()));
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(create_error)?;

        // Owned from here on: any early return drops the partial copy
        let local = LocalImageFile::temporary(path);

        let copy_error = |source| ResolveError::Copy {
            reference: reference.to_string(),
            source,
        };
        let copied = tokio::io::copy(&mut stream, &mut file)
            .await
            .map_err(copy_error)?;
        file.flush().await.map_err(copy_error)?;
        drop(file);
        drop(stream);

        info!(
            "Copied {} ({} bytes) to {:?}",
            reference,
            copied,
            local.path()
        );
        Ok(local)
    }
}
