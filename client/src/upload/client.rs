//! Multipart upload to the annotation service

use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{StreamExt, stream};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::UploadConfig;
use crate::source::LocalImageFile;

use super::types::UploadError;

/// Size of each body chunk handed to the transport
const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered ahead of the transport before the write timer matters
const WRITE_QUEUE_DEPTH: usize = 4;

/// Longest error body kept for diagnostics
const MAX_ERROR_BODY: usize = 512;

type Chunk = Result<Bytes, std::io::Error>;

/// Sends one image per call to the configured endpoint
///
/// Three timeouts apply independently: connection setup, acceptance of each
/// body chunk by the transport, and each read of the response. The read clock
/// only starts once the whole body has been handed to the transport, so a slow
/// but steady upload is bounded by the write timeout alone.
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: Client,
    endpoint: String,
    field_name: String,
    content_type: String,
    connect_timeout: Duration,
    write_timeout: Duration,
    read_timeout: Duration,
}

impl UploadClient {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(UploadError::InvalidRequest)?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            field_name: config.field_name.clone(),
            content_type: config.content_type.clone(),
            connect_timeout: config.connect_timeout,
            write_timeout: config.write_timeout,
            read_timeout: config.read_timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Upload the file and return the raw response body
    ///
    /// Makes exactly one attempt. Non-2xx statuses and empty bodies are
    /// failures regardless of what the body says.
    pub async fn upload(&self, file: &LocalImageFile) -> Result<String, UploadError> {
        let data = tokio::fs::read(file.path())
            .await
            .map_err(|source| UploadError::ReadFile {
                path: file.path().to_path_buf(),
                source,
            })?;
        let data = Bytes::from(data);
        let length = data.len() as u64;

        info!(
            "Uploading {} ({} bytes) to {}",
            file.file_name(),
            length,
            self.endpoint
        );
        let start = Instant::now();

        let (sender, receiver) = mpsc::channel::<Chunk>(WRITE_QUEUE_DEPTH);
        let body = stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|chunk| (chunk, receiver))
        });
        let part = Part::stream_with_length(Body::wrap_stream(body), length)
            .file_name(file.file_name())
            .mime_str(&self.content_type)
            .map_err(UploadError::InvalidRequest)?;
        let form = Form::new().part(self.field_name.clone(), part);

        let send = self.http.post(&self.endpoint).multipart(form).send();
        let feed = feed_body(sender, data, self.write_timeout);
        // Re-armed when the body is fully handed over; disarmed until then
        let response_deadline = tokio::time::sleep(self.read_timeout);
        tokio::pin!(send, feed, response_deadline);

        let mut feeding = true;
        let response = loop {
            tokio::select! {
                result = &mut send => break result.map_err(|e| self.classify(e))?,
                fed = &mut feed, if feeding => {
                    fed?;
                    feeding = false;
                    response_deadline
                        .as_mut()
                        .reset(tokio::time::Instant::now() + self.read_timeout);
                    debug!("Request body handed to transport after {:?}", start.elapsed());
                }
                () = &mut response_deadline, if !feeding => {
                    warn!("No response within {:?} of finishing the upload", self.read_timeout);
                    return Err(UploadError::ReadTimeout(self.read_timeout));
                }
            }
        };

        let status = response.status();
        info!("Upload HTTP status: {} after {:?}", status, start.elapsed());

        let body = self.read_body(response).await?;
        debug!("Upload response body: {} bytes", body.len());

        if !status.is_success() {
            warn!("Annotation service rejected upload with HTTP {}", status);
            return Err(UploadError::HttpStatus {
                status: status.as_u16(),
                body: truncate(body, MAX_ERROR_BODY),
            });
        }
        if body.trim().is_empty() {
            return Err(UploadError::EmptyBody {
                status: status.as_u16(),
            });
        }

        Ok(body)
    }

    /// Collect the response body, allowing `read_timeout` between chunks
    async fn read_body(&self, response: Response) -> Result<String, UploadError> {
        let mut chunks = response.bytes_stream();
        let mut body = Vec::new();
        loop {
            match tokio::time::timeout(self.read_timeout, chunks.next()).await {
                Ok(Some(chunk)) => body.extend_from_slice(&chunk.map_err(|e| self.classify(e))?),
                Ok(None) => break,
                Err(_) => return Err(UploadError::ReadTimeout(self.read_timeout)),
            }
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Map a transport failure to the phase it happened in
    fn classify(&self, error: reqwest::Error) -> UploadError {
        if error.is_connect() {
            if error.is_timeout() {
                UploadError::ConnectTimeout {
                    endpoint: self.endpoint.clone(),
                    timeout: self.connect_timeout,
                    source: error,
                }
            } else {
                UploadError::Connect {
                    endpoint: self.endpoint.clone(),
                    source: error,
                }
            }
        } else {
            UploadError::Transport(error)
        }
    }
}

/// Push the body into the transport chunk by chunk
///
/// Fails once the transport leaves a chunk unaccepted for longer than
/// `write_timeout`. A closed receiver means the request already finished or
/// failed; the caller learns which from the request future.
async fn feed_body(
    sender: mpsc::Sender<Chunk>,
    data: Bytes,
    write_timeout: Duration,
) -> Result<(), UploadError> {
    let mut offset = 0;
    while offset < data.len() {
        let end = (offset + CHUNK_SIZE).min(data.len());
        let chunk = data.slice(offset..end);
        match tokio::time::timeout(write_timeout, sender.send(Ok(chunk))).await {
            Ok(Ok(())) => offset = end,
            Ok(Err(_)) => return Ok(()),
            Err(_) => return Err(UploadError::WriteTimeout(write_timeout)),
        }
    }
    Ok(())
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
