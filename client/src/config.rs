//! Client configuration
//!
//! Configuration is loaded from environment variables and may be overridden
//! by command-line flags.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by [`Config::validate`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Upload endpoint must be an http(s) URL: {0}")]
    InvalidEndpoint(String),

    #[error("Timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error(
        "Read timeout ({read:?}) must exceed connect ({connect:?}) and write ({write:?}) timeouts"
    )]
    ReadTimeoutTooShort {
        read: Duration,
        connect: Duration,
        write: Duration,
    },
}

/// Main client configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Upload configuration
    pub upload: UploadConfig,

    /// Source resolution configuration
    pub source: SourceConfig,
}

/// Upload-related configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Annotation service endpoint
    pub endpoint: String,
    /// Time allowed to establish the connection
    pub connect_timeout: Duration,
    /// Time allowed for the transport to accept each body chunk
    pub write_timeout: Duration,
    /// Time allowed, once the body is sent, for the response head and each later read
    pub read_timeout: Duration,
    /// Multipart form field carrying the image
    pub field_name: String,
    /// Content type declared for the image part
    pub content_type: String,
}

/// Source resolution configuration
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Directory for copies of non-local image references
    pub temp_dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://192.168.1.2:5000/upload".to_string(),
            connect_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(60),
            read_timeout: Duration::from_secs(600), // 10 minutes, star solving is slow
            field_name: "image".to_string(),
            content_type: "image/jpeg".to_string(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            temp_dir: env::temp_dir().join("starmark"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Upload config
        if let Ok(url) = env::var("STARMARK_UPLOAD_URL")
            && !url.is_empty()
        {
            config.upload.endpoint = url;
        }
        if let Ok(val) = env::var("STARMARK_CONNECT_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.upload.connect_timeout = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("STARMARK_WRITE_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.upload.write_timeout = Duration::from_secs(secs);
        }
        if let Ok(val) = env::var("STARMARK_READ_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            config.upload.read_timeout = Duration::from_secs(secs);
        }
        if let Ok(field) = env::var("STARMARK_UPLOAD_FIELD")
            && !field.is_empty()
        {
            config.upload.field_name = field;
        }
        if let Ok(mime) = env::var("STARMARK_UPLOAD_CONTENT_TYPE")
            && !mime.is_empty()
        {
            config.upload.content_type = mime;
        }

        // Source config
        if let Ok(dir) = env::var("STARMARK_TEMP_DIR")
            && !dir.is_empty()
        {
            config.source.temp_dir = PathBuf::from(dir);
        }

        config
    }

    /// Check that the configuration can drive a pipeline run
    pub fn validate(&self) -> Result<(), ConfigError> {
        let upload = &self.upload;

        if !(upload.endpoint.starts_with("http://") || upload.endpoint.starts_with("https://")) {
            return Err(ConfigError::InvalidEndpoint(upload.endpoint.clone()));
        }

        for (name, value) in [
            ("connect", upload.connect_timeout),
            ("write", upload.write_timeout),
            ("read", upload.read_timeout),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }

        if upload.read_timeout <= upload.connect_timeout
            || upload.read_timeout <= upload.write_timeout
        {
            return Err(ConfigError::ReadTimeoutTooShort {
                read: upload.read_timeout,
                connect: upload.connect_timeout,
                write: upload.write_timeout,
            });
        }

        Ok(())
    }
}
