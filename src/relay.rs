use async_trait::async_trait;
use futures::TryStreamExt;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tracing::{debug, error, info};

use crate::config::RelayConfig;

/// Downloads are copied to disk in pieces of this size.
pub const CHUNK_SIZE: usize = 8 * 1024;

const FALLBACK_FILE_NAME: &str = "file.bin";
const MAX_SUFFIX_LEN: usize = 10;

/// Which half of the relay went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    Download,
    Upload,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("download request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("download returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("download stream broke off: {0}")]
    Stream(#[source] std::io::Error),
    #[error("temporary file error: {0}")]
    Storage(#[source] std::io::Error),
    #[error("upload to channel failed: {0}")]
    Upload(String),
}

impl RelayError {
    pub fn stage(&self) -> RelayStage {
        match self {
            RelayError::Upload(_) => RelayStage::Upload,
            _ => RelayStage::Download,
        }
    }
}

/// Moves a remote file into the destination channel.
#[async_trait]
pub trait Relay: Send + Sync {
    async fn relay(&self, direct_link: &str, title: &str) -> Result<(), RelayError>;
}

/// Where relayed files end up.
#[async_trait]
pub trait DocumentSink: Send + Sync {
    async fn send_document(&self, path: &Path, file_name: &str) -> anyhow::Result<()>;
}

/// Upload name for an untrusted title: path separators, control and
/// reserved characters removed.
pub fn upload_file_name(title: &str) -> String {
    let cleaned = sanitize_filename::sanitize(title.trim());
    let cleaned = cleaned.trim().trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Temporary file suffix, kept only for short alphanumeric extensions.
pub fn temp_suffix(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_SUFFIX_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Download-then-upload through a scoped temporary file.
pub struct FileRelay<S> {
    http: reqwest::Client,
    sink: S,
    temp_dir: Option<PathBuf>,
}

impl<S: DocumentSink> FileRelay<S> {
    pub fn new(http: reqwest::Client, sink: S, temp_dir: Option<PathBuf>) -> Self {
        Self {
            http,
            sink,
            temp_dir,
        }
    }

    pub fn from_config(config: &RelayConfig, sink: S) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self::new(http, sink, config.temp_dir.clone()))
    }

    fn create_temp(&self, file_name: &str) -> Result<tempfile::NamedTempFile, RelayError> {
        let suffix = temp_suffix(file_name);
        let mut builder = tempfile::Builder::new();
        builder.prefix("relay-").suffix(&suffix);
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(RelayError::Storage)
    }

    async fn download(
        &self,
        direct_link: &str,
        temp: &tempfile::NamedTempFile,
    ) -> Result<u64, RelayError> {
        let response = self
            .http
            .get(direct_link)
            .send()
            .await
            .map_err(RelayError::Request)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::Status(status));
        }

        let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));
        tokio::pin!(reader);

        let mut file = tokio::fs::File::from_std(temp.reopen().map_err(RelayError::Storage)?);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written = 0u64;
        loop {
            let n = reader.read(&mut buf).await.map_err(RelayError::Stream)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n])
                .await
                .map_err(RelayError::Storage)?;
            written += n as u64;
        }
        file.flush().await.map_err(RelayError::Storage)?;

        Ok(written)
    }

    async fn transfer(
        &self,
        direct_link: &str,
        file_name: &str,
        temp: &tempfile::NamedTempFile,
    ) -> Result<(), RelayError> {
        let bytes = self.download(direct_link, temp).await?;
        debug!("Downloaded {} bytes to {}", bytes, temp.path().display());

        self.sink
            .send_document(temp.path(), file_name)
            .await
            .map_err(|e| RelayError::Upload(format!("{e:#}")))?;

        info!("Relayed {} ({} bytes)", file_name, bytes);
        Ok(())
    }
}

#[async_trait]
impl<S: DocumentSink> Relay for FileRelay<S> {
    async fn relay(&self, direct_link: &str, title: &str) -> Result<(), RelayError> {
        let file_name = upload_file_name(title);

        let result = match self.create_temp(&file_name) {
            // The temporary file is removed when `temp` drops, whatever the outcome.
            Ok(temp) => self.transfer(direct_link, &file_name, &temp).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!("Error downloading/sending {}: {}", file_name, e);
        }
        result
    }
}
