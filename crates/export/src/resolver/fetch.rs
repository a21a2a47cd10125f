//! Image byte acquisition.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Why one image could not be resolved. Never leaves the resolver.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid image URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported URI scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    #[error("malformed data URI")]
    MalformedDataUri,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("resolution task failed: {0}")]
    Task(String),
}

/// Source of raw image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ResolveError>;
}

/// Fetches `http`, `https` and `file` URLs.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing client, e.g. one with custom headers.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, ResolveError> {
        match url.scheme() {
            "http" | "https" => {
                tracing::debug!("Fetching image {}", url);
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            "file" => {
                let path: PathBuf = url.to_file_path().map_err(|_| ResolveError::UnsupportedScheme {
                    scheme: "file".to_string(),
                })?;
                tracing::debug!("Reading image {}", path.display());
                Ok(tokio::fs::read(path).await?)
            }
            other => Err(ResolveError::UnsupportedScheme {
                scheme: other.to_string(),
            }),
        }
    }
}

/// Resolve `uri` against an optional base URL.
pub fn parse_image_url(uri: &str, base: Option<&Url>) -> Result<Url, ResolveError> {
    let result = match base {
        Some(base) => base.join(uri),
        None => Url::parse(uri),
    };
    result.map_err(|source| ResolveError::InvalidUri {
        uri: uri.to_string(),
        source,
    })
}
