//! Image dimension resolution and display bounding
//!
//! Image annotations need a display size at creation time. The natural size
//! is read from the encoded image header; remote images that cannot be loaded
//! fall back to a caller-supplied size so that annotation creation never fails
//! just because a preview was unreachable. Inline payloads are already local,
//! so a decode failure there means corrupt input and is reported.

use crate::config::PagenoteConfig;
use crate::payload::{decode_inline_payload, is_inline_payload, PayloadError};
use image::ImageReader;
use pagenote_doc_model::Dimensions;
use std::future::Future;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on the number of bytes read from a remote image.
const MAX_FETCH_BYTES: u64 = 32 * 1024 * 1024;

/// Why an image could not be fetched. Recovered locally via the fallback size.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Locally supplied payload could not be decoded.
    #[error("failed to decode image payload: {0}")]
    Decode(String),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    /// Remote image failed and the caller supplied no fallback.
    #[error("image unavailable: {0}")]
    Unavailable(#[from] FetchError),
}

/// Loads the encoded bytes of an image reference.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>>;
}

/// Fetches `http(s)://` URLs with `ureq` and everything else from disk.
///
/// Remote requests are bounded by the agent's timeout, so an unresponsive
/// server fails the fetch instead of stalling it. Relative paths are resolved
/// against the base directory, which is normally the directory the
/// document's page images live in.
#[derive(Debug, Clone)]
pub struct DefaultImageFetcher {
    agent: ureq::Agent,
    base_dir: Option<PathBuf>,
}

impl Default for DefaultImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultImageFetcher {
    pub fn new() -> Self {
        Self::from_config(&PagenoteConfig::default())
    }

    pub fn from_config(config: &PagenoteConfig) -> Self {
        Self::with_timeout(config.image_fetch_timeout())
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent, base_dir: None }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    fn local_path(&self, url: &str) -> PathBuf {
        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ImageFetcher for DefaultImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.agent.get(url).call().map_err(|e| FetchError::Http(e.to_string()))?;
            let mut bytes = Vec::new();
            response.into_reader().take(MAX_FETCH_BYTES).read_to_end(&mut bytes)?;
            return Ok(bytes);
        }

        Ok(std::fs::read(self.local_path(url))?)
    }
}

/// Read the intrinsic pixel size from encoded image bytes.
pub fn decode_dimensions(bytes: &[u8]) -> Result<Dimensions, ResolveError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ResolveError::Decode(e.to_string()))?;
    let (width, height) = reader.into_dimensions().map_err(|e| ResolveError::Decode(e.to_string()))?;
    Ok(Dimensions::new(width, height))
}

/// Scale `natural` down so its longer side is at most `max_size`.
///
/// Sizes already within bounds are returned unchanged. The shorter side is
/// rounded half away from zero, so an extreme aspect ratio can round it to 0
/// (10000x1 bounded to 300 is 300x0).
pub fn bounded_display_size(natural: Dimensions, max_size: u32) -> Dimensions {
    let Dimensions { width, height } = natural;
    if width <= max_size && height <= max_size {
        return natural;
    }

    let scale = |short: u32, long: u32| -> u32 {
        let scaled = (f64::from(short) * f64::from(max_size) / f64::from(long)).round();
        scaled as u32
    };

    if width > height {
        Dimensions::new(max_size, scale(height, width))
    } else {
        Dimensions::new(scale(width, height), max_size)
    }
}

/// Resolves natural image dimensions through an [`ImageFetcher`].
#[derive(Debug, Clone, Default)]
pub struct ImageDimensionResolver<F> {
    fetcher: F,
}

impl<F: ImageFetcher> ImageDimensionResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// Resolve the natural size of `source`, which is either an image URL or
    /// an inline `data:` payload.
    ///
    /// A URL that fails to load or decode resolves to `fallback` when one is
    /// given. Inline payloads have no fallback.
    pub async fn resolve_natural_dimensions(
        &self,
        source: &str,
        fallback: Option<Dimensions>,
    ) -> Result<Dimensions, ResolveError> {
        if is_inline_payload(source) {
            return self.resolve_inline(source);
        }

        match self.try_url(source).await {
            Ok(dimensions) => Ok(dimensions),
            Err(err) => match fallback {
                Some(fallback) => {
                    tracing::warn!(url = source, error = %err, ?fallback, "image load failed, using fallback size");
                    Ok(fallback)
                }
                None => Err(err),
            },
        }
    }

    /// URL path with a mandatory fallback. Never fails.
    pub async fn resolve_url(&self, url: &str, fallback: Dimensions) -> Dimensions {
        match self.try_url(url).await {
            Ok(dimensions) => dimensions,
            Err(err) => {
                tracing::warn!(url, error = %err, ?fallback, "image load failed, using fallback size");
                fallback
            }
        }
    }

    pub fn resolve_inline(&self, payload: &str) -> Result<Dimensions, ResolveError> {
        let bytes = decode_inline_payload(payload)?;
        decode_dimensions(&bytes)
    }

    async fn try_url(&self, url: &str) -> Result<Dimensions, ResolveError> {
        let bytes = self.fetcher.fetch(url).await?;
        decode_dimensions(&bytes)
    }
}
