//! Inline image payloads (`data:` URLs)
//!
//! Uploaded images are stored directly in `Annotation::content` as a base64
//! `data:` URL so that the annotation set stays self-contained.

use base64::{engine::general_purpose::STANDARD, Engine};
use std::future::Future;
use std::io;
use std::path::Path;

const DATA_URL_PREFIX: &str = "data:";

/// Errors raised while turning a local file into an inline payload
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} is not a recognised image file")]
    NotAnImage(String),
}

/// Errors raised while unpacking an inline payload
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("not a data URL")]
    NotDataUrl,
    #[error("only base64 data URLs are supported")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Base64(String),
}

/// Turns a user-selected local file into an inline payload string.
pub trait PayloadEncoder {
    fn encode_file(&self, path: &Path) -> impl Future<Output = Result<String, EncodeError>>;
}

/// Reads the file from disk and wraps it as `data:<mime>;base64,<bytes>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileEncoder;

impl PayloadEncoder for FileEncoder {
    async fn encode_file(&self, path: &Path) -> Result<String, EncodeError> {
        let bytes = std::fs::read(path)
            .map_err(|source| EncodeError::Read { path: path.display().to_string(), source })?;
        let format = image::guess_format(&bytes)
            .map_err(|_| EncodeError::NotAnImage(path.display().to_string()))?;

        Ok(encode_inline_payload(format.to_mime_type(), &bytes))
    }
}

pub fn is_inline_payload(source: &str) -> bool {
    source.trim_start().starts_with(DATA_URL_PREFIX)
}

pub fn encode_inline_payload(mime: &str, bytes: &[u8]) -> String {
    format!("{DATA_URL_PREFIX}{mime};base64,{}", STANDARD.encode(bytes))
}

/// Returns the raw bytes carried by a base64 `data:` URL.
pub fn decode_inline_payload(payload: &str) -> Result<Vec<u8>, PayloadError> {
    let rest = payload.trim().strip_prefix(DATA_URL_PREFIX).ok_or(PayloadError::NotDataUrl)?;
    let (header, data) = rest.split_once(',').ok_or(PayloadError::NotDataUrl)?;
    if !header.split(';').any(|param| param.eq_ignore_ascii_case("base64")) {
        return Err(PayloadError::NotBase64);
    }

    STANDARD.decode(data.trim()).map_err(|e| PayloadError::Base64(e.to_string()))
}
