//! Annotator configuration.
//!
//! Settings can be created programmatically, loaded from a TOML file, or read
//! from environment variables. Every field has a default matching the
//! behaviour users expect out of the box: images bounded to 300px, a 128px
//! placeholder for previews that fail to load, a 10 second limit on remote
//! image fetches, and zoom stepping by 25% between 25% and 400%.
//!
//! The zoom range and the reset level are fixed; only the step is
//! configurable.

use pagenote_doc_model::Dimensions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Tolerance used when comparing zoom levels against the policy bounds.
const ZOOM_EPSILON: f64 = 1e-9;

/// Zoom stepping within the fixed `[MIN, MAX]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoomPolicy {
    pub step: f64,
}

impl Default for ZoomPolicy {
    fn default() -> Self {
        Self { step: 0.25 }
    }
}

impl ZoomPolicy {
    pub const MIN: f64 = 0.25;
    pub const MAX: f64 = 4.0;
    /// Level a session starts at and returns to on reset.
    pub const DEFAULT: f64 = 1.0;

    /// Next zoom level up, or `None` when the step would pass `MAX`.
    pub fn step_in(&self, current: f64) -> Option<f64> {
        let next = current + self.step;
        (next <= Self::MAX + ZOOM_EPSILON).then(|| next.min(Self::MAX))
    }

    /// Next zoom level down, or `None` when the step would pass `MIN`.
    pub fn step_out(&self, current: f64) -> Option<f64> {
        let next = current - self.step;
        (next >= Self::MIN - ZOOM_EPSILON).then(|| next.max(Self::MIN))
    }
}

/// Configuration for annotation creation and viewing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagenoteConfig {
    /// Longest side, in pixels, of an image annotation's display size
    pub max_image_size: u32,
    /// Natural size assumed when a remote image cannot be loaded
    pub image_fallback: Dimensions,
    pub zoom: ZoomPolicy,
    /// Maximum length of a text annotation, in characters
    pub max_text_len: usize,
    /// Limit on a whole remote image request, in milliseconds
    pub image_fetch_timeout_ms: u64,
}

impl Default for PagenoteConfig {
    fn default() -> Self {
        Self {
            max_image_size: 300,
            image_fallback: Dimensions::new(128, 128),
            zoom: ZoomPolicy::default(),
            max_text_len: 500,
            image_fetch_timeout_ms: 10_000,
        }
    }
}

impl PagenoteConfig {
    pub fn with_max_image_size(mut self, max_image_size: u32) -> Self {
        self.max_image_size = max_image_size;
        self
    }

    pub fn with_image_fallback(mut self, fallback: Dimensions) -> Self {
        self.image_fallback = fallback;
        self
    }

    pub fn with_zoom(mut self, zoom: ZoomPolicy) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_max_text_len(mut self, max_text_len: usize) -> Self {
        self.max_text_len = max_text_len;
        self
    }

    pub fn with_image_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.image_fetch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.image_fetch_timeout_ms)
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// - `PAGENOTE_MAX_IMAGE_SIZE`: longest image side in pixels (default: 300)
    /// - `PAGENOTE_FALLBACK_SIZE`: `WIDTHxHEIGHT` or a single edge (default: 128x128)
    /// - `PAGENOTE_ZOOM_STEP`: zoom increment (default: 0.25)
    /// - `PAGENOTE_MAX_TEXT_LEN`: maximum text annotation length (default: 500)
    /// - `PAGENOTE_FETCH_TIMEOUT_MS`: remote image request limit (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PAGENOTE_MAX_IMAGE_SIZE") {
            config.max_image_size = parse_env("PAGENOTE_MAX_IMAGE_SIZE", &val)?;
        }

        if let Ok(val) = std::env::var("PAGENOTE_FALLBACK_SIZE") {
            config.image_fallback = parse_dimensions(&val)
                .ok_or_else(|| ConfigError::InvalidValue("PAGENOTE_FALLBACK_SIZE".to_string()))?;
        }

        if let Ok(val) = std::env::var("PAGENOTE_ZOOM_STEP") {
            config.zoom.step = parse_env("PAGENOTE_ZOOM_STEP", &val)?;
        }

        if let Ok(val) = std::env::var("PAGENOTE_MAX_TEXT_LEN") {
            config.max_text_len = parse_env("PAGENOTE_MAX_TEXT_LEN", &val)?;
        }

        if let Ok(val) = std::env::var("PAGENOTE_FETCH_TIMEOUT_MS") {
            config.image_fetch_timeout_ms = parse_env("PAGENOTE_FETCH_TIMEOUT_MS", &val)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file. Missing keys keep their defaults.
    ///
    /// ```toml
    /// max_image_size = 300
    /// max_text_len = 500
    /// image_fetch_timeout_ms = 10000
    ///
    /// [image_fallback]
    /// width = 128
    /// height = 128
    ///
    /// [zoom]
    /// step = 0.25
    /// ```
    ///
    /// The zoom table only accepts `step`; any other key is a parse error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_image_size == 0 {
            return Err(ConfigError::InvalidValue("max_image_size".to_string()));
        }
        if self.image_fallback.width == 0 || self.image_fallback.height == 0 {
            return Err(ConfigError::InvalidValue("image_fallback".to_string()));
        }
        let step = self.zoom.step;
        if !(step > 0.0 && step <= ZoomPolicy::MAX - ZoomPolicy::MIN) {
            return Err(ConfigError::InvalidValue("zoom.step".to_string()));
        }
        if self.max_text_len == 0 {
            return Err(ConfigError::InvalidValue("max_text_len".to_string()));
        }
        if self.image_fetch_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("image_fetch_timeout_ms".to_string()));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_dimensions(value: &str) -> Option<Dimensions> {
    let value = value.trim();
    match value.split_once(['x', 'X']) {
        Some((width, height)) => {
            Some(Dimensions::new(width.trim().parse().ok()?, height.trim().parse().ok()?))
        }
        None => {
            let edge = value.parse().ok()?;
            Some(Dimensions::new(edge, edge))
        }
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed configuration file: {0}")]
    Parse(#[from] toml::de::Error),
}
