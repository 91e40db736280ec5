//! Annotation drafts
//!
//! A draft is what the "new annotation" prompt hands back: the user's raw
//! input before it has a position, a page, or (for images) a display size.

use crate::config::PagenoteConfig;
use crate::image_size::{bounded_display_size, ImageDimensionResolver, ImageFetcher, ResolveError};
use pagenote_doc_model::{DocPoint, NewAnnotation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationDraft {
    Text(String),
    /// Image referenced by URL or path
    ImageUrl(String),
    /// Uploaded image, already encoded as an inline `data:` payload
    Upload(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("text annotation is empty")]
    EmptyText,
    #[error("text annotation is {len} characters long, the limit is {max}")]
    TextTooLong { len: usize, max: usize },
    #[error("image source is empty")]
    EmptyImageSource,
    #[error(transparent)]
    Image(#[from] ResolveError),
}

impl AnnotationDraft {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::ImageUrl(_) | Self::Upload(_) => "image",
        }
    }

    /// Check the input without touching any image.
    pub fn validate(&self, config: &PagenoteConfig) -> Result<(), DraftError> {
        match self {
            Self::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Err(DraftError::EmptyText);
                }
                let len = text.chars().count();
                if len > config.max_text_len {
                    return Err(DraftError::TextTooLong { len, max: config.max_text_len });
                }
                Ok(())
            }
            Self::ImageUrl(source) | Self::Upload(source) => {
                if source.trim().is_empty() {
                    return Err(DraftError::EmptyImageSource);
                }
                Ok(())
            }
        }
    }

    /// Turn the draft into an annotation ready for the store.
    ///
    /// Image drafts resolve their natural size first; a URL that cannot be
    /// loaded uses the configured fallback, a corrupt upload fails.
    pub async fn build<F: ImageFetcher>(
        self,
        at: DocPoint,
        page_number: u32,
        resolver: &ImageDimensionResolver<F>,
        config: &PagenoteConfig,
    ) -> Result<NewAnnotation, DraftError> {
        self.validate(config)?;

        match self {
            Self::Text(text) => Ok(NewAnnotation::text(text.trim(), at, page_number)),
            Self::ImageUrl(url) => {
                let url = url.trim();
                let natural = resolver.resolve_url(url, config.image_fallback).await;
                let size = bounded_display_size(natural, config.max_image_size);
                Ok(NewAnnotation::image(url, size, at, page_number))
            }
            Self::Upload(payload) => {
                let payload = payload.trim();
                let natural = resolver.resolve_inline(payload)?;
                let size = bounded_display_size(natural, config.max_image_size);
                Ok(NewAnnotation::image(payload, size, at, page_number))
            }
        }
    }
}
