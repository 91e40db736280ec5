//! Pagenote Core Library
//!
//! Annotation interaction and data model for a paged document viewer:
//! screen/document coordinate mapping, image sizing, the annotation store,
//! drag handling and the document session that ties them together.

pub mod config;
pub mod draft;
pub mod drag;
pub mod image_size;
pub mod payload;
pub mod session;
pub mod source;
pub mod store;
pub mod transform;

pub use config::{ConfigError, PagenoteConfig, ZoomPolicy};
pub use draft::{AnnotationDraft, DraftError};
pub use drag::{DragCommit, DragController, DragRouter, DragState, PressOutcome};
pub use image_size::{
    bounded_display_size, decode_dimensions, DefaultImageFetcher, FetchError, ImageDimensionResolver,
    ImageFetcher, ResolveError,
};
pub use payload::{
    decode_inline_payload, encode_inline_payload, is_inline_payload, EncodeError, FileEncoder,
    PayloadEncoder, PayloadError,
};
pub use session::{DocumentSession, SessionError, SessionEvent, SubscriptionId};
pub use source::{AnnotationPrompt, DocumentSource};
pub use store::{AnnotationStore, StoreError, StoreResult};
pub use transform::{
    screen_delta_to_document, to_document_space, to_screen_space, BoundingBox, ScreenPoint,
};
