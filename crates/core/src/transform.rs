//! Screen ↔ document coordinate transform
//!
//! Document-space coordinates are unzoomed page pixels with the origin at the
//! top-left of the page. The view renders a document point at
//! `origin + point * zoom`; [`to_document_space`] is the exact inverse.

use pagenote_doc_model::DocPoint;

/// Pointer position in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Screen-space bounding box of the element a page is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Box anchored at `(left, top)` whose size does not matter to the caller
    pub fn at(left: f64, top: f64) -> Self {
        Self { left, top, width: 0.0, height: 0.0 }
    }
}

/// Convert a pointer position into document space.
///
/// # Panics
///
/// `zoom` must be strictly positive; a zero or negative zoom is a caller bug.
pub fn to_document_space(pointer: ScreenPoint, origin: BoundingBox, zoom: f64) -> DocPoint {
    assert!(zoom > 0.0, "zoom must be positive, got {zoom}");
    DocPoint::new((pointer.x - origin.left) / zoom, (pointer.y - origin.top) / zoom)
}

/// Render a document point into screen space.
pub fn to_screen_space(point: DocPoint, origin: BoundingBox, zoom: f64) -> ScreenPoint {
    ScreenPoint::new(origin.left + point.x * zoom, origin.top + point.y * zoom)
}

/// Convert a screen-space displacement into a document-space one.
pub fn screen_delta_to_document(dx: f64, dy: f64, zoom: f64) -> (f64, f64) {
    assert!(zoom > 0.0, "zoom must be positive, got {zoom}");
    (dx / zoom, dy / zoom)
}
