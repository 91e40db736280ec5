use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Stable identifier assigned by the annotation store. Never reassigned.
pub type AnnotationId = uuid::Uuid;

/// Position in unzoomed page pixels, origin at the top-left of the page.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// What an annotation shows. Only images carry a display size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Text { content: String },
    Image { content: String, width: u32, height: u32 },
}

impl AnnotationKind {
    pub fn image(content: impl Into<String>, size: Dimensions) -> Self {
        Self::Image { content: content.into(), width: size.width, height: size.height }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text { content: content.into() }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Text { content } | Self::Image { content, .. } => content,
        }
    }

    pub fn size(&self) -> Option<Dimensions> {
        match self {
            Self::Text { .. } => None,
            Self::Image { width, height, .. } => Some(Dimensions::new(*width, *height)),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
        }
    }
}

/// An annotation payload that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotation {
    #[serde(flatten)]
    pub kind: AnnotationKind,
    pub x: f64,
    pub y: f64,
    pub page_number: u32,
}

impl NewAnnotation {
    pub fn text(content: impl Into<String>, at: DocPoint, page_number: u32) -> Self {
        Self { kind: AnnotationKind::text(content), x: at.x, y: at.y, page_number }
    }

    pub fn image(
        content: impl Into<String>,
        size: Dimensions,
        at: DocPoint,
        page_number: u32,
    ) -> Self {
        Self { kind: AnnotationKind::image(content, size), x: at.x, y: at.y, page_number }
    }

    pub fn position(&self) -> DocPoint {
        DocPoint::new(self.x, self.y)
    }

    pub fn into_annotation(self, id: AnnotationId) -> Annotation {
        Annotation { id, kind: self.kind, x: self.x, y: self.y, page_number: self.page_number }
    }
}

/// A stored annotation.
///
/// Fields are private so that the id and page stay fixed for the record's
/// lifetime; edits go through [`Annotation::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    id: AnnotationId,
    #[serde(flatten)]
    kind: AnnotationKind,
    x: f64,
    y: f64,
    page_number: u32,
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn kind(&self) -> &AnnotationKind {
        &self.kind
    }

    pub fn content(&self) -> &str {
        self.kind.content()
    }

    pub fn size(&self) -> Option<Dimensions> {
        self.kind.size()
    }

    pub fn position(&self) -> DocPoint {
        DocPoint::new(self.x, self.y)
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// Merge `patch` into this record field by field.
    ///
    /// The record is left untouched when the patch is rejected.
    pub fn apply(&mut self, patch: &AnnotationPatch) -> Result<(), PatchError> {
        if patch.size.is_some() && matches!(self.kind, AnnotationKind::Text { .. }) {
            return Err(PatchError::SizeOnText);
        }

        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        match &mut self.kind {
            AnnotationKind::Text { content } => {
                if let Some(new_content) = &patch.content {
                    content.clone_from(new_content);
                }
            }
            AnnotationKind::Image { content, width, height } => {
                if let Some(new_content) = &patch.content {
                    content.clone_from(new_content);
                }
                if let Some(size) = patch.size {
                    *width = size.width;
                    *height = size.height;
                }
            }
        }
        Ok(())
    }
}

/// Partial update. `None` fields are retained from the stored record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnnotationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(flatten)]
    pub size: Option<Dimensions>,
}

impl AnnotationPatch {
    pub fn position(at: DocPoint) -> Self {
        Self { x: Some(at.x), y: Some(at.y), ..Self::default() }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.x.is_none() && self.y.is_none() && self.size.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("text annotations have no display size")]
    SizeOnText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub number: u32,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn new(name: impl Into<String>, pages: Vec<Page>) -> Self {
        Self { name: name.into(), pages }
    }

    pub fn page(&self, number: u32) -> Option<&Page> {
        self.pages.iter().find(|page| page.number == number)
    }

    pub fn has_page(&self, number: u32) -> bool {
        self.page(number).is_some()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Page numbers must be 1-based, unique and listed in ascending order.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let mut seen = BTreeSet::new();
        let mut previous = 0;
        for page in &self.pages {
            if page.number == 0 {
                return Err(DocumentError::ZeroPageNumber);
            }
            if !seen.insert(page.number) {
                return Err(DocumentError::DuplicatePage(page.number));
            }
            if page.number < previous {
                return Err(DocumentError::OutOfOrder(page.number));
            }
            previous = page.number;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("page numbers are 1-based")]
    ZeroPageNumber,
    #[error("page {0} appears more than once")]
    DuplicatePage(u32),
    #[error("page {0} is out of order")]
    OutOfOrder(u32),
}

/// The bundle handed to the persistence collaborator on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentWithAnnotations {
    pub document: Document,
    pub annotations: Vec<Annotation>,
}
