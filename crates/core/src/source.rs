//! Collaborators the session talks to but does not own.

use crate::draft::AnnotationDraft;
use pagenote_doc_model::{Annotation, DocPoint, Document, DocumentWithAnnotations};
use std::future::Future;

/// Where documents and their annotations come from and go back to.
pub trait DocumentSource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_document(&self, id: &str) -> impl Future<Output = Result<Document, Self::Error>>;

    fn fetch_annotations(&self) -> impl Future<Output = Result<Vec<Annotation>, Self::Error>>;

    fn persist_document(
        &self,
        bundle: &DocumentWithAnnotations,
    ) -> impl Future<Output = Result<(), Self::Error>>;
}

/// The "new annotation" dialog.
///
/// Resolves to `None` when the user dismisses it.
pub trait AnnotationPrompt {
    fn prompt(&self, at: DocPoint, page_number: u32) -> impl Future<Output = Option<AnnotationDraft>>;
}
