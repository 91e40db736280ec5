use crate::StorageError;
use pagenote_core::DocumentSource;
use pagenote_doc_model::{Annotation, Document, DocumentWithAnnotations};
use std::cell::RefCell;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct State {
    documents: HashMap<String, Document>,
    annotations: Vec<Annotation>,
    saves: usize,
}

/// Source that keeps everything in memory.
///
/// A persisted bundle replaces the stored annotation set, so a later
/// `fetch_annotations` sees what was saved.
#[derive(Debug, Default)]
pub struct InMemorySource {
    state: RefCell<State>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, id: impl Into<String>, document: Document) -> Self {
        self.state.borrow_mut().documents.insert(id.into(), document);
        self
    }

    pub fn annotations(&self) -> Vec<Annotation> {
        self.state.borrow().annotations.clone()
    }

    pub fn save_count(&self) -> usize {
        self.state.borrow().saves
    }
}

impl DocumentSource for InMemorySource {
    type Error = StorageError;

    async fn fetch_document(&self, id: &str) -> Result<Document, StorageError> {
        self.state
            .borrow()
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::UnknownDocument(id.to_string()))
    }

    async fn fetch_annotations(&self) -> Result<Vec<Annotation>, StorageError> {
        Ok(self.annotations())
    }

    async fn persist_document(&self, bundle: &DocumentWithAnnotations) -> Result<(), StorageError> {
        let mut state = self.state.borrow_mut();
        let id = state
            .documents
            .iter()
            .find(|(_, document)| document.name == bundle.document.name)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| StorageError::UnknownDocument(bundle.document.name.clone()))?;

        state.documents.insert(id, bundle.document.clone());
        state.annotations = bundle.annotations.clone();
        state.saves += 1;
        Ok(())
    }
}
