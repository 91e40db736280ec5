//! Annotation store
//!
//! Owns the canonical annotation set for a session. Records keep their
//! insertion order; updates never reorder. Every operation scans and mutates
//! in one synchronous step, so readers only ever see fully applied states.

use pagenote_doc_model::{Annotation, AnnotationId, AnnotationPatch, NewAnnotation, PatchError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("annotation with id {0} not found")]
    NotFound(AnnotationId),
    #[error("annotation id {0} appears more than once")]
    DuplicateId(AnnotationId),
    #[error("cannot apply patch to annotation {id}: {source}")]
    IncompatiblePatch {
        id: AnnotationId,
        #[source]
        source: PatchError,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// In-memory annotation collection with store-assigned identities
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with previously persisted annotations.
    ///
    /// Rejects the whole set if two records share an id.
    pub fn from_annotations(annotations: Vec<Annotation>) -> StoreResult<Self> {
        let mut store = Self::new();
        for annotation in annotations {
            if store.contains(annotation.id()) {
                return Err(StoreError::DuplicateId(annotation.id()));
            }
            store.annotations.push(annotation);
        }
        Ok(store)
    }

    /// Store a new annotation under a fresh id and return the stored record.
    pub fn create(&mut self, annotation: NewAnnotation) -> Annotation {
        let mut id = AnnotationId::new_v4();
        while self.contains(id) {
            id = AnnotationId::new_v4();
        }

        let stored = annotation.into_annotation(id);
        tracing::debug!(%id, kind = stored.kind().type_name(), page = stored.page_number(), "annotation created");
        self.annotations.push(stored.clone());
        stored
    }

    /// Snapshot of every record in insertion order.
    pub fn list(&self) -> Vec<Annotation> {
        self.annotations.clone()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    pub fn contains(&self, id: AnnotationId) -> bool {
        self.get(id).is_some()
    }

    /// Records on one page, in insertion order.
    pub fn on_page(&self, page_number: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.page_number() == page_number).collect()
    }

    /// Merge `patch` into the record with `id` and return the updated record.
    pub fn update(&mut self, id: AnnotationId, patch: &AnnotationPatch) -> StoreResult<Annotation> {
        let annotation = self
            .annotations
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or(StoreError::NotFound(id))?;

        annotation
            .apply(patch)
            .map_err(|source| StoreError::IncompatiblePatch { id, source })?;
        tracing::debug!(%id, ?patch, "annotation updated");
        Ok(annotation.clone())
    }

    /// Remove the record with `id`.
    pub fn delete(&mut self, id: AnnotationId) -> StoreResult<bool> {
        let index = self
            .annotations
            .iter()
            .position(|a| a.id() == id)
            .ok_or(StoreError::NotFound(id))?;

        self.annotations.remove(index);
        tracing::debug!(%id, "annotation deleted");
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagenote_doc_model::{Dimensions, DocPoint};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn text(content: &str, x: f64, y: f64, page: u32) -> NewAnnotation {
        NewAnnotation::text(content, DocPoint::new(x, y), page)
    }

    #[test]
    fn test_create_then_list() {
        let mut store = AnnotationStore::new();
        let created = store.create(text("hi", 10.0, 20.0, 1));

        let listed = store.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), created.id());
        assert_eq!(listed[0].content(), "hi");
        assert_eq!(listed[0].position(), DocPoint::new(10.0, 20.0));
        assert_eq!(listed[0].page_number(), 1);
    }

    #[test]
    fn test_list_is_a_snapshot() {
        let mut store = AnnotationStore::new();
        store.create(text("a", 0.0, 0.0, 1));
        let snapshot = store.list();

        store.create(text("b", 0.0, 0.0, 1));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_update_keeps_insertion_order() {
        let mut store = AnnotationStore::new();
        let first = store.create(text("first", 0.0, 0.0, 1));
        let second = store.create(text("second", 0.0, 0.0, 1));

        store.update(first.id(), &AnnotationPatch::position(DocPoint::new(50.0, 60.0))).unwrap();

        let ids: Vec<_> = store.list().iter().map(Annotation::id).collect();
        assert_eq!(ids, vec![first.id(), second.id()]);
        assert_eq!(store.get(first.id()).unwrap().position(), DocPoint::new(50.0, 60.0));
    }

    #[test]
    fn test_update_merges_fields() {
        let mut store = AnnotationStore::new();
        let image = store.create(NewAnnotation::image(
            "https://img/a.png",
            Dimensions::new(300, 100),
            DocPoint::new(1.0, 2.0),
            3,
        ));

        let updated = store.update(image.id(), &AnnotationPatch::content("https://img/b.png")).unwrap();
        assert_eq!(updated.content(), "https://img/b.png");
        assert_eq!(updated.position(), DocPoint::new(1.0, 2.0));
        assert_eq!(updated.size(), Some(Dimensions::new(300, 100)));
        assert_eq!(updated.page_number(), 3);
    }

    #[test]
    fn test_empty_patch_leaves_record_unchanged() {
        let mut store = AnnotationStore::new();
        let created = store.create(text("same", 3.0, 4.0, 2));

        let updated = store.update(created.id(), &AnnotationPatch::default()).unwrap();
        assert_eq!(updated, created);
    }

    #[test]
    fn test_update_missing_id() {
        let mut store = AnnotationStore::new();
        let id = AnnotationId::new_v4();
        assert_eq!(
            store.update(id, &AnnotationPatch::content("x")),
            Err(StoreError::NotFound(id))
        );
    }

    #[test]
    fn test_incompatible_patch_is_rejected() {
        let mut store = AnnotationStore::new();
        let created = store.create(text("note", 0.0, 0.0, 1));
        let patch = AnnotationPatch { size: Some(Dimensions::new(5, 5)), ..Default::default() };

        let result = store.update(created.id(), &patch);
        assert!(matches!(result, Err(StoreError::IncompatiblePatch { .. })));
        assert_eq!(store.get(created.id()), Some(&created));
    }

    #[test]
    fn test_delete_twice_fails_second_time() {
        let mut store = AnnotationStore::new();
        let created = store.create(text("bye", 0.0, 0.0, 1));

        assert_eq!(store.delete(created.id()), Ok(true));
        assert_eq!(store.delete(created.id()), Err(StoreError::NotFound(created.id())));
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_removes_exactly_one() {
        let mut store = AnnotationStore::new();
        let a = store.create(text("a", 0.0, 0.0, 1));
        let b = store.create(text("b", 0.0, 0.0, 1));
        let c = store.create(text("c", 0.0, 0.0, 1));

        store.delete(b.id()).unwrap();
        let ids: Vec<_> = store.list().iter().map(Annotation::id).collect();
        assert_eq!(ids, vec![a.id(), c.id()]);
    }

    #[test]
    fn test_on_page_filters() {
        let mut store = AnnotationStore::new();
        store.create(text("p1", 0.0, 0.0, 1));
        store.create(text("p2", 0.0, 0.0, 2));
        store.create(text("p1 again", 0.0, 0.0, 1));

        let contents: Vec<_> = store.on_page(1).iter().map(|a| a.content()).collect();
        assert_eq!(contents, vec!["p1", "p1 again"]);
        assert!(store.on_page(9).is_empty());
    }

    #[test]
    fn test_from_annotations_rejects_duplicates() {
        let id = AnnotationId::new_v4();
        let a = text("a", 0.0, 0.0, 1).into_annotation(id);
        let b = text("b", 0.0, 0.0, 1).into_annotation(id);

        assert_eq!(AnnotationStore::from_annotations(vec![a, b]).err(), Some(StoreError::DuplicateId(id)));
    }

    #[test]
    fn test_from_annotations_preserves_ids_and_order() {
        let a = text("a", 0.0, 0.0, 1).into_annotation(AnnotationId::new_v4());
        let b = text("b", 0.0, 0.0, 2).into_annotation(AnnotationId::new_v4());

        let store = AnnotationStore::from_annotations(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(store.list(), vec![a, b]);
    }

    proptest! {
        #[test]
        fn prop_created_ids_are_distinct(count in 1usize..200) {
            let mut store = AnnotationStore::new();
            let ids: HashSet<_> = (0..count)
                .map(|i| store.create(text(&i.to_string(), 0.0, 0.0, 1)).id())
                .collect();
            prop_assert_eq!(ids.len(), count);
            prop_assert_eq!(store.len(), count);
        }
    }
}
