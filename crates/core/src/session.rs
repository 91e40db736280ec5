//! Document session
//!
//! Aggregates one document, the annotation store, the zoom level and the
//! drag controllers of the rendered annotations. Every mutation goes to the
//! store first and then the visible list is re-read from it in full; the
//! session never patches its visible list in place.
//!
//! Failures are logged and returned to the caller. A failed operation leaves
//! the session exactly as it was.

use crate::config::{PagenoteConfig, ZoomPolicy};
use crate::draft::{AnnotationDraft, DraftError};
use crate::drag::{DragCommit, DragRouter, PressOutcome};
use crate::image_size::{ImageDimensionResolver, ImageFetcher};
use crate::source::{AnnotationPrompt, DocumentSource};
use crate::store::{AnnotationStore, StoreError};
use crate::transform::{to_document_space, BoundingBox, ScreenPoint};
use pagenote_doc_model::{
    Annotation, AnnotationId, AnnotationPatch, DocPoint, Document, DocumentError,
    DocumentWithAnnotations, NewAnnotation,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error("page {0} does not exist in the current document")]
    UnknownPage(u32),
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] DocumentError),
    #[error("document source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SessionError {
    fn from_source<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::Source(Box::new(error))
    }
}

/// Change notifications delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    DocumentLoaded { name: String, page_count: usize },
    AnnotationsChanged { count: usize },
    ZoomChanged { zoom: f64 },
    Saved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&SessionEvent)>;

pub struct DocumentSession<S, F> {
    source: S,
    resolver: ImageDimensionResolver<F>,
    config: PagenoteConfig,
    document: Option<Document>,
    store: AnnotationStore,
    /// Last list read from the store
    annotations: Vec<Annotation>,
    zoom: f64,
    drags: DragRouter,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<S: DocumentSource, F: ImageFetcher> DocumentSession<S, F> {
    pub fn new(source: S, fetcher: F, config: PagenoteConfig) -> Self {
        let zoom = ZoomPolicy::DEFAULT;
        Self {
            source,
            resolver: ImageDimensionResolver::new(fetcher),
            config,
            document: None,
            store: AnnotationStore::new(),
            annotations: Vec::new(),
            zoom,
            drags: DragRouter::new(),
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn config(&self) -> &PagenoteConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    // ---- loading -------------------------------------------------------

    /// Fetch the document and the annotation set.
    ///
    /// The two loads are independent: a failure in one does not prevent the
    /// other from being applied. The first failure is returned.
    ///
    /// Annotations placed on pages the document does not have are kept, and
    /// each is reported with a warning.
    pub async fn load(&mut self, document_id: &str) -> Result<(), SessionError> {
        let document = self.load_document(document_id).await;
        let annotations = self.load_annotations().await;
        for orphan in self.orphaned_annotations() {
            tracing::warn!(id = %orphan.id(), page = orphan.page_number(), "annotation refers to a missing page");
        }
        document.and(annotations)
    }

    pub async fn load_document(&mut self, document_id: &str) -> Result<(), SessionError> {
        let result = self
            .source
            .fetch_document(document_id)
            .await
            .map_err(SessionError::from_source)
            .and_then(|document| {
                document.validate()?;
                Ok(document)
            });

        match result {
            Ok(document) => {
                tracing::info!(id = document_id, name = %document.name, pages = document.page_count(), "document loaded");
                let event = SessionEvent::DocumentLoaded {
                    name: document.name.clone(),
                    page_count: document.page_count(),
                };
                self.document = Some(document);
                self.emit(&event);
                Ok(())
            }
            Err(error) => {
                tracing::error!(id = document_id, %error, "failed to load document");
                Err(error)
            }
        }
    }

    pub async fn load_annotations(&mut self) -> Result<(), SessionError> {
        let result = self
            .source
            .fetch_annotations()
            .await
            .map_err(SessionError::from_source)
            .and_then(|annotations| {
                AnnotationStore::from_annotations(annotations).map_err(SessionError::from)
            });

        match result {
            Ok(store) => {
                tracing::info!(count = store.len(), "annotations loaded");
                self.store = store;
                self.refresh();
                Ok(())
            }
            Err(error) => {
                tracing::error!(%error, "failed to load annotations");
                Err(error)
            }
        }
    }

    // ---- view state ----------------------------------------------------

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn has_document(&self) -> bool {
        self.document.is_some()
    }

    /// Visible annotations, as last read from the store
    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotations_on_page(&self, page_number: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|a| a.page_number() == page_number).collect()
    }

    /// Visible annotations whose page is not in the loaded document. Empty
    /// while no document is loaded.
    pub fn orphaned_annotations(&self) -> Vec<&Annotation> {
        let Some(document) = &self.document else {
            return Vec::new();
        };
        self.annotations.iter().filter(|a| !document.has_page(a.page_number())).collect()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Zoom for display, e.g. `125` for 1.25
    pub fn zoom_percentage(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }

    /// Step the zoom up. Returns `false`, leaving the zoom unchanged, when
    /// the step would pass the maximum.
    pub fn zoom_in(&mut self) -> bool {
        match self.config.zoom.step_in(self.zoom) {
            Some(zoom) => {
                self.set_zoom(zoom);
                true
            }
            None => {
                tracing::debug!(zoom = self.zoom, "zoom in rejected at maximum");
                false
            }
        }
    }

    pub fn zoom_out(&mut self) -> bool {
        match self.config.zoom.step_out(self.zoom) {
            Some(zoom) => {
                self.set_zoom(zoom);
                true
            }
            None => {
                tracing::debug!(zoom = self.zoom, "zoom out rejected at minimum");
                false
            }
        }
    }

    pub fn reset_zoom(&mut self) {
        self.set_zoom(ZoomPolicy::DEFAULT);
    }

    fn set_zoom(&mut self, zoom: f64) {
        if zoom != self.zoom {
            self.zoom = zoom;
            self.emit(&SessionEvent::ZoomChanged { zoom });
        }
    }

    // ---- annotation lifecycle ------------------------------------------

    pub fn add_annotation(&mut self, annotation: NewAnnotation) -> Result<Annotation, SessionError> {
        if let Err(error) = self.check_page(annotation.page_number) {
            tracing::error!(%error, "failed to add annotation");
            return Err(error);
        }

        let created = self.store.create(annotation);
        self.refresh();
        Ok(created)
    }

    /// Build a prompt result into an annotation and store it.
    pub async fn add_draft(
        &mut self,
        draft: AnnotationDraft,
        at: DocPoint,
        page_number: u32,
    ) -> Result<Annotation, SessionError> {
        if let Err(error) = self.check_page(page_number) {
            tracing::error!(%error, "failed to add annotation");
            return Err(error);
        }

        let kind = draft.type_name();
        match draft.build(at, page_number, &self.resolver, &self.config).await {
            Ok(annotation) => self.add_annotation(annotation),
            Err(error) => {
                tracing::error!(kind, %error, "failed to build annotation");
                Err(error.into())
            }
        }
    }

    /// Page click: map the pointer into document space, ask the prompt for
    /// a draft and add it. Dismissing the prompt adds nothing.
    pub async fn add_annotation_at_pointer<P: AnnotationPrompt>(
        &mut self,
        prompt: &P,
        pointer: ScreenPoint,
        page_origin: BoundingBox,
        page_number: u32,
    ) -> Result<Option<Annotation>, SessionError> {
        let at = to_document_space(pointer, page_origin, self.zoom);
        let Some(draft) = prompt.prompt(at, page_number).await else {
            tracing::debug!(page = page_number, "annotation prompt dismissed");
            return Ok(None);
        };

        self.add_draft(draft, at, page_number).await.map(Some)
    }

    pub fn update_annotation(
        &mut self,
        id: AnnotationId,
        patch: &AnnotationPatch,
    ) -> Result<Annotation, SessionError> {
        match self.store.update(id, patch) {
            Ok(updated) => {
                self.refresh();
                Ok(updated)
            }
            Err(error) => {
                tracing::error!(%id, %error, "failed to update annotation");
                Err(error.into())
            }
        }
    }

    pub fn delete_annotation(&mut self, id: AnnotationId) -> Result<bool, SessionError> {
        match self.store.delete(id) {
            Ok(deleted) => {
                self.refresh();
                Ok(deleted)
            }
            Err(error) => {
                tracing::error!(%id, %error, "failed to delete annotation");
                Err(error.into())
            }
        }
    }

    /// Hand the document and every annotation to the source.
    ///
    /// Returns `Ok(false)` without contacting the source when no document is
    /// loaded.
    pub async fn save_document(&mut self) -> Result<bool, SessionError> {
        let Some(document) = &self.document else {
            tracing::debug!("save skipped, no document loaded");
            return Ok(false);
        };

        let bundle = DocumentWithAnnotations { document: document.clone(), annotations: self.store.list() };
        match self.source.persist_document(&bundle).await {
            Ok(()) => {
                tracing::info!(name = %bundle.document.name, annotations = bundle.annotations.len(), "document saved");
                self.emit(&SessionEvent::Saved);
                Ok(true)
            }
            Err(error) => {
                let error = SessionError::from_source(error);
                tracing::error!(%error, "failed to save document");
                Err(error)
            }
        }
    }

    // ---- dragging ------------------------------------------------------

    pub fn press_annotation(&mut self, id: AnnotationId, at: ScreenPoint) -> PressOutcome {
        self.drags.press(id, at)
    }

    pub fn pointer_move(&mut self, at: ScreenPoint) {
        self.drags.pointer_move(at);
    }

    /// Frame tick; returns the transient positions that changed.
    pub fn frame(&mut self) -> Vec<(AnnotationId, DocPoint)> {
        self.drags.frame(self.zoom)
    }

    /// Global pointer release: commit every active drag to the store.
    pub fn pointer_release(&mut self) -> Result<Vec<Annotation>, SessionError> {
        let mut committed = Vec::new();
        let mut first_error = None;
        for commit in self.drags.release(self.zoom) {
            match self.commit_drag(commit) {
                Ok(annotation) => committed.push(annotation),
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(committed),
        }
    }

    pub fn commit_drag(&mut self, commit: DragCommit) -> Result<Annotation, SessionError> {
        let result = self.update_annotation(commit.annotation_id, &commit.patch());
        if result.is_err() {
            // Snap the view back to what the store holds.
            self.drags.sync(&self.annotations);
        }
        result
    }

    /// Where an annotation is drawn, including any in-progress drag
    pub fn drawn_position(&self, id: AnnotationId) -> Option<DocPoint> {
        self.drags.position(id)
    }

    pub fn drags(&self) -> &DragRouter {
        &self.drags
    }

    // ---- observers -----------------------------------------------------

    pub fn subscribe(&mut self, observer: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sub, _)| *sub != id);
        self.observers.len() != before
    }

    fn emit(&mut self, event: &SessionEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }

    fn refresh(&mut self) {
        self.annotations = self.store.list();
        self.drags.sync(&self.annotations);
        let count = self.annotations.len();
        self.emit(&SessionEvent::AnnotationsChanged { count });
    }

    fn check_page(&self, page_number: u32) -> Result<(), SessionError> {
        match &self.document {
            _ if page_number == 0 => Err(SessionError::UnknownPage(page_number)),
            Some(document) if !document.has_page(page_number) => {
                Err(SessionError::UnknownPage(page_number))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_size::FetchError;
    use pagenote_doc_model::{Dimensions, Page};
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, thiserror::Error)]
    #[error("source offline")]
    struct Offline;

    #[derive(Default)]
    struct MemorySource {
        document: Option<Document>,
        annotations: Option<Vec<Annotation>>,
        fail_persist: bool,
        persisted: RefCell<Vec<DocumentWithAnnotations>>,
    }

    impl DocumentSource for MemorySource {
        type Error = Offline;

        async fn fetch_document(&self, _id: &str) -> Result<Document, Offline> {
            self.document.clone().ok_or(Offline)
        }

        async fn fetch_annotations(&self) -> Result<Vec<Annotation>, Offline> {
            self.annotations.clone().ok_or(Offline)
        }

        async fn persist_document(&self, bundle: &DocumentWithAnnotations) -> Result<(), Offline> {
            if self.fail_persist {
                return Err(Offline);
            }
            self.persisted.borrow_mut().push(bundle.clone());
            Ok(())
        }
    }

    struct NoImages;

    impl ImageFetcher for NoImages {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            Err(FetchError::Http(format!("unreachable: {url}")))
        }
    }

    struct Answer(Option<AnnotationDraft>);

    impl AnnotationPrompt for Answer {
        async fn prompt(&self, _at: DocPoint, _page_number: u32) -> Option<AnnotationDraft> {
            self.0.clone()
        }
    }

    fn test_document() -> Document {
        let pages = (1..=5)
            .map(|number| Page { number, image_url: format!("pages/{number}.png") })
            .collect();
        Document::new("test doc", pages)
    }

    fn session_with(source: MemorySource) -> DocumentSession<MemorySource, NoImages> {
        DocumentSession::new(source, NoImages, PagenoteConfig::default())
    }

    fn loaded_session() -> DocumentSession<MemorySource, NoImages> {
        let mut session = session_with(MemorySource {
            document: Some(test_document()),
            annotations: Some(Vec::new()),
            ..Default::default()
        });
        pollster::block_on(session.load("1")).unwrap();
        session
    }

    fn hi() -> NewAnnotation {
        NewAnnotation::text("hi", DocPoint::new(10.0, 20.0), 1)
    }

    #[test]
    fn test_load_fetches_document_and_annotations() {
        let existing = hi().into_annotation(AnnotationId::new_v4());
        let mut session = session_with(MemorySource {
            document: Some(test_document()),
            annotations: Some(vec![existing.clone()]),
            ..Default::default()
        });
        assert!(!session.has_document());

        pollster::block_on(session.load("1")).unwrap();
        assert!(session.has_document());
        assert_eq!(session.document().unwrap().page_count(), 5);
        assert_eq!(session.annotations(), &[existing]);
    }

    #[test]
    fn test_document_failure_does_not_block_annotations() {
        let existing = hi().into_annotation(AnnotationId::new_v4());
        let mut session = session_with(MemorySource {
            document: None,
            annotations: Some(vec![existing]),
            ..Default::default()
        });

        let result = pollster::block_on(session.load("1"));
        assert!(matches!(result, Err(SessionError::Source(_))));
        assert!(!session.has_document());
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let page = Page { number: 1, image_url: "pages/1.png".into() };
        let mut session = session_with(MemorySource {
            document: Some(Document::new("dup", vec![page.clone(), page])),
            annotations: Some(Vec::new()),
            ..Default::default()
        });

        let result = pollster::block_on(session.load("1"));
        assert!(matches!(result, Err(SessionError::InvalidDocument(DocumentError::DuplicatePage(1)))));
        assert!(!session.has_document());
    }

    #[test]
    fn test_add_annotation_refreshes_list() {
        let mut session = loaded_session();
        let created = session.add_annotation(hi()).unwrap();

        assert_eq!(session.annotations().len(), 1);
        assert_eq!(session.annotations()[0].id(), created.id());
        assert_eq!(session.annotations()[0].content(), "hi");
        assert_eq!(session.annotations()[0].position(), DocPoint::new(10.0, 20.0));
    }

    #[test]
    fn test_add_annotation_on_missing_page_is_rejected() {
        let mut session = loaded_session();
        let result = session.add_annotation(NewAnnotation::text("x", DocPoint::default(), 9));

        assert!(matches!(result, Err(SessionError::UnknownPage(9))));
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn test_update_and_delete() {
        let mut session = loaded_session();
        let created = session.add_annotation(hi()).unwrap();

        let updated = session.update_annotation(created.id(), &AnnotationPatch::content("bye")).unwrap();
        assert_eq!(updated.content(), "bye");
        assert_eq!(session.annotations()[0].content(), "bye");

        assert!(session.delete_annotation(created.id()).unwrap());
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn test_failed_update_leaves_state_unchanged() {
        let mut session = loaded_session();
        session.add_annotation(hi()).unwrap();
        let before = session.annotations().to_vec();

        let missing = AnnotationId::new_v4();
        let result = session.update_annotation(missing, &AnnotationPatch::content("x"));
        assert!(matches!(result, Err(SessionError::Store(StoreError::NotFound(id))) if id == missing));
        assert_eq!(session.annotations(), before.as_slice());

        let result = session.delete_annotation(missing);
        assert!(matches!(result, Err(SessionError::Store(StoreError::NotFound(_)))));
        assert_eq!(session.annotations(), before.as_slice());
    }

    #[test]
    fn test_annotations_on_page() {
        let mut session = loaded_session();
        session.add_annotation(hi()).unwrap();
        session.add_annotation(NewAnnotation::text("p2", DocPoint::default(), 2)).unwrap();

        assert_eq!(session.annotations_on_page(2).len(), 1);
        assert_eq!(session.annotations_on_page(2)[0].content(), "p2");
        assert!(session.annotations_on_page(3).is_empty());
    }

    #[test]
    fn test_zoom_steps_and_bounds() {
        let mut session = loaded_session();
        assert_eq!(session.zoom(), 1.0);
        assert_eq!(session.zoom_percentage(), 100);

        assert!(session.zoom_in());
        assert_eq!(session.zoom(), 1.25);
        assert_eq!(session.zoom_percentage(), 125);

        while session.zoom_in() {}
        assert_eq!(session.zoom(), 4.0);
        assert!(!session.zoom_in());

        while session.zoom_out() {}
        assert_eq!(session.zoom(), 0.25);
        assert!(!session.zoom_out());

        session.reset_zoom();
        assert_eq!(session.zoom(), 1.0);
    }

    #[test]
    fn test_reset_zoom_ignores_configured_step() {
        let config = PagenoteConfig::from_toml("[zoom]\nstep = 0.5\n").unwrap();
        let mut session = DocumentSession::new(MemorySource::default(), NoImages, config);
        assert_eq!(session.zoom(), 1.0);

        while session.zoom_in() {}
        assert_eq!(session.zoom(), 4.0);
        while session.zoom_out() {}
        assert!(session.zoom() >= 0.25);

        session.reset_zoom();
        assert_eq!(session.zoom(), 1.0);
    }

    #[test]
    fn test_annotations_on_missing_pages_are_reported() {
        let kept = hi().into_annotation(AnnotationId::new_v4());
        let orphan = NewAnnotation::text("lost", DocPoint::default(), 9).into_annotation(AnnotationId::new_v4());
        let mut session = session_with(MemorySource {
            document: Some(test_document()),
            annotations: Some(vec![kept, orphan.clone()]),
            ..Default::default()
        });
        assert!(session.orphaned_annotations().is_empty());

        pollster::block_on(session.load("1")).unwrap();
        assert_eq!(session.annotations().len(), 2);
        assert_eq!(session.orphaned_annotations(), vec![&orphan]);
    }

    #[test]
    fn test_save_without_document_is_noop() {
        let mut session = session_with(MemorySource::default());
        assert!(!pollster::block_on(session.save_document()).unwrap());
        assert!(session.source().persisted.borrow().is_empty());
    }

    #[test]
    fn test_save_bundles_document_and_annotations() {
        let mut session = loaded_session();
        let created = session.add_annotation(hi()).unwrap();

        assert!(pollster::block_on(session.save_document()).unwrap());
        let persisted = session.source().persisted.borrow();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].document.name, "test doc");
        assert_eq!(persisted[0].annotations, vec![created]);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let mut session = session_with(MemorySource {
            document: Some(test_document()),
            annotations: Some(Vec::new()),
            fail_persist: true,
            ..Default::default()
        });
        pollster::block_on(session.load("1")).unwrap();

        assert!(matches!(pollster::block_on(session.save_document()), Err(SessionError::Source(_))));
    }

    #[test]
    fn test_add_at_pointer_uses_zoomed_page_coordinates() {
        let mut session = loaded_session();
        session.zoom_in();
        session.zoom_in();
        session.zoom_in();
        session.zoom_in();
        assert_eq!(session.zoom(), 2.0);

        let prompt = Answer(Some(AnnotationDraft::Text("note".into())));
        let created = pollster::block_on(session.add_annotation_at_pointer(
            &prompt,
            ScreenPoint::new(140.0, 90.0),
            BoundingBox::at(100.0, 50.0),
            3,
        ))
        .unwrap()
        .expect("prompt answered");

        assert_eq!(created.position(), DocPoint::new(20.0, 20.0));
        assert_eq!(created.page_number(), 3);
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn test_dismissed_prompt_adds_nothing() {
        let mut session = loaded_session();
        let result = pollster::block_on(session.add_annotation_at_pointer(
            &Answer(None),
            ScreenPoint::new(1.0, 1.0),
            BoundingBox::default(),
            1,
        ));

        assert!(matches!(result, Ok(None)));
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn test_image_draft_with_unreachable_url_uses_fallback() {
        let mut session = loaded_session();
        let created = pollster::block_on(session.add_draft(
            AnnotationDraft::ImageUrl("https://img/missing.png".into()),
            DocPoint::new(1.0, 1.0),
            1,
        ))
        .unwrap();

        assert_eq!(created.size(), Some(Dimensions::new(128, 128)));
    }

    #[test]
    fn test_invalid_draft_is_rejected() {
        let mut session = loaded_session();
        let result = pollster::block_on(session.add_draft(
            AnnotationDraft::Text("   ".into()),
            DocPoint::default(),
            1,
        ));

        assert!(matches!(result, Err(SessionError::Draft(DraftError::EmptyText))));
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn test_drag_commits_through_store() {
        let mut session = loaded_session();
        let created = session.add_annotation(NewAnnotation::text("drag", DocPoint::new(5.0, 5.0), 1)).unwrap();
        session.zoom_in();
        session.zoom_in();
        session.zoom_in();
        session.zoom_in();

        assert_eq!(session.press_annotation(created.id(), ScreenPoint::new(100.0, 100.0)), PressOutcome::Captured);
        session.pointer_move(ScreenPoint::new(110.0, 100.0));
        assert_eq!(session.frame(), vec![(created.id(), DocPoint::new(10.0, 5.0))]);
        session.pointer_move(ScreenPoint::new(130.0, 100.0));
        assert_eq!(session.frame(), vec![(created.id(), DocPoint::new(20.0, 5.0))]);

        // Nothing written until release.
        assert_eq!(session.annotations()[0].position(), DocPoint::new(5.0, 5.0));

        let committed = session.pointer_release().unwrap();
        assert_eq!(committed.len(), 1);
        assert_eq!(session.annotations()[0].position(), DocPoint::new(20.0, 5.0));
        assert_eq!(session.drawn_position(created.id()), Some(DocPoint::new(20.0, 5.0)));
        assert_eq!(session.drags().active_listeners(), 0);
    }

    #[test]
    fn test_deleting_mid_drag_cancels_without_commit() {
        let mut session = loaded_session();
        let created = session.add_annotation(hi()).unwrap();

        session.press_annotation(created.id(), ScreenPoint::new(0.0, 0.0));
        session.pointer_move(ScreenPoint::new(50.0, 50.0));
        session.delete_annotation(created.id()).unwrap();

        assert_eq!(session.drags().active_listeners(), 0);
        assert!(session.pointer_release().unwrap().is_empty());
    }

    #[test]
    fn test_subscribers_see_events() {
        let mut session = session_with(MemorySource {
            document: Some(test_document()),
            annotations: Some(Vec::new()),
            ..Default::default()
        });
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let id = session.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        pollster::block_on(session.load("1")).unwrap();
        session.add_annotation(hi()).unwrap();
        session.zoom_in();
        session.zoom_in();
        session.reset_zoom();
        session.reset_zoom();
        pollster::block_on(session.save_document()).unwrap();

        assert_eq!(
            *events.borrow(),
            vec![
                SessionEvent::DocumentLoaded { name: "test doc".into(), page_count: 5 },
                SessionEvent::AnnotationsChanged { count: 0 },
                SessionEvent::AnnotationsChanged { count: 1 },
                SessionEvent::ZoomChanged { zoom: 1.25 },
                SessionEvent::ZoomChanged { zoom: 1.5 },
                SessionEvent::ZoomChanged { zoom: 1.0 },
                SessionEvent::Saved,
            ]
        );

        assert!(session.unsubscribe(id));
        session.zoom_in();
        assert_eq!(events.borrow().len(), 7);
    }

    proptest! {
        #[test]
        fn prop_zoom_stays_in_bounds(steps in proptest::collection::vec(any::<bool>(), 0..64)) {
            let mut session = session_with(MemorySource::default());
            for step_in in steps {
                if step_in {
                    session.zoom_in();
                } else {
                    session.zoom_out();
                }
                prop_assert!((0.25..=4.0).contains(&session.zoom()));
            }
            session.reset_zoom();
            prop_assert_eq!(session.zoom(), 1.0);
        }
    }
}
