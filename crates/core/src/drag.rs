//! Annotation drag handling
//!
//! Each rendered annotation owns a [`DragController`], a two-state machine:
//!
//! - `Idle → Dragging` on a press over the annotation. The press position and
//!   the annotation's committed position become the drag's reference origin.
//! - `Dragging → Dragging` on pointer moves. Moves are coalesced so that at
//!   most one is processed per frame; each processed move sets a transient,
//!   visual-only position of `origin + (move - press) / zoom`.
//! - `Dragging → Idle` on release anywhere. The last transient position is
//!   returned as a [`DragCommit`] for the caller to write to the store.
//!
//! [`DragRouter`] plays the role of the document-level listeners: while a
//! drag is active it holds a cancellation token for it and forwards global
//! moves and releases. Tearing a controller down cancels its token, so a
//! drag interrupted that way never commits.

use crate::transform::{screen_delta_to_document, ScreenPoint};
use pagenote_doc_model::{Annotation, AnnotationId, AnnotationPatch, DocPoint};
use pagenote_scheduler::{CancellationRegistry, CancellationToken, FrameCoalescer};
use std::collections::HashMap;

/// Public view of a controller's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging,
}

/// How the host must treat the press event it just delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOutcome {
    /// A drag started. Stop propagation (so the page does not open its
    /// "add annotation" flow) and prevent the default action.
    Captured,
    /// The press was not accepted and should propagate normally.
    Ignored,
}

impl PressOutcome {
    pub fn stop_propagation(self) -> bool {
        self == Self::Captured
    }

    pub fn prevent_default(self) -> bool {
        self == Self::Captured
    }
}

/// The single store write that finishes a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragCommit {
    pub annotation_id: AnnotationId,
    pub position: DocPoint,
}

impl DragCommit {
    /// Only `x`/`y` are written; everything else is retained.
    pub fn patch(&self) -> AnnotationPatch {
        AnnotationPatch::position(self.position)
    }
}

#[derive(Debug)]
struct ActiveDrag {
    press: ScreenPoint,
    origin: DocPoint,
    transient: DocPoint,
    moves: FrameCoalescer<ScreenPoint>,
    listener: CancellationToken,
}

impl ActiveDrag {
    fn process(&mut self, at: ScreenPoint, zoom: f64) -> DocPoint {
        let (dx, dy) = screen_delta_to_document(at.x - self.press.x, at.y - self.press.y, zoom);
        self.transient = self.origin.offset(dx, dy);
        self.transient
    }
}

/// Drag state machine for one annotation
#[derive(Debug)]
pub struct DragController {
    annotation_id: AnnotationId,
    /// Position last reported by the store
    committed: DocPoint,
    /// Position the view should draw
    display: DocPoint,
    active: Option<ActiveDrag>,
}

impl DragController {
    pub fn new(annotation: &Annotation) -> Self {
        let position = annotation.position();
        Self { annotation_id: annotation.id(), committed: position, display: position, active: None }
    }

    pub fn annotation_id(&self) -> AnnotationId {
        self.annotation_id
    }

    /// Take a fresh copy of the annotation from the store.
    ///
    /// The drawn position follows the store only while idle; an in-progress
    /// drag keeps showing its transient position.
    pub fn sync(&mut self, annotation: &Annotation) {
        debug_assert_eq!(annotation.id(), self.annotation_id);
        self.committed = annotation.position();
        if self.active.is_none() {
            self.display = self.committed;
        }
    }

    pub fn state(&self) -> DragState {
        if self.active.is_some() {
            DragState::Dragging
        } else {
            DragState::Idle
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Where the annotation should be drawn, in document space
    pub fn position(&self) -> DocPoint {
        self.display
    }

    /// Press on the annotation's surface. Only accepted while idle.
    ///
    /// `listener` scopes the drag's global listeners; cancelling it abandons
    /// the drag without a commit.
    pub fn press(&mut self, at: ScreenPoint, listener: CancellationToken) -> PressOutcome {
        if self.active.is_some() {
            return PressOutcome::Ignored;
        }

        tracing::debug!(id = %self.annotation_id, x = at.x, y = at.y, "drag started");
        self.active = Some(ActiveDrag {
            press: at,
            origin: self.committed,
            transient: self.committed,
            moves: FrameCoalescer::new(),
            listener,
        });
        PressOutcome::Captured
    }

    /// Pointer moved while the button is held. Buffered until the next frame.
    pub fn pointer_move(&mut self, at: ScreenPoint) {
        if self.abandon_if_cancelled() {
            return;
        }
        if let Some(drag) = &mut self.active {
            drag.moves.push(at);
        }
    }

    /// Frame boundary: process the latest buffered move, if any, and return
    /// the new transient position.
    pub fn frame(&mut self, zoom: f64) -> Option<DocPoint> {
        if self.abandon_if_cancelled() {
            return None;
        }
        let drag = self.active.as_mut()?;
        let at = drag.moves.tick()?;
        let position = drag.process(at, zoom);
        self.display = position;
        Some(position)
    }

    /// Pointer released anywhere. Ends the drag and returns the commit.
    ///
    /// A move still waiting for its frame is processed first so the commit
    /// reflects the last pointer position. Returns `None` when no drag is
    /// active or the drag was cancelled.
    pub fn release(&mut self, zoom: f64) -> Option<DragCommit> {
        if self.abandon_if_cancelled() {
            return None;
        }
        let Some(mut drag) = self.active.take() else {
            tracing::debug!(id = %self.annotation_id, "release without an active press ignored");
            return None;
        };

        if let Some(at) = drag.moves.tick() {
            drag.process(at, zoom);
        }
        self.display = drag.transient;

        tracing::debug!(
            id = %self.annotation_id,
            x = drag.transient.x,
            y = drag.transient.y,
            coalesced_moves = drag.moves.dropped(),
            "drag committed"
        );
        Some(DragCommit { annotation_id: self.annotation_id, position: drag.transient })
    }

    /// Tear the drag down without committing; the view snaps back to the
    /// committed position.
    pub fn cancel(&mut self) {
        if let Some(drag) = self.active.take() {
            drag.listener.cancel();
            self.display = self.committed;
            tracing::debug!(id = %self.annotation_id, "drag cancelled");
        }
    }

    fn abandon_if_cancelled(&mut self) -> bool {
        let cancelled = self.active.as_ref().is_some_and(|drag| drag.listener.is_cancelled());
        if cancelled {
            self.cancel();
        }
        cancelled
    }
}

/// Routes pointer input to the drag controllers of the rendered annotations.
///
/// Presses target one annotation; moves, frames and releases are global and
/// reach every controller whose listener is live.
#[derive(Debug, Default)]
pub struct DragRouter {
    controllers: HashMap<AnnotationId, DragController>,
    listeners: CancellationRegistry<AnnotationId>,
}

impl DragRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile controllers with the current annotation list: create new
    /// ones, refresh existing ones and tear down those whose annotation is gone.
    pub fn sync(&mut self, annotations: &[Annotation]) {
        let removed: Vec<AnnotationId> = self
            .controllers
            .keys()
            .filter(|id| !annotations.iter().any(|a| a.id() == **id))
            .copied()
            .collect();
        for id in removed {
            self.teardown(id);
        }

        for annotation in annotations {
            self.controllers
                .entry(annotation.id())
                .and_modify(|controller| controller.sync(annotation))
                .or_insert_with(|| DragController::new(annotation));
        }
    }

    pub fn press(&mut self, id: AnnotationId, at: ScreenPoint) -> PressOutcome {
        let Some(controller) = self.controllers.get_mut(&id) else {
            return PressOutcome::Ignored;
        };
        if controller.is_dragging() {
            return PressOutcome::Ignored;
        }

        let token = self.listeners.register(id);
        controller.press(at, token)
    }

    pub fn pointer_move(&mut self, at: ScreenPoint) {
        for controller in self.listening_mut() {
            controller.pointer_move(at);
        }
    }

    /// Process one frame; returns the transient positions that changed.
    pub fn frame(&mut self, zoom: f64) -> Vec<(AnnotationId, DocPoint)> {
        self.listening_mut()
            .filter_map(|controller| {
                controller.frame(zoom).map(|position| (controller.annotation_id(), position))
            })
            .collect()
    }

    /// Global release: every active drag commits and its listener is released.
    pub fn release(&mut self, zoom: f64) -> Vec<DragCommit> {
        let active: Vec<AnnotationId> = self.listeners_ids();
        let mut commits = Vec::new();
        for id in active {
            self.listeners.unregister(&id);
            if let Some(commit) = self.controllers.get_mut(&id).and_then(|c| c.release(zoom)) {
                commits.push(commit);
            }
        }
        commits
    }

    /// The annotation's view went away: drop its listener and controller.
    pub fn teardown(&mut self, id: AnnotationId) {
        self.listeners.cancel(&id);
        if let Some(mut controller) = self.controllers.remove(&id) {
            controller.cancel();
        }
    }

    /// Tear down every controller.
    pub fn clear(&mut self) {
        self.listeners.cancel_all();
        for (_, mut controller) in self.controllers.drain() {
            controller.cancel();
        }
    }

    pub fn position(&self, id: AnnotationId) -> Option<DocPoint> {
        self.controllers.get(&id).map(DragController::position)
    }

    pub fn state(&self, id: AnnotationId) -> Option<DragState> {
        self.controllers.get(&id).map(DragController::state)
    }

    /// Number of drags currently holding global listeners
    pub fn active_listeners(&self) -> usize {
        self.listeners.len()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    fn listeners_ids(&self) -> Vec<AnnotationId> {
        self.controllers.keys().filter(|id| self.listeners.contains(id)).copied().collect()
    }

    fn listening_mut(&mut self) -> impl Iterator<Item = &mut DragController> {
        let listeners = &self.listeners;
        self.controllers.values_mut().filter(move |c| listeners.contains(&c.annotation_id()))
    }
}
