//! The editing session: gestures, selection, and host synchronization.
//!
//! An [`EditorSession`] is the single entry point a host page talks to. It
//! owns the graph model, the pool layout, the palette, and the current
//! selection, and it translates user gestures into model transactions. No
//! other layer opens transactions on its own behalf.
//!
//! # Architecture
//!
//! - Every gesture is one branch: consult the validator, open a
//!   transaction, mutate, commit. A rejected gesture commits nothing.
//! - Constraint rejections are interactive feedback ([`DragFeedback`],
//!   [`DropOutcome`], silent link discards), never errors.
//! - Drags run through a small state machine. While a drag is in flight
//!   the pointer position lives in the session, not in the model; the
//!   model changes only when the drop commits.
//! - After a committing gesture the layout pass re-runs, and the document
//!   sync observer pushes a fresh snapshot to the [`Host`].
//! - Undo and redo treat a gesture transaction and the layout transaction
//!   that followed it as one user-visible step.

use std::mem;

use log::{debug, info, trace};
use thiserror::Error;

use malla_core::{
    color::Palette,
    geometry::{Point, Size},
    key::{LaneKey, NodeKey},
    semantic::{Course, Prerequisite, Routing, Semester},
};

use crate::{
    config::AppConfig,
    document::{Document, DocumentSync, Host},
    error::MallaError,
    layout::PoolLayout,
    model::{GraphModel, LinkId, ObserverId, ProtocolError},
    validate,
};

/// The session was asked for a gesture its current state forbids.
///
/// These are protocol mistakes by the calling layer, not user-level
/// rejections; a well-behaved host never triggers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GestureError {
    /// A drag was started while another drag was in flight.
    #[error("A drag gesture is already active")]
    DragInProgress,

    /// A drag operation arrived with no drag in flight.
    #[error("No drag gesture is active")]
    NoActiveDrag,

    /// A drag was started with nothing selected.
    #[error("Nothing is selected to drag")]
    EmptyDrag,
}

/// How a drag gesture resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    /// Membership and locations were committed.
    Committed,
    /// The model was left untouched; dragged parts return to where they
    /// were.
    Cancelled,
}

/// Pointer feedback while a drag is over the canvas.
///
/// Mirrors the highlight and cursor rules of the swimlane UI: a legal
/// foreign lane lights up, the lane the parts already live in accepts
/// without lighting up, and an illegal lane shows the blocked cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragFeedback {
    /// Over a legal lane that would change membership; highlight it.
    Highlight,
    /// Over a legal lane that is already the parts' lane; default cursor,
    /// no highlight.
    Accept,
    /// Over a lane the dragged parts may not join; blocked cursor.
    Blocked,
    /// Not over any lane; clear highlight and cursor.
    Clear,
}

/// Ephemeral state of a drag in flight.
#[derive(Debug)]
struct DragState {
    /// Dragged courses with the location each one started from.
    nodes: Vec<(NodeKey, Option<Point>)>,
    /// Accumulated pointer movement since the drag started.
    delta: Point,
    /// Lane currently under the pointer, if any.
    over: Option<LaneKey>,
}

/// Gesture phase. Commit and cancel resolve synchronously inside
/// [`EditorSession::finish_drag`], so between calls the session is either
/// idle or dragging.
#[derive(Debug)]
enum Gesture {
    Idle,
    Dragging(DragState),
}

/// An owned editing session over one curriculum document.
///
/// Created once per page view with [`EditorSession::load`] and torn down
/// explicitly with [`EditorSession::teardown`]. All mutation goes through
/// gesture methods; the host receives a serialized document after every
/// finished transaction through its [`Host`] implementation.
pub struct EditorSession {
    model: GraphModel,
    layout: PoolLayout,
    palette: Palette,
    selection: Vec<NodeKey>,
    gesture: Gesture,
    /// Course whose label editor the host should open, set when a gesture
    /// requests it and consumed by the host.
    editing: Option<NodeKey>,
    sync: ObserverId,
}

impl EditorSession {
    /// Builds a session from a configuration and a persisted document.
    ///
    /// Startup order: deserialize, run the initial layout pass, publish
    /// the laid-out document to the host once, then attach the document
    /// sync observer and clear the history so undo stops at the loaded
    /// state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured palette cannot be parsed or the
    /// document cannot be loaded into a model.
    pub fn load(
        config: AppConfig,
        document: Document,
        mut host: Box<dyn Host>,
    ) -> Result<Self, MallaError> {
        let palette = config.style().palette().map_err(MallaError::Config)?;
        let layout = PoolLayout::new(config.layout().clone());
        let mut model = document.into_model()?;

        layout.run(&mut model)?;
        host.document_changed(&Document::from_model(&model));
        let sync = model.subscribe(Box::new(DocumentSync::new(host)));
        model.clear_history();

        info!(
            lanes = model.semester_count(),
            courses = model.course_count(),
            links = model.link_count();
            "Session ready"
        );
        Ok(Self {
            model,
            layout,
            palette,
            selection: Vec::new(),
            gesture: Gesture::Idle,
            editing: None,
            sync,
        })
    }

    /// Tears the session down, detaching the document sync observer.
    pub fn teardown(mut self) {
        self.model.unsubscribe(self.sync);
        debug!("Session torn down");
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Borrows the underlying model.
    pub fn model(&self) -> &GraphModel {
        &self.model
    }

    /// Returns a document snapshot of the current model state.
    pub fn document(&self) -> Document {
        Document::from_model(&self.model)
    }

    /// Borrows the course palette.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Borrows the currently selected courses.
    pub fn selection(&self) -> &[NodeKey] {
        &self.selection
    }

    /// Returns whether a drag gesture is in flight.
    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Dragging(_))
    }

    /// Returns the course whose label editor the host should open next.
    pub fn pending_text_edit(&self) -> Option<NodeKey> {
        self.editing
    }

    /// Consumes the pending text edit request.
    pub fn take_pending_text_edit(&mut self) -> Option<NodeKey> {
        self.editing.take()
    }

    /// Returns whether undo has anything to reverse.
    pub fn can_undo(&self) -> bool {
        self.model.can_undo()
    }

    /// Returns whether redo has anything to replay.
    pub fn can_redo(&self) -> bool {
        self.model.can_redo()
    }

    /// Returns whether a link should be drawn.
    ///
    /// Visibility is derived, never stored: a link shows exactly when the
    /// lanes of both endpoints are expanded.
    pub fn link_visible(&self, id: LinkId) -> bool {
        let Some(link) = self.model.link(id) else {
            return false;
        };
        self.lane_expanded(link.from()) && self.lane_expanded(link.to())
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Makes the given course the only selected part.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn select(&mut self, key: NodeKey) -> Result<(), MallaError> {
        self.require_course(key)?;
        self.selection = vec![key];
        Ok(())
    }

    /// Adds a course to the selection, as a shift-click would.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn extend_selection(&mut self, key: NodeKey) -> Result<(), MallaError> {
        self.require_course(key)?;
        if !self.selection.contains(&key) {
            self.selection.push(key);
        }
        Ok(())
    }

    /// Clears the selection, as a click on empty lane background would.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Adds a course to a lane and opens its label for editing.
    ///
    /// The lane is resolved in order: the explicit target, the lane of the
    /// first selected course, the first lane by rank. Returns `None`
    /// without touching the model when the document has no lanes at all.
    ///
    /// The new course starts with the label `"New item N"` where `N` is
    /// the lane's member count before insertion, color `0`, both hour
    /// counters at `1`, and category `"OB"`.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit target lane does not exist.
    pub fn add_course(&mut self, target: Option<LaneKey>) -> Result<Option<NodeKey>, MallaError> {
        let Some(lane) = self.resolve_lane(target)? else {
            debug!("No lane to add a course to");
            return Ok(None);
        };
        let text = format!("New item {}", self.model.members_of(lane).count());

        let key = self.transact("add node", |model| model.add_course(lane, text))?;
        self.refresh_layout()?;
        self.selection = vec![key];
        self.editing = Some(key);
        debug!(key:%, lane:%; "Course created");
        Ok(Some(key))
    }

    // =========================================================================
    // Hour counters
    // =========================================================================

    /// Increments the practice hours counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn increment_hp(&mut self, key: NodeKey) -> Result<(), MallaError> {
        let hp = self.require_course(key)?.hp();
        self.transact("increment count", |model| {
            model.set_course_hp(key, hp.saturating_add(1))
        })?;
        self.refresh_layout()
    }

    /// Increments the theory hours counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn increment_ht(&mut self, key: NodeKey) -> Result<(), MallaError> {
        let ht = self.require_course(key)?.ht();
        self.transact("increment count", |model| {
            model.set_course_ht(key, ht.saturating_add(1))
        })?;
        self.refresh_layout()
    }

    /// Decrements the practice hours counter, clamped at 1.
    ///
    /// At the minimum the transaction stays empty and is dropped, so
    /// nothing reaches the history or the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn decrement_hp(&mut self, key: NodeKey) -> Result<(), MallaError> {
        let hp = self.require_course(key)?.hp();
        self.transact("decrement count", |model| {
            if hp > 1 {
                model.set_course_hp(key, hp - 1)?;
            }
            Ok(())
        })?;
        self.refresh_layout()
    }

    /// Decrements the theory hours counter, clamped at 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn decrement_ht(&mut self, key: NodeKey) -> Result<(), MallaError> {
        let ht = self.require_course(key)?.ht();
        self.transact("decrement count", |model| {
            if ht > 1 {
                model.set_course_ht(key, ht - 1)?;
            }
            Ok(())
        })?;
        self.refresh_layout()
    }

    /// Applies a typed-in value to the practice hours counter.
    ///
    /// Returns `false` and discards the edit, with no transaction, when
    /// the input is not a whole number of at least 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn edit_hp(&mut self, key: NodeKey, input: &str) -> Result<bool, MallaError> {
        self.require_course(key)?;
        let Some(value) = parse_count(input) else {
            debug!(key:%, input:%; "Count edit rejected");
            return Ok(false);
        };
        self.transact("TextEditing", |model| model.set_course_hp(key, value))?;
        self.refresh_layout()?;
        Ok(true)
    }

    /// Applies a typed-in value to the theory hours counter.
    ///
    /// Returns `false` and discards the edit, with no transaction, when
    /// the input is not a whole number of at least 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn edit_ht(&mut self, key: NodeKey, input: &str) -> Result<bool, MallaError> {
        self.require_course(key)?;
        let Some(value) = parse_count(input) else {
            debug!(key:%, input:%; "Count edit rejected");
            return Ok(false);
        };
        self.transact("TextEditing", |model| model.set_course_ht(key, value))?;
        self.refresh_layout()?;
        Ok(true)
    }

    // =========================================================================
    // Color and text
    // =========================================================================

    /// Advances the course to the next palette color, wrapping past the
    /// last entry. Returns the new color index.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn cycle_color(&mut self, key: NodeKey) -> Result<usize, MallaError> {
        let next = self.palette.next_index(self.require_course(key)?.color());
        self.transact("Update node color", |model| {
            model.set_course_color(key, next)
        })?;
        self.refresh_layout()?;
        Ok(next)
    }

    /// Commits an edited course label.
    ///
    /// # Errors
    ///
    /// Returns an error if the course does not exist.
    pub fn edit_course_text(
        &mut self,
        key: NodeKey,
        text: impl Into<String>,
    ) -> Result<(), MallaError> {
        self.require_course(key)?;
        let text = text.into();
        self.transact("TextEditing", |model| model.set_course_text(key, text))?;
        if self.editing == Some(key) {
            self.editing = None;
        }
        self.refresh_layout()
    }

    /// Commits an edited lane label. The lane header may grow, so the
    /// layout pass re-runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the lane does not exist.
    pub fn edit_lane_label(
        &mut self,
        lane: LaneKey,
        label: impl Into<String>,
    ) -> Result<(), MallaError> {
        self.require_semester(lane)?;
        let label = label.into();
        self.transact("TextEditing", |model| model.set_semester_label(lane, label))?;
        self.refresh_layout()
    }

    // =========================================================================
    // Drag and drop
    // =========================================================================

    /// Starts dragging the current selection.
    ///
    /// # Errors
    ///
    /// Returns an error if a drag is already in flight or the selection is
    /// empty.
    pub fn begin_drag(&mut self) -> Result<(), MallaError> {
        if self.is_dragging() {
            return Err(GestureError::DragInProgress.into());
        }
        if self.selection.is_empty() {
            return Err(GestureError::EmptyDrag.into());
        }
        let mut nodes = Vec::with_capacity(self.selection.len());
        for &key in &self.selection {
            let origin = self
                .model
                .course(key)
                .ok_or(ProtocolError::UnknownNode(key))?
                .location();
            nodes.push((key, origin));
        }
        trace!(count = nodes.len(); "Drag started");
        self.gesture = Gesture::Dragging(DragState {
            nodes,
            delta: Point::default(),
            over: None,
        });
        Ok(())
    }

    /// Accumulates pointer movement into the drag.
    ///
    /// Positions stay in the gesture state; the model is untouched until
    /// the drop commits.
    ///
    /// # Errors
    ///
    /// Returns an error if no drag is in flight.
    pub fn drag_by(&mut self, delta: Point) -> Result<(), MallaError> {
        let state = self.drag_state()?;
        state.delta = state.delta.add_point(delta);
        Ok(())
    }

    /// Reports the lane under the pointer and returns the feedback the
    /// view should show.
    ///
    /// Consults [`validate::membership_allowed`] for every dragged course.
    /// The answer only feeds the cursor and the lane highlight; the drop
    /// re-checks before anything commits.
    ///
    /// # Errors
    ///
    /// Returns an error if no drag is in flight.
    pub fn drag_over(&mut self, lane: Option<LaneKey>) -> Result<DragFeedback, MallaError> {
        let state = match &mut self.gesture {
            Gesture::Dragging(state) => state,
            Gesture::Idle => return Err(GestureError::NoActiveDrag.into()),
        };
        state.over = lane;
        let Some(lane) = lane else {
            return Ok(DragFeedback::Clear);
        };

        let allowed = state
            .nodes
            .iter()
            .all(|&(key, _)| validate::membership_allowed(&self.model, Some(lane), key));
        if !allowed {
            return Ok(DragFeedback::Blocked);
        }
        let same_lane = state
            .nodes
            .iter()
            .all(|&(key, _)| self.model.course(key).is_some_and(|c| c.lane() == lane));
        if same_lane {
            Ok(DragFeedback::Accept)
        } else {
            Ok(DragFeedback::Highlight)
        }
    }

    /// Resolves the drag: commits over a legal lane, cancels otherwise.
    ///
    /// A commit moves every dragged course to the target lane at its
    /// dragged location, then clears stored waypoints and resets routing
    /// on links whose endpoint changed lanes. A drop over no lane, or
    /// over a lane the validator rejects, leaves the model untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if no drag is in flight.
    pub fn finish_drag(&mut self) -> Result<DropOutcome, MallaError> {
        let state = match mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Dragging(state) => state,
            Gesture::Idle => return Err(GestureError::NoActiveDrag.into()),
        };
        let Some(lane) = state.over else {
            debug!("Drop outside every lane; drag cancelled");
            return Ok(DropOutcome::Cancelled);
        };
        let allowed = state
            .nodes
            .iter()
            .all(|&(key, _)| validate::membership_allowed(&self.model, Some(lane), key));
        if !allowed {
            debug!(lane:%; "Drop rejected; drag cancelled");
            return Ok(DropOutcome::Cancelled);
        }

        self.transact("Drag", |model| {
            for &(key, origin) in &state.nodes {
                let location = match origin {
                    Some(origin) => origin.add_point(state.delta),
                    None => state.delta,
                };
                model.set_course_location(key, Some(location))?;

                let previous = model.course(key).map(Course::lane);
                if previous != Some(lane) {
                    model.set_course_lane(key, lane)?;
                    let incident: Vec<LinkId> =
                        model.links_of(key).map(|(id, _)| id).collect();
                    for id in incident {
                        model.set_link_points(id, Vec::new())?;
                        model.set_link_routing(id, Routing::default())?;
                    }
                }
            }
            Ok(())
        })?;
        self.refresh_layout()?;
        debug!(lane:%, count = state.nodes.len(); "Drag committed");
        Ok(DropOutcome::Committed)
    }

    /// Abandons the drag, leaving the model untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if no drag is in flight.
    pub fn cancel_drag(&mut self) -> Result<(), MallaError> {
        match mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Dragging(_) => {
                trace!("Drag cancelled");
                Ok(())
            }
            Gesture::Idle => Err(GestureError::NoActiveDrag.into()),
        }
    }

    // =========================================================================
    // Links
    // =========================================================================

    /// Draws a prerequisite link between two courses.
    ///
    /// Returns `None` without a transaction when the validator rejects
    /// the pair; an illegal draw attempt is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if either course does not exist.
    pub fn draw_link(&mut self, from: NodeKey, to: NodeKey) -> Result<Option<LinkId>, MallaError> {
        self.require_course(from)?;
        self.require_course(to)?;
        if !validate::link_allowed(&self.model, from, to) {
            debug!(from:%, to:%; "Link rejected");
            return Ok(None);
        }
        let id = self.transact("Linking", |model| model.add_link(from, to))?;
        self.refresh_layout()?;
        Ok(Some(id))
    }

    /// Reconnects a link's source end. Returns `false` and leaves the
    /// link untouched when the validator rejects the new pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the link or the course does not exist.
    pub fn relink_source(&mut self, id: LinkId, from: NodeKey) -> Result<bool, MallaError> {
        let to = self.require_link(id)?.to();
        self.require_course(from)?;
        if !validate::link_allowed(&self.model, from, to) {
            debug!(id:%, from:%; "Relink rejected");
            return Ok(false);
        }
        self.transact("Relinking", |model| {
            model.set_link_from(id, from)?;
            model.set_link_points(id, Vec::new())
        })?;
        self.refresh_layout()?;
        Ok(true)
    }

    /// Reconnects a link's target end. Returns `false` and leaves the
    /// link untouched when the validator rejects the new pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the link or the course does not exist.
    pub fn relink_target(&mut self, id: LinkId, to: NodeKey) -> Result<bool, MallaError> {
        let from = self.require_link(id)?.from();
        self.require_course(to)?;
        if !validate::link_allowed(&self.model, from, to) {
            debug!(id:%, to:%; "Relink rejected");
            return Ok(false);
        }
        self.transact("Relinking", |model| {
            model.set_link_to(id, to)?;
            model.set_link_points(id, Vec::new())
        })?;
        self.refresh_layout()?;
        Ok(true)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Deletes every selected course, cascading to incident links.
    /// Returns how many courses were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected course no longer exists.
    pub fn delete_selection(&mut self) -> Result<usize, MallaError> {
        if self.selection.is_empty() {
            return Ok(0);
        }
        for &key in &self.selection {
            self.require_course(key)?;
        }
        let nodes = self.selection.clone();
        self.transact("remove", |model| {
            for &key in &nodes {
                model.remove_course(key)?;
            }
            Ok(())
        })?;
        self.selection.clear();
        if self.editing.is_some_and(|key| nodes.contains(&key)) {
            self.editing = None;
        }
        self.refresh_layout()?;
        debug!(count = nodes.len(); "Selection deleted");
        Ok(nodes.len())
    }

    /// Deletes a single link.
    ///
    /// # Errors
    ///
    /// Returns an error if the link does not exist.
    pub fn delete_link(&mut self, id: LinkId) -> Result<(), MallaError> {
        self.require_link(id)?;
        self.transact("remove", |model| model.remove_link(id))?;
        self.refresh_layout()
    }

    // =========================================================================
    // Expand and collapse
    // =========================================================================

    /// Toggles a lane between expanded and collapsed. Returns the new
    /// expanded state.
    ///
    /// Collapsing remembers the lane's current breadth in `savedBreadth`
    /// and hands the size back to the layout, which shrinks the lane to
    /// its header. Expanding restores the remembered breadth.
    ///
    /// # Errors
    ///
    /// Returns an error if the lane does not exist.
    pub fn toggle_expanded(&mut self, lane: LaneKey) -> Result<bool, MallaError> {
        let semester = self.require_semester(lane)?;
        let expanded = semester.expanded();
        let size = semester.size();
        let saved = semester.saved_breadth();

        if expanded {
            self.transact("Collapse SubGraph", |model| {
                model.set_semester_expanded(lane, false)?;
                if let Some(size) = size {
                    model.set_semester_saved_breadth(lane, Some(size.width()))?;
                }
                model.set_semester_size(lane, None)
            })?;
        } else {
            self.transact("Expand SubGraph", |model| {
                model.set_semester_expanded(lane, true)?;
                if let Some(breadth) = saved {
                    let length = size.map_or(0.0, Size::height);
                    model.set_semester_size(lane, Some(Size::new(breadth, length)))?;
                }
                Ok(())
            })?;
        }
        self.refresh_layout()?;
        debug!(lane:%, expanded = !expanded; "Lane toggled");
        Ok(!expanded)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Undoes the newest user-visible step and returns its label.
    ///
    /// When the newest transaction is a layout pass, the gesture
    /// transaction beneath it is undone as well, so one call maps to one
    /// gesture. Returns `None` when there is nothing to undo.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is open.
    pub fn undo(&mut self) -> Result<Option<String>, MallaError> {
        let Some(mut label) = self.model.undo()? else {
            return Ok(None);
        };
        if label == PoolLayout::LABEL {
            if let Some(gesture) = self.model.undo()? {
                label = gesture;
            }
        }
        // The restored state is already laid out, so this pass applies
        // nothing and the redo stack survives.
        self.refresh_layout()?;
        debug!(label:%; "Undid");
        Ok(Some(label))
    }

    /// Replays the newest undone step and returns its label.
    ///
    /// Replays the paired layout transaction along with its gesture.
    /// Returns `None` when there is nothing to redo.
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction is open.
    pub fn redo(&mut self) -> Result<Option<String>, MallaError> {
        let Some(label) = self.model.redo()? else {
            return Ok(None);
        };
        if self.model.next_redo_label() == Some(PoolLayout::LABEL) {
            self.model.redo()?;
        }
        self.refresh_layout()?;
        debug!(label:%; "Redid");
        Ok(Some(label))
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Runs one gesture as a transaction: commit on success, roll back
    /// and propagate on failure.
    fn transact<T>(
        &mut self,
        label: &str,
        operations: impl FnOnce(&mut GraphModel) -> Result<T, ProtocolError>,
    ) -> Result<T, MallaError> {
        self.model.begin(label)?;
        match operations(&mut self.model) {
            Ok(value) => {
                self.model.commit()?;
                Ok(value)
            }
            Err(err) => {
                self.model.rollback()?;
                Err(err.into())
            }
        }
    }

    /// Re-runs the layout pass over the current model state.
    fn refresh_layout(&mut self) -> Result<(), MallaError> {
        self.layout.run(&mut self.model)?;
        Ok(())
    }

    /// Resolves the lane a new course should join.
    fn resolve_lane(&self, target: Option<LaneKey>) -> Result<Option<LaneKey>, ProtocolError> {
        if let Some(lane) = target {
            if self.model.semester(lane).is_none() {
                return Err(ProtocolError::UnknownLane(lane));
            }
            return Ok(Some(lane));
        }
        if let Some(&selected) = self.selection.first() {
            if let Some(course) = self.model.course(selected) {
                return Ok(Some(course.lane()));
            }
        }
        Ok(self.model.first_semester().map(Semester::key))
    }

    fn drag_state(&mut self) -> Result<&mut DragState, GestureError> {
        match &mut self.gesture {
            Gesture::Dragging(state) => Ok(state),
            Gesture::Idle => Err(GestureError::NoActiveDrag),
        }
    }

    fn require_course(&self, key: NodeKey) -> Result<&Course, ProtocolError> {
        self.model.course(key).ok_or(ProtocolError::UnknownNode(key))
    }

    fn require_semester(&self, key: LaneKey) -> Result<&Semester, ProtocolError> {
        self.model
            .semester(key)
            .ok_or(ProtocolError::UnknownLane(key))
    }

    fn require_link(&self, id: LinkId) -> Result<&Prerequisite, ProtocolError> {
        self.model.link(id).ok_or(ProtocolError::UnknownLink(id))
    }

    fn lane_expanded(&self, key: NodeKey) -> bool {
        self.model
            .course(key)
            .and_then(|course| self.model.semester(course.lane()))
            .is_some_and(Semester::expanded)
    }
}

/// Parses a typed-in hour counter value.
///
/// Anything that is not a whole number of at least 1 is rejected:
/// empty input, text, fractions, negatives, and zero.
fn parse_count(input: &str) -> Option<u32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let value = trimmed.parse::<u32>().ok()?;
    (value >= 1).then_some(value)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use float_cmp::assert_approx_eq;

    use super::*;

    /// Host that records every published document snapshot.
    struct RecordingHost {
        published: Rc<RefCell<Vec<Document>>>,
    }

    impl Host for RecordingHost {
        fn document_changed(&mut self, document: &Document) {
            self.published.borrow_mut().push(document.clone());
        }
    }

    fn recording_host() -> (Box<RecordingHost>, Rc<RefCell<Vec<Document>>>) {
        let published = Rc::new(RefCell::new(Vec::new()));
        let host = Box::new(RecordingHost {
            published: Rc::clone(&published),
        });
        (host, published)
    }

    fn session_from(document: Document) -> (EditorSession, Rc<RefCell<Vec<Document>>>) {
        let (host, published) = recording_host();
        let session = EditorSession::load(AppConfig::default(), document, host).unwrap();
        (session, published)
    }

    fn seeded_session() -> (EditorSession, Rc<RefCell<Vec<Document>>>) {
        session_from(Document::seed())
    }

    /// Four lanes and a prerequisite chain 1 -> 2 -> 3, with the middle
    /// course in the second lane and room to move it to the third.
    const CHAIN: &str = r#"{
        "class": "go.GraphLinksModel",
        "nodeDataArray": [
            {"key": "semestre1", "text": "1", "isGroup": true, "rank": 1},
            {"key": "semestre2", "text": "2", "isGroup": true, "rank": 2},
            {"key": "semestre3", "text": "3", "isGroup": true, "rank": 3},
            {"key": "semestre4", "text": "4", "isGroup": true, "rank": 4},
            {"key": 1, "group": "semestre1", "text": "Intro"},
            {"key": 2, "group": "semestre2", "text": "Middle"},
            {"key": 3, "group": "semestre4", "text": "Capstone"}
        ],
        "linkDataArray": [
            {"from": 1, "to": 2, "points": [10, 20, 30, 40], "routing": "Link.Orthogonal"},
            {"from": 2, "to": 3}
        ]
    }"#;

    fn chain_session() -> (EditorSession, Rc<RefCell<Vec<Document>>>) {
        session_from(Document::from_json(CHAIN).unwrap())
    }

    fn link_between(model: &GraphModel, from: i64, to: i64) -> LinkId {
        model
            .links()
            .find(|(_, link)| {
                link.from() == NodeKey::new(from) && link.to() == NodeKey::new(to)
            })
            .map(|(id, _)| id)
            .unwrap()
    }

    #[test]
    fn test_load_lays_out_and_publishes_once() {
        let (session, published) = seeded_session();

        assert_eq!(published.borrow().len(), 1);
        assert!(!session.can_undo());
        let first = session.model().first_semester().unwrap();
        assert_eq!(first.size(), Some(Size::new(180.0, 200.0)));
        assert_eq!(first.location(), Some(Point::new(0.0, 0.0)));
        assert_eq!(published.borrow().last(), Some(&session.document()));
    }

    #[test]
    fn test_load_rejects_invalid_palette() {
        let config: AppConfig =
            serde_json::from_str(r#"{"style": {"palette": ["plaid"]}}"#).unwrap();
        let (host, _) = recording_host();

        let result = EditorSession::load(config, Document::seed(), host);

        assert!(matches!(result, Err(MallaError::Config(_))));
    }

    #[test]
    fn test_add_course_uses_explicit_lane() {
        let (mut session, _) = seeded_session();
        let lane = LaneKey::new("semestre3");

        let key = session.add_course(Some(lane)).unwrap().unwrap();

        let course = session.model().course(key).unwrap();
        assert_eq!(course.lane(), lane);
        assert_eq!(course.text(), "New item 0");
        assert_eq!(course.hp(), 1);
        assert_eq!(course.ht(), 1);
        assert_eq!(course.color(), 0);
        assert_eq!(course.category(), "OB");
        assert_eq!(session.selection(), [key]);
        assert_eq!(session.pending_text_edit(), Some(key));
    }

    #[test]
    fn test_add_course_falls_back_to_selection_lane() {
        let (mut session, _) = chain_session();
        session.select(NodeKey::new(2)).unwrap();

        let key = session.add_course(None).unwrap().unwrap();

        assert_eq!(
            session.model().course(key).unwrap().lane(),
            LaneKey::new("semestre2")
        );
    }

    #[test]
    fn test_add_course_falls_back_to_first_lane_by_rank() {
        let (mut session, _) = seeded_session();

        let key = session.add_course(None).unwrap().unwrap();

        assert_eq!(
            session.model().course(key).unwrap().lane(),
            LaneKey::new("semestre1")
        );
    }

    #[test]
    fn test_new_course_labels_count_members() {
        let (mut session, _) = seeded_session();
        let lane = LaneKey::new("semestre1");

        let first = session.add_course(Some(lane)).unwrap().unwrap();
        let second = session.add_course(Some(lane)).unwrap().unwrap();

        assert_eq!(session.model().course(first).unwrap().text(), "New item 0");
        assert_eq!(session.model().course(second).unwrap().text(), "New item 1");
    }

    #[test]
    fn test_add_course_with_unknown_lane_fails() {
        let (mut session, _) = seeded_session();

        let result = session.add_course(Some(LaneKey::new("electivas")));

        assert!(matches!(result, Err(MallaError::Protocol(_))));
    }

    #[test]
    fn test_counters_increment_and_clamp() {
        let (mut session, _) = seeded_session();
        let key = session.add_course(None).unwrap().unwrap();

        session.increment_hp(key).unwrap();
        session.increment_ht(key).unwrap();
        assert_eq!(session.model().course(key).unwrap().hp(), 2);
        assert_eq!(session.model().course(key).unwrap().ht(), 2);

        session.decrement_hp(key).unwrap();
        let before = session.model().history().len();
        session.decrement_hp(key).unwrap();

        assert_eq!(session.model().course(key).unwrap().hp(), 1);
        assert_eq!(session.model().history().len(), before);
    }

    #[test]
    fn test_counters_saturate_at_the_field_ceiling() {
        let (mut session, _) = seeded_session();
        let key = session.add_course(None).unwrap().unwrap();
        assert!(session.edit_hp(key, "4294967295").unwrap());
        assert!(session.edit_ht(key, "4294967295").unwrap());
        let before = session.model().history().len();

        session.increment_hp(key).unwrap();
        session.increment_ht(key).unwrap();

        let course = session.model().course(key).unwrap();
        assert_eq!(course.hp(), u32::MAX);
        assert_eq!(course.ht(), u32::MAX);
        assert_eq!(session.model().history().len(), before);
    }

    #[test]
    fn test_count_entry_rejects_bad_input() {
        let (mut session, published) = seeded_session();
        let key = session.add_course(None).unwrap().unwrap();
        let before = published.borrow().len();

        for input in ["", "  ", "abc", "2.5", "-3", "0"] {
            assert!(!session.edit_hp(key, input).unwrap(), "accepted {input:?}");
        }

        assert_eq!(session.model().course(key).unwrap().hp(), 1);
        assert_eq!(published.borrow().len(), before);
    }

    #[test]
    fn test_count_entry_accepts_whole_numbers() {
        let (mut session, _) = seeded_session();
        let key = session.add_course(None).unwrap().unwrap();

        assert!(session.edit_hp(key, " 4 ").unwrap());
        assert!(session.edit_ht(key, "3").unwrap());

        let course = session.model().course(key).unwrap();
        assert_eq!(course.hp(), 4);
        assert_eq!(course.ht(), 3);
    }

    #[test]
    fn test_cycle_color_wraps_past_palette_end() {
        let (mut session, _) = seeded_session();
        let key = session.add_course(None).unwrap().unwrap();

        let mut seen = vec![session.model().course(key).unwrap().color()];
        for _ in 0..session.palette().len() {
            seen.push(session.cycle_color(key).unwrap());
        }

        assert_eq!(seen, vec![0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_text_edits_commit_and_clear_the_pending_edit() {
        let (mut session, _) = seeded_session();
        let lane = LaneKey::new("semestre1");
        let key = session.add_course(Some(lane)).unwrap().unwrap();
        assert_eq!(session.pending_text_edit(), Some(key));

        session.edit_course_text(key, "Álgebra Lineal").unwrap();
        session.edit_lane_label(lane, "Primer semestre").unwrap();

        assert_eq!(session.model().course(key).unwrap().text(), "Álgebra Lineal");
        assert_eq!(
            session.model().semester(lane).unwrap().label(),
            "Primer semestre"
        );
        assert_eq!(session.pending_text_edit(), None);
        let labels: Vec<&str> = session
            .model()
            .history()
            .iter()
            .map(|transaction| transaction.label())
            .collect();
        assert!(labels.contains(&"TextEditing"));
    }

    #[test]
    fn test_long_lane_label_widens_the_lane() {
        let (mut session, _) = seeded_session();
        let lane = LaneKey::new("semestre1");

        session
            .edit_lane_label(lane, "Semestre de nivelación inicial complementario")
            .unwrap();

        let width = session.model().semester(lane).unwrap().size().unwrap().width();
        assert!(width > 180.0);
    }

    #[test]
    fn test_drag_feedback_follows_validator() {
        let (mut session, _) = chain_session();
        session.select(NodeKey::new(2)).unwrap();
        session.begin_drag().unwrap();

        assert_eq!(
            session.drag_over(Some(LaneKey::new("semestre3"))).unwrap(),
            DragFeedback::Highlight
        );
        assert_eq!(
            session.drag_over(Some(LaneKey::new("semestre2"))).unwrap(),
            DragFeedback::Accept
        );
        assert_eq!(
            session.drag_over(Some(LaneKey::new("semestre1"))).unwrap(),
            DragFeedback::Blocked
        );
        assert_eq!(
            session.drag_over(Some(LaneKey::new("semestre4"))).unwrap(),
            DragFeedback::Blocked
        );
        assert_eq!(session.drag_over(None).unwrap(), DragFeedback::Clear);

        session.cancel_drag().unwrap();
    }

    #[test]
    fn test_drop_commits_membership_and_resets_crossing_links() {
        let (mut session, _) = chain_session();
        let middle = NodeKey::new(2);
        let incoming = link_between(session.model(), 1, 2);
        assert!(!session.model().link(incoming).unwrap().points().is_empty());
        session.select(middle).unwrap();
        session.begin_drag().unwrap();
        session.drag_by(Point::new(200.0, 40.0)).unwrap();
        session.drag_over(Some(LaneKey::new("semestre3"))).unwrap();

        let outcome = session.finish_drag().unwrap();

        assert_eq!(outcome, DropOutcome::Committed);
        assert!(!session.is_dragging());
        let course = session.model().course(middle).unwrap();
        assert_eq!(course.lane(), LaneKey::new("semestre3"));
        let link = session.model().link(incoming).unwrap();
        assert!(link.points().is_empty());
        assert_eq!(link.routing(), Routing::default());
        // Snapped into the third lane's member column by the layout pass.
        let lane_x = session
            .model()
            .semester(LaneKey::new("semestre3"))
            .unwrap()
            .location()
            .unwrap()
            .x();
        assert_approx_eq!(f32, course.location().unwrap().x(), lane_x + 12.0);
    }

    #[test]
    fn test_drop_outside_any_lane_cancels() {
        let (mut session, _) = chain_session();
        let middle = NodeKey::new(2);
        let before = session.model().course(middle).unwrap().clone();
        let history = session.model().history().len();
        session.select(middle).unwrap();
        session.begin_drag().unwrap();
        session.drag_by(Point::new(0.0, 500.0)).unwrap();

        let outcome = session.finish_drag().unwrap();

        assert_eq!(outcome, DropOutcome::Cancelled);
        assert_eq!(session.model().course(middle).unwrap(), &before);
        assert_eq!(session.model().history().len(), history);
    }

    #[test]
    fn test_drop_on_illegal_lane_cancels() {
        let (mut session, _) = chain_session();
        let middle = NodeKey::new(2);
        session.select(middle).unwrap();
        session.begin_drag().unwrap();
        assert_eq!(
            session.drag_over(Some(LaneKey::new("semestre1"))).unwrap(),
            DragFeedback::Blocked
        );

        let outcome = session.finish_drag().unwrap();

        assert_eq!(outcome, DropOutcome::Cancelled);
        assert_eq!(
            session.model().course(middle).unwrap().lane(),
            LaneKey::new("semestre2")
        );
    }

    #[test]
    fn test_cancel_drag_leaves_model_untouched() {
        let (mut session, published) = chain_session();
        session.select(NodeKey::new(2)).unwrap();
        let before = published.borrow().len();
        session.begin_drag().unwrap();
        session.drag_by(Point::new(50.0, 50.0)).unwrap();
        session.cancel_drag().unwrap();

        assert!(!session.is_dragging());
        assert_eq!(published.borrow().len(), before);
    }

    #[test]
    fn test_drag_protocol_violations() {
        let (mut session, _) = chain_session();

        assert!(matches!(
            session.begin_drag(),
            Err(MallaError::Gesture(GestureError::EmptyDrag))
        ));
        assert!(matches!(
            session.finish_drag(),
            Err(MallaError::Gesture(GestureError::NoActiveDrag))
        ));

        session.select(NodeKey::new(1)).unwrap();
        session.begin_drag().unwrap();
        assert!(matches!(
            session.begin_drag(),
            Err(MallaError::Gesture(GestureError::DragInProgress))
        ));
    }

    #[test]
    fn test_multi_drag_requires_every_node_to_pass() {
        let (mut session, _) = chain_session();
        session.select(NodeKey::new(1)).unwrap();
        session.extend_selection(NodeKey::new(2)).unwrap();
        session.begin_drag().unwrap();

        assert_eq!(
            session.drag_over(Some(LaneKey::new("semestre2"))).unwrap(),
            DragFeedback::Blocked
        );
        assert_eq!(
            session.drag_over(Some(LaneKey::new("semestre1"))).unwrap(),
            DragFeedback::Blocked
        );

        session.cancel_drag().unwrap();
    }

    #[test]
    fn test_move_within_lane_reorders_the_column() {
        let (mut session, _) = seeded_session();
        let lane = LaneKey::new("semestre1");
        let first = session.add_course(Some(lane)).unwrap().unwrap();
        let second = session.add_course(Some(lane)).unwrap().unwrap();
        assert_approx_eq!(
            f32,
            session.model().course(second).unwrap().location().unwrap().y(),
            127.0
        );

        session.select(second).unwrap();
        session.begin_drag().unwrap();
        session.drag_by(Point::new(0.0, -100.0)).unwrap();
        session.drag_over(Some(lane)).unwrap();
        let outcome = session.finish_drag().unwrap();

        assert_eq!(outcome, DropOutcome::Committed);
        assert_approx_eq!(
            f32,
            session.model().course(second).unwrap().location().unwrap().y(),
            37.0
        );
        assert_approx_eq!(
            f32,
            session.model().course(first).unwrap().location().unwrap().y(),
            127.0
        );
    }

    #[test]
    fn test_draw_link_enforces_ordering() {
        let (mut session, _) = chain_session();
        let history = session.model().history().len();

        assert_eq!(
            session.draw_link(NodeKey::new(2), NodeKey::new(1)).unwrap(),
            None
        );
        assert_eq!(session.model().history().len(), history);

        let id = session.draw_link(NodeKey::new(1), NodeKey::new(3)).unwrap();
        assert!(id.is_some());
        assert_eq!(session.model().link_count(), 3);
    }

    #[test]
    fn test_relink_enforces_ordering() {
        let (mut session, _) = chain_session();
        let id = link_between(session.model(), 2, 3);

        assert!(!session.relink_target(id, NodeKey::new(1)).unwrap());
        assert_eq!(session.model().link(id).unwrap().to(), NodeKey::new(3));

        assert!(session.relink_source(id, NodeKey::new(1)).unwrap());
        assert_eq!(session.model().link(id).unwrap().from(), NodeKey::new(1));
    }

    #[test]
    fn test_delete_selection_cascades_to_links() {
        let (mut session, _) = chain_session();
        session.select(NodeKey::new(2)).unwrap();

        let removed = session.delete_selection().unwrap();

        assert_eq!(removed, 1);
        assert!(session.model().course(NodeKey::new(2)).is_none());
        assert_eq!(session.model().link_count(), 0);
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_delete_link_only() {
        let (mut session, _) = chain_session();
        let id = link_between(session.model(), 1, 2);

        session.delete_link(id).unwrap();

        assert!(session.model().link(id).is_none());
        assert_eq!(session.model().link_count(), 1);
        assert_eq!(session.model().course_count(), 3);
    }

    const SIZED_LANE: &str = r#"{
        "class": "go.GraphLinksModel",
        "nodeDataArray": [
            {"key": "semestre1", "text": "1", "isGroup": true, "rank": 1,
             "loc": "0 0", "size": "300 454"},
            {"key": "semestre2", "text": "2", "isGroup": true, "rank": 2},
            {"key": 1, "group": "semestre1", "text": "Anatomía"}
        ],
        "linkDataArray": []
    }"#;

    #[test]
    fn test_collapse_remembers_breadth_and_expand_restores_it() {
        let (mut session, _) = session_from(Document::from_json(SIZED_LANE).unwrap());
        let lane = LaneKey::new("semestre1");
        assert_eq!(
            session.model().semester(lane).unwrap().size(),
            Some(Size::new(300.0, 200.0))
        );

        assert!(!session.toggle_expanded(lane).unwrap());
        let collapsed = session.model().semester(lane).unwrap();
        assert!(!collapsed.expanded());
        assert_eq!(collapsed.saved_breadth(), Some(300.0));
        assert_eq!(collapsed.size(), Some(Size::new(25.0, 200.0)));

        assert!(session.toggle_expanded(lane).unwrap());
        let expanded = session.model().semester(lane).unwrap();
        assert!(expanded.expanded());
        assert_eq!(expanded.size(), Some(Size::new(300.0, 200.0)));
    }

    #[test]
    fn test_link_visibility_follows_lane_collapse() {
        let (mut session, _) = chain_session();
        let id = link_between(session.model(), 1, 2);
        assert!(session.link_visible(id));

        session.toggle_expanded(LaneKey::new("semestre1")).unwrap();
        assert!(!session.link_visible(id));
        assert!(session.link_visible(link_between(session.model(), 2, 3)));

        session.toggle_expanded(LaneKey::new("semestre1")).unwrap();
        assert!(session.link_visible(id));
    }

    #[test]
    fn test_undo_reverses_gesture_and_its_layout_pass() {
        let (mut session, _) = seeded_session();
        let lane = LaneKey::new("semestre1");
        for _ in 0..3 {
            session.add_course(Some(lane)).unwrap();
        }
        assert_eq!(
            session.model().semester(lane).unwrap().size(),
            Some(Size::new(180.0, 274.0))
        );

        let label = session.undo().unwrap();

        assert_eq!(label.as_deref(), Some("add node"));
        assert_eq!(session.model().members_of(lane).count(), 2);
        // The pool growth rolled back together with the gesture.
        assert_eq!(
            session.model().semester(lane).unwrap().size(),
            Some(Size::new(180.0, 200.0))
        );
        assert!(session.can_redo());

        let label = session.redo().unwrap();
        assert_eq!(label.as_deref(), Some("add node"));
        assert_eq!(session.model().members_of(lane).count(), 3);
        assert_eq!(
            session.model().semester(lane).unwrap().size(),
            Some(Size::new(180.0, 274.0))
        );
    }

    #[test]
    fn test_undo_stops_at_the_loaded_state() {
        let (mut session, _) = chain_session();

        assert_eq!(session.undo().unwrap(), None);
    }

    #[test]
    fn test_new_gesture_clears_redo() {
        let (mut session, _) = seeded_session();
        session.add_course(None).unwrap();
        session.undo().unwrap();
        assert!(session.can_redo());

        session.add_course(None).unwrap();

        assert!(!session.can_redo());
        assert_eq!(session.redo().unwrap(), None);
    }

    #[test]
    fn test_gestures_publish_documents() {
        let (mut session, published) = seeded_session();
        assert_eq!(published.borrow().len(), 1);

        let key = session.add_course(None).unwrap().unwrap();
        // One snapshot for the gesture, one for the layout repair.
        assert_eq!(published.borrow().len(), 3);

        session.cycle_color(key).unwrap();
        assert_eq!(published.borrow().len(), 4);

        session.decrement_hp(key).unwrap();
        assert_eq!(published.borrow().len(), 4);

        assert_eq!(published.borrow().last(), Some(&session.document()));
    }

    #[test]
    fn test_selection_gestures() {
        let (mut session, _) = chain_session();
        session.select(NodeKey::new(1)).unwrap();
        session.extend_selection(NodeKey::new(2)).unwrap();
        session.extend_selection(NodeKey::new(2)).unwrap();
        assert_eq!(session.selection(), [NodeKey::new(1), NodeKey::new(2)]);

        session.clear_selection();
        assert!(session.selection().is_empty());

        assert!(matches!(
            session.select(NodeKey::new(99)),
            Err(MallaError::Protocol(_))
        ));
    }

    #[test]
    fn test_teardown_detaches_the_observer() {
        let (session, published) = seeded_session();

        session.teardown();

        assert_eq!(published.borrow().len(), 1);
    }
}
