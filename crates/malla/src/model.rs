//! The transactional curriculum graph model.
//!
//! This module owns the mutable state of a curriculum map: ordered semester
//! lanes, the courses inside them, and the prerequisite links between
//! courses. Every mutation happens inside a labelled transaction and is
//! recorded as a [`Change`], which gives the model linear undo and redo for
//! free.
//!
//! # Architecture
//!
//! The module provides:
//! - [`GraphModel`]: The record stores plus transaction, history, and
//!   observer machinery
//! - [`LinkId`]: Model-internal identity for links, which carry no key of
//!   their own in documents
//! - [`ProtocolError`]: Errors raised when a caller violates the transaction
//!   protocol or references an unknown record
//! - [`ModelObserver`]: Callback interface notified once per finished
//!   transaction
//!
//! The model enforces structural integrity (known lanes, known endpoint
//! courses, one lane per rank) but deliberately knows nothing about the
//! prerequisite ordering policy. That policy lives in [`crate::validate`]
//! and is consulted by callers before they mutate.

pub mod change;

use std::fmt;

use indexmap::IndexMap;
use log::{debug, info, trace};
use thiserror::Error;

use malla_core::{
    geometry::{Point, Size},
    key::{LaneKey, NodeKey},
    semantic::{Course, Prerequisite, Routing, Semester},
};

pub use change::{Change, CourseField, LinkField, SemesterField, Transaction};

/// Model-internal identity for a link.
///
/// Links have no key in the document format; they are identified
/// positionally there. The model assigns each link an id so that changes
/// and removals can name their target. Ids are never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(u64);

impl LinkId {
    /// Creates a link id with the given raw value.
    pub fn new(value: u64) -> Self {
        LinkId(value)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when a caller violates the model's protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A mutating method was called with no transaction open.
    #[error("Mutation attempted outside of a transaction")]
    MutationOutsideTransaction,

    /// A transaction was started, or history navigated, while another
    /// transaction was still open.
    #[error("Transaction '{0}' is already open")]
    TransactionAlreadyOpen(String),

    /// Commit or rollback was called with no transaction open.
    #[error("No transaction is open")]
    NoOpenTransaction,

    /// A lane key does not name a semester in the model.
    #[error("Unknown lane '{0}'")]
    UnknownLane(LaneKey),

    /// A node key does not name a course in the model.
    #[error("Unknown node '{0}'")]
    UnknownNode(NodeKey),

    /// A link id does not name a link in the model.
    #[error("Unknown link '{0}'")]
    UnknownLink(LinkId),

    /// A semester with this key already exists.
    #[error("Lane '{0}' already exists")]
    DuplicateLane(LaneKey),

    /// Another semester already occupies this rank.
    #[error("Rank {1} is already taken by lane '{0}'")]
    DuplicateRank(LaneKey, u32),

    /// The semester still has member courses and cannot be removed.
    #[error("Lane '{0}' still has members")]
    LaneNotEmpty(LaneKey),
}

/// Observer notified after every finished transaction.
///
/// A transaction finishes when it is committed with at least one recorded
/// change, or when history replays it through undo or redo. Rolled-back
/// and empty transactions do not notify.
pub trait ModelObserver {
    /// Called with the model state after the transaction and its label.
    fn transaction_finished(&mut self, model: &GraphModel, label: &str);
}

/// Handle returned by [`GraphModel::subscribe`], used to detach later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

/// The transaction currently being recorded.
struct OpenTransaction {
    label: String,
    changes: Vec<Change>,
}

/// The curriculum graph: semester lanes, courses, and prerequisite links.
///
/// All iteration surfaces preserve insertion order, which is also the
/// order records appear in serialized documents.
pub struct GraphModel {
    semesters: IndexMap<LaneKey, Semester>,
    courses: IndexMap<NodeKey, Course>,
    links: IndexMap<LinkId, Prerequisite>,
    /// Counts downward; host documents use positive keys, model-created
    /// courses get negative ones so the two never collide.
    next_node_key: i64,
    next_link_id: u64,
    open: Option<OpenTransaction>,
    history: Vec<Transaction>,
    undone: Vec<Transaction>,
    observers: Vec<(ObserverId, Box<dyn ModelObserver>)>,
    next_observer_id: u64,
}

impl GraphModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self {
            semesters: IndexMap::new(),
            courses: IndexMap::new(),
            links: IndexMap::new(),
            next_node_key: -1,
            next_link_id: 0,
            open: None,
            history: Vec::new(),
            undone: Vec::new(),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    /// Builds a model directly from validated records.
    ///
    /// Callers are responsible for referential integrity: every course
    /// references an existing lane, every link references existing
    /// courses, and ranks are unique. The deserializer checks all of this
    /// before calling in.
    pub(crate) fn from_parts(
        semesters: Vec<Semester>,
        courses: Vec<Course>,
        links: Vec<Prerequisite>,
    ) -> Self {
        let lowest_key = courses.iter().map(|c| c.key().value()).min().unwrap_or(0);
        let next_link_id = links.len() as u64;
        Self {
            semesters: semesters.into_iter().map(|s| (s.key(), s)).collect(),
            courses: courses.into_iter().map(|c| (c.key(), c)).collect(),
            links: links
                .into_iter()
                .enumerate()
                .map(|(index, link)| (LinkId(index as u64), link))
                .collect(),
            next_node_key: lowest_key.min(0) - 1,
            next_link_id,
            open: None,
            history: Vec::new(),
            undone: Vec::new(),
            observers: Vec::new(),
            next_observer_id: 0,
        }
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// Returns the semester stored under the given key.
    pub fn semester(&self, key: LaneKey) -> Option<&Semester> {
        self.semesters.get(&key)
    }

    /// Returns the course stored under the given key.
    pub fn course(&self, key: NodeKey) -> Option<&Course> {
        self.courses.get(&key)
    }

    /// Returns the link stored under the given id.
    pub fn link(&self, id: LinkId) -> Option<&Prerequisite> {
        self.links.get(&id)
    }

    /// Iterates semesters in insertion order.
    pub fn semesters(&self) -> impl Iterator<Item = &Semester> {
        self.semesters.values()
    }

    /// Returns semesters sorted by rank, lowest first.
    pub fn semesters_by_rank(&self) -> Vec<&Semester> {
        let mut semesters: Vec<&Semester> = self.semesters.values().collect();
        semesters.sort_by_key(|semester| semester.rank());
        semesters
    }

    /// Returns the semester with the lowest rank, if any exist.
    pub fn first_semester(&self) -> Option<&Semester> {
        self.semesters.values().min_by_key(|semester| semester.rank())
    }

    /// Iterates courses in insertion order.
    pub fn courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.values()
    }

    /// Iterates links with their ids in insertion order.
    pub fn links(&self) -> impl Iterator<Item = (LinkId, &Prerequisite)> {
        self.links.iter().map(|(id, link)| (*id, link))
    }

    /// Iterates the courses assigned to the given lane, in insertion order.
    pub fn members_of(&self, lane: LaneKey) -> impl Iterator<Item = &Course> {
        self.courses
            .values()
            .filter(move |course| course.lane() == lane)
    }

    /// Iterates the courses with a prerequisite link into the given course.
    pub fn predecessors_of(&self, key: NodeKey) -> impl Iterator<Item = &Course> {
        self.links
            .values()
            .filter(move |link| link.to() == key)
            .filter_map(|link| self.courses.get(&link.from()))
    }

    /// Iterates the courses the given course is a prerequisite of.
    pub fn successors_of(&self, key: NodeKey) -> impl Iterator<Item = &Course> {
        self.links
            .values()
            .filter(move |link| link.from() == key)
            .filter_map(|link| self.courses.get(&link.to()))
    }

    /// Iterates the links touching the given course at either end.
    pub fn links_of(&self, key: NodeKey) -> impl Iterator<Item = (LinkId, &Prerequisite)> {
        self.links
            .iter()
            .filter(move |(_, link)| link.touches(key))
            .map(|(id, link)| (*id, link))
    }

    /// Returns the number of semesters.
    pub fn semester_count(&self) -> usize {
        self.semesters.len()
    }

    /// Returns the number of courses.
    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    /// Returns the number of links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Opens a transaction with the given label.
    ///
    /// Exactly one transaction may be open at a time; nesting is a
    /// protocol violation.
    pub fn begin(&mut self, label: impl Into<String>) -> Result<(), ProtocolError> {
        let label = label.into();
        if let Some(open) = &self.open {
            return Err(ProtocolError::TransactionAlreadyOpen(open.label.clone()));
        }
        trace!(label = label.as_str(); "Transaction opened");
        self.open = Some(OpenTransaction {
            label,
            changes: Vec::new(),
        });
        Ok(())
    }

    /// Commits the open transaction.
    ///
    /// A commit that recorded no changes is dropped: it enters no history
    /// and notifies no observers. Otherwise the transaction is pushed onto
    /// the undo history, the redo stack is cleared, and observers fire.
    pub fn commit(&mut self) -> Result<(), ProtocolError> {
        let open = self.open.take().ok_or(ProtocolError::NoOpenTransaction)?;
        if open.changes.is_empty() {
            trace!(label = open.label.as_str(); "Empty transaction dropped");
            return Ok(());
        }
        info!(label = open.label.as_str(), changes = open.changes.len(); "Transaction committed");
        let label = open.label.clone();
        self.history.push(Transaction::new(open.label, open.changes));
        self.undone.clear();
        self.notify(&label);
        Ok(())
    }

    /// Discards the open transaction, reversing every change it applied.
    ///
    /// Observers are not notified; to the outside the transaction never
    /// happened.
    pub fn rollback(&mut self) -> Result<(), ProtocolError> {
        let open = self.open.take().ok_or(ProtocolError::NoOpenTransaction)?;
        for change in open.changes.iter().rev() {
            self.apply_change(&change.inverted());
        }
        debug!(label = open.label.as_str(), discarded = open.changes.len(); "Transaction rolled back");
        Ok(())
    }

    /// Returns the label of the open transaction, if one is open.
    pub fn open_label(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.label.as_str())
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Reverses the most recent committed transaction.
    ///
    /// Returns the undone transaction's label, or `None` when the history
    /// is empty. Observers are notified as for a commit.
    pub fn undo(&mut self) -> Result<Option<String>, ProtocolError> {
        if let Some(open) = &self.open {
            return Err(ProtocolError::TransactionAlreadyOpen(open.label.clone()));
        }
        let Some(transaction) = self.history.pop() else {
            return Ok(None);
        };
        for change in transaction.changes().iter().rev() {
            self.apply_change(&change.inverted());
        }
        let label = transaction.label().to_string();
        info!(label = label.as_str(); "Transaction undone");
        self.undone.push(transaction);
        self.notify(&label);
        Ok(Some(label))
    }

    /// Replays the most recently undone transaction.
    pub fn redo(&mut self) -> Result<Option<String>, ProtocolError> {
        if let Some(open) = &self.open {
            return Err(ProtocolError::TransactionAlreadyOpen(open.label.clone()));
        }
        let Some(transaction) = self.undone.pop() else {
            return Ok(None);
        };
        for change in transaction.changes() {
            self.apply_change(change);
        }
        let label = transaction.label().to_string();
        info!(label = label.as_str(); "Transaction redone");
        self.history.push(transaction);
        self.notify(&label);
        Ok(Some(label))
    }

    /// Returns whether undo would replay anything.
    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// Returns whether redo would replay anything.
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Returns the label of the transaction redo would replay next.
    pub fn next_redo_label(&self) -> Option<&str> {
        self.undone.last().map(|transaction| transaction.label())
    }

    /// Returns the committed transactions, oldest first.
    pub fn history(&self) -> &[Transaction] {
        &self.history
    }

    /// Forgets all undo and redo state.
    ///
    /// Called after loading a document so that undo cannot walk back past
    /// the loaded state.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.undone.clear();
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Adds a semester.
    ///
    /// The key and the rank must both be unused.
    pub fn add_semester(&mut self, semester: Semester) -> Result<LaneKey, ProtocolError> {
        self.require_open()?;
        let key = semester.key();
        if self.semesters.contains_key(&key) {
            return Err(ProtocolError::DuplicateLane(key));
        }
        if let Some(existing) = self
            .semesters
            .values()
            .find(|s| s.rank() == semester.rank())
        {
            return Err(ProtocolError::DuplicateRank(existing.key(), existing.rank()));
        }
        self.push_change(Change::AddSemester(semester));
        Ok(key)
    }

    /// Removes a semester, which must have no member courses.
    pub fn remove_semester(&mut self, key: LaneKey) -> Result<(), ProtocolError> {
        self.require_open()?;
        let semester = self
            .semesters
            .get(&key)
            .ok_or(ProtocolError::UnknownLane(key))?
            .clone();
        if self.members_of(key).next().is_some() {
            return Err(ProtocolError::LaneNotEmpty(key));
        }
        self.push_change(Change::RemoveSemester(semester));
        Ok(())
    }

    /// Adds a course to the given lane and returns its assigned key.
    ///
    /// Keys are negative and count downward, leaving positive keys to the
    /// documents a model is loaded from. Defaults beyond lane and text are
    /// set through the field setters within the same transaction.
    pub fn add_course(
        &mut self,
        lane: LaneKey,
        text: impl Into<String>,
    ) -> Result<NodeKey, ProtocolError> {
        self.require_open()?;
        if !self.semesters.contains_key(&lane) {
            return Err(ProtocolError::UnknownLane(lane));
        }
        let key = NodeKey::new(self.next_node_key);
        self.next_node_key -= 1;
        trace!(key:%, lane:%; "Course added");
        self.push_change(Change::AddCourse(Course::new(key, lane, text)));
        Ok(key)
    }

    /// Removes a course along with every link touching it.
    ///
    /// The incident links are recorded first so that undo restores them
    /// only after the course is back.
    pub fn remove_course(&mut self, key: NodeKey) -> Result<(), ProtocolError> {
        self.require_open()?;
        let course = self
            .courses
            .get(&key)
            .ok_or(ProtocolError::UnknownNode(key))?
            .clone();
        let incident: Vec<(LinkId, Prerequisite)> = self
            .links_of(key)
            .map(|(id, link)| (id, link.clone()))
            .collect();
        trace!(key:%, links = incident.len(); "Course removed");
        for (id, link) in incident {
            self.push_change(Change::RemoveLink(id, link));
        }
        self.push_change(Change::RemoveCourse(course));
        Ok(())
    }

    /// Adds a prerequisite link between two existing courses.
    ///
    /// The model checks only that both endpoints exist. Whether the link
    /// respects semester ordering is the caller's concern; see
    /// [`crate::validate::link_allowed`].
    pub fn add_link(&mut self, from: NodeKey, to: NodeKey) -> Result<LinkId, ProtocolError> {
        self.require_open()?;
        if !self.courses.contains_key(&from) {
            return Err(ProtocolError::UnknownNode(from));
        }
        if !self.courses.contains_key(&to) {
            return Err(ProtocolError::UnknownNode(to));
        }
        let id = LinkId(self.next_link_id);
        self.next_link_id += 1;
        trace!(from:%, to:%; "Link added");
        self.push_change(Change::AddLink(id, Prerequisite::new(from, to)));
        Ok(id)
    }

    /// Removes a link.
    pub fn remove_link(&mut self, id: LinkId) -> Result<(), ProtocolError> {
        self.require_open()?;
        let link = self
            .links
            .get(&id)
            .ok_or(ProtocolError::UnknownLink(id))?
            .clone();
        self.push_change(Change::RemoveLink(id, link));
        Ok(())
    }

    // =========================================================================
    // Course field setters
    // =========================================================================

    /// Moves a course to another lane.
    pub fn set_course_lane(&mut self, key: NodeKey, lane: LaneKey) -> Result<(), ProtocolError> {
        self.require_open()?;
        if !self.semesters.contains_key(&lane) {
            return Err(ProtocolError::UnknownLane(lane));
        }
        let old = self.course_ref(key)?.lane();
        if old == lane {
            return Ok(());
        }
        self.push_change(Change::Course {
            key,
            field: CourseField::Lane { old, new: lane },
        });
        Ok(())
    }

    /// Sets a course's display text.
    pub fn set_course_text(
        &mut self,
        key: NodeKey,
        text: impl Into<String>,
    ) -> Result<(), ProtocolError> {
        self.require_open()?;
        let new = text.into();
        let old = self.course_ref(key)?.text().to_string();
        if old == new {
            return Ok(());
        }
        self.push_change(Change::Course {
            key,
            field: CourseField::Text { old, new },
        });
        Ok(())
    }

    /// Sets a course's palette index.
    pub fn set_course_color(&mut self, key: NodeKey, color: usize) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.course_ref(key)?.color();
        if old == color {
            return Ok(());
        }
        self.push_change(Change::Course {
            key,
            field: CourseField::Color { old, new: color },
        });
        Ok(())
    }

    /// Sets a course's weekly practice hours.
    pub fn set_course_hp(&mut self, key: NodeKey, hp: u32) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.course_ref(key)?.hp();
        if old == hp {
            return Ok(());
        }
        self.push_change(Change::Course {
            key,
            field: CourseField::Hp { old, new: hp },
        });
        Ok(())
    }

    /// Sets a course's weekly theory hours.
    pub fn set_course_ht(&mut self, key: NodeKey, ht: u32) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.course_ref(key)?.ht();
        if old == ht {
            return Ok(());
        }
        self.push_change(Change::Course {
            key,
            field: CourseField::Ht { old, new: ht },
        });
        Ok(())
    }

    /// Sets a course's category code.
    pub fn set_course_category(
        &mut self,
        key: NodeKey,
        category: impl Into<String>,
    ) -> Result<(), ProtocolError> {
        self.require_open()?;
        let new = category.into();
        let old = self.course_ref(key)?.category().to_string();
        if old == new {
            return Ok(());
        }
        self.push_change(Change::Course {
            key,
            field: CourseField::Category { old, new },
        });
        Ok(())
    }

    /// Sets or clears a course's location.
    pub fn set_course_location(
        &mut self,
        key: NodeKey,
        location: Option<Point>,
    ) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.course_ref(key)?.location();
        if old == location {
            return Ok(());
        }
        self.push_change(Change::Course {
            key,
            field: CourseField::Location { old, new: location },
        });
        Ok(())
    }

    // =========================================================================
    // Semester field setters
    // =========================================================================

    /// Sets a semester's header label.
    pub fn set_semester_label(
        &mut self,
        key: LaneKey,
        label: impl Into<String>,
    ) -> Result<(), ProtocolError> {
        self.require_open()?;
        let new = label.into();
        let old = self.semester_ref(key)?.label().to_string();
        if old == new {
            return Ok(());
        }
        self.push_change(Change::Semester {
            key,
            field: SemesterField::Label { old, new },
        });
        Ok(())
    }

    /// Sets or clears a semester's location.
    pub fn set_semester_location(
        &mut self,
        key: LaneKey,
        location: Option<Point>,
    ) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.semester_ref(key)?.location();
        if old == location {
            return Ok(());
        }
        self.push_change(Change::Semester {
            key,
            field: SemesterField::Location { old, new: location },
        });
        Ok(())
    }

    /// Expands or collapses a semester.
    pub fn set_semester_expanded(
        &mut self,
        key: LaneKey,
        expanded: bool,
    ) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.semester_ref(key)?.expanded();
        if old == expanded {
            return Ok(());
        }
        self.push_change(Change::Semester {
            key,
            field: SemesterField::Expanded { old, new: expanded },
        });
        Ok(())
    }

    /// Sets or clears the breadth remembered across a collapse.
    pub fn set_semester_saved_breadth(
        &mut self,
        key: LaneKey,
        breadth: Option<f32>,
    ) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.semester_ref(key)?.saved_breadth();
        if old == breadth {
            return Ok(());
        }
        self.push_change(Change::Semester {
            key,
            field: SemesterField::SavedBreadth { old, new: breadth },
        });
        Ok(())
    }

    /// Sets or clears a semester's explicit size.
    pub fn set_semester_size(
        &mut self,
        key: LaneKey,
        size: Option<Size>,
    ) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.semester_ref(key)?.size();
        if old == size {
            return Ok(());
        }
        self.push_change(Change::Semester {
            key,
            field: SemesterField::Size { old, new: size },
        });
        Ok(())
    }

    // =========================================================================
    // Link field setters
    // =========================================================================

    /// Reconnects a link's source end.
    pub fn set_link_from(&mut self, id: LinkId, from: NodeKey) -> Result<(), ProtocolError> {
        self.require_open()?;
        if !self.courses.contains_key(&from) {
            return Err(ProtocolError::UnknownNode(from));
        }
        let old = self.link_ref(id)?.from();
        if old == from {
            return Ok(());
        }
        self.push_change(Change::Link {
            id,
            field: LinkField::From { old, new: from },
        });
        Ok(())
    }

    /// Reconnects a link's target end.
    pub fn set_link_to(&mut self, id: LinkId, to: NodeKey) -> Result<(), ProtocolError> {
        self.require_open()?;
        if !self.courses.contains_key(&to) {
            return Err(ProtocolError::UnknownNode(to));
        }
        let old = self.link_ref(id)?.to();
        if old == to {
            return Ok(());
        }
        self.push_change(Change::Link {
            id,
            field: LinkField::To { old, new: to },
        });
        Ok(())
    }

    /// Replaces a link's route waypoints.
    pub fn set_link_points(&mut self, id: LinkId, points: Vec<Point>) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.link_ref(id)?.points().to_vec();
        if old == points {
            return Ok(());
        }
        self.push_change(Change::Link {
            id,
            field: LinkField::Points { old, new: points },
        });
        Ok(())
    }

    /// Sets a link's routing style.
    pub fn set_link_routing(&mut self, id: LinkId, routing: Routing) -> Result<(), ProtocolError> {
        self.require_open()?;
        let old = self.link_ref(id)?.routing();
        if old == routing {
            return Ok(());
        }
        self.push_change(Change::Link {
            id,
            field: LinkField::Routing { old, new: routing },
        });
        Ok(())
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Registers an observer and returns a handle for detaching it.
    pub fn subscribe(&mut self, observer: Box<dyn ModelObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer_id);
        self.next_observer_id += 1;
        self.observers.push((id, observer));
        id
    }

    /// Detaches an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn require_open(&self) -> Result<(), ProtocolError> {
        if self.open.is_some() {
            Ok(())
        } else {
            Err(ProtocolError::MutationOutsideTransaction)
        }
    }

    fn course_ref(&self, key: NodeKey) -> Result<&Course, ProtocolError> {
        self.courses.get(&key).ok_or(ProtocolError::UnknownNode(key))
    }

    fn semester_ref(&self, key: LaneKey) -> Result<&Semester, ProtocolError> {
        self.semesters.get(&key).ok_or(ProtocolError::UnknownLane(key))
    }

    fn link_ref(&self, id: LinkId) -> Result<&Prerequisite, ProtocolError> {
        self.links.get(&id).ok_or(ProtocolError::UnknownLink(id))
    }

    /// Applies a change to the stores and records it in the open transaction.
    ///
    /// Callers must have checked `require_open` first.
    fn push_change(&mut self, change: Change) {
        self.apply_change(&change);
        self.open
            .as_mut()
            .expect("Mutation requires an open transaction")
            .changes
            .push(change);
    }

    /// Applies a change to the stores without recording it.
    ///
    /// Used both for the forward direction during mutation and for
    /// replaying inverted or stored changes during rollback, undo, and
    /// redo. Field changes target records that the recorded history
    /// guarantees to exist.
    fn apply_change(&mut self, change: &Change) {
        match change {
            Change::AddCourse(course) => {
                self.courses.insert(course.key(), course.clone());
            }
            Change::RemoveCourse(course) => {
                self.courses.shift_remove(&course.key());
            }
            Change::AddSemester(semester) => {
                self.semesters.insert(semester.key(), semester.clone());
            }
            Change::RemoveSemester(semester) => {
                self.semesters.shift_remove(&semester.key());
            }
            Change::AddLink(id, link) => {
                self.links.insert(*id, link.clone());
            }
            Change::RemoveLink(id, _) => {
                self.links.shift_remove(id);
            }
            Change::Course { key, field } => {
                let course = self
                    .courses
                    .get_mut(key)
                    .expect("Course change should target an existing course");
                match field {
                    CourseField::Lane { new, .. } => course.set_lane(*new),
                    CourseField::Text { new, .. } => course.set_text(new.clone()),
                    CourseField::Color { new, .. } => course.set_color(*new),
                    CourseField::Hp { new, .. } => course.set_hp(*new),
                    CourseField::Ht { new, .. } => course.set_ht(*new),
                    CourseField::Category { new, .. } => course.set_category(new.clone()),
                    CourseField::Location { new, .. } => course.set_location(*new),
                }
            }
            Change::Semester { key, field } => {
                let semester = self
                    .semesters
                    .get_mut(key)
                    .expect("Semester change should target an existing semester");
                match field {
                    SemesterField::Label { new, .. } => semester.set_label(new.clone()),
                    SemesterField::Location { new, .. } => semester.set_location(*new),
                    SemesterField::Expanded { new, .. } => semester.set_expanded(*new),
                    SemesterField::SavedBreadth { new, .. } => semester.set_saved_breadth(*new),
                    SemesterField::Size { new, .. } => semester.set_size(*new),
                }
            }
            Change::Link { id, field } => {
                let link = self
                    .links
                    .get_mut(id)
                    .expect("Link change should target an existing link");
                match field {
                    LinkField::From { new, .. } => link.set_from(*new),
                    LinkField::To { new, .. } => link.set_to(*new),
                    LinkField::Points { new, .. } => link.set_points(new.clone()),
                    LinkField::Routing { new, .. } => link.set_routing(*new),
                }
            }
        }
    }

    fn notify(&mut self, label: &str) {
        // The observer list is parked so observers can borrow the model.
        // Subscribing requires `&mut self`, so the list cannot change
        // underneath the loop.
        let mut observers = std::mem::take(&mut self.observers);
        for (_, observer) in &mut observers {
            observer.transaction_finished(self, label);
        }
        self.observers = observers;
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphModel")
            .field("semesters", &self.semesters)
            .field("courses", &self.courses)
            .field("links", &self.links)
            .field("history", &self.history.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}
