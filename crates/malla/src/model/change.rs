//! Change records for undoable transactions.
//!
//! Every mutation the model performs is captured as a [`Change`] holding
//! enough information to replay or reverse itself. Field-level changes
//! carry both the old and the new value; inverting a change swaps them.

use malla_core::{
    geometry::{Point, Size},
    key::{LaneKey, NodeKey},
    semantic::{Course, Prerequisite, Routing, Semester},
};

use crate::model::LinkId;

/// One recorded mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A course was inserted.
    AddCourse(Course),
    /// A course was removed; the record is kept so undo can restore it.
    RemoveCourse(Course),
    /// A lane was inserted.
    AddSemester(Semester),
    /// A lane was removed.
    RemoveSemester(Semester),
    /// A link was inserted under the given model-internal id.
    AddLink(LinkId, Prerequisite),
    /// A link was removed.
    RemoveLink(LinkId, Prerequisite),
    /// A single course field changed.
    Course { key: NodeKey, field: CourseField },
    /// A single lane field changed.
    Semester { key: LaneKey, field: SemesterField },
    /// A single link field changed.
    Link { id: LinkId, field: LinkField },
}

impl Change {
    /// Returns the change that undoes this one.
    pub fn inverted(&self) -> Change {
        match self {
            Change::AddCourse(course) => Change::RemoveCourse(course.clone()),
            Change::RemoveCourse(course) => Change::AddCourse(course.clone()),
            Change::AddSemester(semester) => Change::RemoveSemester(semester.clone()),
            Change::RemoveSemester(semester) => Change::AddSemester(semester.clone()),
            Change::AddLink(id, link) => Change::RemoveLink(*id, link.clone()),
            Change::RemoveLink(id, link) => Change::AddLink(*id, link.clone()),
            Change::Course { key, field } => Change::Course {
                key: *key,
                field: field.inverted(),
            },
            Change::Semester { key, field } => Change::Semester {
                key: *key,
                field: field.inverted(),
            },
            Change::Link { id, field } => Change::Link {
                id: *id,
                field: field.inverted(),
            },
        }
    }
}

/// Old and new value of a single course field.
#[derive(Debug, Clone, PartialEq)]
pub enum CourseField {
    Lane { old: LaneKey, new: LaneKey },
    Text { old: String, new: String },
    Color { old: usize, new: usize },
    Hp { old: u32, new: u32 },
    Ht { old: u32, new: u32 },
    Category { old: String, new: String },
    Location { old: Option<Point>, new: Option<Point> },
}

impl CourseField {
    fn inverted(&self) -> CourseField {
        match self.clone() {
            CourseField::Lane { old, new } => CourseField::Lane { old: new, new: old },
            CourseField::Text { old, new } => CourseField::Text { old: new, new: old },
            CourseField::Color { old, new } => CourseField::Color { old: new, new: old },
            CourseField::Hp { old, new } => CourseField::Hp { old: new, new: old },
            CourseField::Ht { old, new } => CourseField::Ht { old: new, new: old },
            CourseField::Category { old, new } => CourseField::Category { old: new, new: old },
            CourseField::Location { old, new } => CourseField::Location { old: new, new: old },
        }
    }
}

/// Old and new value of a single lane field.
#[derive(Debug, Clone, PartialEq)]
pub enum SemesterField {
    Label { old: String, new: String },
    Location { old: Option<Point>, new: Option<Point> },
    Expanded { old: bool, new: bool },
    SavedBreadth { old: Option<f32>, new: Option<f32> },
    Size { old: Option<Size>, new: Option<Size> },
}

impl SemesterField {
    fn inverted(&self) -> SemesterField {
        match self.clone() {
            SemesterField::Label { old, new } => SemesterField::Label { old: new, new: old },
            SemesterField::Location { old, new } => SemesterField::Location { old: new, new: old },
            SemesterField::Expanded { old, new } => SemesterField::Expanded { old: new, new: old },
            SemesterField::SavedBreadth { old, new } => {
                SemesterField::SavedBreadth { old: new, new: old }
            }
            SemesterField::Size { old, new } => SemesterField::Size { old: new, new: old },
        }
    }
}

/// Old and new value of a single link field.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkField {
    From { old: NodeKey, new: NodeKey },
    To { old: NodeKey, new: NodeKey },
    Points { old: Vec<Point>, new: Vec<Point> },
    Routing { old: Routing, new: Routing },
}

impl LinkField {
    fn inverted(&self) -> LinkField {
        match self.clone() {
            LinkField::From { old, new } => LinkField::From { old: new, new: old },
            LinkField::To { old, new } => LinkField::To { old: new, new: old },
            LinkField::Points { old, new } => LinkField::Points { old: new, new: old },
            LinkField::Routing { old, new } => LinkField::Routing { old: new, new: old },
        }
    }
}

/// A committed transaction: its label and the changes it made, in order.
#[derive(Debug, Clone)]
pub struct Transaction {
    label: String,
    changes: Vec<Change>,
}

impl Transaction {
    pub(crate) fn new(label: String, changes: Vec<Change>) -> Self {
        Self { label, changes }
    }

    /// Returns the label the transaction was opened with.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the recorded changes in application order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }
}
