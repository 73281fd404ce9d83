//! The pool layout: one row of equal-length semester lanes.
//!
//! Curriculum maps render as a pool of vertical lanes, one per semester,
//! packed left to right in rank order. Every lane is exactly as long as
//! the pool and the pool exactly as long as its tallest expanded lane
//! needs; inside each expanded lane the member courses stack in a single
//! column.
//!
//! # Architecture
//!
//! The engine is split into a pure and an applying half:
//! - [`PoolLayout::compute`] reads a model and produces a [`LayoutPlan`]
//!   with target geometry for every lane and every visible member
//! - [`PoolLayout::run`] diffs a plan against the model and applies only
//!   the differences, inside its own transaction, so layout repair
//!   participates in the same undo history as the gesture that caused it
//!
//! When a plan matches the current state, `run` opens no transaction and
//! nobody is notified, which keeps the pass idempotent.

use log::{debug, trace};

use malla_core::{
    geometry::{Insets, Point, Size},
    key::{LaneKey, NodeKey},
    semantic::{Course, Semester},
};

use crate::{
    config::LayoutConfig,
    model::{GraphModel, ProtocolError},
};

/// Average glyph width as a fraction of the font size, used to estimate
/// header label widths without a font system.
const CHAR_WIDTH_FACTOR: f32 = 0.55;

/// Vertical margin above the header label text.
const HEADER_TEXT_MARGIN: f32 = 2.0;

/// Target geometry for one lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LanePlan {
    key: LaneKey,
    location: Point,
    size: Size,
}

impl LanePlan {
    /// Returns the lane this plan is for.
    pub fn key(&self) -> LaneKey {
        self.key
    }

    /// Returns the lane's target top-left corner.
    pub fn location(&self) -> Point {
        self.location
    }

    /// Returns the lane's target size, breadth by length.
    pub fn size(&self) -> Size {
        self.size
    }
}

/// Target position for one member course.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPlan {
    key: NodeKey,
    location: Point,
}

impl MemberPlan {
    /// Returns the course this plan is for.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Returns the course's target top-left corner.
    pub fn location(&self) -> Point {
        self.location
    }
}

/// The computed target geometry for a whole model.
///
/// Lanes appear in rank order. Members of collapsed lanes are absent;
/// they are hidden and keep whatever location they had.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayoutPlan {
    lanes: Vec<LanePlan>,
    members: Vec<MemberPlan>,
}

impl LayoutPlan {
    /// Returns the lane plans in rank order.
    pub fn lanes(&self) -> &[LanePlan] {
        &self.lanes
    }

    /// Returns the member plans, grouped by lane in rank order.
    pub fn members(&self) -> &[MemberPlan] {
        &self.members
    }

    /// Returns the plan for the given lane.
    pub fn lane(&self, key: LaneKey) -> Option<&LanePlan> {
        self.lanes.iter().find(|lane| lane.key == key)
    }

    /// Returns the plan for the given course.
    pub fn member(&self, key: NodeKey) -> Option<&MemberPlan> {
        self.members.iter().find(|member| member.key == key)
    }
}

/// The lane sizing and packing engine.
pub struct PoolLayout {
    config: LayoutConfig,
}

impl PoolLayout {
    /// Label of the transaction [`PoolLayout::run`] commits its repairs in.
    pub const LABEL: &'static str = "PoolLayout";

    /// Creates an engine with the given metrics.
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Computes target geometry for every lane and visible member.
    ///
    /// Pure: reads the model, mutates nothing.
    pub fn compute(&self, model: &GraphModel) -> LayoutPlan {
        let padding = Insets::uniform(self.config.lane_padding());

        // Member columns keep their visual order: stable sort by current
        // vertical position, with unplaced members sinking to the end.
        let columns: Vec<(&Semester, Vec<&Course>)> = model
            .semesters_by_rank()
            .into_iter()
            .map(|semester| {
                let mut members: Vec<&Course> = model.members_of(semester.key()).collect();
                members.sort_by(|a, b| sort_position(a).total_cmp(&sort_position(b)));
                (semester, members)
            })
            .collect();

        // Every lane is as long as the tallest expanded lane's content,
        // with a floor so an empty pool still has presence.
        let mut pool_length = self.config.min_length();
        for (semester, members) in &columns {
            if semester.expanded() {
                let content = self.column_height(members.len()) + padding.vertical_sum();
                pool_length = pool_length.max(content);
            }
        }

        let header_height = self.header_height();
        let mut lanes = Vec::with_capacity(columns.len());
        let mut planned_members = Vec::new();
        let mut x = 0.0;
        for (semester, members) in &columns {
            let computed = if semester.expanded() {
                let column_width = if members.is_empty() {
                    0.0
                } else {
                    self.config.course_width()
                };
                self.config
                    .min_breadth()
                    .max(column_width + padding.horizontal_sum())
                    .max(self.header_width(semester))
            } else {
                // Collapsed lanes shrink to the expander button; the
                // label is hidden with the subgraph.
                self.header_width(semester)
            };
            // Breadth is monotonic against an explicit size: a lane the
            // user or a previous pass widened never narrows on its own.
            // Length is always snapped to the pool, down included.
            let breadth = match semester.size() {
                Some(size) => computed.max(size.width()),
                None => computed,
            };
            let size = Size::new(
                ceil_to_cell(breadth, self.config.resize_cell_width()),
                ceil_to_cell(pool_length, self.config.resize_cell_height()),
            );

            if semester.expanded() {
                let mut y = header_height + padding.top();
                for member in members {
                    planned_members.push(MemberPlan {
                        key: member.key(),
                        location: Point::new(x + padding.left(), y),
                    });
                    y += self.config.course_height() + self.config.member_spacing();
                }
            }

            lanes.push(LanePlan {
                key: semester.key(),
                location: Point::new(x, 0.0),
                size,
            });
            x += size.width();
        }

        LayoutPlan {
            lanes,
            members: planned_members,
        }
    }

    /// Applies a freshly computed plan to the model.
    ///
    /// Differences are committed in a single [`PoolLayout::LABEL`]
    /// transaction. Returns whether anything changed; when nothing does,
    /// no transaction is opened.
    ///
    /// # Errors
    ///
    /// Fails with [`ProtocolError::TransactionAlreadyOpen`] if called
    /// while the caller still has a transaction open.
    pub fn run(&self, model: &mut GraphModel) -> Result<bool, ProtocolError> {
        let plan = self.compute(model);

        let mut lane_diffs: Vec<(LaneKey, Option<Point>, Option<Size>)> = Vec::new();
        for lane in plan.lanes() {
            let semester = model
                .semester(lane.key())
                .expect("Planned lane should exist in the model");
            let location =
                (semester.location() != Some(lane.location())).then_some(lane.location());
            let size = (semester.size() != Some(lane.size())).then_some(lane.size());
            if location.is_some() || size.is_some() {
                lane_diffs.push((lane.key(), location, size));
            }
        }

        let mut member_diffs: Vec<(NodeKey, Point)> = Vec::new();
        for member in plan.members() {
            let course = model
                .course(member.key())
                .expect("Planned member should exist in the model");
            if course.location() != Some(member.location()) {
                member_diffs.push((member.key(), member.location()));
            }
        }

        if lane_diffs.is_empty() && member_diffs.is_empty() {
            trace!("Pool layout already satisfied");
            return Ok(false);
        }

        let lane_count = lane_diffs.len();
        let member_count = member_diffs.len();
        model.begin(Self::LABEL)?;
        for (key, location, size) in lane_diffs {
            if let Some(location) = location {
                model.set_semester_location(key, Some(location))?;
            }
            if let Some(size) = size {
                model.set_semester_size(key, Some(size))?;
            }
        }
        for (key, location) in member_diffs {
            model.set_course_location(key, Some(location))?;
        }
        model.commit()?;
        debug!(lanes = lane_count, members = member_count; "Pool layout applied");
        Ok(true)
    }

    /// Height of the lane header above the resizable body.
    fn header_height(&self) -> f32 {
        self.config
            .header_expander_extent()
            .max(self.config.header_font_size() + 2.0 * HEADER_TEXT_MARGIN)
    }

    /// Estimated width of a lane's header row.
    ///
    /// The label is measured with the per-character heuristic; collapsed
    /// lanes hide the label and keep only the expander.
    fn header_width(&self, semester: &Semester) -> f32 {
        let label_width = if semester.expanded() {
            semester.label().len() as f32 * (self.config.header_font_size() * CHAR_WIDTH_FACTOR)
        } else {
            0.0
        };
        self.config.header_expander_extent() + label_width
    }

    /// Height of a column of `count` stacked course boxes.
    fn column_height(&self, count: usize) -> f32 {
        if count == 0 {
            return 0.0;
        }
        let count = count as f32;
        count * self.config.course_height() + (count - 1.0) * self.config.member_spacing()
    }
}

/// Sort key for member ordering; unplaced members go last.
fn sort_position(course: &Course) -> f32 {
    course
        .location()
        .map_or(f32::INFINITY, |location| location.y())
}

/// Rounds up to the next multiple of the resize grid cell.
fn ceil_to_cell(value: f32, cell: f32) -> f32 {
    if cell.is_finite() && cell > 0.0 {
        (value / cell).ceil() * cell
    } else {
        value
    }
}
