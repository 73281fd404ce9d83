//! Semantic record types for the curriculum graph.
//!
//! These are the in-memory counterparts of the records found in graph
//! documents: a [`Course`] per node, a [`Semester`] per lane, and a
//! [`Prerequisite`] per link. They are plain data; all mutation policy
//! (transactions, validation) lives in the editor crate that owns them.

use std::{fmt, str::FromStr};

use crate::{
    geometry::{Point, Size},
    key::{LaneKey, NodeKey},
};

/// A course box: one node of the curriculum graph.
///
/// A course always belongs to exactly one semester lane. The `hp` and `ht`
/// counters are weekly practice/theory hours and stay at 1 or above; the
/// color is an index into the area palette, clamped on resolution rather
/// than validated here.
#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    key: NodeKey,
    lane: LaneKey,
    text: String,
    color: usize,
    hp: u32,
    ht: u32,
    category: String,
    location: Option<Point>,
}

impl Course {
    /// Creates a course with the defaults a freshly added node gets:
    /// color 0, one practice and one theory hour, category `"OB"`, and no
    /// location until a layout pass assigns one.
    pub fn new(key: NodeKey, lane: LaneKey, text: impl Into<String>) -> Self {
        Self {
            key,
            lane,
            text: text.into(),
            color: 0,
            hp: 1,
            ht: 1,
            category: "OB".to_string(),
            location: None,
        }
    }

    /// Sets the color index, consuming and returning the course.
    pub fn with_color(mut self, color: usize) -> Self {
        self.color = color;
        self
    }

    /// Sets both hour counters, consuming and returning the course.
    pub fn with_hours(mut self, hp: u32, ht: u32) -> Self {
        self.hp = hp;
        self.ht = ht;
        self
    }

    /// Sets the category tag, consuming and returning the course.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the location, consuming and returning the course.
    pub fn with_location(mut self, location: Point) -> Self {
        self.location = Some(location);
        self
    }

    /// Returns the course's key.
    pub fn key(&self) -> NodeKey {
        self.key
    }

    /// Returns the key of the lane this course belongs to.
    pub fn lane(&self) -> LaneKey {
        self.lane
    }

    /// Returns the display text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the color index into the area palette.
    pub fn color(&self) -> usize {
        self.color
    }

    /// Returns the weekly practice hours counter.
    pub fn hp(&self) -> u32 {
        self.hp
    }

    /// Returns the weekly theory hours counter.
    pub fn ht(&self) -> u32 {
        self.ht
    }

    /// Returns the free-form category tag.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the location, or `None` before the first layout pass.
    pub fn location(&self) -> Option<Point> {
        self.location
    }

    /// Moves the course to another lane.
    pub fn set_lane(&mut self, lane: LaneKey) {
        self.lane = lane;
    }

    /// Replaces the display text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Replaces the color index.
    pub fn set_color(&mut self, color: usize) {
        self.color = color;
    }

    /// Replaces the practice hours counter.
    pub fn set_hp(&mut self, hp: u32) {
        self.hp = hp;
    }

    /// Replaces the theory hours counter.
    pub fn set_ht(&mut self, ht: u32) {
        self.ht = ht;
    }

    /// Replaces the category tag.
    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    /// Replaces the location.
    pub fn set_location(&mut self, location: Option<Point>) {
        self.location = location;
    }
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// A semester lane: a ranked container partitioning courses.
///
/// Ranks give lanes their left-to-right order and drive the prerequisite
/// constraints. A lane whose `size` is `None` is sized automatically by
/// the next layout pass; `saved_breadth` remembers the width a collapsed
/// lane had so expanding restores it.
#[derive(Debug, Clone, PartialEq)]
pub struct Semester {
    key: LaneKey,
    rank: u32,
    label: String,
    location: Option<Point>,
    expanded: bool,
    saved_breadth: Option<f32>,
    size: Option<Size>,
}

impl Semester {
    /// Creates an expanded, automatically sized lane.
    pub fn new(key: LaneKey, rank: u32, label: impl Into<String>) -> Self {
        Self {
            key,
            rank,
            label: label.into(),
            location: None,
            expanded: true,
            saved_breadth: None,
            size: None,
        }
    }

    /// Sets the location, consuming and returning the lane.
    pub fn with_location(mut self, location: Point) -> Self {
        self.location = Some(location);
        self
    }

    /// Sets the expansion state, consuming and returning the lane.
    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    /// Sets the remembered breadth, consuming and returning the lane.
    pub fn with_saved_breadth(mut self, breadth: f32) -> Self {
        self.saved_breadth = Some(breadth);
        self
    }

    /// Sets an explicit size, consuming and returning the lane.
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    /// Returns the lane's key.
    pub fn key(&self) -> LaneKey {
        self.key
    }

    /// Returns the lane's ordinal rank.
    pub fn rank(&self) -> u32 {
        self.rank
    }

    /// Returns the display label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the location, or `None` before the first layout pass.
    pub fn location(&self) -> Option<Point> {
        self.location
    }

    /// Returns true when the lane is expanded.
    pub fn expanded(&self) -> bool {
        self.expanded
    }

    /// Returns the breadth remembered at collapse time, if any.
    pub fn saved_breadth(&self) -> Option<f32> {
        self.saved_breadth
    }

    /// Returns the explicit size, or `None` when the lane is sized
    /// automatically.
    pub fn size(&self) -> Option<Size> {
        self.size
    }

    /// Replaces the display label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// Replaces the location.
    pub fn set_location(&mut self, location: Option<Point>) {
        self.location = location;
    }

    /// Replaces the expansion state.
    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    /// Replaces the remembered breadth.
    pub fn set_saved_breadth(&mut self, breadth: Option<f32>) {
        self.saved_breadth = breadth;
    }

    /// Replaces the explicit size; `None` returns the lane to automatic
    /// sizing.
    pub fn set_size(&mut self, size: Option<Size>) {
        self.size = size;
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// How a link finds its path between two courses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Routing {
    /// Routed around intervening nodes; the default.
    #[default]
    AvoidsNodes,
    /// Orthogonal segments; set once the user manually reshapes a link.
    Orthogonal,
}

impl Routing {
    /// Returns the name used in graph documents.
    pub fn name(self) -> &'static str {
        match self {
            Routing::AvoidsNodes => "AvoidsNodes",
            Routing::Orthogonal => "Orthogonal",
        }
    }
}

impl fmt::Display for Routing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Routing {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Documents written by older hosts prefix the enclosing class name.
        let name = s.strip_prefix("Link.").unwrap_or(s);
        match name {
            "AvoidsNodes" => Ok(Routing::AvoidsNodes),
            "Orthogonal" => Ok(Routing::Orthogonal),
            _ => Err("Invalid routing value"),
        }
    }
}

/// A prerequisite link: a directed edge from an earlier course to a later
/// one.
///
/// Waypoints are only present once the user manually reshapes the link;
/// an empty list means the router decides the path.
#[derive(Debug, Clone, PartialEq)]
pub struct Prerequisite {
    from: NodeKey,
    to: NodeKey,
    points: Vec<Point>,
    routing: Routing,
}

impl Prerequisite {
    /// Creates a link with default routing and no manual waypoints.
    pub fn new(from: NodeKey, to: NodeKey) -> Self {
        Self {
            from,
            to,
            points: Vec::new(),
            routing: Routing::default(),
        }
    }

    /// Sets manual waypoints, consuming and returning the link.
    pub fn with_points(mut self, points: Vec<Point>) -> Self {
        self.points = points;
        self
    }

    /// Sets the routing mode, consuming and returning the link.
    pub fn with_routing(mut self, routing: Routing) -> Self {
        self.routing = routing;
        self
    }

    /// Returns the source course key.
    pub fn from(&self) -> NodeKey {
        self.from
    }

    /// Returns the target course key.
    pub fn to(&self) -> NodeKey {
        self.to
    }

    /// Returns the manual waypoints; empty when the route is automatic.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Returns the routing mode.
    pub fn routing(&self) -> Routing {
        self.routing
    }

    /// Reconnects the source end.
    pub fn set_from(&mut self, from: NodeKey) {
        self.from = from;
    }

    /// Reconnects the target end.
    pub fn set_to(&mut self, to: NodeKey) {
        self.to = to;
    }

    /// Replaces the manual waypoints.
    pub fn set_points(&mut self, points: Vec<Point>) {
        self.points = points;
    }

    /// Replaces the routing mode.
    pub fn set_routing(&mut self, routing: Routing) {
        self.routing = routing;
    }

    /// True when either end attaches to the given course.
    pub fn touches(&self, key: NodeKey) -> bool {
        self.from == key || self.to == key
    }
}

impl fmt::Display for Prerequisite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}
