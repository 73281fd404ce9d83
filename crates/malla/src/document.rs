//! Reading and writing `go.GraphLinksModel` documents.
//!
//! The host application persists curricula as the JSON produced by GoJS's
//! `Model.toJson`: a `class` marker, one `nodeDataArray` holding lanes and
//! courses together, and one `linkDataArray`. This module converts between
//! that format and [`GraphModel`].
//!
//! Wire conventions worth knowing:
//! - Lanes are the entries with a string key and `"isGroup": true`;
//!   courses have integer keys and a `"group"` referencing their lane.
//! - Coordinates travel as `"x y"` strings, link routes as flat
//!   `[x, y, x, y, ...]` arrays.
//! - Link routing serializes as the enum name (`"AvoidsNodes"`,
//!   `"Orthogonal"`); the `"Link."`-prefixed spelling found in older
//!   documents is accepted on input.
//! - Links carry no keys; their identity is positional.
//!
//! Deserialization validates the whole document before building a model:
//! referential integrity, rank uniqueness, counter ranges, and the
//! semester ordering rule all fail fast with a [`DocumentError`].

use std::str::FromStr;

use log::{debug, info};
use serde::{Deserialize, Deserializer, Serialize, de};
use thiserror::Error;

use malla_core::{
    geometry::{Point, Size},
    key::{LaneKey, NodeKey},
    semantic::{Course, Prerequisite, Routing, Semester},
};

use crate::{model::GraphModel, validate};

/// The only model class this adapter understands.
pub const CLASS: &str = "go.GraphLinksModel";

/// Number of lanes in a freshly seeded curriculum.
const SEED_LANES: u32 = 10;

/// Errors raised while reading a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The `class` field names a model kind this adapter does not read.
    #[error("Unsupported model class '{0}'")]
    UnsupportedClass(String),

    /// The payload is not the JSON shape this adapter expects.
    #[error("Invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two lanes share a key.
    #[error("Duplicate lane '{0}'")]
    DuplicateLane(String),

    /// Two nodes share a key.
    #[error("Duplicate node key {0}")]
    DuplicateNode(i64),

    /// A lane has no `rank` and no trailing number in its key to fall
    /// back on.
    #[error("Lane '{0}' has no usable rank")]
    MissingRank(String),

    /// Two lanes resolve to the same rank.
    #[error("Lanes '{0}' and '{1}' share rank {2}")]
    DuplicateRank(String, String, u32),

    /// A course names a lane the document does not define.
    #[error("Node {0} references unknown lane '{1}'")]
    UnknownLane(i64, String),

    /// A course has no `group` field at all.
    #[error("Node {0} is not assigned to any lane")]
    NodeWithoutLane(i64),

    /// A link endpoint names a node the document does not define.
    #[error("Link references unknown node {0}")]
    UnknownNode(i64),

    /// A `loc` or `size` string failed to parse.
    #[error("Invalid geometry for '{key}': {message}")]
    Geometry { key: String, message: String },

    /// A link's flat point array has an odd number of coordinates.
    #[error("Link {from} -> {to} has an odd number of point coordinates")]
    OddPoints { from: i64, to: i64 },

    /// An hour counter is outside the storable range: a whole number of
    /// at least 1.
    #[error("Node {key}: {field} is outside the valid counter range")]
    CounterOutOfRange { key: i64, field: &'static str },

    /// A link points from a later semester to an earlier one.
    #[error("Link {0} -> {1} violates semester ordering")]
    OrderingViolation(i64, i64),
}

/// A curriculum document in wire shape.
///
/// Field layout mirrors `go.GraphLinksModel` JSON exactly; this type
/// round-trips through [`serde_json`] untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    class: String,
    #[serde(rename = "nodeDataArray", default)]
    node_data_array: Vec<PartData>,
    #[serde(rename = "linkDataArray", default)]
    link_data_array: Vec<LinkData>,
}

/// One entry of `nodeDataArray`: either a lane or a course.
///
/// Lane first: its required string key and `isGroup` flag make the two
/// shapes disjoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum PartData {
    Lane(LaneData),
    Course(CourseData),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LaneData {
    key: String,
    #[serde(rename = "isGroup")]
    is_group: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rank: Option<u32>,
    #[serde(default)]
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    size: Option<String>,
    #[serde(default = "default_expanded")]
    expanded: bool,
    #[serde(
        rename = "savedBreadth",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    saved_breadth: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CourseData {
    key: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default, deserialize_with = "flexible_number")]
    color: i64,
    #[serde(rename = "HP", default = "default_counter", deserialize_with = "flexible_number")]
    hp: i64,
    #[serde(rename = "HT", default = "default_counter", deserialize_with = "flexible_number")]
    ht: i64,
    #[serde(default = "default_category")]
    tipo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    loc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LinkData {
    from: i64,
    to: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    points: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    routing: Option<String>,
}

fn default_expanded() -> bool {
    true
}

fn default_counter() -> i64 {
    1
}

fn default_category() -> String {
    "OB".to_string()
}

/// Narrows a wire counter to the model's range.
///
/// Counters are stored as `u32` and must be at least 1; anything the
/// field cannot hold exactly is rejected rather than wrapped.
fn wire_counter(value: i64) -> Option<u32> {
    u32::try_from(value).ok().filter(|&hours| hours >= 1)
}

/// Accepts a number either as a JSON number or as a numeric string.
///
/// Documents written by older host versions carry counters and color
/// indices as strings; the original front end ran `parseInt` over them.
fn flexible_number<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: Deserialize<'de> + FromStr,
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Number(T),
        Text(String),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid numeric string '{text}'"))),
    }
}

impl Document {
    /// Parses a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the document to JSON.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the document's model class marker.
    pub fn class(&self) -> &str {
        &self.class
    }

    /// A fresh curriculum: ten empty lanes ranked one through ten.
    pub fn seed() -> Self {
        let lanes = (1..=SEED_LANES)
            .map(|rank| {
                PartData::Lane(LaneData {
                    key: format!("semestre{rank}"),
                    is_group: true,
                    rank: Some(rank),
                    text: rank.to_string(),
                    loc: None,
                    size: None,
                    expanded: true,
                    saved_breadth: None,
                })
            })
            .collect();
        Self {
            class: CLASS.to_string(),
            node_data_array: lanes,
            link_data_array: Vec::new(),
        }
    }

    /// Snapshots a model into wire shape.
    ///
    /// Lanes come first in `nodeDataArray`, then courses, each in model
    /// insertion order; links keep their model order.
    pub fn from_model(model: &GraphModel) -> Self {
        let mut node_data_array =
            Vec::with_capacity(model.semester_count() + model.course_count());
        for semester in model.semesters() {
            node_data_array.push(PartData::Lane(LaneData {
                key: semester.key().to_string(),
                is_group: true,
                rank: Some(semester.rank()),
                text: semester.label().to_string(),
                loc: semester.location().map(Point::to_coord_string),
                size: semester.size().map(Size::to_coord_string),
                expanded: semester.expanded(),
                saved_breadth: semester.saved_breadth(),
            }));
        }
        for course in model.courses() {
            node_data_array.push(PartData::Course(CourseData {
                key: course.key().value(),
                group: Some(course.lane().to_string()),
                text: course.text().to_string(),
                color: course.color() as i64,
                hp: i64::from(course.hp()),
                ht: i64::from(course.ht()),
                tipo: course.category().to_string(),
                loc: course.location().map(Point::to_coord_string),
            }));
        }

        let link_data_array = model
            .links()
            .map(|(_, link)| LinkData {
                from: link.from().value(),
                to: link.to().value(),
                points: if link.points().is_empty() {
                    None
                } else {
                    Some(
                        link.points()
                            .iter()
                            .flat_map(|point| [point.x(), point.y()])
                            .collect(),
                    )
                },
                routing: Some(link.routing().name().to_string()),
            })
            .collect();

        Self {
            class: CLASS.to_string(),
            node_data_array,
            link_data_array,
        }
    }

    /// Validates the document and builds a model from it.
    ///
    /// All checks run against the wire data before any model exists, so a
    /// bad document never yields a half-built model.
    pub fn into_model(self) -> Result<GraphModel, DocumentError> {
        if self.class != CLASS {
            return Err(DocumentError::UnsupportedClass(self.class));
        }

        let mut lane_data = Vec::new();
        let mut course_data = Vec::new();
        for part in self.node_data_array {
            match part {
                PartData::Lane(lane) => lane_data.push(lane),
                PartData::Course(course) => course_data.push(course),
            }
        }

        let mut semesters: Vec<Semester> = Vec::with_capacity(lane_data.len());
        for lane in &lane_data {
            if semesters.iter().any(|s| s.key() == lane.key.as_str()) {
                return Err(DocumentError::DuplicateLane(lane.key.clone()));
            }
            let key = LaneKey::new(&lane.key);
            // Older documents carry no rank; the lane key's trailing
            // number ("semestre7") stands in for it.
            let rank = lane
                .rank
                .or_else(|| key.trailing_number())
                .ok_or_else(|| DocumentError::MissingRank(lane.key.clone()))?;
            if let Some(taken) = semesters.iter().find(|s| s.rank() == rank) {
                return Err(DocumentError::DuplicateRank(
                    taken.key().to_string(),
                    lane.key.clone(),
                    rank,
                ));
            }
            let mut semester =
                Semester::new(key, rank, lane.text.clone()).with_expanded(lane.expanded);
            if let Some(loc) = &lane.loc {
                let location = Point::from_coord_str(loc).map_err(|message| {
                    DocumentError::Geometry {
                        key: lane.key.clone(),
                        message,
                    }
                })?;
                semester = semester.with_location(location);
            }
            if let Some(size) = &lane.size {
                let size = Size::from_coord_str(size).map_err(|message| {
                    DocumentError::Geometry {
                        key: lane.key.clone(),
                        message,
                    }
                })?;
                semester = semester.with_size(size);
            }
            if let Some(saved) = lane.saved_breadth {
                semester = semester.with_saved_breadth(saved);
            }
            semesters.push(semester);
        }

        let mut courses: Vec<Course> = Vec::with_capacity(course_data.len());
        for data in &course_data {
            if courses.iter().any(|c| c.key().value() == data.key) {
                return Err(DocumentError::DuplicateNode(data.key));
            }
            let group = data
                .group
                .as_ref()
                .ok_or(DocumentError::NodeWithoutLane(data.key))?;
            if !semesters.iter().any(|s| s.key() == group.as_str()) {
                return Err(DocumentError::UnknownLane(data.key, group.clone()));
            }
            let hp = wire_counter(data.hp).ok_or(DocumentError::CounterOutOfRange {
                key: data.key,
                field: "HP",
            })?;
            let ht = wire_counter(data.ht).ok_or(DocumentError::CounterOutOfRange {
                key: data.key,
                field: "HT",
            })?;
            // Color indices stay lenient like the front end: negatives
            // clamp to the first slot here, oversized values saturate
            // and the palette clamps them at lookup.
            let color = usize::try_from(data.color.max(0)).unwrap_or(usize::MAX);
            let mut course = Course::new(
                NodeKey::new(data.key),
                LaneKey::new(group),
                data.text.clone(),
            )
            .with_color(color)
            .with_hours(hp, ht)
            .with_category(data.tipo.clone());
            if let Some(loc) = &data.loc {
                let location = Point::from_coord_str(loc).map_err(|message| {
                    DocumentError::Geometry {
                        key: data.key.to_string(),
                        message,
                    }
                })?;
                course = course.with_location(location);
            }
            courses.push(course);
        }

        let mut links: Vec<Prerequisite> = Vec::with_capacity(self.link_data_array.len());
        for data in &self.link_data_array {
            for endpoint in [data.from, data.to] {
                if !courses.iter().any(|c| c.key().value() == endpoint) {
                    return Err(DocumentError::UnknownNode(endpoint));
                }
            }
            let mut link = Prerequisite::new(NodeKey::new(data.from), NodeKey::new(data.to));
            if let Some(flat) = &data.points {
                if flat.len() % 2 != 0 {
                    return Err(DocumentError::OddPoints {
                        from: data.from,
                        to: data.to,
                    });
                }
                let points = flat
                    .chunks_exact(2)
                    .map(|pair| Point::new(pair[0], pair[1]))
                    .collect();
                link = link.with_points(points);
            }
            if let Some(routing) = &data.routing {
                // Unknown names fall back to the default, matching the
                // front end's lenient enum parsing.
                link = link.with_routing(Routing::from_str(routing).unwrap_or_default());
            }
            links.push(link);
        }

        let model = GraphModel::from_parts(semesters, courses, links);
        if let Some((from, to)) = validate::find_ordering_violation(&model) {
            return Err(DocumentError::OrderingViolation(from.value(), to.value()));
        }

        info!(
            lanes = model.semester_count(),
            courses = model.course_count(),
            links = model.link_count();
            "Document loaded"
        );
        Ok(model)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::seed()
    }
}

/// Something that receives the serialized document after every finished
/// transaction, typically the host page's form field.
pub trait Host {
    /// Called with the fresh document snapshot.
    fn document_changed(&mut self, document: &Document);
}

/// Model observer that pushes a [`Document`] snapshot to a [`Host`].
pub(crate) struct DocumentSync {
    host: Box<dyn Host>,
}

impl DocumentSync {
    pub(crate) fn new(host: Box<dyn Host>) -> Self {
        Self { host }
    }
}

impl crate::model::ModelObserver for DocumentSync {
    fn transaction_finished(&mut self, model: &GraphModel, label: &str) {
        debug!(label:%; "Publishing document");
        let document = Document::from_model(model);
        self.host.document_changed(&document);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_model() -> GraphModel {
        let mut model = Document::seed().into_model().unwrap();
        model.begin("build").unwrap();
        let a = model
            .add_course(LaneKey::new("semestre1"), "Algoritmos")
            .unwrap();
        let b = model.add_course(LaneKey::new("semestre3"), "Datos").unwrap();
        model.set_course_color(a, 2).unwrap();
        model.set_course_hp(a, 4).unwrap();
        model.set_course_ht(a, 2).unwrap();
        model
            .set_course_location(a, Some(Point::new(12.0, 37.0)))
            .unwrap();
        let id = model.add_link(a, b).unwrap();
        model
            .set_link_points(id, vec![Point::new(0.0, 1.5), Point::new(2.0, 3.0)])
            .unwrap();
        model.set_link_routing(id, Routing::Orthogonal).unwrap();
        model.commit().unwrap();
        model
    }

    #[test]
    fn test_seed_has_ten_ranked_lanes() {
        let model = Document::seed().into_model().unwrap();

        assert_eq!(model.semester_count(), 10);
        assert_eq!(model.course_count(), 0);
        let ranks: Vec<u32> = model.semesters_by_rank().iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<u32>>());
        assert_eq!(
            model.first_semester().unwrap().key(),
            LaneKey::new("semestre1")
        );
        assert!(model.semesters().all(Semester::expanded));
    }

    #[test]
    fn test_model_round_trips_through_wire_shape() {
        let model = build_model();

        let document = Document::from_model(&model);
        let json = document.to_json().unwrap();
        let reloaded = Document::from_json(&json).unwrap();
        assert_eq!(document, reloaded);

        let restored = reloaded.into_model().unwrap();
        assert_eq!(Document::from_model(&restored), document);
    }

    #[test]
    fn test_round_trip_preserves_course_fields() {
        let model = build_model();
        let key = NodeKey::new(-1);

        let restored = Document::from_model(&model).into_model().unwrap();
        let course = restored.course(key).unwrap();

        assert_eq!(course.text(), "Algoritmos");
        assert_eq!(course.color(), 2);
        assert_eq!(course.hp(), 4);
        assert_eq!(course.ht(), 2);
        assert_eq!(course.category(), "OB");
        assert_eq!(course.location(), Some(Point::new(12.0, 37.0)));
    }

    #[test]
    fn test_round_trip_preserves_link_route() {
        let model = build_model();

        let restored = Document::from_model(&model).into_model().unwrap();
        let (_, link) = restored.links().next().unwrap();

        assert_eq!(link.points(), &[Point::new(0.0, 1.5), Point::new(2.0, 3.0)]);
        assert_eq!(link.routing(), Routing::Orthogonal);
    }

    #[test]
    fn test_unsupported_class_is_rejected() {
        let document = Document::from_json(
            r#"{"class": "go.TreeModel", "nodeDataArray": [], "linkDataArray": []}"#,
        )
        .unwrap();

        let err = document.into_model().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported model class 'go.TreeModel'");
    }

    #[test]
    fn test_lane_rank_falls_back_to_trailing_number() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre7", "isGroup": true, "text": "7"},
                    {"key": "semestre10", "isGroup": true, "text": "10"}
                ]
            }"#,
        )
        .unwrap();

        let model = document.into_model().unwrap();

        assert_eq!(model.semester(LaneKey::new("semestre7")).unwrap().rank(), 7);
        assert_eq!(
            model.semester(LaneKey::new("semestre10")).unwrap().rank(),
            10
        );
    }

    #[test]
    fn test_explicit_rank_wins_over_trailing_number() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre9", "isGroup": true, "rank": 2, "text": "2"}
                ]
            }"#,
        )
        .unwrap();

        let model = document.into_model().unwrap();
        assert_eq!(model.semester(LaneKey::new("semestre9")).unwrap().rank(), 2);
    }

    #[test]
    fn test_lane_without_any_rank_is_rejected() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [{"key": "electivas", "isGroup": true}]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            document.into_model(),
            Err(DocumentError::MissingRank(key)) if key == "electivas"
        ));
    }

    #[test]
    fn test_duplicate_rank_is_rejected() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": "primero", "isGroup": true, "rank": 1}
                ]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            document.into_model(),
            Err(DocumentError::DuplicateRank(_, _, 1))
        ));
    }

    #[test]
    fn test_course_in_unknown_lane_is_rejected() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": 4, "group": "semestre9", "text": "x"}
                ]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            document.into_model(),
            Err(DocumentError::UnknownLane(4, lane)) if lane == "semestre9"
        ));
    }

    #[test]
    fn test_link_to_unknown_node_is_rejected() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": 1, "group": "semestre1"}
                ],
                "linkDataArray": [{"from": 1, "to": 99}]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            document.into_model(),
            Err(DocumentError::UnknownNode(99))
        ));
    }

    #[test]
    fn test_zero_counter_is_rejected() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": 1, "group": "semestre1", "HP": 0}
                ]
            }"#,
        )
        .unwrap();

        let err = document.into_model().unwrap_err();
        assert_eq!(err.to_string(), "Node 1: HP is outside the valid counter range");
    }

    #[test]
    fn test_oversized_counter_is_rejected() {
        // 2^32 would wrap to 0 and 2^32 + 1 to a plausible 1 if the
        // load narrowed counters by truncation.
        let hp_overflow = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": 1, "group": "semestre1", "HP": 4294967296}
                ]
            }"#,
        )
        .unwrap();
        let ht_overflow = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": 1, "group": "semestre1", "HT": 4294967297}
                ]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            hp_overflow.into_model(),
            Err(DocumentError::CounterOutOfRange { key: 1, field: "HP" })
        ));
        assert!(matches!(
            ht_overflow.into_model(),
            Err(DocumentError::CounterOutOfRange { key: 1, field: "HT" })
        ));
    }

    #[test]
    fn test_counters_and_color_accept_numeric_strings() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": 1, "group": "semestre1", "HP": "4", "HT": "2", "color": "3"}
                ]
            }"#,
        )
        .unwrap();

        let model = document.into_model().unwrap();
        let course = model.course(NodeKey::new(1)).unwrap();

        assert_eq!(course.hp(), 4);
        assert_eq!(course.ht(), 2);
        assert_eq!(course.color(), 3);
    }

    #[test]
    fn test_backwards_link_is_rejected_on_load() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": "semestre2", "isGroup": true},
                    {"key": 1, "group": "semestre2"},
                    {"key": 2, "group": "semestre1"}
                ],
                "linkDataArray": [{"from": 1, "to": 2}]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            document.into_model(),
            Err(DocumentError::OrderingViolation(1, 2))
        ));
    }

    #[test]
    fn test_prefixed_routing_is_accepted_and_normalized() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": "semestre2", "isGroup": true},
                    {"key": 1, "group": "semestre1"},
                    {"key": 2, "group": "semestre2"}
                ],
                "linkDataArray": [{"from": 1, "to": 2, "routing": "Link.Orthogonal"}]
            }"#,
        )
        .unwrap();

        let model = document.into_model().unwrap();
        let (_, link) = model.links().next().unwrap();
        assert_eq!(link.routing(), Routing::Orthogonal);

        let json = Document::from_model(&model).to_json().unwrap();
        assert!(json.contains(r#""routing":"Orthogonal""#));
    }

    #[test]
    fn test_unknown_routing_falls_back_to_default() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": "semestre2", "isGroup": true},
                    {"key": 1, "group": "semestre1"},
                    {"key": 2, "group": "semestre2"}
                ],
                "linkDataArray": [{"from": 1, "to": 2, "routing": "Link.Bezier"}]
            }"#,
        )
        .unwrap();

        let model = document.into_model().unwrap();
        let (_, link) = model.links().next().unwrap();
        assert_eq!(link.routing(), Routing::AvoidsNodes);
    }

    #[test]
    fn test_odd_point_array_is_rejected() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true},
                    {"key": "semestre2", "isGroup": true},
                    {"key": 1, "group": "semestre1"},
                    {"key": 2, "group": "semestre2"}
                ],
                "linkDataArray": [{"from": 1, "to": 2, "points": [0.0, 1.0, 2.0]}]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            document.into_model(),
            Err(DocumentError::OddPoints { from: 1, to: 2 })
        ));
    }

    #[test]
    fn test_malformed_location_is_rejected() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {"key": "semestre1", "isGroup": true, "loc": "12 abc"}
                ]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            document.into_model(),
            Err(DocumentError::Geometry { key, .. }) if key == "semestre1"
        ));
    }

    #[test]
    fn test_node_without_lane_is_rejected() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [{"key": 7, "text": "stray"}]
            }"#,
        )
        .unwrap();

        assert!(matches!(
            document.into_model(),
            Err(DocumentError::NodeWithoutLane(7))
        ));
    }

    #[test]
    fn test_lane_geometry_and_collapse_state_round_trip() {
        let document = Document::from_json(
            r#"{
                "class": "go.GraphLinksModel",
                "nodeDataArray": [
                    {
                        "key": "semestre1", "isGroup": true, "text": "1",
                        "loc": "0 0", "size": "300 454",
                        "expanded": false, "savedBreadth": 300
                    }
                ]
            }"#,
        )
        .unwrap();

        let model = document.into_model().unwrap();
        let lane = model.semester(LaneKey::new("semestre1")).unwrap();

        assert!(!lane.expanded());
        assert_eq!(lane.size(), Some(Size::new(300.0, 454.0)));
        assert_eq!(lane.saved_breadth(), Some(300.0));
        assert_eq!(lane.location(), Some(Point::new(0.0, 0.0)));
    }
}
