//! Prerequisite ordering rules.
//!
//! Pure decision functions consulted by interaction code before it
//! mutates the model. The rule is the one curriculum maps live by: a
//! prerequisite must be taught in an earlier semester than the course
//! that requires it. The model itself never enforces this; it records
//! what it is told, and callers ask here first.

use malla_core::{
    key::{LaneKey, NodeKey},
    semantic::Semester,
};

use crate::model::GraphModel;

/// Returns whether a prerequisite link from `source` to `target` respects
/// semester ordering.
///
/// A link is allowed only when the source course sits in a strictly
/// lower-ranked lane than the target course. Unknown courses are simply
/// not allowed; callers treat the answer as a plain yes or no.
pub fn link_allowed(model: &GraphModel, source: NodeKey, target: NodeKey) -> bool {
    let Some(source_rank) = course_rank(model, source) else {
        return false;
    };
    let Some(target_rank) = course_rank(model, target) else {
        return false;
    };
    source_rank < target_rank
}

/// Returns whether `node` may be placed in `lane` given its current links.
///
/// The lane's rank must be strictly above every predecessor's lane rank
/// and strictly below every successor's lane rank. A node with no
/// predecessors fits any lane from the first onward; a node with no
/// successors has no upper bound. `None` stands for a drop outside every
/// lane and is always allowed here so the gesture layer can cancel it
/// instead of flagging it.
pub fn membership_allowed(model: &GraphModel, lane: Option<LaneKey>, node: NodeKey) -> bool {
    let Some(lane) = lane else {
        return true;
    };
    let Some(rank) = lane_rank(model, lane) else {
        return false;
    };
    if model.course(node).is_none() {
        return false;
    }

    let max_pred_rank = model
        .predecessors_of(node)
        .filter_map(|course| lane_rank(model, course.lane()))
        .max()
        .unwrap_or(0);
    if max_pred_rank >= rank {
        return false;
    }

    let min_succ_rank = model
        .successors_of(node)
        .filter_map(|course| lane_rank(model, course.lane()))
        .min();
    if let Some(min_succ_rank) = min_succ_rank {
        if rank >= min_succ_rank {
            return false;
        }
    }

    true
}

/// Scans every link for an ordering violation.
///
/// Returns the endpoints of the first link whose source does not precede
/// its target. The deserializer uses this to fail fast on inconsistent
/// documents; the interactive paths keep the invariant by construction.
pub fn find_ordering_violation(model: &GraphModel) -> Option<(NodeKey, NodeKey)> {
    model
        .links()
        .find(|(_, link)| !link_allowed(model, link.from(), link.to()))
        .map(|(_, link)| (link.from(), link.to()))
}

fn course_rank(model: &GraphModel, key: NodeKey) -> Option<u32> {
    let course = model.course(key)?;
    lane_rank(model, course.lane())
}

fn lane_rank(model: &GraphModel, lane: LaneKey) -> Option<u32> {
    model.semester(lane).map(Semester::rank)
}
