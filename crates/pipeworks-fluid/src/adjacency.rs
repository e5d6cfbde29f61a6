//! Adjacency oracles decide which registered points touch each other.
//!
//! The manager asks the oracle for every point's neighbours when it rebuilds
//! its networks at the start of a tick. Direction is not the oracle's
//! concern: the manager keeps only pairs whose kinds can carry fluid.

use std::collections::{BTreeMap, BTreeSet};

use pipeworks_core::id::PointId;
use pipeworks_core::location::BlockPos;

use crate::point::ConnectionPoint;

/// Read-only view of the registered points handed to an oracle.
pub struct PointLookup<'a> {
    points: &'a BTreeMap<PointId, ConnectionPoint>,
    by_location: &'a BTreeMap<BlockPos, Vec<PointId>>,
}

impl<'a> PointLookup<'a> {
    pub(crate) fn new(
        points: &'a BTreeMap<PointId, ConnectionPoint>,
        by_location: &'a BTreeMap<BlockPos, Vec<PointId>>,
    ) -> Self {
        Self {
            points,
            by_location,
        }
    }

    /// Points registered at `pos`.
    pub fn at(&self, pos: BlockPos) -> &'a [PointId] {
        self.by_location.get(&pos).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get(&self, id: PointId) -> Option<&'a ConnectionPoint> {
        self.points.get(&id)
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.points.contains_key(&id)
    }
}

/// Answers "which points is this point adjacent to?".
pub trait AdjacencyOracle: Send {
    /// Ids adjacent to `point`. Unknown ids and `point` itself are ignored by
    /// the caller, so implementations need not filter them.
    fn adjacent_points(&self, point: &ConnectionPoint, lookup: &PointLookup<'_>) -> Vec<PointId>;
}

// ---------------------------------------------------------------------------
// Grid adjacency
// ---------------------------------------------------------------------------

/// Points are adjacent when their blocks share a face.
///
/// Points attached to the same block are not adjacent to each other; a
/// machine with an input and an output on one block does not short-circuit.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridAdjacency;

impl AdjacencyOracle for GridAdjacency {
    fn adjacent_points(&self, point: &ConnectionPoint, lookup: &PointLookup<'_>) -> Vec<PointId> {
        point
            .location()
            .neighbors()
            .into_iter()
            .flat_map(|pos| lookup.at(pos).iter().copied())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Explicit links
// ---------------------------------------------------------------------------

/// Adjacency maintained by hand, e.g. by a pipe block that tracks its own
/// connections. Links are symmetric.
#[derive(Debug, Clone, Default)]
pub struct ExplicitLinks {
    links: BTreeMap<PointId, BTreeSet<PointId>>,
}

impl ExplicitLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `a` and `b`. Returns false if they were already linked.
    pub fn link(&mut self, a: PointId, b: PointId) -> bool {
        if a == b {
            return false;
        }
        let added = self.links.entry(a).or_default().insert(b);
        self.links.entry(b).or_default().insert(a);
        added
    }

    /// Disconnect `a` and `b`. Returns false if they were not linked.
    pub fn unlink(&mut self, a: PointId, b: PointId) -> bool {
        let removed = self.links.get_mut(&a).is_some_and(|set| set.remove(&b));
        if let Some(set) = self.links.get_mut(&b) {
            set.remove(&a);
        }
        self.links.retain(|_, set| !set.is_empty());
        removed
    }

    /// Drop every link touching `id`.
    pub fn forget(&mut self, id: PointId) {
        if let Some(peers) = self.links.remove(&id) {
            for peer in peers {
                if let Some(set) = self.links.get_mut(&peer) {
                    set.remove(&id);
                }
            }
        }
        self.links.retain(|_, set| !set.is_empty());
    }

    pub fn links_of(&self, id: PointId) -> impl Iterator<Item = PointId> + '_ {
        self.links.get(&id).into_iter().flatten().copied()
    }

    pub fn is_linked(&self, a: PointId, b: PointId) -> bool {
        self.links.get(&a).is_some_and(|set| set.contains(&b))
    }
}

impl AdjacencyOracle for ExplicitLinks {
    fn adjacent_points(&self, point: &ConnectionPoint, _lookup: &PointLookup<'_>) -> Vec<PointId> {
        self.links_of(point.id()).collect()
    }
}
