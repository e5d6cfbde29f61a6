//! Component building and directed reachability.
//!
//! A [`FluidNetwork`] is rebuilt from the registered points at the start of
//! every tick. Edges exist only between kinds that can carry fluid
//! (OUTPUT to INPUT or INTERSECTION, INTERSECTION to INPUT or INTERSECTION),
//! and components are the connected sets under those edges.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use pipeworks_core::id::{FluidTypeId, PointId};
use pipeworks_core::location::BlockPos;

use crate::adjacency::{AdjacencyOracle, PointLookup};
use crate::point::{ConnectionPoint, PointKind};

/// A maximal set of points connected by carrying edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Every member, ascending.
    pub points: Vec<PointId>,
    /// Producers and stored-fluid suppliers, ascending.
    pub suppliers: Vec<PointId>,
    /// Inputs with a buffer open to the network, ascending.
    pub consumers: Vec<PointId>,
    pub intersections: Vec<PointId>,
}

impl Component {
    /// Lowest point id; identifies the component within one tick.
    pub fn anchor(&self) -> PointId {
        self.points[0]
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.points.binary_search(&id).is_ok()
    }
}

/// Directed edges plus the component partition.
#[derive(Debug, Default)]
pub struct FluidNetwork {
    out_edges: BTreeMap<PointId, BTreeSet<PointId>>,
    components: Vec<Component>,
}

/// A supplier's route to one consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub consumer: PointId,
    /// Every point on the path, supplier first and consumer last.
    pub path: Vec<PointId>,
}

impl Route {
    pub fn intersections(&self) -> &[PointId] {
        let end = self.path.len().saturating_sub(1);
        if end <= 1 { &[] } else { &self.path[1..end] }
    }

    pub fn edges(&self) -> impl Iterator<Item = (PointId, PointId)> + '_ {
        self.path.windows(2).map(|w| (w[0], w[1]))
    }
}

impl FluidNetwork {
    /// Build edges and components for the given points.
    pub fn build<A: AdjacencyOracle + ?Sized>(
        points: &BTreeMap<PointId, ConnectionPoint>,
        by_location: &BTreeMap<BlockPos, Vec<PointId>>,
        oracle: &A,
    ) -> Self {
        let lookup = PointLookup::new(points, by_location);
        let ids: Vec<PointId> = points.keys().copied().collect();
        let index: BTreeMap<PointId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut parent: Vec<usize> = (0..ids.len()).collect();
        let mut out_edges: BTreeMap<PointId, BTreeSet<PointId>> = BTreeMap::new();

        for (id, point) in points {
            for other_id in oracle.adjacent_points(point, &lookup) {
                if other_id == *id {
                    continue;
                }
                let Some(other) = points.get(&other_id) else {
                    continue;
                };
                let forward = point.kind().carries_to(other.kind());
                let backward = other.kind().carries_to(point.kind());
                if forward {
                    out_edges.entry(*id).or_default().insert(other_id);
                }
                if backward {
                    out_edges.entry(other_id).or_default().insert(*id);
                }
                if forward || backward {
                    union(&mut parent, index[id], index[&other_id]);
                }
            }
        }

        let mut groups: BTreeMap<usize, Vec<PointId>> = BTreeMap::new();
        for (i, id) in ids.iter().enumerate() {
            let root = find(&mut parent, i);
            groups.entry(root).or_default().push(*id);
        }

        let mut components: Vec<Component> = groups
            .into_values()
            .map(|members| classify(members, points))
            .collect();
        components.sort_by_key(Component::anchor);

        Self {
            out_edges,
            components,
        }
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn into_components(self) -> Vec<Component> {
        self.components
    }

    /// Whether a directed edge `from -> to` exists.
    pub fn has_edge(&self, from: PointId, to: PointId) -> bool {
        self.out_edges
            .get(&from)
            .is_some_and(|targets| targets.contains(&to))
    }

    /// Shortest routes from `supplier` to every consumer it can feed with
    /// `fluid`. Intersections whose pass filter rejects the fluid block the
    /// route. Ties between equal-length routes go to lower ids. Results are
    /// ordered by consumer id.
    pub fn routes(
        &self,
        supplier: PointId,
        fluid: FluidTypeId,
        points: &BTreeMap<PointId, ConnectionPoint>,
    ) -> Vec<Route> {
        let mut came_from: BTreeMap<PointId, PointId> = BTreeMap::new();
        let mut visited: BTreeSet<PointId> = BTreeSet::from([supplier]);
        let mut queue = VecDeque::from([supplier]);
        let mut reached = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(targets) = self.out_edges.get(&current) else {
                continue;
            };
            for &next in targets {
                if !visited.insert(next) {
                    continue;
                }
                let Some(point) = points.get(&next) else {
                    continue;
                };
                match point.kind() {
                    PointKind::Intersection if point.passes(fluid) => {
                        came_from.insert(next, current);
                        queue.push_back(next);
                    }
                    PointKind::Input => {
                        came_from.insert(next, current);
                        reached.push(next);
                    }
                    _ => {}
                }
            }
        }

        let mut routes: Vec<Route> = reached
            .into_iter()
            .map(|consumer| {
                let mut path = vec![consumer];
                let mut at = consumer;
                while let Some(&prev) = came_from.get(&at) {
                    path.push(prev);
                    at = prev;
                }
                path.reverse();
                Route { consumer, path }
            })
            .collect();
        routes.sort_by_key(|r| r.consumer);
        routes
    }
}

fn classify(members: Vec<PointId>, points: &BTreeMap<PointId, ConnectionPoint>) -> Component {
    let mut suppliers = Vec::new();
    let mut consumers = Vec::new();
    let mut intersections = Vec::new();
    for id in &members {
        let Some(p) = points.get(id) else { continue };
        if p.is_producer() || p.is_stored_supplier() {
            suppliers.push(*id);
        }
        if p.is_consumer() {
            consumers.push(*id);
        }
        if p.kind() == PointKind::Intersection {
            intersections.push(*id);
        }
    }
    Component {
        points: members,
        suppliers,
        consumers,
        intersections,
    }
}

// ---------------------------------------------------------------------------
// Union-find
// ---------------------------------------------------------------------------

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        // Lower index wins so roots are stable across rebuilds.
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[hi] = lo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjacency::{ExplicitLinks, GridAdjacency};
    use crate::buffer::AllowedFluids;
    use crate::producer::ConstantProducer;
    use pipeworks_core::test_utils::{fixed, lava, pid, pos, water};

    struct Fixture {
        points: BTreeMap<PointId, ConnectionPoint>,
        index: BTreeMap<BlockPos, Vec<PointId>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                points: BTreeMap::new(),
                index: BTreeMap::new(),
            }
        }

        fn add(&mut self, p: ConnectionPoint) -> &mut Self {
            self.index.entry(p.location()).or_default().push(p.id());
            self.points.insert(p.id(), p);
            self
        }

        fn build(&self) -> FluidNetwork {
            FluidNetwork::build(&self.points, &self.index, &GridAdjacency)
        }
    }

    fn producer(n: u128, x: i32) -> ConnectionPoint {
        let mut p = ConnectionPoint::restore(pid(n), PointKind::Output, pos(x, 0, 0));
        p.set_producer(Box::new(ConstantProducer::new(water(), fixed(10.0))))
            .unwrap();
        p
    }

    fn consumer(n: u128, x: i32) -> ConnectionPoint {
        let mut p = ConnectionPoint::restore(pid(n), PointKind::Input, pos(x, 0, 0));
        p.create_fluid_tank(AllowedFluids::Any, fixed(100.0), true, false)
            .unwrap();
        p
    }

    fn pipe(n: u128, x: i32) -> ConnectionPoint {
        ConnectionPoint::restore(pid(n), PointKind::Intersection, pos(x, 0, 0))
    }

    #[test]
    fn line_forms_one_component() {
        let mut f = Fixture::new();
        f.add(producer(1, 0)).add(pipe(2, 1)).add(pipe(3, 2)).add(consumer(4, 3));
        let net = f.build();
        assert_eq!(net.components().len(), 1);
        let c = &net.components()[0];
        assert_eq!(c.anchor(), pid(1));
        assert_eq!(c.suppliers, vec![pid(1)]);
        assert_eq!(c.consumers, vec![pid(4)]);
        assert_eq!(c.intersections, vec![pid(2), pid(3)]);
    }

    #[test]
    fn edges_are_directed() {
        let mut f = Fixture::new();
        f.add(producer(1, 0)).add(pipe(2, 1)).add(consumer(3, 2));
        let net = f.build();
        assert!(net.has_edge(pid(1), pid(2)));
        assert!(net.has_edge(pid(2), pid(3)));
        assert!(!net.has_edge(pid(2), pid(1)));
        assert!(!net.has_edge(pid(3), pid(2)));
    }

    #[test]
    fn incompatible_kinds_do_not_connect() {
        let mut f = Fixture::new();
        // Two inputs side by side, two outputs side by side.
        f.add(consumer(1, 0)).add(consumer(2, 1));
        f.add(producer(3, 10)).add(producer(4, 11));
        let net = f.build();
        assert_eq!(net.components().len(), 4);
    }

    #[test]
    fn disjoint_groups_are_separate_components_sorted_by_anchor() {
        let mut f = Fixture::new();
        f.add(producer(5, 0)).add(consumer(6, 1));
        f.add(producer(1, 10)).add(consumer(2, 11));
        let net = f.build();
        let anchors: Vec<_> = net.components().iter().map(Component::anchor).collect();
        assert_eq!(anchors, vec![pid(1), pid(5)]);
        assert!(net.components()[0].contains(pid(2)));
        assert!(!net.components()[0].contains(pid(6)));
    }

    #[test]
    fn routes_follow_pipes_to_inputs() {
        let mut f = Fixture::new();
        f.add(producer(1, 0)).add(pipe(2, 1)).add(pipe(3, 2)).add(consumer(4, 3));
        let net = f.build();
        let routes = net.routes(pid(1), water(), &f.points);
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].consumer, pid(4));
        assert_eq!(routes[0].path, vec![pid(1), pid(2), pid(3), pid(4)]);
        assert_eq!(routes[0].intersections(), &[pid(2), pid(3)]);
        assert_eq!(routes[0].edges().count(), 3);
    }

    #[test]
    fn direct_route_has_no_intersections() {
        let mut f = Fixture::new();
        f.add(producer(1, 0)).add(consumer(2, 1));
        let net = f.build();
        let routes = net.routes(pid(1), water(), &f.points);
        assert_eq!(routes[0].path, vec![pid(1), pid(2)]);
        assert!(routes[0].intersections().is_empty());
    }

    #[test]
    fn pass_filter_blocks_route_for_that_fluid() {
        let mut f = Fixture::new();
        let mut filtered = pipe(2, 1);
        filtered
            .set_pass_filter(AllowedFluids::Only(lava()))
            .unwrap();
        f.add(producer(1, 0)).add(filtered).add(consumer(3, 2));
        let net = f.build();
        assert!(net.routes(pid(1), water(), &f.points).is_empty());
        assert_eq!(net.routes(pid(1), lava(), &f.points).len(), 1);
        // Still one component: filters affect routing, not connectivity.
        assert_eq!(net.components().len(), 1);
    }

    #[test]
    fn routes_do_not_pass_through_inputs() {
        let mut f = Fixture::new();
        // producer -> input -> pipe -> input: the far input is unreachable.
        f.add(producer(1, 0)).add(consumer(2, 1)).add(pipe(3, 2)).add(consumer(4, 3));
        let net = f.build();
        let routes = net.routes(pid(1), water(), &f.points);
        assert_eq!(routes.iter().map(|r| r.consumer).collect::<Vec<_>>(), vec![pid(2)]);
    }

    #[test]
    fn explicit_links_override_geometry() {
        let mut points = BTreeMap::new();
        let mut index: BTreeMap<BlockPos, Vec<PointId>> = BTreeMap::new();
        for p in [
            ConnectionPoint::restore(pid(1), PointKind::Output, pos(0, 0, 0)),
            ConnectionPoint::restore(pid(2), PointKind::Input, pos(50, 0, 0)),
        ] {
            index.entry(p.location()).or_default().push(p.id());
            points.insert(p.id(), p);
        }
        let mut links = ExplicitLinks::new();
        links.link(pid(1), pid(2));
        let net = FluidNetwork::build(&points, &index, &links);
        assert_eq!(net.components().len(), 1);
        assert!(net.has_edge(pid(1), pid(2)));
    }

    #[test]
    fn unknown_ids_from_oracle_are_ignored() {
        let mut points = BTreeMap::new();
        let index: BTreeMap<BlockPos, Vec<PointId>> = BTreeMap::new();
        points.insert(
            pid(1),
            ConnectionPoint::restore(pid(1), PointKind::Output, pos(0, 0, 0)),
        );
        let mut links = ExplicitLinks::new();
        links.link(pid(1), pid(99));
        let net = FluidNetwork::build(&points, &index, &links);
        assert_eq!(net.components().len(), 1);
        assert!(!net.has_edge(pid(1), pid(99)));
    }
}
