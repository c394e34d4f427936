//! Potentials for goal directed search.
//!
//! A potential estimates the remaining weight from a node to the current target.
//! It has to be a lower bound and consistent (`pot(u) <= w(u, v) + pot(v)`) for A* to stay exact.
//! `None` means the target can not be reached from a node at all, which allows pruning.

use super::dijkstra::{DijkstraData, DijkstraRun, Direction};
use super::*;
use crate::report::*;

pub trait Potential {
    fn init(&mut self, target: NodeId);
    fn potential(&mut self, node: NodeId) -> Option<Weight>;
}

/// Turns A* back into Dijkstra.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPotential();

impl Potential for ZeroPotential {
    fn init(&mut self, _target: NodeId) {}
    fn potential(&mut self, _node: NodeId) -> Option<Weight> {
        Some(0.0)
    }
}

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great circle distance in meters between two (lat, lng) pairs in degrees.
pub fn haversine_distance((lat1, lng1): (f64, f64), (lat2, lng2): (f64, f64)) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = phi2 - phi1;
    let d_lambda = (lng2 - lng1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * a.sqrt().min(1.0).asin()
}

/// The beeline distance to the target, converted with the weighting's `min_weight`.
/// Only a lower bound if edge distances are at least as long as the beeline between their endpoints.
/// Graphs without coordinates get a zero potential.
pub struct BeelinePotential<'a, W> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    target: Option<(f64, f64)>,
}

impl<'a, W: Weighting> BeelinePotential<'a, W> {
    pub fn new(graph: &'a RoadGraph, weighting: &'a W) -> Self {
        Self { graph, weighting, target: None }
    }
}

impl<'a, W: Weighting> Potential for BeelinePotential<'a, W> {
    fn init(&mut self, target: NodeId) {
        self.target = self.graph.coordinates(target);
    }

    fn potential(&mut self, node: NodeId) -> Option<Weight> {
        match (self.target, self.graph.coordinates(node)) {
            (Some(target), Some(coords)) => Some(self.weighting.min_weight(haversine_distance(coords, target))),
            _ => Some(0.0),
        }
    }
}

/// Exact distances to the target, obtained by a complete node based Dijkstra on the road graph.
/// Turn costs are ignored, which keeps the distances a lower bound for turn aware searches.
/// Mostly useful as a reference and for testing.
pub struct BaselinePotential<'a, W> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    direction: Direction,
    data: DijkstraData,
}

impl<'a, W: Weighting> BaselinePotential<'a, W> {
    /// Distances to the target, for forward searches.
    pub fn new(graph: &'a RoadGraph, weighting: &'a W) -> Self {
        Self::with_direction(graph, weighting, Direction::Backward)
    }

    /// Distances from the node passed to `init`, for backward searches.
    pub fn reversed(graph: &'a RoadGraph, weighting: &'a W) -> Self {
        Self::with_direction(graph, weighting, Direction::Forward)
    }

    fn with_direction(graph: &'a RoadGraph, weighting: &'a W, direction: Direction) -> Self {
        Self {
            graph,
            weighting,
            direction,
            data: DijkstraData::new(TraversalMode::NodeBased.num_states(graph)),
        }
    }
}

impl<'a, W: Weighting> Potential for BaselinePotential<'a, W> {
    fn init(&mut self, target: NodeId) {
        let (graph, weighting, direction, data) = (self.graph, self.weighting, self.direction, &mut self.data);
        silent_report_time_with_key("baseline_pot_init", || {
            let mut run = DijkstraRun::new(graph, weighting, &AllEdges, TraversalMode::NodeBased, direction, data);
            run.init(target, |_| Some(0.0));
            while run.settle_next(|_| Some(0.0), |_, _, _| ()).is_some() {}
        })
    }

    fn potential(&mut self, node: NodeId) -> Option<Weight> {
        self.data.label(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weighting::FastestWeighting;

    #[test]
    fn haversine_of_known_distance() {
        // one degree of latitude is roughly 111.2 km
        let d = haversine_distance((49.0, 8.4), (50.0, 8.4));
        assert!((d - 111_195.0).abs() < 50.0, "{}", d);
        assert_eq!(haversine_distance((49.0, 8.4), (49.0, 8.4)), 0.0);
    }

    #[test]
    fn baseline_potential_is_exact() {
        // 0 -> 1 -> 2, 0 -> 2 long
        let mut builder = RoadGraphBuilder::new(4);
        builder.add_oneway_edge(0, 1, 100.0, 36.0).unwrap();
        builder.add_oneway_edge(1, 2, 100.0, 36.0).unwrap();
        builder.add_oneway_edge(0, 2, 500.0, 36.0).unwrap();
        let graph = builder.build();
        let weighting = FastestWeighting::new(36.0).unwrap();

        let mut pot = BaselinePotential::new(&graph, &weighting);
        pot.init(2);
        assert_eq!(pot.potential(2), Some(0.0));
        assert!((pot.potential(0).unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(pot.potential(3), None);

        let mut pot = BaselinePotential::reversed(&graph, &weighting);
        pot.init(0);
        assert!((pot.potential(2).unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(pot.potential(3), None);
    }

    #[test]
    fn beeline_without_coordinates_is_zero() {
        let mut builder = RoadGraphBuilder::new(2);
        builder.add_bidir_edge(0, 1, 100.0, 50.0).unwrap();
        let graph = builder.build();
        let weighting = FastestWeighting::new(50.0).unwrap();
        let mut pot = BeelinePotential::new(&graph, &weighting);
        pot.init(1);
        assert_eq!(pot.potential(0), Some(0.0));
    }
}
