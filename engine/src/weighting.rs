//! Cost models for edges and turns.
//!
//! A weighting turns the attributes of a directed edge into a weight (what the searches minimize)
//! and a travel time in milliseconds. Turn costs are evaluated only by turn aware weightings,
//! which makes searches switch to the edge based traversal mode.
//!
//! Weights are `f64` and lie in `[0, INFINITY]`. `INFINITY` means the edge (or turn) can not be used.

use crate::datastr::graph::*;
use crate::error::{Error, Result};

/// Conversion factor from km/h to m/s.
const SPEED_CONV: f64 = 3.6;

/// The cost model interface used by all searches and by the preprocessing.
pub trait Weighting {
    /// Weight of traversing the edge in the direction of the view.
    fn edge_weight(&self, edge: &EdgeView) -> Weight;
    /// Travel time in milliseconds for the edge in the direction of the view.
    fn edge_millis(&self, edge: &EdgeView) -> u64;
    /// Lower bound on the weight of any edge with the given length in meters.
    /// Used by A* potentials, must never overestimate.
    fn min_weight(&self, distance: f64) -> Weight;

    /// Weight of turning from `in_key` onto `out_key` at `via`.
    fn turn_weight(&self, _in_key: EdgeKey, _via: NodeId, _out_key: EdgeKey) -> Weight {
        0.0
    }

    fn turn_millis(&self, _in_key: EdgeKey, _via: NodeId, _out_key: EdgeKey) -> u64 {
        0
    }

    fn has_turn_costs(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str;
}

impl<'a, W: Weighting + ?Sized> Weighting for &'a W {
    fn edge_weight(&self, edge: &EdgeView) -> Weight {
        (**self).edge_weight(edge)
    }
    fn edge_millis(&self, edge: &EdgeView) -> u64 {
        (**self).edge_millis(edge)
    }
    fn min_weight(&self, distance: f64) -> Weight {
        (**self).min_weight(distance)
    }
    fn turn_weight(&self, in_key: EdgeKey, via: NodeId, out_key: EdgeKey) -> Weight {
        (**self).turn_weight(in_key, via, out_key)
    }
    fn turn_millis(&self, in_key: EdgeKey, via: NodeId, out_key: EdgeKey) -> u64 {
        (**self).turn_millis(in_key, via, out_key)
    }
    fn has_turn_costs(&self) -> bool {
        (**self).has_turn_costs()
    }
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

fn check_max_speed(max_speed: f64) -> Result<f64> {
    if max_speed.is_finite() && max_speed > 0.0 {
        Ok(max_speed)
    } else {
        Err(Error::InvalidWeighting(format!("max speed must be finite and positive, got {}", max_speed)))
    }
}

// Speed in km/h usable for this edge, None if it can't be traversed at all.
#[inline]
fn usable_speed(edge: &EdgeView, max_speed: f64) -> Option<f64> {
    if !edge.access || edge.speed <= 0.0 {
        None
    } else {
        Some(edge.speed.min(max_speed))
    }
}

#[inline]
fn travel_millis(edge: &EdgeView, max_speed: f64) -> u64 {
    match usable_speed(edge, max_speed) {
        Some(speed) => (edge.distance / speed * SPEED_CONV * 1000.0).round() as u64,
        None => 0,
    }
}

/// Minimizes travel time in seconds. Speeds above `max_speed` are capped to keep `min_weight` admissible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastestWeighting {
    max_speed: f64,
}

impl FastestWeighting {
    pub fn new(max_speed: f64) -> Result<Self> {
        Ok(Self {
            max_speed: check_max_speed(max_speed)?,
        })
    }

    /// Use the largest speed occurring in the graph as the maximum speed.
    pub fn for_graph(graph: &RoadGraph) -> Result<Self> {
        Self::new(graph.max_speed())
    }

    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }
}

impl Weighting for FastestWeighting {
    #[inline]
    fn edge_weight(&self, edge: &EdgeView) -> Weight {
        match usable_speed(edge, self.max_speed) {
            Some(speed) => edge.distance / speed * SPEED_CONV,
            None => INFINITY,
        }
    }

    fn edge_millis(&self, edge: &EdgeView) -> u64 {
        travel_millis(edge, self.max_speed)
    }

    fn min_weight(&self, distance: f64) -> Weight {
        distance / self.max_speed * SPEED_CONV
    }

    fn name(&self) -> &'static str {
        "fastest"
    }
}

/// Minimizes distance in meters. Edges without access or speed are still impassable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShortestWeighting {
    max_speed: f64,
}

impl ShortestWeighting {
    pub fn new(max_speed: f64) -> Result<Self> {
        Ok(Self {
            max_speed: check_max_speed(max_speed)?,
        })
    }

    pub fn for_graph(graph: &RoadGraph) -> Result<Self> {
        Self::new(graph.max_speed())
    }
}

impl Weighting for ShortestWeighting {
    #[inline]
    fn edge_weight(&self, edge: &EdgeView) -> Weight {
        match usable_speed(edge, self.max_speed) {
            Some(_) => edge.distance,
            None => INFINITY,
        }
    }

    fn edge_millis(&self, edge: &EdgeView) -> u64 {
        travel_millis(edge, self.max_speed)
    }

    fn min_weight(&self, distance: f64) -> Weight {
        distance
    }

    fn name(&self) -> &'static str {
        "shortest"
    }
}

/// Like `FastestWeighting` but prefers edges with a high priority:
/// the travel time is divided by `0.5 + priority`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityWeighting {
    fastest: FastestWeighting,
}

const MAX_PRIORITY_FACTOR: f64 = 1.5;

impl PriorityWeighting {
    pub fn new(max_speed: f64) -> Result<Self> {
        Ok(Self {
            fastest: FastestWeighting::new(max_speed)?,
        })
    }

    pub fn for_graph(graph: &RoadGraph) -> Result<Self> {
        Self::new(graph.max_speed())
    }
}

impl Weighting for PriorityWeighting {
    #[inline]
    fn edge_weight(&self, edge: &EdgeView) -> Weight {
        self.fastest.edge_weight(edge) / (0.5 + edge.priority)
    }

    fn edge_millis(&self, edge: &EdgeView) -> u64 {
        self.fastest.edge_millis(edge)
    }

    fn min_weight(&self, distance: f64) -> Weight {
        self.fastest.min_weight(distance) / MAX_PRIORITY_FACTOR
    }

    fn name(&self) -> &'static str {
        "priority"
    }
}

/// Adds turn costs from a `TurnCostTable` to an inner weighting.
/// Leaving a node by the edge we arrived on is a u-turn and costs `u_turn_costs`,
/// which by default forbids u-turns.
#[derive(Debug, Clone, Copy)]
pub struct TurnCostWeighting<'a, W> {
    inner: W,
    turn_costs: &'a TurnCostTable,
    u_turn_costs: Weight,
}

impl<'a, W: Weighting> TurnCostWeighting<'a, W> {
    pub fn new(inner: W, turn_costs: &'a TurnCostTable) -> Self {
        Self {
            inner,
            turn_costs,
            u_turn_costs: INFINITY,
        }
    }

    /// Allow u-turns at the given cost in seconds.
    pub fn with_u_turn_costs(inner: W, turn_costs: &'a TurnCostTable, u_turn_costs: Weight) -> Result<Self> {
        if u_turn_costs.is_nan() || u_turn_costs < 0.0 {
            return Err(Error::InvalidWeighting(format!("u-turn costs must not be negative or NaN, got {}", u_turn_costs)));
        }
        Ok(Self {
            inner,
            turn_costs,
            u_turn_costs,
        })
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

impl<'a, W: Weighting> Weighting for TurnCostWeighting<'a, W> {
    #[inline]
    fn edge_weight(&self, edge: &EdgeView) -> Weight {
        self.inner.edge_weight(edge)
    }

    fn edge_millis(&self, edge: &EdgeView) -> u64 {
        self.inner.edge_millis(edge)
    }

    fn min_weight(&self, distance: f64) -> Weight {
        self.inner.min_weight(distance)
    }

    #[inline]
    fn turn_weight(&self, in_key: EdgeKey, via: NodeId, out_key: EdgeKey) -> Weight {
        let (in_edge, out_edge) = (key_edge(in_key), key_edge(out_key));
        if in_edge == out_edge {
            return self.u_turn_costs;
        }
        self.turn_costs.turn_cost(in_edge, via, out_edge)
    }

    fn turn_millis(&self, in_key: EdgeKey, via: NodeId, out_key: EdgeKey) -> u64 {
        let weight = self.turn_weight(in_key, via, out_key);
        if weight.is_finite() {
            (weight * 1000.0).round() as u64
        } else {
            0
        }
    }

    fn has_turn_costs(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
