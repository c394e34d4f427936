//! Road graphs and the basic types to address their nodes and edges.

pub mod first_out_graph;
pub mod road_graph;
pub mod turn_costs;

pub use self::first_out_graph::{degrees_to_first_out, AdjacencyArray};
pub use self::road_graph::{EdgeView, RoadGraph, RoadGraphBuilder};
pub use self::turn_costs::TurnCostTable;

/// Node ids are 32bit unsigned ints
pub type NodeId = u32;
/// Edge ids are 32bit unsigned ints
pub type EdgeId = u32;
/// A directed view of an edge: `2 * edge_id` for traversal from base to adj node,
/// `2 * edge_id + 1` for the opposite direction.
pub type EdgeKey = u32;
/// Weights are non negative floats, usually seconds.
pub type Weight = f64;
/// Impassable edges and forbidden turns have infinite weight.
pub const INFINITY: Weight = f64::INFINITY;

/// Build the key for traversing `edge` in the given direction.
#[inline(always)]
pub fn edge_key(edge: EdgeId, reverse: bool) -> EdgeKey {
    2 * edge + reverse as u32
}

/// The undirected edge behind a key.
#[inline(always)]
pub fn key_edge(key: EdgeKey) -> EdgeId {
    key / 2
}

/// Does the key traverse its edge from adj to base node?
#[inline(always)]
pub fn key_is_reverse(key: EdgeKey) -> bool {
    key % 2 == 1
}

/// The same edge traversed in the other direction.
#[inline(always)]
pub fn reverse_key(key: EdgeKey) -> EdgeKey {
    key ^ 1
}

/// Base trait for graphs.
/// Interesting behaviour will be added through subtraits.
pub trait Graph {
    fn num_nodes(&self) -> usize;
    fn num_arcs(&self) -> usize;
    fn degree(&self, node: NodeId) -> usize;
}

/// Predicate deciding which directed edges a search may use,
/// for example vehicle specific access or blocked areas.
pub trait EdgeFilter {
    fn accept(&self, edge: &EdgeView) -> bool;
}

/// Filter which accepts every edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEdges;

impl EdgeFilter for AllEdges {
    #[inline(always)]
    fn accept(&self, _edge: &EdgeView) -> bool {
        true
    }
}

impl<F: Fn(&EdgeView) -> bool> EdgeFilter for F {
    #[inline(always)]
    fn accept(&self, edge: &EdgeView) -> bool {
        self(edge)
    }
}
