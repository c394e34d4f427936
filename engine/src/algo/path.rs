//! Query results and their construction from search trees.

use super::dijkstra::{DijkstraData, EntryId};
use super::*;

/// Some statistics about the search which produced a path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DebugInfo {
    pub algorithm: &'static str,
    pub visited_nodes: usize,
}

/// The result of a point to point query.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub found: bool,
    /// source, then the head of every edge
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeKey>,
    /// meters
    pub distance: f64,
    pub weight: Weight,
    /// milliseconds
    pub time: u64,
    pub debug_info: DebugInfo,
}

impl Path {
    pub fn not_found() -> Self {
        Path {
            found: false,
            nodes: Vec::new(),
            edges: Vec::new(),
            distance: 0.0,
            weight: std::f64::MAX,
            time: 0,
            debug_info: DebugInfo::default(),
        }
    }

    /// The empty path of a query with `source == target`.
    pub fn trivial(node: NodeId) -> Self {
        Path {
            found: true,
            nodes: vec![node],
            edges: Vec::new(),
            distance: 0.0,
            weight: 0.0,
            time: 0,
            debug_info: DebugInfo::default(),
        }
    }

    /// Build the path traversing the given edges from `source`.
    ///
    /// Distance, weight and time are summed up in path order. In the edge based mode the turn
    /// between every pair of consecutive edges is included, so the turn where two search
    /// frontiers met is counted exactly once. All algorithms go through this, so equal edge
    /// sequences always yield bit identical paths.
    pub fn from_edge_keys<W: Weighting>(graph: &RoadGraph, weighting: &W, mode: TraversalMode, source: NodeId, edges: Vec<EdgeKey>) -> Self {
        let mut nodes = Vec::with_capacity(edges.len() + 1);
        nodes.push(source);
        let mut distance = 0.0;
        let mut weight = 0.0;
        let mut time = 0;
        let mut prev: Option<EdgeKey> = None;

        for &key in &edges {
            let edge = graph.view(key);
            debug_assert_eq!(edge.tail, *nodes.last().unwrap_or(&source));
            if let (Some(prev), true) = (prev, mode.is_edge_based()) {
                weight += weighting.turn_weight(prev, edge.tail, key);
                time += weighting.turn_millis(prev, edge.tail, key);
            }
            distance += edge.distance;
            weight += weighting.edge_weight(&edge);
            time += weighting.edge_millis(&edge);
            nodes.push(edge.head);
            prev = Some(key);
        }

        Path {
            found: true,
            nodes,
            edges,
            distance,
            weight,
            time,
            debug_info: DebugInfo::default(),
        }
    }

    pub(crate) fn with_debug_info(mut self, algorithm: &'static str, visited_nodes: usize) -> Self {
        self.debug_info = DebugInfo { algorithm, visited_nodes };
        self
    }
}

/// Joins the parent chains of one or two search trees into a `Path`.
pub struct PathExtractor<'a, W> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    mode: TraversalMode,
}

impl<'a, W: Weighting> PathExtractor<'a, W> {
    pub fn new(graph: &'a RoadGraph, weighting: &'a W, mode: TraversalMode) -> Self {
        Self { graph, weighting, mode }
    }

    /// Path of a unidirectional search, ending in `entry`.
    pub fn extract(&self, source: NodeId, forward: &DijkstraData, entry: EntryId) -> Path {
        Path::from_edge_keys(self.graph, self.weighting, self.mode, source, forward.edges_to(entry))
    }

    /// Path of a bidirectional search which met between `forward_entry` and `backward_entry`.
    /// The forward chain runs back to the source, the backward chain on to the target.
    pub fn extract_bidirectional(&self, source: NodeId, forward: &DijkstraData, forward_entry: EntryId, backward: &DijkstraData, backward_entry: EntryId) -> Path {
        let mut edges = forward.edges_to(forward_entry);
        edges.extend(backward.edges_from(backward_entry));
        Path::from_edge_keys(self.graph, self.weighting, self.mode, source, edges)
    }
}
