//! Building blocks for fast routing algorithms.

use crate::datastr::graph::*;
use crate::error::Result;
use crate::weighting::Weighting;

pub mod a_star;
pub mod contraction_hierarchy;
pub mod dijkstra;
pub mod path;

pub use self::path::Path;

/// Simply a source-target pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub from: NodeId,
    pub to: NodeId,
}

/// Common interface of all point to point query servers.
///
/// Servers own their search data and borrow the graph and the weighting,
/// so a server can be reused for many queries but is bound to one thread.
/// A query without a path is not an error but returns `Path::not_found`.
pub trait QueryServer {
    fn query(&mut self, query: Query) -> Result<Path>;
}

/// What a search state stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraversalMode {
    /// A state is a node. Turn costs are ignored.
    NodeBased,
    /// A state is the directed edge used to reach (or, searching backward, to leave) a node.
    /// This allows turn costs and restrictions.
    EdgeBased,
}

impl TraversalMode {
    /// Edge based iff the weighting has turn costs.
    pub fn for_weighting<W: Weighting + ?Sized>(weighting: &W) -> Self {
        if weighting.has_turn_costs() {
            TraversalMode::EdgeBased
        } else {
            TraversalMode::NodeBased
        }
    }

    pub fn is_edge_based(self) -> bool {
        self == TraversalMode::EdgeBased
    }

    /// Size of the state space for a graph.
    /// Edge based searches get one extra root state per node.
    pub fn num_states(self, graph: &RoadGraph) -> usize {
        match self {
            TraversalMode::NodeBased => graph.num_nodes(),
            TraversalMode::EdgeBased => graph.num_keys() + graph.num_nodes(),
        }
    }

    /// The state a search starting (or ending) at `node` is rooted in.
    pub fn root_state(self, graph: &RoadGraph, node: NodeId) -> u32 {
        match self {
            TraversalMode::NodeBased => node,
            TraversalMode::EdgeBased => (graph.num_keys() + node as usize) as u32,
        }
    }
}
