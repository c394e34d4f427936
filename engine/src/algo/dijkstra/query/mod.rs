//! Query Server wrappers for the different dijkstra variants

use super::*;
use crate::algo::path::PathExtractor;
use crate::error::{check_node, Error};

pub mod bidirectional_dijkstra;
pub mod dijkstra;
pub mod one_to_many;

/// Abort limits shared by the query servers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchLimits {
    /// Queue keys above this weight are not explored, paths above it are not found.
    pub weight_limit: Weight,
    /// Settling more states than this fails the query with `Error::MaxVisitedNodesExceeded`.
    pub max_visited_nodes: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            weight_limit: INFINITY,
            max_visited_nodes: std::usize::MAX,
        }
    }
}

impl SearchLimits {
    pub(crate) fn check_visited(&self, visited: usize) -> Result<()> {
        if visited > self.max_visited_nodes {
            Err(Error::MaxVisitedNodesExceeded(self.max_visited_nodes))
        } else {
            Ok(())
        }
    }
}

fn check_query(graph: &RoadGraph, query: Query) -> Result<()> {
    check_node(query.from, graph.num_nodes())?;
    check_node(query.to, graph.num_nodes())
}
