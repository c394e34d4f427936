//! Errors reported by the engine.
//!
//! A query without a path is not an error, it yields `Path::not_found()`.
//! The variants here are either caller mistakes (invalid nodes, invalid numbers)
//! or conditions under which we refuse to produce a possibly wrong path.

use crate::datastr::graph::NodeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("node {node} is not a valid node id (graph has {num_nodes} nodes)")]
    InvalidQuery { node: NodeId, num_nodes: usize },
    #[error("invalid weighting parameter: {0}")]
    InvalidWeighting(String),
    #[error("invalid graph data: {0}")]
    InvalidGraph(String),
    #[error("contraction hierarchy is inconsistent: {0}")]
    PreparationInvariantViolation(String),
    #[error("search aborted after visiting more than {0} nodes")]
    MaxVisitedNodesExceeded(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check that a node id used in a query exists.
pub fn check_node(node: NodeId, num_nodes: usize) -> Result<()> {
    if (node as usize) < num_nodes {
        Ok(())
    } else {
        Err(Error::InvalidQuery { node, num_nodes })
    }
}
