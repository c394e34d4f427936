//! Bidirectional mapping between nodes and their rank in a contraction order.

use crate::datastr::graph::*;
use crate::io::*;

pub type Rank = NodeId;

/// A node order which allows efficiently retrieving both the rank of a node
/// and the node for a given rank. Rank 0 is the least important node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOrder {
    // node ids ordered by their ranks
    node_order: Vec<NodeId>,
    // the rank of each node
    ranks: Vec<Rank>,
}

impl NodeOrder {
    /// Create a `NodeOrder` where the id is equal to the rank
    pub fn identity(n: usize) -> NodeOrder {
        NodeOrder {
            node_order: (0..n as NodeId).collect(),
            ranks: (0..n as Rank).collect(),
        }
    }

    /// Create a `NodeOrder` from a vector of node ids ordered by their rank.
    pub fn from_node_order(node_order: Vec<NodeId>) -> NodeOrder {
        let n = node_order.len();
        assert!(n < <NodeId>::max_value() as usize);
        let mut ranks = vec![n as Rank; n];

        for (i, &node) in node_order.iter().enumerate() {
            ranks[node as usize] = i as Rank;
        }

        debug_assert_eq!(ranks.iter().position(|&rank| rank == n as Rank), None);

        NodeOrder { node_order, ranks }
    }

    /// Create a `NodeOrder` from a rank vector, that is a vector where `rank[id]` contains the rank for node `id`
    pub fn from_ranks(ranks: Vec<Rank>) -> NodeOrder {
        let n = ranks.len();
        assert!(n < <NodeId>::max_value() as usize);
        let mut node_order = vec![n as NodeId; n];

        for (node, &rank) in ranks.iter().enumerate() {
            node_order[rank as usize] = node as NodeId;
        }

        debug_assert_eq!(node_order.iter().position(|&node| node == n as NodeId), None);

        NodeOrder { node_order, ranks }
    }

    /// Node ids ordered by rank
    pub fn order(&self) -> &[NodeId] {
        &self.node_order
    }

    /// Rank of every node
    pub fn ranks(&self) -> &[Rank] {
        &self.ranks
    }

    pub fn rank(&self, node: NodeId) -> Rank {
        self.ranks[node as usize]
    }

    pub fn node(&self, rank: Rank) -> NodeId {
        self.node_order[rank as usize]
    }

    pub fn len(&self) -> usize {
        self.node_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Deconstruct for NodeOrder {
    fn store_each(&self, store: &dyn Fn(&str, &dyn Store) -> std::io::Result<()>) -> std::io::Result<()> {
        store("contraction_ranks", &self.ranks)
    }
}

impl Reconstruct for NodeOrder {
    fn reconstruct_with(loader: Loader) -> std::io::Result<Self> {
        let ranks: Vec<Rank> = loader.load("contraction_ranks")?;
        let mut seen = vec![false; ranks.len()];
        for &rank in &ranks {
            if rank as usize >= ranks.len() || std::mem::replace(&mut seen[rank as usize], true) {
                return Err(invalid_data("contraction ranks are not a permutation".to_string()));
            }
        }
        Ok(Self::from_ranks(ranks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_and_order_are_inverse() {
        let order = NodeOrder::from_node_order(vec![2, 0, 1]);
        assert_eq!(order.ranks(), &[1, 2, 0]);
        assert_eq!(order.node(0), 2);
        assert_eq!(order.rank(2), 0);
        assert_eq!(NodeOrder::from_ranks(vec![1, 2, 0]), order);
        assert_eq!(NodeOrder::identity(3).order(), &[0, 1, 2]);
    }
}
