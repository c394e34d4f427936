//! Static adjacency array representation.
//!
//! Entries of node `x` are stored consecutively: `entries[first_out[x]..first_out[x+1]]`.
//! `first_out` has `n+1` elements, the first one is always 0 and the last one the number of entries.

use super::*;

/// Adjacency array generic over the per entry payload.
/// The road graph stores edge keys, the contraction hierarchy arc ids.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjacencyArray<T> {
    // index of first entry of each node +1 entry in the end
    first_out: Vec<u32>,
    entries: Vec<T>,
}

impl<T> AdjacencyArray<T> {
    pub fn new(first_out: Vec<u32>, entries: Vec<T>) -> Self {
        assert!(first_out.len() < <NodeId>::max_value() as usize);
        assert!(entries.len() < <u32>::max_value() as usize);
        assert_eq!(first_out.first().copied(), Some(0));
        assert_eq!(first_out.last().copied().unwrap_or(0) as usize, entries.len());

        AdjacencyArray { first_out, entries }
    }

    /// Build from one list per node.
    pub fn from_adjacency_lists(adjacency_lists: Vec<Vec<T>>) -> Self {
        // create first_out array by doing a prefix sum over the adjacency list sizes
        let first_out = degrees_to_first_out(adjacency_lists.iter().map(|list| list.len() as u32)).collect();
        let entries = adjacency_lists.into_iter().flatten().collect();
        Self::new(first_out, entries)
    }

    /// The entries of the given node.
    #[inline(always)]
    pub fn neighbors(&self, node: NodeId) -> &[T] {
        let node = node as usize;
        &self.entries[self.first_out[node] as usize..self.first_out[node + 1] as usize]
    }

    pub fn first_out(&self) -> &[u32] {
        &self.first_out
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }
}

impl<T> Graph for AdjacencyArray<T> {
    fn num_nodes(&self) -> usize {
        self.first_out.len() - 1
    }

    fn num_arcs(&self) -> usize {
        self.entries.len()
    }

    fn degree(&self, node: NodeId) -> usize {
        let node = node as usize;
        (self.first_out[node + 1] - self.first_out[node]) as usize
    }
}

/// Turn an iterator of node degrees into the `first_out` prefix sums (with the leading 0).
pub fn degrees_to_first_out<I: Iterator<Item = u32>>(degrees: I) -> impl Iterator<Item = u32> {
    std::iter::once(0).chain(degrees.scan(0, |state, degree| {
        *state += degree;
        Some(*state)
    }))
}
