//! Local searches deciding whether a shortcut is necessary.

use super::preparation::PreparationGraph;
use crate::datastr::{graph::*, index_heap::*, timestamped_vector::TimestampedVector};
use crate::util::NonNan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct WitnessState {
    weight: NonNan,
    node: u32,
}

impl Indexing for WitnessState {
    #[inline]
    fn as_index(&self) -> usize {
        self.node as usize
    }
}

/// A Dijkstra from one in-neighbor of the node being contracted which must not pass that node.
///
/// The search stops once the queue exceeds the largest shortcut weight in question or after a number
/// of settled nodes. Tentative weights of unsettled nodes are weights of real paths,
/// so they are valid upper bounds. An aborted search can only lead to unnecessary shortcuts, never to missing ones.
#[derive(Debug)]
pub struct WitnessSearch {
    heap: IndexdMinHeap<WitnessState>,
    weights: TimestampedVector<Weight>,
    num_settled: usize,
}

impl WitnessSearch {
    pub fn new(num_nodes: usize) -> Self {
        WitnessSearch {
            heap: IndexdMinHeap::new(num_nodes),
            weights: TimestampedVector::new(num_nodes, INFINITY),
            num_settled: 0,
        }
    }

    pub fn run(&mut self, graph: &PreparationGraph, source: u32, ignore: u32, max_weight: Weight, max_settled: usize) {
        self.heap.clear();
        self.weights.reset();
        self.num_settled = 0;

        self.weights.set(source as usize, 0.0);
        self.push(source, 0.0);

        while let Some(&WitnessState { weight, node }) = self.heap.peek() {
            if weight.value() > max_weight || self.num_settled >= max_settled {
                break;
            }
            self.heap.pop();
            self.num_settled += 1;

            for &arc_id in graph.outgoing(node) {
                let arc = graph.arc(arc_id);
                if arc.head == ignore {
                    continue;
                }
                let candidate = weight.value() + arc.weight;
                if candidate < self.weights[arc.head as usize] {
                    self.weights.set(arc.head as usize, candidate);
                    self.push(arc.head, candidate);
                }
            }
        }
    }

    fn push(&mut self, node: u32, weight: Weight) {
        if let Some(weight) = NonNan::new(weight) {
            self.heap.push_or_update(WitnessState { weight, node });
        }
    }

    /// Weight of the best path found to `node` that avoids the ignored node.
    pub fn upper_bound(&self, node: u32) -> Weight {
        self.weights[node as usize]
    }

    pub fn num_settled(&self) -> usize {
        self.num_settled
    }
}
