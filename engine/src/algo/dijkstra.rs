//! Label setting search core shared by all Dijkstra variants.
//!
//! The shortest path tree is kept in an arena of immutable `SptEntry`s.
//! Improving the label of a state appends a new entry and redirects the state's best entry to it,
//! so queue items pointing to older entries become stale and are skipped when popped.

use super::*;
use crate::datastr::timestamped_vector::*;
use std::{cmp::Ordering, collections::BinaryHeap};

pub mod query;

pub use query::dijkstra::Server;

/// Index into the entry arena
pub type EntryId = u32;
/// Parent of root entries
pub const INVALID_ENTRY: EntryId = std::u32::MAX;

/// A node of the shortest path tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SptEntry {
    /// The node this entry reaches. For backward searches the node where the entry's edge starts.
    pub adj_node: NodeId,
    /// The edge used to reach `adj_node`, `None` for roots.
    pub edge: Option<EdgeKey>,
    pub weight: Weight,
    pub time: u64,
    pub parent: EntryId,
}

/// Priority Queue entries.
/// Ordered ascending by key, then by state and entry id so runs are deterministic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct State {
    pub key: Weight,
    pub state: u32,
    pub entry: EntryId,
}

impl Eq for State {}

impl Ord for State {
    // reversed, std's BinaryHeap is a max heap
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .total_cmp(&self.key)
            .then_with(|| other.state.cmp(&self.state))
            .then_with(|| other.entry.cmp(&self.entry))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Search direction. Backward searches follow edges against their direction,
/// starting at the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// All the mutable data of one search. Can be reused across queries.
#[derive(Debug, Clone)]
pub struct DijkstraData {
    entries: Vec<SptEntry>,
    best: TimestampedVector<EntryId>,
    settled: TimestampedVector<bool>,
    queue: BinaryHeap<State>,
    num_settled: usize,
}

impl DijkstraData {
    pub fn new(num_states: usize) -> Self {
        Self {
            entries: Vec::new(),
            best: TimestampedVector::new(num_states, INVALID_ENTRY),
            settled: TimestampedVector::new(num_states, false),
            queue: BinaryHeap::new(),
            num_settled: 0,
        }
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.best.reset();
        self.settled.reset();
        self.queue.clear();
        self.num_settled = 0;
    }

    pub fn num_states(&self) -> usize {
        self.best.len()
    }

    #[inline]
    pub fn entry(&self, id: EntryId) -> &SptEntry {
        &self.entries[id as usize]
    }

    pub fn entries(&self) -> &[SptEntry] {
        &self.entries
    }

    /// The currently best entry for a state, if it was reached at all.
    #[inline]
    pub fn best_entry(&self, state: u32) -> Option<EntryId> {
        let id = self.best[state as usize];
        if id == INVALID_ENTRY {
            None
        } else {
            Some(id)
        }
    }

    #[inline]
    pub fn label(&self, state: u32) -> Option<Weight> {
        self.best_entry(state).map(|id| self.entry(id).weight)
    }

    #[inline]
    pub fn is_settled(&self, state: u32) -> bool {
        self.settled[state as usize]
    }

    pub fn num_settled(&self) -> usize {
        self.num_settled
    }

    /// Insert a root entry. Returns `None` if the state already has a label at least as good.
    pub fn add_root(&mut self, state: u32, node: NodeId, weight: Weight, key: Weight) -> Option<EntryId> {
        self.improve(
            state,
            SptEntry {
                adj_node: node,
                edge: None,
                weight,
                time: 0,
                parent: INVALID_ENTRY,
            },
            key,
        )
    }

    /// Add `entry` as the new label of `state` if it is better than the current one and the state is not yet settled.
    #[inline]
    pub fn improve(&mut self, state: u32, entry: SptEntry, key: Weight) -> Option<EntryId> {
        debug_assert!(!entry.weight.is_nan() && entry.weight >= 0.0);
        if self.is_settled(state) {
            return None;
        }
        if let Some(current) = self.label(state) {
            if current <= entry.weight {
                return None;
            }
        }
        let id = self.entries.len() as EntryId;
        self.entries.push(entry);
        self.best.set(state as usize, id);
        self.queue.push(State { key, state, entry: id });
        Some(id)
    }

    fn is_stale(&self, item: &State) -> bool {
        self.is_settled(item.state) || self.best[item.state as usize] != item.entry
    }

    /// The smallest key of a non stale queue item. Drops stale items from the top of the queue.
    pub fn min_key(&mut self) -> Option<Weight> {
        while let Some(top) = self.queue.peek() {
            if self.is_stale(top) {
                self.queue.pop();
            } else {
                return Some(top.key);
            }
        }
        None
    }

    /// Pop the next non stale item and mark its state settled.
    pub fn pop(&mut self) -> Option<State> {
        while let Some(item) = self.queue.pop() {
            if self.is_stale(&item) {
                continue;
            }
            self.settled.set(item.state as usize, true);
            self.num_settled += 1;
            return Some(item);
        }
        None
    }

    /// Edge keys of the parent chain ending in `entry`, from the root to `entry`.
    pub fn edges_to(&self, entry: EntryId) -> Vec<EdgeKey> {
        let mut edges = self.edges_from(entry);
        edges.reverse();
        edges
    }

    /// Edge keys of the parent chain starting at `entry`, from `entry` to the root.
    pub fn edges_from(&self, mut entry: EntryId) -> Vec<EdgeKey> {
        let mut edges = Vec::new();
        while entry != INVALID_ENTRY {
            let e = self.entry(entry);
            if let Some(edge) = e.edge {
                edges.push(edge);
            }
            entry = e.parent;
        }
        edges
    }
}

/// One search over a road graph: the static inputs together with the search data.
/// Creating a run is cheap, all state lives in the borrowed `DijkstraData`,
/// so a search can be continued later by a new run on the same data.
pub struct DijkstraRun<'a, W> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    filter: &'a dyn EdgeFilter,
    mode: TraversalMode,
    direction: Direction,
    data: &'a mut DijkstraData,
}

impl<'a, W: Weighting> DijkstraRun<'a, W> {
    pub fn new(
        graph: &'a RoadGraph,
        weighting: &'a W,
        filter: &'a dyn EdgeFilter,
        mode: TraversalMode,
        direction: Direction,
        data: &'a mut DijkstraData,
    ) -> Self {
        debug_assert_eq!(data.num_states(), mode.num_states(graph));
        Self {
            graph,
            weighting,
            filter,
            mode,
            direction,
            data,
        }
    }

    pub fn data(&self) -> &DijkstraData {
        self.data
    }

    pub fn mode(&self) -> TraversalMode {
        self.mode
    }

    /// Clear the data and insert the root for `node`.
    pub fn init(&mut self, node: NodeId, mut potential: impl FnMut(NodeId) -> Option<Weight>) {
        self.data.reset();
        let state = self.mode.root_state(self.graph, node);
        if let Some(pot) = potential(node) {
            self.data.add_root(state, node, 0.0, pot);
        }
    }

    pub fn min_key(&mut self) -> Option<Weight> {
        self.data.min_key()
    }

    /// Settle the next state and relax its edges.
    /// `on_improve` is called for every state whose label got better, with the new entry.
    /// Returns the settled queue item or `None` if the queue is exhausted.
    pub fn settle_next(&mut self, mut potential: impl FnMut(NodeId) -> Option<Weight>, mut on_improve: impl FnMut(u32, EntryId, &SptEntry)) -> Option<State> {
        let item = self.data.pop()?;
        let current = *self.data.entry(item.entry);
        let node = current.adj_node;
        let graph = self.graph;

        let keys = match self.direction {
            Direction::Forward => graph.out_keys(node),
            Direction::Backward => graph.in_keys(node),
        };

        for &key in keys {
            let edge = graph.view(key);
            if !self.filter.accept(&edge) {
                continue;
            }
            let edge_weight = self.weighting.edge_weight(&edge);
            if edge_weight == INFINITY {
                continue;
            }

            let (mut weight, mut time) = (current.weight + edge_weight, current.time + self.weighting.edge_millis(&edge));
            if self.mode.is_edge_based() {
                if let Some(prev) = current.edge {
                    let (turn_weight, turn_millis) = match self.direction {
                        Direction::Forward => (self.weighting.turn_weight(prev, node, key), self.weighting.turn_millis(prev, node, key)),
                        Direction::Backward => (self.weighting.turn_weight(key, node, prev), self.weighting.turn_millis(key, node, prev)),
                    };
                    if turn_weight == INFINITY {
                        continue;
                    }
                    weight += turn_weight;
                    time += turn_millis;
                }
            }

            let next_node = match self.direction {
                Direction::Forward => edge.head,
                Direction::Backward => edge.tail,
            };
            let state = match self.mode {
                TraversalMode::NodeBased => next_node,
                TraversalMode::EdgeBased => key,
            };
            if self.data.is_settled(state) {
                continue;
            }
            if let Some(current_label) = self.data.label(state) {
                if current_label <= weight {
                    continue;
                }
            }
            let pot = match potential(next_node) {
                Some(pot) => pot,
                None => continue,
            };

            let entry = SptEntry {
                adj_node: next_node,
                edge: Some(key),
                weight,
                time,
                parent: item.entry,
            };
            if let Some(id) = self.data.improve(state, entry, weight + pot) {
                on_improve(state, id, &entry);
            }
        }

        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(node: NodeId, weight: Weight) -> SptEntry {
        SptEntry {
            adj_node: node,
            edge: Some(node),
            weight,
            time: 0,
            parent: INVALID_ENTRY,
        }
    }

    #[test]
    fn queue_orders_by_key_then_state() {
        let mut queue = BinaryHeap::new();
        queue.push(State { key: 2.0, state: 0, entry: 0 });
        queue.push(State { key: 1.0, state: 5, entry: 1 });
        queue.push(State { key: 1.0, state: 3, entry: 2 });
        let states: Vec<u32> = std::iter::from_fn(|| queue.pop()).map(|item| item.state).collect();
        assert_eq!(states, vec![3, 5, 0]);
    }

    #[test]
    fn stale_items_are_skipped() {
        let mut data = DijkstraData::new(4);
        data.add_root(0, 0, 0.0, 0.0);
        assert!(data.improve(1, entry(1, 5.0), 5.0).is_some());
        assert!(data.improve(1, entry(1, 7.0), 7.0).is_none());
        let better = data.improve(1, entry(1, 3.0), 3.0).unwrap();
        assert_eq!(data.entries().len(), 3);

        assert_eq!(data.pop().map(|item| item.state), Some(0));
        let item = data.pop().unwrap();
        assert_eq!((item.state, item.entry), (1, better));
        // the outdated item with key 5 is still in the heap but must not show up
        assert_eq!(data.min_key(), None);
        assert_eq!(data.pop(), None);
        assert_eq!(data.num_settled(), 2);
        assert!(data.improve(1, entry(1, 1.0), 1.0).is_none());
    }

    #[test]
    fn reset_forgets_labels() {
        let mut data = DijkstraData::new(2);
        data.add_root(1, 1, 0.0, 0.0);
        data.pop();
        data.reset();
        assert_eq!(data.label(1), None);
        assert!(!data.is_settled(1));
        assert_eq!(data.num_settled(), 0);
        assert!(data.entries().is_empty());
    }
}
