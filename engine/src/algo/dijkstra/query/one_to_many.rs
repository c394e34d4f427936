//! Many queries from the same source, answered from one growing shortest path tree.
//!
//! The forward search is only continued as far as needed for the current target.
//! Targets which were already settled by an earlier query are answered by a lookup.

use super::*;
use crate::datastr::timestamped_vector::TimestampedVector;

pub struct OneToManyServer<'a, W> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    mode: TraversalMode,
    filter: Box<dyn EdgeFilter + 'a>,
    limits: SearchLimits,
    data: DijkstraData,
    // the first settled entry reaching each node
    settled_at: TimestampedVector<EntryId>,
    source: Option<NodeId>,
}

impl<'a, W: Weighting> OneToManyServer<'a, W> {
    pub fn new(graph: &'a RoadGraph, weighting: &'a W, mode: TraversalMode) -> Self {
        Self {
            graph,
            weighting,
            mode,
            filter: Box::new(AllEdges),
            limits: SearchLimits::default(),
            data: DijkstraData::new(mode.num_states(graph)),
            settled_at: TimestampedVector::new(graph.num_nodes(), INVALID_ENTRY),
            source: None,
        }
    }

    /// Changing the filter invalidates the cached tree.
    pub fn set_filter(&mut self, filter: impl EdgeFilter + 'a) {
        self.filter = Box::new(filter);
        self.clear();
    }

    pub fn set_max_visited_nodes(&mut self, max_visited_nodes: usize) {
        self.limits.max_visited_nodes = max_visited_nodes;
    }

    /// Drop the cached tree.
    pub fn clear(&mut self) {
        self.source = None;
    }

    /// The source of the cached tree, if any.
    pub fn cached_source(&self) -> Option<NodeId> {
        self.source
    }

    pub fn visited_nodes(&self) -> usize {
        self.data.num_settled()
    }

    fn start(&mut self, source: NodeId) {
        self.settled_at.reset();
        let mut run = DijkstraRun::new(self.graph, self.weighting, &*self.filter, self.mode, Direction::Forward, &mut self.data);
        run.init(source, |_| Some(0.0));
        self.source = Some(source);
    }

    // Continue the search until `target` is settled. Returns the entry reaching it.
    fn settle_until(&mut self, target: NodeId) -> Result<Option<EntryId>> {
        if self.settled_at.is_set(target as usize) {
            return Ok(Some(self.settled_at[target as usize]));
        }

        let mut run = DijkstraRun::new(self.graph, self.weighting, &*self.filter, self.mode, Direction::Forward, &mut self.data);
        while let Some(item) = run.settle_next(|_| Some(0.0), |_, _, _| ()) {
            let node = run.data().entry(item.entry).adj_node;
            if !self.settled_at.is_set(node as usize) {
                self.settled_at.set(node as usize, item.entry);
            }
            self.limits.check_visited(run.data().num_settled())?;
            if node == target {
                return Ok(Some(item.entry));
            }
        }
        Ok(None)
    }
}

impl<'a, W: Weighting> QueryServer for OneToManyServer<'a, W> {
    fn query(&mut self, query: Query) -> Result<Path> {
        check_query(self.graph, query)?;
        if query.from == query.to {
            return Ok(Path::trivial(query.from).with_debug_info("one_to_many", self.visited_nodes()));
        }
        if self.source != Some(query.from) {
            self.start(query.from);
        }

        let path = match self.settle_until(query.to) {
            Ok(Some(entry)) => PathExtractor::new(self.graph, self.weighting, self.mode).extract(query.from, &self.data, entry),
            Ok(None) => Path::not_found(),
            Err(e) => {
                // the tree is incomplete
                self.clear();
                return Err(e);
            }
        };
        Ok(path.with_debug_info("one_to_many", self.visited_nodes()))
    }
}
