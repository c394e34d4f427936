//! Bidirectional Dijkstra and symmetric bidirectional A*.
//!
//! The forward search runs from the source along edges, the backward search from the target against them.
//! The frontiers alternate by the smaller queue key. Whenever one side improves a label,
//! the labels of the other side at the same node are checked for a better connection.
//! In the edge based mode a connection joins an arriving forward state and a leaving backward state,
//! so the turn between them is paid exactly once, at the node where the frontiers meet.

use super::*;
use crate::algo::a_star::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoppingRule {
    /// Stop when the sum of both minimum keys reaches the best connection.
    SumOfKeys,
    /// Stop when either minimum key reaches the best connection.
    /// Needed with potentials, where keys of both sides don't add up to a lower bound anymore.
    EitherKey,
}

/// The best connection between the two search trees found so far.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Meeting {
    weight: Weight,
    forward_state: u32,
    forward_entry: EntryId,
    backward_state: u32,
    backward_entry: EntryId,
}

impl Meeting {
    // smaller weight wins, ties go to the smaller pair of states
    fn is_better_than(&self, other: &Meeting) -> bool {
        self.weight < other.weight || (self.weight == other.weight && (self.forward_state, self.backward_state) < (other.forward_state, other.backward_state))
    }
}

fn offer(meeting: &mut Option<Meeting>, candidate: Meeting) {
    if meeting.map_or(true, |current| candidate.is_better_than(&current)) {
        *meeting = Some(candidate);
    }
}

/// Finds the connections created by an improved label.
struct MeetingScan<'a, W> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    mode: TraversalMode,
}

impl<'a, W: Weighting> MeetingScan<'a, W> {
    fn forward_improved(&self, target: NodeId, backward: &DijkstraData, state: u32, id: EntryId, entry: &SptEntry, meeting: &mut Option<Meeting>) {
        let mut connect = |backward_state: u32, turn_weight: Weight| {
            if let Some(backward_entry) = backward.best_entry(backward_state) {
                offer(
                    meeting,
                    Meeting {
                        weight: entry.weight + turn_weight + backward.entry(backward_entry).weight,
                        forward_state: state,
                        forward_entry: id,
                        backward_state,
                        backward_entry,
                    },
                );
            }
        };

        match (self.mode, entry.edge) {
            (TraversalMode::EdgeBased, Some(in_key)) => {
                let node = entry.adj_node;
                for &out_key in self.graph.out_keys(node) {
                    if backward.best_entry(out_key).is_none() {
                        continue;
                    }
                    let turn_weight = self.weighting.turn_weight(in_key, node, out_key);
                    if turn_weight < INFINITY {
                        connect(out_key, turn_weight);
                    }
                }
                if node == target {
                    connect(self.mode.root_state(self.graph, target), 0.0);
                }
            }
            _ => connect(state, 0.0),
        }
    }

    fn backward_improved(&self, source: NodeId, forward: &DijkstraData, state: u32, id: EntryId, entry: &SptEntry, meeting: &mut Option<Meeting>) {
        let mut connect = |forward_state: u32, turn_weight: Weight| {
            if let Some(forward_entry) = forward.best_entry(forward_state) {
                offer(
                    meeting,
                    Meeting {
                        weight: forward.entry(forward_entry).weight + turn_weight + entry.weight,
                        forward_state,
                        forward_entry,
                        backward_state: state,
                        backward_entry: id,
                    },
                );
            }
        };

        match (self.mode, entry.edge) {
            (TraversalMode::EdgeBased, Some(out_key)) => {
                let node = entry.adj_node;
                for &in_key in self.graph.in_keys(node) {
                    if forward.best_entry(in_key).is_none() {
                        continue;
                    }
                    let turn_weight = self.weighting.turn_weight(in_key, node, out_key);
                    if turn_weight < INFINITY {
                        connect(in_key, turn_weight);
                    }
                }
                if node == source {
                    connect(self.mode.root_state(self.graph, source), 0.0);
                }
            }
            _ => connect(state, 0.0),
        }
    }
}

pub struct Server<'a, W, P = ZeroPotential> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    mode: TraversalMode,
    filter: Box<dyn EdgeFilter + 'a>,
    limits: SearchLimits,
    forward_data: DijkstraData,
    backward_data: DijkstraData,
    forward_potential: P,
    backward_potential: P,
    stopping_rule: StoppingRule,
    algorithm: &'static str,
}

impl<'a, W: Weighting> Server<'a, W, ZeroPotential> {
    pub fn new(graph: &'a RoadGraph, weighting: &'a W, mode: TraversalMode) -> Self {
        Server {
            stopping_rule: StoppingRule::SumOfKeys,
            algorithm: "bidirectional_dijkstra",
            ..Self::with_potentials(graph, weighting, mode, ZeroPotential(), ZeroPotential())
        }
    }
}

impl<'a, W: Weighting, P: Potential> Server<'a, W, P> {
    /// Symmetric bidirectional A*. The forward potential estimates the weight to the target,
    /// the backward potential the weight from the source, so it will be initialized with the source.
    pub fn with_potentials(graph: &'a RoadGraph, weighting: &'a W, mode: TraversalMode, forward_potential: P, backward_potential: P) -> Self {
        let num_states = mode.num_states(graph);
        Server {
            graph,
            weighting,
            mode,
            filter: Box::new(AllEdges),
            limits: SearchLimits::default(),
            forward_data: DijkstraData::new(num_states),
            backward_data: DijkstraData::new(num_states),
            forward_potential,
            backward_potential,
            stopping_rule: StoppingRule::EitherKey,
            algorithm: "bidirectional_astar",
        }
    }

    pub fn set_filter(&mut self, filter: impl EdgeFilter + 'a) {
        self.filter = Box::new(filter);
    }

    pub fn set_weight_limit(&mut self, weight_limit: Weight) {
        self.limits.weight_limit = weight_limit;
    }

    pub fn set_max_visited_nodes(&mut self, max_visited_nodes: usize) {
        self.limits.max_visited_nodes = max_visited_nodes;
    }

    fn visited_nodes(&self) -> usize {
        self.forward_data.num_settled() + self.backward_data.num_settled()
    }

    fn search(&mut self, from: NodeId, to: NodeId) -> Result<Option<Meeting>> {
        self.forward_potential.init(to);
        self.backward_potential.init(from);
        let (forward_potential, backward_potential) = (&mut self.forward_potential, &mut self.backward_potential);
        let limits = self.limits;
        let scan = MeetingScan {
            graph: self.graph,
            weighting: self.weighting,
            mode: self.mode,
        };

        let mut forward = DijkstraRun::new(self.graph, self.weighting, &*self.filter, self.mode, Direction::Forward, &mut self.forward_data);
        let mut backward = DijkstraRun::new(self.graph, self.weighting, &*self.filter, self.mode, Direction::Backward, &mut self.backward_data);
        forward.init(from, |node| forward_potential.potential(node));
        backward.init(to, |node| backward_potential.potential(node));

        let mut meeting: Option<Meeting> = None;

        loop {
            let best = meeting.map_or(INFINITY, |m| m.weight);
            let forward_key = forward.min_key().unwrap_or(INFINITY);
            let backward_key = backward.min_key().unwrap_or(INFINITY);

            let done = match self.stopping_rule {
                StoppingRule::SumOfKeys => forward_key + backward_key >= best,
                StoppingRule::EitherKey => forward_key >= best || backward_key >= best || forward_key == INFINITY || backward_key == INFINITY,
            };
            if done || forward_key.min(backward_key) > limits.weight_limit {
                break;
            }

            if forward_key <= backward_key {
                let backward_data = backward.data();
                forward.settle_next(
                    |node| forward_potential.potential(node),
                    |state, id, entry| scan.forward_improved(to, backward_data, state, id, entry, &mut meeting),
                );
            } else {
                let forward_data = forward.data();
                backward.settle_next(
                    |node| backward_potential.potential(node),
                    |state, id, entry| scan.backward_improved(from, forward_data, state, id, entry, &mut meeting),
                );
            }

            limits.check_visited(forward.data().num_settled() + backward.data().num_settled())?;
        }

        Ok(meeting.filter(|m| m.weight <= limits.weight_limit))
    }
}

impl<'a, W: Weighting, P: Potential> QueryServer for Server<'a, W, P> {
    fn query(&mut self, query: Query) -> Result<Path> {
        check_query(self.graph, query)?;
        if query.from == query.to {
            return Ok(Path::trivial(query.from).with_debug_info(self.algorithm, 0));
        }

        let path = match self.search(query.from, query.to)? {
            Some(meeting) => PathExtractor::new(self.graph, self.weighting, self.mode).extract_bidirectional(
                query.from,
                &self.forward_data,
                meeting.forward_entry,
                &self.backward_data,
                meeting.backward_entry,
            ),
            None => Path::not_found(),
        };
        Ok(path.with_debug_info(self.algorithm, self.visited_nodes()))
    }
}
