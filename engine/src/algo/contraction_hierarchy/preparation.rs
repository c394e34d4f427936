use super::witness_search::WitnessSearch;
use super::*;
use crate::datastr::index_heap::*;
use crate::report::*;
use crate::util::NonNan;
use rand::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PrepArc {
    pub tail: u32,
    pub head: u32,
    pub weight: Weight,
    pub distance: f64,
    // number of original arcs this arc stands for
    pub orig_count: u32,
    pub skipped: Option<(ArcId, ArcId)>,
    pub original: u32,
}

#[derive(Debug, PartialEq)]
enum ShortcutResult {
    NewShortcut,
    ShortenedExisting,
    ShorterExisting,
}

/// The graph being contracted. Arcs are never removed from the arc list,
/// contracting a node only removes its arcs from the adjacency of its neighbors.
#[derive(Debug)]
pub(super) struct PreparationGraph {
    arcs: Vec<PrepArc>,
    outgoing: Vec<Vec<ArcId>>,
    incoming: Vec<Vec<ArcId>>,
}

impl PreparationGraph {
    fn new(num_nodes: usize) -> Self {
        PreparationGraph {
            arcs: Vec::new(),
            outgoing: vec![Vec::new(); num_nodes],
            incoming: vec![Vec::new(); num_nodes],
        }
    }

    /// One arc per usable directed road edge. Loops are never part of shortest paths between nodes.
    fn node_based<W: Weighting>(graph: &RoadGraph, weighting: &W) -> Self {
        let mut prep = Self::new(graph.num_nodes());
        for key in 0..graph.num_keys() as EdgeKey {
            let edge = graph.view(key);
            let weight = weighting.edge_weight(&edge);
            if edge.tail == edge.head || weight == INFINITY {
                continue;
            }
            prep.push(PrepArc {
                tail: edge.tail,
                head: edge.head,
                weight,
                distance: edge.distance,
                orig_count: 1,
                skipped: None,
                original: key,
            });
        }
        prep
    }

    /// The line graph: one node per edge key and one arc per allowed turn,
    /// weighted with the turn and the edge turned onto.
    fn edge_based<W: Weighting>(graph: &RoadGraph, weighting: &W) -> Self {
        let mut prep = Self::new(graph.num_keys());
        for key in 0..graph.num_keys() as EdgeKey {
            let edge = graph.view(key);
            if weighting.edge_weight(&edge) == INFINITY {
                continue;
            }
            for &next_key in graph.out_keys(edge.head) {
                if next_key == key {
                    continue;
                }
                let next = graph.view(next_key);
                let next_weight = weighting.edge_weight(&next);
                let turn_weight = weighting.turn_weight(key, edge.head, next_key);
                if next_weight == INFINITY || turn_weight == INFINITY {
                    continue;
                }
                prep.push(PrepArc {
                    tail: key,
                    head: next_key,
                    weight: turn_weight + next_weight,
                    distance: next.distance,
                    orig_count: 1,
                    skipped: None,
                    original: next_key,
                });
            }
        }
        prep
    }

    fn push(&mut self, arc: PrepArc) -> ArcId {
        let id = self.arcs.len() as ArcId;
        self.outgoing[arc.tail as usize].push(id);
        self.incoming[arc.head as usize].push(id);
        self.arcs.push(arc);
        id
    }

    pub fn num_nodes(&self) -> usize {
        self.outgoing.len()
    }

    #[inline]
    pub fn arc(&self, id: ArcId) -> &PrepArc {
        &self.arcs[id as usize]
    }

    #[inline]
    pub fn outgoing(&self, node: u32) -> &[ArcId] {
        &self.outgoing[node as usize]
    }

    #[inline]
    pub fn incoming(&self, node: u32) -> &[ArcId] {
        &self.incoming[node as usize]
    }

    fn degree(&self, node: u32) -> usize {
        self.outgoing(node).len() + self.incoming(node).len()
    }

    // Parallel arcs keep the minimum. Existing shortcuts are updated in place, originals are kept.
    fn insert_or_decrease(&mut self, shortcut: PrepArc) -> ShortcutResult {
        let mut existing_shortcut = None;
        for &id in &self.outgoing[shortcut.tail as usize] {
            let arc = &self.arcs[id as usize];
            if arc.head != shortcut.head {
                continue;
            }
            if arc.weight <= shortcut.weight {
                return ShortcutResult::ShorterExisting;
            }
            if arc.skipped.is_some() {
                existing_shortcut = Some(id);
            }
        }

        match existing_shortcut {
            Some(id) => {
                self.arcs[id as usize] = shortcut;
                ShortcutResult::ShortenedExisting
            }
            None => {
                self.push(shortcut);
                ShortcutResult::NewShortcut
            }
        }
    }

    // Remove the arcs of `node` from its neighbors. Returns the distinct neighbors.
    fn disconnect(&mut self, node: u32) -> Vec<u32> {
        let mut neighbors = Vec::with_capacity(self.degree(node));
        let incoming = std::mem::take(&mut self.incoming[node as usize]);
        let outgoing = std::mem::take(&mut self.outgoing[node as usize]);

        for &id in &incoming {
            let tail = self.arcs[id as usize].tail;
            self.outgoing[tail as usize].retain(|&other| other != id);
            neighbors.push(tail);
        }
        for &id in &outgoing {
            let head = self.arcs[id as usize].head;
            self.incoming[head as usize].retain(|&other| other != id);
            neighbors.push(head);
        }

        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct PriorityState {
    priority: NonNan,
    node: u32,
}

impl Indexing for PriorityState {
    #[inline]
    fn as_index(&self) -> usize {
        self.node as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct Shortcut {
    in_arc: ArcId,
    out_arc: ArcId,
    weight: Weight,
}

struct Contractor<'p> {
    graph: PreparationGraph,
    witness_search: WitnessSearch,
    depth: Vec<u32>,
    mean_degree: f64,
    params: &'p PrepareParams,
}

impl<'p> Contractor<'p> {
    fn new(graph: PreparationGraph, params: &'p PrepareParams) -> Self {
        let n = graph.num_nodes();
        let mean_degree = if n == 0 { 0.0 } else { graph.arcs.len() as f64 / n as f64 };
        Contractor {
            witness_search: WitnessSearch::new(n),
            depth: vec![0; n],
            mean_degree,
            params,
            graph,
        }
    }

    fn max_settled(&self, factor: f64) -> usize {
        ((self.mean_degree * factor) as usize).max(1)
    }

    // All pairs of in and out arcs of `node` which need a shortcut.
    fn find_shortcuts(&mut self, node: u32, max_settled: usize) -> Vec<Shortcut> {
        let graph = &self.graph;
        let witness_search = &mut self.witness_search;
        let mut shortcuts = Vec::new();

        for &in_arc in graph.incoming(node) {
            let PrepArc { tail: from, weight: in_weight, .. } = *graph.arc(in_arc);
            let max_weight = graph
                .outgoing(node)
                .iter()
                .map(|&out_arc| graph.arc(out_arc))
                .filter(|arc| arc.head != from)
                .fold(None, |max: Option<Weight>, arc| Some(max.map_or(in_weight + arc.weight, |max| max.max(in_weight + arc.weight))));
            let max_weight = match max_weight {
                Some(max_weight) => max_weight,
                None => continue,
            };

            witness_search.run(graph, from, node, max_weight, max_settled);

            for &out_arc in graph.outgoing(node) {
                let out = graph.arc(out_arc);
                if out.head == from {
                    continue;
                }
                let weight = in_weight + out.weight;
                if witness_search.upper_bound(out.head) > weight {
                    shortcuts.push(Shortcut { in_arc, out_arc, weight });
                }
            }
        }

        shortcuts
    }

    fn priority(&mut self, node: u32) -> NonNan {
        let degree = self.graph.degree(node);
        if degree == 0 {
            return NonNan::NEG_INFINITY;
        }
        let shortcuts = self.find_shortcuts(node, self.max_settled(self.params.max_poll_factor_heuristic));
        let original_edges: u32 = shortcuts
            .iter()
            .map(|shortcut| self.graph.arc(shortcut.in_arc).orig_count + self.graph.arc(shortcut.out_arc).orig_count)
            .sum();

        let priority = self.params.edge_difference_weight * (shortcuts.len() as f64 - degree as f64)
            + self.params.original_edges_count_weight * original_edges as f64
            + self.params.depth_weight * self.depth[node as usize] as f64;
        NonNan::new(priority).unwrap_or(NonNan::INFINITY)
    }

    // Insert the necessary shortcuts and remove `node` from the graph. Returns the former neighbors.
    fn contract(&mut self, node: u32) -> Vec<u32> {
        let shortcuts = self.find_shortcuts(node, self.max_settled(self.params.max_poll_factor_contraction));
        for Shortcut { in_arc, out_arc, weight } in shortcuts {
            let (first, second) = (*self.graph.arc(in_arc), *self.graph.arc(out_arc));
            self.graph.insert_or_decrease(PrepArc {
                tail: first.tail,
                head: second.head,
                weight,
                distance: first.distance + second.distance,
                orig_count: first.orig_count + second.orig_count,
                skipped: Some((in_arc, out_arc)),
                original: 0,
            });
        }
        self.graph.disconnect(node)
    }

    fn run(mut self) -> (Vec<u32>, Vec<PrepArc>) {
        let n = self.graph.num_nodes();
        let params = *self.params;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut levels = vec![std::u32::MAX; n];

        let mut queue = IndexdMinHeap::new(n);
        report_time_with_key("CH priority initialization", "ch_priority_init_ms", || {
            for node in 0..n as u32 {
                let priority = self.priority(node);
                queue.push(PriorityState { priority, node });
            }
        });

        let percent_of_nodes = |percent: u32| (n as u64 * percent as u64 / 100) as usize;
        let to_contract = percent_of_nodes(params.contracted_nodes);
        let periodic_interval = percent_of_nodes(params.periodic_updates);
        let lazy_start = n - percent_of_nodes(params.lazy_updates);

        let mut contracted = 0;
        let mut since_periodic = 0;
        let mut periodic_updates = 0;
        let mut lazy_updates = 0;
        let mut neighbor_updates = 0;

        report_time_with_key("CH contraction", "ch_contraction_ms", || {
            while contracted < to_contract {
                if periodic_interval > 0 && since_periodic == periodic_interval {
                    since_periodic = 0;
                    periodic_updates += 1;
                    let remaining: Vec<u32> = queue.elements().iter().map(|state| state.node).collect();
                    for node in remaining {
                        let priority = self.priority(node);
                        queue.update_key(PriorityState { priority, node });
                    }
                }

                let node = match queue.pop() {
                    Some(PriorityState { node, .. }) => node,
                    None => break,
                };

                if contracted >= lazy_start {
                    let priority = self.priority(node);
                    if let Some(next) = queue.peek() {
                        if priority > next.priority {
                            queue.push(PriorityState { priority, node });
                            lazy_updates += 1;
                            continue;
                        }
                    }
                }

                let degree = self.graph.degree(node);
                let neighbors = self.contract(node);
                levels[node as usize] = contracted as u32;
                contracted += 1;
                since_periodic += 1;
                self.mean_degree = (self.mean_degree * 2.0 + degree as f64) / 3.0;

                for &neighbor in &neighbors {
                    self.depth[neighbor as usize] = self.depth[neighbor as usize].max(self.depth[node as usize] + 1);
                }
                for &neighbor in &neighbors {
                    if queue.contains_index(neighbor as usize) && rng.gen_range(0..100) < params.neighbor_updates {
                        let priority = self.priority(neighbor);
                        queue.update_key(PriorityState { priority, node: neighbor });
                        neighbor_updates += 1;
                    }
                }
            }
        });

        // everything left over is the core and shares the top level
        for level in &mut levels {
            if *level == std::u32::MAX {
                *level = contracted as u32;
            }
        }

        report!("ch_contracted_nodes", contracted);
        report!("ch_core_nodes", n - contracted);
        report!("ch_periodic_updates", periodic_updates);
        report!("ch_lazy_updates", lazy_updates);
        report!("ch_neighbor_updates", neighbor_updates);
        report!("ch_mean_degree", self.mean_degree);

        (levels, self.graph.arcs)
    }
}

/// A preparation session. Holds the inputs, `prepare` does the work.
pub struct PrepareContractionHierarchies<'a, W> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    mode: TraversalMode,
    params: PrepareParams,
}

impl<'a, W: Weighting> PrepareContractionHierarchies<'a, W> {
    /// Node based preparation. Turn costs of the weighting are ignored.
    pub fn new(graph: &'a RoadGraph, weighting: &'a W, params: PrepareParams) -> Self {
        PrepareContractionHierarchies {
            graph,
            weighting,
            mode: TraversalMode::NodeBased,
            params,
        }
    }

    /// Turn aware preparation on the line graph.
    pub fn edge_based(graph: &'a RoadGraph, weighting: &'a W, params: PrepareParams) -> Self {
        PrepareContractionHierarchies {
            graph,
            weighting,
            mode: TraversalMode::EdgeBased,
            params,
        }
    }

    pub fn prepare(self) -> ContractionHierarchy {
        report!("ch_mode", if self.mode.is_edge_based() { "edge_based" } else { "node_based" });
        report!("ch_weighting", self.weighting.name());

        let prep = report_time_with_key("CH graph building", "ch_graph_building_ms", || match self.mode {
            TraversalMode::NodeBased => PreparationGraph::node_based(self.graph, self.weighting),
            TraversalMode::EdgeBased => PreparationGraph::edge_based(self.graph, self.weighting),
        });
        let num_nodes = prep.num_nodes();
        let num_original_arcs = prep.arcs.len();

        let (levels, arcs) = Contractor::new(prep, &self.params).run();
        report!("ch_num_shortcuts", arcs.len() - num_original_arcs);

        let arcs = arcs
            .into_iter()
            .map(|arc| {
                let (base, adj, flags) = if levels[arc.tail as usize] <= levels[arc.head as usize] {
                    (arc.tail, arc.head, FORWARD)
                } else {
                    (arc.head, arc.tail, BACKWARD)
                };
                ChArc {
                    base,
                    adj,
                    weight: arc.weight,
                    distance: arc.distance,
                    flags,
                    skipped: arc.skipped,
                    original: arc.original,
                }
            })
            .collect();

        ContractionHierarchy::new(self.mode, num_nodes, levels, arcs)
    }
}
