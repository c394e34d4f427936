//! Contraction Hierarchy query server.
//!
//! Actually not much more than a bidirectional dijkstra with a different stopping criterion.
//! And more complicated path unpacking.
//! This works because the arcs of the hierarchy are split into an upward and a downward part.
//! The forward search only follows upward arcs, the backward search only downward arcs against their direction,
//! so both searches only go to higher ranked nodes and meet at the top of the path.

use super::*;
use crate::algo::dijkstra::{query::SearchLimits, DijkstraData, Direction, EntryId, SptEntry, INVALID_ENTRY};
use crate::error::{check_node, Error};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Meeting {
    weight: Weight,
    node: u32,
    forward_entry: EntryId,
    backward_entry: EntryId,
}

pub struct Server<'a, W> {
    ch: &'a ContractionHierarchy,
    graph: &'a RoadGraph,
    weighting: &'a W,
    limits: SearchLimits,
    forward_data: DijkstraData,
    backward_data: DijkstraData,
    // whether the original arcs of the hierarchy are edges of `graph`
    originals: std::result::Result<(), String>,
}

impl<'a, W: Weighting> Server<'a, W> {
    /// `graph` and `weighting` have to be the ones the hierarchy was prepared with.
    /// They are needed to turn the unpacked arcs back into a path.
    pub fn new(ch: &'a ContractionHierarchy, graph: &'a RoadGraph, weighting: &'a W) -> Self {
        let n = ch.num_nodes();
        Server {
            ch,
            graph,
            weighting,
            limits: SearchLimits::default(),
            forward_data: DijkstraData::new(n),
            backward_data: DijkstraData::new(n),
            originals: check_originals(ch, graph),
        }
    }

    pub fn set_max_visited_nodes(&mut self, max_visited_nodes: usize) {
        self.limits.max_visited_nodes = max_visited_nodes;
    }

    fn visited_nodes(&self) -> usize {
        self.forward_data.num_settled() + self.backward_data.num_settled()
    }

    fn check_hierarchy(&self) -> Result<()> {
        self.ch.check()?;
        let expected = hierarchy_size(self.ch.mode(), self.graph);
        if self.ch.num_nodes() != expected {
            return Err(Error::InvalidGraph(format!(
                "hierarchy has {} nodes but the graph requires {}",
                self.ch.num_nodes(),
                expected
            )));
        }
        self.originals.clone().map_err(Error::PreparationInvariantViolation)
    }

    // Node based, the roots are the query nodes. Edge based, the forward roots are the
    // edges leaving the source, already including their weight, the backward roots the edges entering the target.
    fn init(&mut self, from: NodeId, to: NodeId) -> Option<Meeting> {
        self.forward_data.reset();
        self.backward_data.reset();

        match self.ch.mode() {
            TraversalMode::NodeBased => {
                self.forward_data.add_root(from, from, 0.0, 0.0);
                self.backward_data.add_root(to, to, 0.0, 0.0);
            }
            TraversalMode::EdgeBased => {
                for &key in self.graph.out_keys(from) {
                    let weight = self.weighting.edge_weight(&self.graph.view(key));
                    if weight < INFINITY {
                        self.forward_data.add_root(key, key, weight, weight);
                    }
                }
                for &key in self.graph.in_keys(to) {
                    if self.weighting.edge_weight(&self.graph.view(key)) < INFINITY {
                        self.backward_data.add_root(key, key, 0.0, 0.0);
                    }
                }
            }
        }

        // a single edge from source to target is rooted on both sides
        let mut meeting = None;
        for (id, entry) in self.forward_data.entries().iter().enumerate() {
            connect(Direction::Forward, entry.adj_node, id as EntryId, entry.weight, &self.backward_data, &mut meeting);
        }
        meeting
    }

    fn search(&mut self, from: NodeId, to: NodeId) -> Result<Option<Meeting>> {
        let mut meeting = self.init(from, to);

        loop {
            let best = meeting.map_or(INFINITY, |m| m.weight);
            let forward_key = self.forward_data.min_key().unwrap_or(INFINITY);
            let backward_key = self.backward_data.min_key().unwrap_or(INFINITY);
            if forward_key >= best && backward_key >= best {
                break;
            }

            if forward_key <= backward_key {
                settle_next(self.ch, &mut self.forward_data, &self.backward_data, Direction::Forward, &mut meeting);
            } else {
                settle_next(self.ch, &mut self.backward_data, &self.forward_data, Direction::Backward, &mut meeting);
            }

            self.limits.check_visited(self.visited_nodes())?;
        }

        Ok(meeting)
    }

    fn unpack_path(&self, from: NodeId, meeting: Meeting) -> Path {
        let mut chain = self.forward_data.edges_to(meeting.forward_entry);
        chain.extend(self.backward_data.edges_from(meeting.backward_entry));

        let mut originals = Vec::new();
        for arc in chain {
            self.ch.unpack(arc, &mut originals);
        }

        let mut edges = Vec::with_capacity(originals.len() + 1);
        if self.ch.mode().is_edge_based() {
            // arcs of the line graph lead onto an edge, the first edge is the root itself
            edges.push(root_of(&self.forward_data, meeting.forward_entry));
        }
        edges.extend(originals.into_iter().map(|arc| self.ch.arcs()[arc as usize].original));

        Path::from_edge_keys(self.graph, self.weighting, self.ch.mode(), from, edges)
    }
}

fn hierarchy_size(mode: TraversalMode, graph: &RoadGraph) -> usize {
    match mode {
        TraversalMode::NodeBased => graph.num_nodes(),
        TraversalMode::EdgeBased => graph.num_keys(),
    }
}

// Unpacked paths are turned into edge keys, so every original arc has to be one of the graph's edges.
fn check_originals(ch: &ContractionHierarchy, graph: &RoadGraph) -> std::result::Result<(), String> {
    if ch.check().is_err() || ch.num_nodes() != hierarchy_size(ch.mode(), graph) {
        // reported by the other checks
        return Ok(());
    }
    for (id, arc) in ch.arcs().iter().enumerate().filter(|(_, arc)| !arc.is_shortcut()) {
        let key = arc.original;
        if key as usize >= graph.num_keys() {
            return Err(format!("arc {} refers to edge key {} which is not in the graph", id, key));
        }
        let connects = match ch.mode() {
            TraversalMode::NodeBased => graph.tail(key) == arc.tail() && graph.head(key) == arc.head(),
            TraversalMode::EdgeBased => key == arc.head() && graph.head(arc.tail()) == graph.tail(key),
        };
        if !connects {
            return Err(format!("arc {} does not match edge key {}", id, key));
        }
    }
    Ok(())
}

fn root_of(data: &DijkstraData, mut entry: EntryId) -> u32 {
    while data.entry(entry).parent != INVALID_ENTRY {
        entry = data.entry(entry).parent;
    }
    data.entry(entry).adj_node
}

// Ties between equally good meetings are broken by the smaller node.
fn connect(direction: Direction, node: u32, id: EntryId, weight: Weight, other: &DijkstraData, meeting: &mut Option<Meeting>) {
    if let Some(other_id) = other.best_entry(node) {
        let candidate = weight + other.entry(other_id).weight;
        if meeting.map_or(true, |m| candidate < m.weight || (candidate == m.weight && node < m.node)) {
            let (forward_entry, backward_entry) = match direction {
                Direction::Forward => (id, other_id),
                Direction::Backward => (other_id, id),
            };
            *meeting = Some(Meeting {
                weight: candidate,
                node,
                forward_entry,
                backward_entry,
            });
        }
    }
}

fn settle_next(ch: &ContractionHierarchy, data: &mut DijkstraData, other: &DijkstraData, direction: Direction, meeting: &mut Option<Meeting>) {
    let item = match data.pop() {
        Some(item) => item,
        None => return,
    };
    let current = *data.entry(item.entry);

    let arcs = match direction {
        Direction::Forward => ch.upward_arcs(item.state),
        Direction::Backward => ch.downward_arcs(item.state),
    };
    for &arc_id in arcs {
        let arc = &ch.arcs()[arc_id as usize];
        let next = match direction {
            Direction::Forward => arc.head(),
            Direction::Backward => arc.tail(),
        };
        let weight = current.weight + arc.weight;
        let entry = SptEntry {
            adj_node: next,
            edge: Some(arc_id),
            weight,
            time: 0,
            parent: item.entry,
        };
        if let Some(id) = data.improve(next, entry, weight) {
            connect(direction, next, id, weight, other, meeting);
        }
    }
}

impl<'a, W: Weighting> QueryServer for Server<'a, W> {
    fn query(&mut self, query: Query) -> Result<Path> {
        check_node(query.from, self.graph.num_nodes())?;
        check_node(query.to, self.graph.num_nodes())?;
        if query.from == query.to {
            return Ok(Path::trivial(query.from).with_debug_info("contraction_hierarchy", 0));
        }
        self.check_hierarchy()?;

        let path = match self.search(query.from, query.to)? {
            Some(meeting) => self.unpack_path(query.from, meeting),
            None => Path::not_found(),
        };
        Ok(path.with_debug_info("contraction_hierarchy", self.visited_nodes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::dijkstra::Server as DijkstraServer;
    use crate::weighting::*;

    // 3x3 grid, 0 1 2 in the first row, horizontal edges longer than vertical ones
    fn grid() -> RoadGraph {
        let mut builder = RoadGraphBuilder::new(9);
        for row in 0..3u32 {
            for col in 0..3u32 {
                let node = row * 3 + col;
                if col < 2 {
                    builder.add_bidir_edge(node, node + 1, 100.0 + 10.0 * row as f64, 60.0).unwrap();
                }
                if row < 2 {
                    builder.add_bidir_edge(node, node + 3, 70.0, 60.0).unwrap();
                }
            }
        }
        builder.build()
    }

    #[test]
    fn same_weights_as_dijkstra() {
        let graph = grid();
        let weighting = FastestWeighting::for_graph(&graph).unwrap();
        let ch = PrepareContractionHierarchies::new(&graph, &weighting, PrepareParams::default()).prepare();
        let mut server = Server::new(&ch, &graph, &weighting);
        let mut dijkstra = DijkstraServer::new(&graph, &weighting, TraversalMode::NodeBased);

        for from in 0..9 {
            for to in 0..9 {
                let expected = dijkstra.query(Query { from, to }).unwrap();
                let path = server.query(Query { from, to }).unwrap();
                assert!(path.found);
                assert!(crate::util::approx_eq(path.weight, expected.weight), "{} -> {}", from, to);
                assert_eq!(path.nodes.first(), Some(&from));
                assert_eq!(path.nodes.last(), Some(&to));
                assert_eq!(path.debug_info.algorithm, "contraction_hierarchy");
            }
        }
    }

    #[test]
    fn restricted_turns_are_avoided() {
        let graph = grid();
        let mut turn_costs = TurnCostTable::new();
        // 0 -> 1 -> 2 forbidden
        let first = graph.view(graph.out_keys(0).iter().copied().find(|&key| graph.head(key) == 1).unwrap()).edge;
        let second = graph.view(graph.out_keys(1).iter().copied().find(|&key| graph.head(key) == 2).unwrap()).edge;
        turn_costs.add_restriction(first, 1, second);
        let weighting = TurnCostWeighting::new(FastestWeighting::for_graph(&graph).unwrap(), &turn_costs);

        let ch = PrepareContractionHierarchies::edge_based(&graph, &weighting, PrepareParams::default()).prepare();
        let mut server = Server::new(&ch, &graph, &weighting);
        let path = server.query(Query { from: 0, to: 2 }).unwrap();
        assert!(path.found);
        assert_ne!(&path.nodes[..], &[0, 1, 2]);

        let mut dijkstra = DijkstraServer::new(&graph, &weighting, TraversalMode::EdgeBased);
        let expected = dijkstra.query(Query { from: 0, to: 2 }).unwrap();
        assert!(crate::util::approx_eq(path.weight, expected.weight));
    }

    #[test]
    fn corrupted_hierarchy_is_refused() {
        let graph = grid();
        let weighting = FastestWeighting::for_graph(&graph).unwrap();
        let ch = PrepareContractionHierarchies::new(&graph, &weighting, PrepareParams::default()).prepare();
        let broken = ContractionHierarchy::new(ch.mode(), ch.num_nodes(), ch.levels().iter().map(|&level| 8 - level).collect(), ch.arcs().to_vec());
        let mut server = Server::new(&broken, &graph, &weighting);
        assert!(matches!(
            server.query(Query { from: 0, to: 8 }),
            Err(Error::PreparationInvariantViolation(_))
        ));
    }

    #[test]
    fn originals_outside_the_graph_are_refused() {
        let graph = grid();
        let weighting = FastestWeighting::for_graph(&graph).unwrap();
        let ch = PrepareContractionHierarchies::new(&graph, &weighting, PrepareParams::default()).prepare();
        let mut arcs = ch.arcs().to_vec();
        for arc in arcs.iter_mut().filter(|arc| !arc.is_shortcut()) {
            arc.original = 999;
        }
        let broken = ContractionHierarchy::new(ch.mode(), ch.num_nodes(), ch.levels().to_vec(), arcs);
        assert!(broken.check().is_ok());
        let mut server = Server::new(&broken, &graph, &weighting);
        assert!(matches!(
            server.query(Query { from: 0, to: 8 }),
            Err(Error::PreparationInvariantViolation(_))
        ));

        // in range, but an edge between other nodes
        let mut arcs = ch.arcs().to_vec();
        for arc in arcs.iter_mut().filter(|arc| !arc.is_shortcut()) {
            arc.original = 0;
        }
        let swapped = ContractionHierarchy::new(ch.mode(), ch.num_nodes(), ch.levels().to_vec(), arcs);
        let mut server = Server::new(&swapped, &graph, &weighting);
        assert!(matches!(
            server.query(Query { from: 0, to: 8 }),
            Err(Error::PreparationInvariantViolation(_))
        ));
    }
}
