//! Basic variant of dijkstras algorithm, with optional potential (A*).

use super::*;
use crate::algo::a_star::*;

pub struct Server<'a, W, P = ZeroPotential> {
    graph: &'a RoadGraph,
    weighting: &'a W,
    mode: TraversalMode,
    filter: Box<dyn EdgeFilter + 'a>,
    limits: SearchLimits,
    data: DijkstraData,
    potential: P,
    algorithm: &'static str,
}

impl<'a, W: Weighting> Server<'a, W, ZeroPotential> {
    pub fn new(graph: &'a RoadGraph, weighting: &'a W, mode: TraversalMode) -> Self {
        Server {
            algorithm: "dijkstra",
            ..Self::with_potential(graph, weighting, mode, ZeroPotential())
        }
    }
}

impl<'a, W: Weighting, P: Potential> Server<'a, W, P> {
    /// An A* server. With `ZeroPotential` this is plain Dijkstra.
    pub fn with_potential(graph: &'a RoadGraph, weighting: &'a W, mode: TraversalMode, potential: P) -> Self {
        Server {
            graph,
            weighting,
            mode,
            filter: Box::new(AllEdges),
            limits: SearchLimits::default(),
            data: DijkstraData::new(mode.num_states(graph)),
            potential,
            algorithm: "astar",
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

    pub fn potential(&self) -> &P {
        &self.potential
    }

    fn search(&mut self, from: NodeId, to: NodeId) -> Result<Path> {
        self.potential.init(to);
        let potential = &mut self.potential;
        let mut run = DijkstraRun::new(self.graph, self.weighting, &*self.filter, self.mode, Direction::Forward, &mut self.data);
        run.init(from, |node| potential.potential(node));

        loop {
            match run.min_key() {
                Some(key) if key <= self.limits.weight_limit => (),
                _ => return Ok(Path::not_found()),
            }
            let item = match run.settle_next(|node| potential.potential(node), |_, _, _| ()) {
                Some(item) => item,
                None => return Ok(Path::not_found()),
            };
            self.limits.check_visited(run.data().num_settled())?;

            if run.data().entry(item.entry).adj_node == to {
                let path = PathExtractor::new(self.graph, self.weighting, self.mode).extract(from, run.data(), item.entry);
                return Ok(path);
            }
        }
    }
}

impl<'a, W: Weighting, P: Potential> QueryServer for Server<'a, W, P> {
    fn query(&mut self, query: Query) -> Result<Path> {
        check_query(self.graph, query)?;
        if query.from == query.to {
            return Ok(Path::trivial(query.from).with_debug_info(self.algorithm, 0));
        }
        let path = self.search(query.from, query.to)?;
        Ok(path.with_debug_info(self.algorithm, self.data.num_settled()))
    }
}
