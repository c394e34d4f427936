#![allow(dead_code)]

use route_engine::{
    algo::{
        a_star::*,
        contraction_hierarchy::*,
        dijkstra::{
            query::{bidirectional_dijkstra::Server as BiDijkServer, one_to_many::OneToManyServer},
            Server as DijkServer,
        },
        *,
    },
    datastr::graph::*,
    util::approx_eq,
    weighting::*,
};

/// The id of the edge between `a` and `b`, in either direction.
pub fn edge_between(graph: &RoadGraph, a: NodeId, b: NodeId) -> EdgeId {
    (0..graph.num_edges() as EdgeId)
        .find(|&edge| {
            let (base, adj) = graph.endpoints(edge);
            (base, adj) == (a, b) || (base, adj) == (b, a)
        })
        .unwrap_or_else(|| panic!("no edge between {} and {}", a, b))
}

/// Forbid turning from the edge `from - via` onto the edge `via - to`.
pub fn restrict(turn_costs: &mut TurnCostTable, graph: &RoadGraph, from: NodeId, via: NodeId, to: NodeId) {
    turn_costs.add_restriction(edge_between(graph, from, via), via, edge_between(graph, via, to));
}

pub fn set_turn_cost(turn_costs: &mut TurnCostTable, graph: &RoadGraph, cost: Weight, from: NodeId, via: NodeId, to: NodeId) {
    turn_costs.set(edge_between(graph, from, via), via, edge_between(graph, via, to), cost).unwrap();
}

/// Run the queries with every query server, including a freshly prepared hierarchy for the mode,
/// and hand each resulting path to `check`.
pub fn check_all_algorithms<'a, W: Weighting>(graph: &'a RoadGraph, weighting: &'a W, mode: TraversalMode, queries: &[Query], mut check: impl FnMut(Query, &Path)) {
    let mut servers: Vec<Box<dyn QueryServer + 'a>> = vec![
        Box::new(DijkServer::new(graph, weighting, mode)),
        Box::new(DijkServer::with_potential(graph, weighting, mode, BeelinePotential::new(graph, weighting))),
        Box::new(DijkServer::with_potential(graph, weighting, mode, BaselinePotential::new(graph, weighting))),
        Box::new(BiDijkServer::new(graph, weighting, mode)),
        Box::new(BiDijkServer::with_potentials(
            graph,
            weighting,
            mode,
            BeelinePotential::new(graph, weighting),
            BeelinePotential::new(graph, weighting),
        )),
        Box::new(BiDijkServer::with_potentials(
            graph,
            weighting,
            mode,
            BaselinePotential::new(graph, weighting),
            BaselinePotential::reversed(graph, weighting),
        )),
        Box::new(OneToManyServer::new(graph, weighting, mode)),
    ];
    for server in &mut servers {
        for &query in queries {
            let path = server.query(query).unwrap();
            check(query, &path);
        }
    }

    let ch = match mode {
        TraversalMode::NodeBased => PrepareContractionHierarchies::new(graph, weighting, PrepareParams::default()),
        TraversalMode::EdgeBased => PrepareContractionHierarchies::edge_based(graph, weighting, PrepareParams::default()),
    }
    .prepare();
    let mut server = ContractionHierarchyQuery::new(&ch, graph, weighting);
    for &query in queries {
        let path = server.query(query).unwrap();
        check(query, &path);
    }
}

/// Check that a path is a connected walk from source to target whose totals match its edges.
pub fn assert_consistent<W: Weighting>(graph: &RoadGraph, weighting: &W, mode: TraversalMode, query: Query, path: &Path) {
    let algo = path.debug_info.algorithm;
    assert!(path.found, "{} {:?}", algo, query);
    assert_eq!(path.nodes.first(), Some(&query.from), "{}", algo);
    assert_eq!(path.nodes.last(), Some(&query.to), "{}", algo);
    assert_eq!(path.nodes.len(), path.edges.len() + 1, "{}", algo);
    for (i, &key) in path.edges.iter().enumerate() {
        assert_eq!(graph.tail(key), path.nodes[i], "{}", algo);
        assert_eq!(graph.head(key), path.nodes[i + 1], "{}", algo);
        assert!(weighting.edge_weight(&graph.view(key)) < INFINITY, "{}", algo);
    }
    let recomputed = Path::from_edge_keys(graph, weighting, mode, query.from, path.edges.clone());
    assert!(approx_eq(recomputed.weight, path.weight), "{}: {} vs {}", algo, recomputed.weight, path.weight);
    assert_eq!(recomputed.time, path.time, "{}", algo);
}

/// Shortest path weight by relaxing all edges until nothing changes. Slow but obviously right.
pub fn reference_weight<W: Weighting>(graph: &RoadGraph, weighting: &W, mode: TraversalMode, from: NodeId, to: NodeId) -> Option<Weight> {
    if from == to {
        return Some(0.0);
    }
    let weight_of = |key: EdgeKey| weighting.edge_weight(&graph.view(key));

    match mode {
        TraversalMode::NodeBased => {
            let mut dist = vec![INFINITY; graph.num_nodes()];
            dist[from as usize] = 0.0;
            let mut changed = true;
            while changed {
                changed = false;
                for key in 0..graph.num_keys() as EdgeKey {
                    let candidate = dist[graph.tail(key) as usize] + weight_of(key);
                    if candidate < dist[graph.head(key) as usize] {
                        dist[graph.head(key) as usize] = candidate;
                        changed = true;
                    }
                }
            }
            Some(dist[to as usize]).filter(|&d| d < INFINITY)
        }
        TraversalMode::EdgeBased => {
            // weight of the best walk from the source ending with each key
            let mut dist = vec![INFINITY; graph.num_keys()];
            for &key in graph.out_keys(from) {
                dist[key as usize] = dist[key as usize].min(weight_of(key));
            }
            let mut changed = true;
            while changed {
                changed = false;
                for key in 0..graph.num_keys() as EdgeKey {
                    if dist[key as usize] == INFINITY {
                        continue;
                    }
                    let via = graph.head(key);
                    for &next in graph.out_keys(via) {
                        let candidate = dist[key as usize] + weighting.turn_weight(key, via, next) + weight_of(next);
                        if candidate < dist[next as usize] {
                            dist[next as usize] = candidate;
                            changed = true;
                        }
                    }
                }
            }
            graph
                .in_keys(to)
                .iter()
                .map(|&key| dist[key as usize])
                .fold(None, |best: Option<Weight>, d| if d < INFINITY && best.map_or(true, |b| d < b) { Some(d) } else { best })
        }
    }
}
