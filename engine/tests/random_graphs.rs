//! All query servers against a brute force reference on many small random graphs.

mod common;

use common::*;
use rand::prelude::*;
use rayon::prelude::*;
use route_engine::{
    algo::{a_star::*, dijkstra::query::bidirectional_dijkstra::Server as BiDijkServer, dijkstra::Server as DijkServer, *},
    datastr::graph::*,
    util::approx_eq,
    weighting::*,
};

fn random_graph(rng: &mut StdRng, with_coordinates: bool) -> RoadGraph {
    let n = rng.gen_range(2..=20);
    let m = rng.gen_range(n..=3 * n);
    let mut builder = RoadGraphBuilder::new(n);

    let coordinates: Vec<(f64, f64)> = (0..n).map(|_| (rng.gen_range(49.0..49.1), rng.gen_range(8.3..8.5))).collect();
    if with_coordinates {
        for (node, &(lat, lng)) in coordinates.iter().enumerate() {
            builder.set_coordinates(node as NodeId, lat, lng).unwrap();
        }
    }

    for _ in 0..m {
        let base = rng.gen_range(0..n as NodeId);
        // the occasional loop
        let adj = if rng.gen_bool(0.05) { base } else { rng.gen_range(0..n as NodeId) };
        let distance = if with_coordinates {
            // keep the beeline a lower bound
            haversine_distance(coordinates[base as usize], coordinates[adj as usize]) * rng.gen_range(1.2..2.0) + 1.0
        } else {
            rng.gen_range(1.0..100.0)
        };
        let speed_fwd = *[30.0, 50.0, 60.0, 100.0].choose(rng).unwrap();
        let speed_bwd = *[30.0, 50.0, 60.0, 100.0].choose(rng).unwrap();
        let access_fwd = rng.gen_bool(0.9);
        let access_bwd = rng.gen_bool(0.7);
        builder
            .add_edge(base, adj, distance, speed_fwd, speed_bwd, access_fwd, access_bwd, rng.gen_range(0.0..=1.0))
            .unwrap();
    }
    builder.build()
}

fn random_turn_costs(rng: &mut StdRng, graph: &RoadGraph) -> TurnCostTable {
    let mut turn_costs = TurnCostTable::new();
    for via in 0..graph.num_nodes() as NodeId {
        for &in_key in graph.in_keys(via) {
            for &out_key in graph.out_keys(via) {
                let (from, to) = (key_edge(in_key), key_edge(out_key));
                if from == to {
                    continue;
                }
                let roll: f64 = rng.gen();
                if roll < 0.15 {
                    turn_costs.add_restriction(from, via, to);
                } else if roll < 0.4 {
                    turn_costs.set(from, via, to, rng.gen_range(0.0..10.0)).unwrap();
                }
            }
        }
    }
    turn_costs
}

fn all_pairs(graph: &RoadGraph) -> Vec<Query> {
    let n = graph.num_nodes() as NodeId;
    (0..n).flat_map(|from| (0..n).map(move |to| Query { from, to })).collect()
}

fn check_against_reference<W: Weighting>(graph: &RoadGraph, weighting: &W, mode: TraversalMode) {
    let queries = all_pairs(graph);
    let expected: Vec<Option<Weight>> = queries
        .iter()
        .map(|query| reference_weight(graph, weighting, mode, query.from, query.to))
        .collect();

    // Random distances make shortest paths unique, so all servers have to agree with
    // the node sequences of the first one, plain Dijkstra.
    let mut dijkstra_nodes: Vec<Vec<NodeId>> = Vec::with_capacity(queries.len());
    let mut i = 0;
    check_all_algorithms(graph, weighting, mode, &queries, |query, path| {
        let expected = expected[i % queries.len()];
        if i < queries.len() {
            dijkstra_nodes.push(path.nodes.clone());
        } else {
            assert_eq!(path.nodes, dijkstra_nodes[i % queries.len()], "{} {:?}", path.debug_info.algorithm, query);
        }
        i += 1;
        match expected {
            Some(weight) => {
                assert_consistent(graph, weighting, mode, query, path);
                assert!(
                    approx_eq(path.weight, weight),
                    "{} {:?}: {} instead of {}",
                    path.debug_info.algorithm,
                    query,
                    path.weight,
                    weight
                );
            }
            None => assert!(!path.found, "{} {:?} found {:?}", path.debug_info.algorithm, query, path.nodes),
        }
    });
}

#[test]
fn node_based_matches_reference() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..30 {
        let graph = random_graph(&mut rng, false);
        let weighting = FastestWeighting::for_graph(&graph).unwrap();
        check_against_reference(&graph, &weighting, TraversalMode::NodeBased);
    }
}

#[test]
fn node_based_shortest_and_priority_match_reference() {
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..15 {
        let graph = random_graph(&mut rng, false);
        check_against_reference(&graph, &ShortestWeighting::for_graph(&graph).unwrap(), TraversalMode::NodeBased);
        check_against_reference(&graph, &PriorityWeighting::for_graph(&graph).unwrap(), TraversalMode::NodeBased);
    }
}

#[test]
fn edge_based_matches_reference() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..30 {
        let graph = random_graph(&mut rng, false);
        let turn_costs = random_turn_costs(&mut rng, &graph);
        let fastest = FastestWeighting::for_graph(&graph).unwrap();
        check_against_reference(&graph, &TurnCostWeighting::new(fastest, &turn_costs), TraversalMode::EdgeBased);
    }
}

#[test]
fn edge_based_with_u_turns_matches_reference() {
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..20 {
        let graph = random_graph(&mut rng, false);
        let turn_costs = random_turn_costs(&mut rng, &graph);
        let u_turn_costs = rng.gen_range(0.0..40.0);
        let weighting = TurnCostWeighting::with_u_turn_costs(FastestWeighting::for_graph(&graph).unwrap(), &turn_costs, u_turn_costs).unwrap();
        check_against_reference(&graph, &weighting, TraversalMode::EdgeBased);
    }
}

#[test]
fn beeline_potentials_stay_exact() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..20 {
        let graph = random_graph(&mut rng, true);
        assert!(graph.has_coordinates());
        let fastest = FastestWeighting::for_graph(&graph).unwrap();
        check_against_reference(&graph, &fastest, TraversalMode::NodeBased);
        let turn_costs = random_turn_costs(&mut rng, &graph);
        check_against_reference(&graph, &TurnCostWeighting::new(fastest, &turn_costs), TraversalMode::EdgeBased);
    }
}

#[test]
fn turn_costs_are_ignored_node_based() {
    let mut rng = StdRng::seed_from_u64(6);
    let graph = random_graph(&mut rng, false);
    let turn_costs = random_turn_costs(&mut rng, &graph);
    let fastest = FastestWeighting::for_graph(&graph).unwrap();
    let with_turns = TurnCostWeighting::new(fastest, &turn_costs);

    let mut plain = DijkServer::new(&graph, &fastest, TraversalMode::NodeBased);
    let mut turn_aware = DijkServer::new(&graph, &with_turns, TraversalMode::NodeBased);
    for query in all_pairs(&graph) {
        let a = plain.query(query).unwrap();
        let b = turn_aware.query(query).unwrap();
        assert_eq!(a.found, b.found);
        assert_eq!(a.weight, b.weight);
    }
}

#[test]
fn repeated_queries_give_identical_paths() {
    let mut rng = StdRng::seed_from_u64(7);
    let graph = random_graph(&mut rng, false);
    let turn_costs = random_turn_costs(&mut rng, &graph);
    let weighting = TurnCostWeighting::new(FastestWeighting::for_graph(&graph).unwrap(), &turn_costs);
    let mut server = BiDijkServer::new(&graph, &weighting, TraversalMode::EdgeBased);

    let queries = all_pairs(&graph);
    let first: Vec<Path> = queries.iter().map(|&query| server.query(query).unwrap()).collect();
    let second: Vec<Path> = queries.iter().map(|&query| server.query(query).unwrap()).collect();
    assert_eq!(first, second);
}

#[test]
fn parallel_queries_agree_with_sequential_ones() {
    let mut rng = StdRng::seed_from_u64(8);
    let graph = random_graph(&mut rng, true);
    let turn_costs = random_turn_costs(&mut rng, &graph);
    let weighting = TurnCostWeighting::new(FastestWeighting::for_graph(&graph).unwrap(), &turn_costs);
    let mode = TraversalMode::for_weighting(&weighting);
    assert_eq!(mode, TraversalMode::EdgeBased);

    let queries = all_pairs(&graph);
    let mut server = DijkServer::new(&graph, &weighting, mode);
    let sequential: Vec<Path> = queries.iter().map(|&query| server.query(query).unwrap()).collect();

    let parallel: Vec<Path> = queries
        .par_iter()
        .map_init(
            || BiDijkServer::with_potentials(&graph, &weighting, mode, BeelinePotential::new(&graph, &weighting), BeelinePotential::new(&graph, &weighting)),
            |server, &query| server.query(query).unwrap(),
        )
        .collect();

    for (a, b) in sequential.iter().zip(&parallel) {
        assert_eq!(a.found, b.found);
        if a.found {
            assert!(approx_eq(a.weight, b.weight));
        }
    }
}
