// Run random queries with every algorithm on a stored graph and check that they agree on the weights.
// Usage: random_queries <graph_dir> [seed]
// Turn costs and hierarchies (see prepare_ch) are used when present in the graph directory.

#[macro_use]
extern crate route_engine;
use route_engine::{
    algo::{
        a_star::*,
        contraction_hierarchy::*,
        dijkstra::{query::bidirectional_dijkstra, Server as DijkServer},
        *,
    },
    cli::{parse_arg_or, CliErr},
    datastr::graph::*,
    experiments::*,
    io::*,
    report::*,
    util::approx_eq,
    weighting::*,
};
use std::{env, error::Error, path::Path};

use rand::prelude::*;
use rayon::prelude::*;

fn main() -> Result<(), Box<dyn Error>> {
    let _reporter = enable_reporting("random_queries");

    let mut args = env::args().skip(1);
    let arg = &args.next().ok_or(CliErr("No graph directory arg given"))?;
    let path = Path::new(arg);
    let seed: u64 = parse_arg_or(args.next(), 42, "Seed has to be an unsigned integer")?;
    report!("seed", seed);

    let graph = RoadGraph::reconstruct_from(&path)?;
    report!("graph", { "num_nodes": graph.num_nodes(), "num_edges": graph.num_edges() });
    let weighting = FastestWeighting::for_graph(&graph)?;

    if path.join("turn_from").exists() {
        let turn_costs = TurnCostTable::reconstruct_from(&path)?;
        report!("num_turn_costs", turn_costs.len());
        let weighting = TurnCostWeighting::new(weighting, &turn_costs);
        run(&graph, &weighting, &path.join("ch_edge_based"), seed)
    } else {
        run(&graph, &weighting, &path.join("ch"), seed)
    }
}

fn run<W: Weighting + Sync>(graph: &RoadGraph, weighting: &W, ch_dir: &Path, seed: u64) -> Result<(), Box<dyn Error>> {
    let mode = TraversalMode::for_weighting(weighting);
    report!("weighting", weighting.name());
    report!("mode", if mode.is_edge_based() { "edge_based" } else { "node_based" });

    let ch = if ch_dir.exists() {
        let ch = ContractionHierarchy::reconstruct_from(&ch_dir)?;
        ch.check()?;
        Some(ch)
    } else {
        None
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let queries = random_queries(graph.num_nodes(), &mut rng, num_queries());

    let mut algo_runs_ctxt = push_collection_context("algo_runs".to_string());

    let reference = {
        let _item = algo_runs_ctxt.push_collection_item();
        report!("algo", "dijkstra");
        let mut runs_ctxt = push_collection_context("queries".to_string());
        run_queries(&queries, &mut DijkServer::new(graph, weighting, mode), &mut runs_ctxt)?
    };

    let mut others = Vec::new();
    {
        let _item = algo_runs_ctxt.push_collection_item();
        report!("algo", "bidirectional_dijkstra");
        let mut runs_ctxt = push_collection_context("queries".to_string());
        let mut server = bidirectional_dijkstra::Server::new(graph, weighting, mode);
        others.push(("bidirectional_dijkstra", run_queries(&queries, &mut server, &mut runs_ctxt)?));
    }
    if graph.has_coordinates() {
        let _item = algo_runs_ctxt.push_collection_item();
        report!("algo", "astar_beeline");
        let mut runs_ctxt = push_collection_context("queries".to_string());
        let mut server = DijkServer::with_potential(graph, weighting, mode, BeelinePotential::new(graph, weighting));
        others.push(("astar_beeline", run_queries(&queries, &mut server, &mut runs_ctxt)?));
    }
    if let Some(ch) = &ch {
        let _item = algo_runs_ctxt.push_collection_item();
        report!("algo", "contraction_hierarchy");
        let mut runs_ctxt = push_collection_context("queries".to_string());
        let mut server = ContractionHierarchyQuery::new(ch, graph, weighting);
        others.push(("contraction_hierarchy", run_queries(&queries, &mut server, &mut runs_ctxt)?));
    }
    drop(algo_runs_ctxt);

    for (algo, paths) in &others {
        for ((query, expected), path) in queries.iter().zip(&reference).zip(paths) {
            if expected.found != path.found || (expected.found && !approx_eq(expected.weight, path.weight)) {
                eprintln!("{} disagrees on {:?}: {} vs {}", algo, query, path.weight, expected.weight);
                return Err(Box::new(CliErr("Algorithms disagree")));
            }
        }
    }

    // the same queries again, spread over all cores, each thread with its own server
    let parallel: Vec<Option<Weight>> = report_time("parallel bidirectional dijkstra", || {
        queries
            .par_iter()
            .map_init(
                || bidirectional_dijkstra::Server::new(graph, weighting, mode),
                |server, &query| server.query(query).map(|path| if path.found { Some(path.weight) } else { None }),
            )
            .collect::<route_engine::Result<_>>()
    })?;
    let consistent = parallel
        .iter()
        .zip(&reference)
        .all(|(weight, expected)| match weight {
            Some(weight) => expected.found && approx_eq(*weight, expected.weight),
            None => !expected.found,
        });
    report!("parallel_consistent", consistent);
    if !consistent {
        return Err(Box::new(CliErr("Parallel queries disagree")));
    }

    Ok(())
}
