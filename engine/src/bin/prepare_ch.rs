// Contract a road graph stored in a directory and write the hierarchy next to it.
// Usage: prepare_ch <graph_dir> [node_based|edge_based]
// Edge based preparation requires the turn cost files in the graph directory.

#[macro_use]
extern crate route_engine;
use route_engine::{
    algo::contraction_hierarchy::*,
    cli::CliErr,
    datastr::graph::*,
    io::*,
    report::*,
    weighting::*,
};
use std::{env, error::Error, path::Path};

fn main() -> Result<(), Box<dyn Error>> {
    let _reporter = enable_reporting("prepare_ch");

    let mut args = env::args().skip(1);
    let arg = &args.next().ok_or(CliErr("No graph directory arg given"))?;
    let path = Path::new(arg);
    let edge_based = match args.next().as_deref() {
        None | Some("node_based") => false,
        Some("edge_based") => true,
        Some(_) => return Err(Box::new(CliErr("Traversal mode has to be node_based or edge_based"))),
    };

    let graph = RoadGraph::reconstruct_from(&path)?;
    report!("graph", { "num_nodes": graph.num_nodes(), "num_edges": graph.num_edges() });

    let weighting = FastestWeighting::for_graph(&graph)?;
    let params = PrepareParams::default();
    report!("params", {
        "periodic_updates": params.periodic_updates,
        "lazy_updates": params.lazy_updates,
        "neighbor_updates": params.neighbor_updates,
        "contracted_nodes": params.contracted_nodes
    });

    let (ch, dir) = if edge_based {
        let turn_costs = TurnCostTable::reconstruct_from(&path)?;
        report!("num_turn_costs", turn_costs.len());
        let weighting = TurnCostWeighting::new(weighting, &turn_costs);
        let ch = report_time("edge based CH preparation", || {
            PrepareContractionHierarchies::edge_based(&graph, &weighting, params).prepare()
        });
        (ch, path.join("ch_edge_based"))
    } else {
        let ch = report_time("CH preparation", || PrepareContractionHierarchies::new(&graph, &weighting, params).prepare());
        (ch, path.join("ch"))
    };
    ch.check()?;
    report!("num_shortcuts", ch.num_shortcuts());

    std::fs::create_dir_all(&dir)?;
    ch.deconstruct_to(&dir)?;
    ch.order().deconstruct_to(&dir)?;

    Ok(())
}
