//! Running batches of random queries for the experiment binaries.

use rand::prelude::*;
use std::time::Duration;

use crate::{algo::*, datastr::graph::*, error::Result, report::*};

/// Number of queries performed for experiments.
/// Can be overriden through the NUM_QUERIES env var.
pub fn num_queries() -> usize {
    std::env::var("NUM_QUERIES").ok().and_then(|num| num.parse().ok()).unwrap_or(1000)
}

/// Uniformly random source target pairs.
pub fn random_queries(num_nodes: usize, rng: &mut StdRng, num_queries: usize) -> Vec<Query> {
    if num_nodes == 0 {
        return Vec::new();
    }
    (0..num_queries)
        .map(|_| Query {
            from: rng.gen_range(0..num_nodes as NodeId),
            to: rng.gen_range(0..num_nodes as NodeId),
        })
        .collect()
}

/// Run all queries on the server, reporting one collection item per query, and return the paths.
pub fn run_queries(queries: &[Query], server: &mut impl QueryServer, reporting_context: &mut CollectionContextGuard) -> Result<Vec<Path>> {
    let mut total_query_time = Duration::ZERO;
    let mut paths = Vec::with_capacity(queries.len());

    for &query in queries {
        let _query_ctxt = reporting_context.push_collection_item();

        report!("from", query.from);
        report!("to", query.to);

        let (path, time) = measure(|| server.query(query));
        let path = path?;
        report!("running_time_ms", time.as_secs_f64() * 1000.0);
        report!("found", path.found);
        if path.found {
            report!("weight", path.weight);
            report!("distance", path.distance);
            report!("time", path.time);
        }
        report!("visited_nodes", path.debug_info.visited_nodes);

        total_query_time += time;
        paths.push(path);
    }

    if !queries.is_empty() {
        eprintln!("Avg. query time {:?}", total_query_time / queries.len() as u32)
    };

    Ok(paths)
}
