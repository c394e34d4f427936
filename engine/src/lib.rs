//! A road network routing engine.
//!
//! Label setting shortest path searches (Dijkstra, A*, bidirectional and one-to-many variants)
//! over road graphs with optional turn costs and Contraction Hierarchies
//! for fast repeated queries, node based and turn aware.

#[macro_use]
pub mod report;
pub mod algo;
pub mod cli;
pub mod datastr;
pub mod error;
pub mod experiments;
pub mod io;
pub mod util;
pub mod weighting;

pub use error::{Error, Result};

mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
