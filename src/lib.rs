//! lib target
//!
//! Multilevel spectral coarsening of graphs and refinement of embeddings computed on the coarsest graph.
//!
//! The pipeline is :
//! - optional fusion of the structural laplacian with a feature similarity graph. See [fusion].
//! - coarsening into a hierarchy of smaller graphs. See [coarsen].
//! - embedding of the coarsest graph by an external method. See [embedding].
//! - refinement back to the original graph. See [refine].
//!
//! [pipeline::GraphZoom] chains all these steps.

use env_logger::Builder;

#[macro_use]
extern crate lazy_static;

lazy_static! {
    static ref LOG: u64 = {
        let res = init_log();
        res
    };
}

// install a logger facility
fn init_log() -> u64 {
    let _ = Builder::from_default_env().try_init();
    println!("\n ************** initializing logger *****************\n");
    return 1;
}

/// installs env_logger once if the caller did not install a logger itself
pub fn ensure_logger() {
    lazy_static::initialize(&LOG);
}

pub mod tools;

pub mod laplacian;

pub mod fusion;

pub mod coarsen;

pub mod refine;

pub mod embedding;

pub mod io;

pub mod pipeline;

pub mod prelude;
