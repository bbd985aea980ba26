//! Graph fusion : blends the structural laplacian with the laplacian of a feature similarity graph.
//!
//! The clusters in which the feature graph is searched come from one coarsening pass of the structural graph,
//! done by whichever [CoarsenerT] the run is configured with.

use anyhow::anyhow;

use std::time::SystemTime;

use cpu_time::ProcessTime;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::coarsen::CoarsenerT;

pub mod featgraph;

pub use featgraph::feats_to_laplacian;

/// number of neighbours in the feature knn graph
pub const DEFAULT_NUM_NEIGHS: usize = 2;

#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct FusionParams {
    /// number of nearest neighbours searched in a cluster
    pub num_neighs: usize,
}

impl FusionParams {
    pub fn new(num_neighs: usize) -> Self {
        FusionParams { num_neighs }
    }

    pub fn get_num_neighs(&self) -> usize {
        self.num_neighs
    }
}

impl Default for FusionParams {
    fn default() -> Self {
        FusionParams::new(DEFAULT_NUM_NEIGHS)
    }
}

/// returns laplacian + feature laplacian.
/// The feature graph is built inside the clusters of a single coarsening pass of laplacian by coarsener.
pub fn graph_fusion(
    laplacian: &CsMat<f64>,
    features: &Array2<f64>,
    params: &FusionParams,
    coarsener: &mut dyn CoarsenerT,
) -> anyhow::Result<CsMat<f64>> {
    let cpu_start = ProcessTime::now();
    let sys_start = SystemTime::now();
    //
    if features.nrows() != laplacian.rows() {
        log::error!(
            "graph_fusion features have {} rows, graph has {} nodes",
            features.nrows(),
            laplacian.rows()
        );
        return Err(anyhow!(
            "features have {} rows, graph has {} nodes",
            features.nrows(),
            laplacian.rows()
        ));
    }
    log::info!("graph fusion, mapping from {:?} coarsening", coarsener.get_mode());
    let mapping = coarsener.fusion_mapping(laplacian)?;
    log::debug!("fusion mapping {} nodes in {} clusters", mapping.rows(), mapping.cols());
    let feats_laplacian = feats_to_laplacian(features, params.get_num_neighs(), &mapping)?;
    let fused = laplacian + &feats_laplacian;
    coarsener.persist_fused(&fused)?;
    //
    log::info!(
        "graph fusion done, nnz : {} -> {}, sys time(ms) {:?} cpu time(ms) {:?}",
        laplacian.nnz(),
        fused.nnz(),
        sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
        cpu_start.elapsed().as_millis()
    );
    Ok(fused)
} // end of graph_fusion

//========================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::coarsen::simple::SimpleCoarsener;
    use crate::coarsen::CoarsenParams;
    use crate::laplacian::{build_laplacian, WeightedGraph};
    use crate::tools::sparse::check_laplacian;
    use ndarray::array;
    use petgraph::graph::NodeIndex;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn ring(nb_nodes: usize) -> CsMat<f64> {
        let mut graph = WeightedGraph::default();
        for _ in 0..nb_nodes {
            graph.add_node(());
        }
        for i in 0..nb_nodes {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new((i + 1) % nb_nodes), 1.);
        }
        build_laplacian(&graph).unwrap()
    }

    #[test]
    fn test_fusion_gives_laplacian() {
        log_init_test();
        let laplacian = ring(6);
        let features = array![[1., 0.], [0.9, 0.1], [0., 1.], [0.2, 1.], [1., 1.], [-1., 0.5]];
        let mut coarsener = SimpleCoarsener::new(CoarsenParams::default());
        let fused = graph_fusion(&laplacian, &features, &FusionParams::default(), &mut coarsener).unwrap();
        assert_eq!(fused.shape(), laplacian.shape());
        check_laplacian(&fused, 1.0E-10).unwrap();
        // structural edges are kept and can only be reinforced
        for i in 0..6 {
            let j = (i + 1) % 6;
            assert!(*fused.get(i, j).unwrap() <= -1.);
        }
    }

    #[test]
    fn test_fusion_rejects_misaligned_features() {
        log_init_test();
        let laplacian = ring(4);
        let features = array![[1., 0.], [0., 1.]];
        let mut coarsener = SimpleCoarsener::new(CoarsenParams::default());
        assert!(graph_fusion(&laplacian, &features, &FusionParams::default(), &mut coarsener).is_err());
    }
} // end of mod tests
