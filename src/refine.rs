//! Refinement : brings the embedding of the coarsest graph back to the original graph.
//!
//! Levels are unwound from the coarsest to the finest. At level i the embedding is copied from each cluster
//! to its members by the mapping $M_i$, then smoothed by the filter $F_i$ of the laplacian of level i :
//!
//! $$ E \leftarrow F_i \cdot (F_i \cdot M_i E) $$
//!
//! Smoothing is done at every level in power mode, otherwise only at the finest level.

use anyhow::anyhow;

use std::time::SystemTime;

use cpu_time::ProcessTime;
use ndarray::Array2;

use crate::coarsen::Hierarchy;
use crate::laplacian::smooth_filter;

#[cfg_attr(doc, katexit::katexit)]
/// refines embedding, which must have one row per node of the coarsest graph.
/// lda is the self loop weight of the filter.
/// Returns an embedding with one row per node of the original graph.
pub fn refine(hierarchy: &Hierarchy, embedding: Array2<f64>, lda: f64, power: bool) -> anyhow::Result<Array2<f64>> {
    let cpu_start = ProcessTime::now();
    let sys_start = SystemTime::now();
    //
    if embedding.nrows() != hierarchy.get_nb_coarse_nodes() {
        log::error!(
            "refine : embedding has {} rows, coarsest graph has {} nodes",
            embedding.nrows(),
            hierarchy.get_nb_coarse_nodes()
        );
        return Err(anyhow!(
            "embedding has {} rows, coarsest graph has {} nodes",
            embedding.nrows(),
            hierarchy.get_nb_coarse_nodes()
        ));
    }
    let mut embedding = embedding;
    for level in (0..hierarchy.get_nb_levels()).rev() {
        embedding = hierarchy.get_projection(level) * &embedding;
        if power || level == 0 {
            let filter = smooth_filter(hierarchy.get_laplacian(level), lda);
            embedding = &filter * &embedding;
            embedding = &filter * &embedding;
        }
        log::debug!("refine level {} : {} rows", level, embedding.nrows());
    }
    log::info!(
        "refinement done, sys time(ms) {:?} cpu time(ms) {:?}",
        sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
        cpu_start.elapsed().as_millis()
    );
    Ok(embedding)
} // end of refine

//========================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::coarsen::simple::SimpleCoarsener;
    use crate::coarsen::CoarsenParams;
    use crate::laplacian::{build_laplacian, WeightedGraph};
    use ndarray::array;
    use petgraph::graph::NodeIndex;
    use sprs::{CsMat, TriMat};

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn path(nb_nodes: usize) -> CsMat<f64> {
        let mut graph = WeightedGraph::default();
        for _ in 0..nb_nodes {
            graph.add_node(());
        }
        for i in 0..nb_nodes - 1 {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new(i + 1), 1.);
        }
        build_laplacian(&graph).unwrap()
    }

    // path of 4 nodes, clusters {0,1} {2,3}, then one cluster
    fn two_levels() -> Hierarchy {
        let p0: CsMat<f64> = TriMat::from_triplets((4, 2), vec![0, 1, 2, 3], vec![0, 0, 1, 1], vec![1.; 4]).to_csr();
        let p1: CsMat<f64> = TriMat::from_triplets((2, 1), vec![0, 1], vec![0, 0], vec![1.; 2]).to_csr();
        Hierarchy::from_projections(&path(4), vec![p0, p1]).unwrap()
    }

    #[test]
    fn test_zero_levels_is_identity() {
        log_init_test();
        let hierarchy = Hierarchy::from_projections(&path(3), vec![]).unwrap();
        let embedding = array![[1., 2.], [3., 4.], [5., 6.]];
        let refined = refine(&hierarchy, embedding.clone(), 0.1, true).unwrap();
        assert_eq!(refined, embedding);
    }

    #[test]
    fn test_refined_rows() {
        log_init_test();
        let hierarchy = two_levels();
        let refined = refine(&hierarchy, array![[1., -1., 0.5]], 0.1, false).unwrap();
        assert_eq!(refined.dim(), (4, 3));
        assert!(refined.iter().all(|v| v.is_finite()));
        // the path is symetric, so is the refined embedding
        assert!((refined[[0, 0]] - refined[[3, 0]]).abs() < 1.0E-12);
        assert!((refined[[1, 0]] - refined[[2, 0]]).abs() < 1.0E-12);
    }

    #[test]
    fn test_power_flag() {
        log_init_test();
        let hierarchy = two_levels();
        let coarse = array![[1.]];
        let no_power = refine(&hierarchy, coarse.clone(), 0.1, false).unwrap();
        let with_power = refine(&hierarchy, coarse, 0.1, true).unwrap();
        assert_eq!(no_power.dim(), with_power.dim());
        // at level 1 the 2 clusters have degree 1 each, the filter is [[0.1, 1],[1, 0.1]] / 1.1 which keeps a constant vector.
        for i in 0..4 {
            assert!((no_power[[i, 0]] - with_power[[i, 0]]).abs() < 1.0E-12);
        }
        // smoothing at the finest level keeps the asymmetry of the coarse embedding
        let hierarchy = Hierarchy::from_projections(
            &path(4),
            vec![TriMat::from_triplets((4, 2), vec![0, 1, 2, 3], vec![0, 0, 1, 1], vec![1.; 4]).to_csr()],
        )
        .unwrap();
        let refined = refine(&hierarchy, array![[1.], [0.]], 0.1, false).unwrap();
        assert!(refined[[0, 0]] > refined[[3, 0]]);
        // an identity level above it is smoothed only in power mode
        let identity: CsMat<f64> = TriMat::from_triplets((2, 2), vec![0, 1], vec![0, 1], vec![1.; 2]).to_csr();
        let hierarchy = Hierarchy::from_projections(
            &path(4),
            vec![
                TriMat::from_triplets((4, 2), vec![0, 1, 2, 3], vec![0, 0, 1, 1], vec![1.; 4]).to_csr(),
                identity,
            ],
        )
        .unwrap();
        let no_power = refine(&hierarchy, array![[1.], [0.]], 0.1, false).unwrap();
        let with_power = refine(&hierarchy, array![[1.], [0.]], 0.1, true).unwrap();
        assert!((no_power[[0, 0]] - refined[[0, 0]]).abs() < 1.0E-12);
        assert!((no_power[[0, 0]] - with_power[[0, 0]]).abs() > 1.0E-3);
    }

    #[test]
    fn test_row_mismatch() {
        log_init_test();
        let hierarchy = two_levels();
        assert!(refine(&hierarchy, array![[1.], [2.]], 0.1, false).is_err());
    }

    #[test]
    fn test_round_trip_with_coarsening() {
        log_init_test();
        let laplacian = path(7);
        for nb_levels in 0..3 {
            let mut coarsener = SimpleCoarsener::new(CoarsenParams::new(nb_levels, 42));
            let hierarchy = coarsener.coarsen_hierarchy(&laplacian).unwrap();
            let coarse = Array2::<f64>::ones((hierarchy.get_nb_coarse_nodes(), 4));
            let refined = refine(&hierarchy, coarse, 0.1, nb_levels % 2 == 0).unwrap();
            assert_eq!(refined.dim(), (7, 4));
        }
    }
} // end of mod tests
