//! Self contained multilevel spectral coarsening.
//!
//! At each level random test vectors are smoothed by the filter of the current laplacian.
//! Nodes whose smoothed signatures are aligned (in the sense of the squared cosine) are merged
//! by a greedy matching visiting nodes by increasing weighted degree.
//! The laplacian of the coarse graph is the Galerkin projection $M^t L M$ where M is the 0/1 mapping of nodes to clusters.

use anyhow::anyhow;

use std::time::SystemTime;

use cpu_time::ProcessTime;

use ndarray::{Array2, ArrayView1};
use petgraph::graph::NodeIndex;
use rand::distributions::{Distribution, Uniform};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use sprs::{CsMat, TriMat};

use super::params::CoarsenParams;
use super::{CoarsenMode, CoarsenerT, Coarsening, Hierarchy};
use crate::laplacian::{adjacency_from_laplacian, graph_from_laplacian, smooth_filter};
use crate::tools::degrees::increasing_degree_order;
use crate::tools::sparse::galerkin;

/// squared cosine between 2 signatures. Returns 0 if one of them is null.
pub(crate) fn affinity(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let denom = x.dot(&x) * y.dot(&y);
    if !(denom > 0.) || !denom.is_finite() {
        return 0.;
    }
    let xy = x.dot(&y);
    xy * xy / denom
}

/// builds the (nb_nodes, nb_clusters) 0/1 mapping with one 1 per row
pub(crate) fn mapping_from_clusters(nb_nodes: usize, clusters: &[Vec<usize>]) -> anyhow::Result<CsMat<f64>> {
    let mut trimat = TriMat::<f64>::with_capacity((nb_nodes, clusters.len()), nb_nodes);
    let mut seen = vec![false; nb_nodes];
    for (c, cluster) in clusters.iter().enumerate() {
        for node in cluster {
            if seen[*node] {
                return Err(anyhow!("node {} is in more than one cluster", node));
            }
            seen[*node] = true;
            trimat.add_triplet(*node, c, 1.);
        }
    }
    if let Some(node) = seen.iter().position(|s| !s) {
        return Err(anyhow!("node {} is in no cluster", node));
    }
    Ok(trimat.to_csr())
} // end of mapping_from_clusters

/// The spectral coarsener. It owns its random generator, so 2 coarseners built with the same seed
/// give the same hierarchy, and a fusion pass followed by a coarsening continues the same random sequence.
pub struct SimpleCoarsener {
    params: CoarsenParams,
    rng: Xoshiro256PlusPlus,
}

impl SimpleCoarsener {
    pub fn new(params: CoarsenParams) -> Self {
        let rng = Xoshiro256PlusPlus::seed_from_u64(params.get_seed());
        SimpleCoarsener { params, rng }
    }

    pub fn get_params(&self) -> &CoarsenParams {
        &self.params
    }

    // test vectors uniform in [-1,1], each column orthogonal to the constant vector
    fn test_vectors(&mut self, nb_nodes: usize) -> Array2<f64> {
        let uniform = Uniform::<f64>::new_inclusive(-1., 1.);
        let rng = &mut self.rng;
        let mut vectors = Array2::<f64>::from_shape_fn((nb_nodes, self.params.nb_test_vectors), |_| uniform.sample(&mut *rng));
        for mut column in vectors.columns_mut() {
            let mean = column.mean().unwrap_or(0.);
            column -= mean;
        }
        vectors
    }

    /// computes smoothed node signatures for a laplacian
    fn signatures(&mut self, laplacian: &CsMat<f64>) -> Array2<f64> {
        let mut vectors = self.test_vectors(laplacian.rows());
        let filter = smooth_filter(laplacian, self.params.self_loop);
        for _ in 0..self.params.power {
            vectors = &filter * &vectors;
        }
        vectors
    }

    /// greedy matching. Each unmatched node visited seeds a cluster and takes its unmatched neighbours
    /// with an affinity above threshold.
    fn matching(&self, laplacian: &CsMat<f64>, signatures: &Array2<f64>) -> Vec<Vec<usize>> {
        let nb_nodes = laplacian.rows();
        let adjacency = adjacency_from_laplacian(laplacian);
        let graph = graph_from_laplacian(laplacian);
        let order = increasing_degree_order(&adjacency);
        //
        let mut matched = vec![false; nb_nodes];
        let mut clusters = Vec::<Vec<usize>>::with_capacity(nb_nodes);
        for seed in order {
            if matched[seed] {
                continue;
            }
            matched[seed] = true;
            let mut cluster = vec![seed];
            let seed_signature = signatures.row(seed);
            for neighbour in graph.neighbors(NodeIndex::new(seed)) {
                let neighbour = neighbour.index();
                if matched[neighbour] {
                    continue;
                }
                if affinity(seed_signature, signatures.row(neighbour)) > self.params.threshold {
                    matched[neighbour] = true;
                    cluster.push(neighbour);
                }
            }
            clusters.push(cluster);
        }
        clusters
    } // end of matching

    /// one coarsening pass, returns the mapping of nodes to clusters
    pub fn coarsen_once(&mut self, laplacian: &CsMat<f64>) -> anyhow::Result<CsMat<f64>> {
        let nb_nodes = laplacian.rows();
        if laplacian.cols() != nb_nodes {
            return Err(anyhow!("coarsen_once : laplacian is not square {:?}", laplacian.shape()));
        }
        if nb_nodes == 0 {
            return Ok(TriMat::<f64>::new((0, 0)).to_csr());
        }
        let signatures = self.signatures(laplacian);
        let clusters = self.matching(laplacian, &signatures);
        let nb_singletons = clusters.iter().filter(|c| c.len() == 1).count();
        log::debug!(
            "coarsen_once nb nodes : {}, nb clusters : {}, nb singletons : {}",
            nb_nodes,
            clusters.len(),
            nb_singletons
        );
        mapping_from_clusters(nb_nodes, &clusters)
    } // end of coarsen_once

    /// builds the hierarchy, running the requested number of levels even if coarsening saturates.
    pub fn coarsen_hierarchy(&mut self, laplacian: &CsMat<f64>) -> anyhow::Result<Hierarchy> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        //
        let nb_levels = self.params.get_nb_levels();
        let mut projections = Vec::<CsMat<f64>>::with_capacity(nb_levels);
        let mut laplacians = Vec::<CsMat<f64>>::with_capacity(nb_levels);
        let mut current = laplacian.clone();
        for level in 0..nb_levels {
            let mapping = self.coarsen_once(&current)?;
            let coarse = galerkin(&current, &mapping)?;
            log::info!("level {} : {} nodes coarsened to {}", level, current.rows(), coarse.rows());
            if coarse.rows() == current.rows() && current.rows() > 0 {
                log::warn!("level {} : no reduction, coarsening has saturated", level);
            }
            projections.push(mapping);
            laplacians.push(current);
            current = coarse;
        }
        log::info!(
            "spectral coarsening sys time(ms) {:?} cpu time(ms) {:?}",
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0),
            cpu_start.elapsed().as_millis()
        );
        Ok(Hierarchy::new(projections, laplacians, current))
    } // end of coarsen_hierarchy
} // end of impl SimpleCoarsener

impl CoarsenerT for SimpleCoarsener {
    fn coarsen(&mut self, laplacian: &CsMat<f64>) -> anyhow::Result<Coarsening> {
        let hierarchy = self.coarsen_hierarchy(laplacian)?;
        let coarse_graph = graph_from_laplacian(hierarchy.get_coarsest_laplacian());
        Ok(Coarsening {
            hierarchy,
            coarse_graph,
            reported_time: None,
        })
    }

    fn fusion_mapping(&mut self, laplacian: &CsMat<f64>) -> anyhow::Result<CsMat<f64>> {
        self.coarsen_once(laplacian)
    }

    fn get_mode(&self) -> CoarsenMode {
        CoarsenMode::Simple
    }
} // end of impl CoarsenerT for SimpleCoarsener

//========================================================================================

// end of mod tests
