//! Multilevel coarsening of a graph given by its laplacian.
//!
//! Coarsening produces a [Hierarchy] : for each level the laplacian of the graph at this level
//! and the 0/1 mapping operator assigning each node of the level to a node (a cluster) of the next coarser level.
//! The hierarchy is built once and only read afterwards, by refinement.
//!
//! Two strategies are provided, both satisfying [CoarsenerT] :
//! - [simple::SimpleCoarsener] a self contained spectral coarsening.
//! - [lamg::LamgCoarsener] an adapter reading the results of the external Lamg tool.

use anyhow::anyhow;

use std::str::FromStr;

use ndarray::Array2;
use sprs::CsMat;

use crate::laplacian::WeightedGraph;
use crate::tools::sparse::{check_mapping, galerkin};

pub mod params;
pub mod simple;
pub mod lamg;

pub use params::{CoarsenParams, LamgParams};

/// The sequence of coarsening levels.
///
/// Level i stores the laplacian of the graph at level i (before coarsening) and
/// the mapping of shape (nb nodes at level i, nb nodes at level i+1).
/// Level 0 is the original (or fused) graph.
#[derive(Clone, Debug)]
pub struct Hierarchy {
    /// mappings, one per level
    projections: Vec<CsMat<f64>>,
    /// laplacians before coarsening, one per level
    laplacians: Vec<CsMat<f64>>,
    /// laplacian of the coarsest graph
    coarsest: CsMat<f64>,
} // end of struct Hierarchy

impl Hierarchy {
    pub(crate) fn new(projections: Vec<CsMat<f64>>, laplacians: Vec<CsMat<f64>>, coarsest: CsMat<f64>) -> Self {
        assert_eq!(projections.len(), laplacians.len());
        Hierarchy {
            projections,
            laplacians,
            coarsest,
        }
    }

    /// builds the hierarchy from the original laplacian and the sequence of mappings,
    /// computing each coarser laplacian by Galerkin projection.
    /// Each mapping must assign every node of its level to exactly one cluster.
    pub fn from_projections(laplacian: &CsMat<f64>, projections: Vec<CsMat<f64>>) -> anyhow::Result<Self> {
        let mut laplacians = Vec::<CsMat<f64>>::with_capacity(projections.len());
        let mut current = laplacian.clone();
        for (level, projection) in projections.iter().enumerate() {
            if projection.rows() != current.rows() {
                log::error!(
                    "level {} : projection has {} fine nodes, laplacian has {} nodes",
                    level,
                    projection.rows(),
                    current.rows()
                );
                return Err(anyhow!(
                    "projection of level {} has {} fine nodes, expected {}",
                    level,
                    projection.rows(),
                    current.rows()
                ));
            }
            if let Err(e) = check_mapping(projection) {
                log::error!("level {} : invalid mapping", level);
                return Err(anyhow!("projection of level {} : {}", level, e));
            }
            let coarse = galerkin(&current, projection)?;
            laplacians.push(current);
            current = coarse;
        }
        Ok(Hierarchy::new(projections, laplacians, current))
    } // end of from_projections

    /// number of coarsening levels
    pub fn get_nb_levels(&self) -> usize {
        self.projections.len()
    }

    /// mapping of level, shape (nb nodes at level, nb nodes at level + 1)
    pub fn get_projection(&self, level: usize) -> &CsMat<f64> {
        &self.projections[level]
    }

    /// laplacian of level before its coarsening
    pub fn get_laplacian(&self, level: usize) -> &CsMat<f64> {
        &self.laplacians[level]
    }

    /// laplacian of the coarsest graph
    pub fn get_coarsest_laplacian(&self) -> &CsMat<f64> {
        &self.coarsest
    }

    /// number of nodes of the original graph
    pub fn get_nb_fine_nodes(&self) -> usize {
        match self.laplacians.first() {
            Some(l) => l.rows(),
            None => self.coarsest.rows(),
        }
    }

    /// number of nodes of the coarsest graph
    pub fn get_nb_coarse_nodes(&self) -> usize {
        self.coarsest.rows()
    }

    /// pushes node features down to the coarsest level.
    /// Each cluster gets the mean of the features of its members.
    pub fn coarse_features(&self, features: &Array2<f64>) -> anyhow::Result<Array2<f64>> {
        if features.nrows() != self.get_nb_fine_nodes() {
            return Err(anyhow!(
                "features have {} rows, graph has {} nodes",
                features.nrows(),
                self.get_nb_fine_nodes()
            ));
        }
        let mut current = features.clone();
        for projection in &self.projections {
            let mut aggregated: Array2<f64> = &projection.transpose_view().to_csr() * &current;
            let sizes = projection.outer_iterator().fold(vec![0f64; projection.cols()], |mut acc, row| {
                for (c, v) in row.iter() {
                    acc[c] += *v;
                }
                acc
            });
            for (c, mut row) in aggregated.rows_mut().into_iter().enumerate() {
                if sizes[c] > 0. {
                    row /= sizes[c];
                }
            }
            current = aggregated;
        }
        Ok(current)
    } // end of coarse_features
} // end of impl Hierarchy

/// What a coarsening strategy returns.
pub struct Coarsening {
    /// the levels
    pub hierarchy: Hierarchy,
    /// the graph to embed
    pub coarse_graph: WeightedGraph,
    /// cpu time reported by an external tool, if any
    pub reported_time: Option<f64>,
}

/// The interface of coarsening strategies.
pub trait CoarsenerT {
    /// builds the whole hierarchy from a laplacian
    fn coarsen(&mut self, laplacian: &CsMat<f64>) -> anyhow::Result<Coarsening>;
    /// a single coarsening pass used to build the feature graph during fusion. Shape (nb nodes, nb clusters)
    fn fusion_mapping(&mut self, laplacian: &CsMat<f64>) -> anyhow::Result<CsMat<f64>>;
    /// called with the fused laplacian. Strategies that need it on disk store it.
    fn persist_fused(&self, _fused: &CsMat<f64>) -> anyhow::Result<()> {
        Ok(())
    }
    ///
    fn get_mode(&self) -> CoarsenMode;
} // end of trait CoarsenerT

/// names of coarsening strategies
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CoarsenMode {
    /// self contained spectral coarsening
    Simple,
    /// external Lamg tool
    Lamg,
}

impl FromStr for CoarsenMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(CoarsenMode::Simple),
            "lamg" => Ok(CoarsenMode::Lamg),
            _ => {
                log::error!("unrecognized coarsening strategy : {}", s);
                Err(anyhow!("unrecognized coarsening strategy {:?}, expected simple or lamg", s))
            }
        }
    }
} // end of impl FromStr for CoarsenMode

/// a coarsening strategy with its parameters, resolved once at configuration time.
#[derive(Clone, Debug)]
pub enum CoarsenStrategy {
    Simple(CoarsenParams),
    Lamg(LamgParams),
}

impl CoarsenStrategy {
    pub fn get_mode(&self) -> CoarsenMode {
        match self {
            CoarsenStrategy::Simple(_) => CoarsenMode::Simple,
            CoarsenStrategy::Lamg(_) => CoarsenMode::Lamg,
        }
    }

    /// allocates the coarsener
    pub fn build(self) -> Box<dyn CoarsenerT> {
        match self {
            CoarsenStrategy::Simple(params) => Box::new(simple::SimpleCoarsener::new(params)),
            CoarsenStrategy::Lamg(params) => Box::new(lamg::LamgCoarsener::new(params)),
        }
    }
} // end of impl CoarsenStrategy

//========================================================================================

// end of mod tests
