//! defines parameters for the coarsening strategies

use serde::{Deserialize, Serialize};

use std::path::PathBuf;

/// number of random test vectors used to compute node signatures
pub const NB_TEST_VECTORS: usize = 7;

/// number of filter applications on test vectors
pub const FILTER_POWER: usize = 2;

/// self loop weight of the filter used on test vectors
pub const TEST_FILTER_SELF_LOOP: f64 = 0.1;

/// affinity above which a neighbour joins the cluster of its seed
pub const AFFINITY_THRESHOLD: f64 = 0.3;

/// parameters of the self contained spectral coarsening
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct CoarsenParams {
    /// number of coarsening levels
    pub nb_levels: usize,
    /// number of test vectors
    pub nb_test_vectors: usize,
    /// number of filter passes on test vectors
    pub power: usize,
    /// self loop weight of the filter smoothing test vectors
    pub self_loop: f64,
    /// affinity threshold for matching
    pub threshold: f64,
    /// seed of the random generator producing test vectors
    pub seed: u64,
} // end of CoarsenParams

impl CoarsenParams {
    pub fn new(nb_levels: usize, seed: u64) -> Self {
        CoarsenParams {
            nb_levels,
            nb_test_vectors: NB_TEST_VECTORS,
            power: FILTER_POWER,
            self_loop: TEST_FILTER_SELF_LOOP,
            threshold: AFFINITY_THRESHOLD,
            seed,
        }
    }

    ///
    pub fn get_nb_levels(&self) -> usize {
        self.nb_levels
    }

    ///
    pub fn get_seed(&self) -> u64 {
        self.seed
    }
} // end of impl CoarsenParams

impl Default for CoarsenParams {
    fn default() -> Self {
        CoarsenParams::new(1, 42)
    }
}

/// parameters describing the Lamg coarsening tool and where it writes its results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LamgParams {
    /// script launching the tool. If None, the tool results must already be present in output_dir
    pub script: Option<PathBuf>,
    /// directory of the matlab compiler runtime
    pub mcr_dir: PathBuf,
    /// controls the number of levels in coarsening
    pub reduce_ratio: usize,
    /// controls the search space in the fusion pass
    pub search_ratio: usize,
    /// directory where the tool writes (and we read) NumLevels.txt, CPUtime.txt, Projection_i.mtx, Mapping.mtx, Gs.mtx
    pub output_dir: PathBuf,
} // end of LamgParams

impl LamgParams {
    pub fn new(script: Option<PathBuf>, mcr_dir: PathBuf, reduce_ratio: usize, search_ratio: usize, output_dir: PathBuf) -> Self {
        LamgParams {
            script,
            mcr_dir,
            reduce_ratio,
            search_ratio,
            output_dir,
        }
    }
} // end of impl LamgParams

impl Default for LamgParams {
    fn default() -> Self {
        LamgParams {
            script: None,
            mcr_dir: PathBuf::from("/opt/matlab/R2018A/"),
            reduce_ratio: 2,
            search_ratio: 12,
            output_dir: PathBuf::from("reduction_results"),
        }
    }
}
