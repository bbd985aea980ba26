//! The GraphZoom batch pipeline.
//!
//! fusion (optional) -> coarsening -> embedding of the coarsest graph -> refinement.
//!
//! Each stage runs to completion before the next one starts. The cpu time of each stage is measured
//! and returned in a [ZoomTimings] record. With the Lamg strategy the reduction time is the one reported by the tool.

use anyhow::anyhow;

use std::path::Path;
use std::time::SystemTime;

use cpu_time::ProcessTime;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use sprs::CsMat;

use crate::coarsen::{CoarsenStrategy, CoarsenerT};
use crate::embedding::{check_embedded, Embedded, EmbedderT};
use crate::fusion::{graph_fusion, FusionParams};
use crate::io::csv::{read_dense_csv, write_dense_csv};
use crate::io::embeddedbson::bson_dump;
use crate::io::mtx::read_mtx_laplacian;
use crate::io::output::{Format, Output};
use crate::refine::refine;
use crate::tools::sparse::check_laplacian;

/// self loop weight of the refinement filter
pub const DEFAULT_LDA: f64 = 0.1;

/// relative tolerance on row sums and symetry of the input laplacian
const LAPLACIAN_TOLERANCE: f64 = 1.0E-8;

/// parameters of a run
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct ZoomParams {
    /// fuse the structural graph with the feature graph before coarsening
    pub fusion: bool,
    ///
    pub fusion_params: FusionParams,
    /// self loop weight of the refinement filter
    pub lda: f64,
    /// smooth at every refinement level and not only the finest one
    pub power: bool,
} // end of ZoomParams

impl ZoomParams {
    pub fn new(fusion: bool, fusion_params: FusionParams, lda: f64, power: bool) -> Self {
        ZoomParams {
            fusion,
            fusion_params,
            lda,
            power,
        }
    }

    pub fn get_lda(&self) -> f64 {
        self.lda
    }

    pub fn get_power(&self) -> bool {
        self.power
    }

    pub fn do_fusion(&self) -> bool {
        self.fusion
    }
} // end of impl ZoomParams

impl Default for ZoomParams {
    fn default() -> Self {
        ZoomParams::new(true, FusionParams::default(), DEFAULT_LDA, false)
    }
}

/// cpu times in seconds of the stages of a run
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize)]
pub struct ZoomTimings {
    pub fusion: f64,
    pub reduction: f64,
    pub embedding: f64,
    pub refinement: f64,
    pub total: f64,
}

impl std::fmt::Display for ZoomTimings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fusion : {:.3} s, reduction : {:.3} s, embedding : {:.3} s, refinement : {:.3} s, total : {:.3} s",
            self.fusion, self.reduction, self.embedding, self.refinement, self.total
        )
    }
}

/// The pipeline with its coarsening strategy and embedder, both resolved at construction.
pub struct GraphZoom {
    params: ZoomParams,
    coarsener: Box<dyn CoarsenerT>,
    embedder: Box<dyn EmbedderT>,
}

impl GraphZoom {
    pub fn new(params: ZoomParams, strategy: CoarsenStrategy, embedder: Box<dyn EmbedderT>) -> Self {
        log::info!("GraphZoom params : {:?}, coarsening : {:?}", params, strategy);
        GraphZoom {
            params,
            coarsener: strategy.build(),
            embedder,
        }
    }

    pub fn get_params(&self) -> &ZoomParams {
        &self.params
    }

    /// runs the whole pipeline on a laplacian. features are required for fusion.
    /// The laplacian must be symetric with null row sums and non negative edge weights, else the run fails before any stage.
    /// Returns the embedding of the original graph nodes.
    pub fn run(&mut self, laplacian: &CsMat<f64>, features: Option<&Array2<f64>>) -> anyhow::Result<(Embedded, ZoomTimings)> {
        let cpu_start = ProcessTime::now();
        let sys_start = SystemTime::now();
        let mut timings = ZoomTimings::default();
        //
        if let Err(e) = check_laplacian(laplacian, LAPLACIAN_TOLERANCE) {
            log::error!("input is not a graph laplacian : {}", e);
            return Err(anyhow!("malformed input laplacian : {}", e));
        }
        if let Some(features) = features {
            if features.nrows() != laplacian.rows() {
                log::error!("features have {} rows, graph has {} nodes", features.nrows(), laplacian.rows());
                return Err(anyhow!(
                    "features have {} rows, graph has {} nodes",
                    features.nrows(),
                    laplacian.rows()
                ));
            }
        }
        log::info!("GraphZoom run on {} nodes, nnz : {}", laplacian.rows(), laplacian.nnz());
        // fusion
        let fused;
        let laplacian = if self.params.do_fusion() {
            let features = match features {
                Some(features) => features,
                None => {
                    log::error!("fusion asked but no features given");
                    return Err(anyhow!("graph fusion needs node features"));
                }
            };
            log::info!("\n ============ graph fusion ============");
            let start = ProcessTime::now();
            fused = graph_fusion(laplacian, features, &self.params.fusion_params, self.coarsener.as_mut())?;
            timings.fusion = start.elapsed().as_secs_f64();
            &fused
        } else {
            laplacian
        };
        // reduction
        log::info!("\n ============ graph reduction ============");
        let start = ProcessTime::now();
        let coarsening = self.coarsener.coarsen(laplacian)?;
        timings.reduction = match coarsening.reported_time {
            Some(t) => t,
            None => start.elapsed().as_secs_f64(),
        };
        let hierarchy = &coarsening.hierarchy;
        log::info!(
            "reduction : {} levels, {} nodes -> {} nodes",
            hierarchy.get_nb_levels(),
            hierarchy.get_nb_fine_nodes(),
            hierarchy.get_nb_coarse_nodes()
        );
        // embedding
        log::info!("\n ============ coarse graph embedding ============");
        let start = ProcessTime::now();
        let coarse_features = match features {
            Some(features) => Some(hierarchy.coarse_features(features)?),
            None => None,
        };
        let embedded = self.embedder.embed(&coarsening.coarse_graph, coarse_features.as_ref())?;
        check_embedded(&embedded, hierarchy.get_nb_coarse_nodes())?;
        timings.embedding = start.elapsed().as_secs_f64();
        // refinement
        log::info!("\n ============ refinement ============");
        let start = ProcessTime::now();
        let refined = refine(hierarchy, embedded.into_array(), self.params.get_lda(), self.params.get_power())?;
        timings.refinement = start.elapsed().as_secs_f64();
        //
        timings.total = cpu_start.elapsed().as_secs_f64();
        log::info!("GraphZoom timings : {}", timings);
        log::info!(
            "GraphZoom sys time(ms) {:?}",
            sys_start.elapsed().map(|d| d.as_millis()).unwrap_or(0)
        );
        Ok((Embedded::new(refined), timings))
    } // end of run

    /// reads the laplacian (matrix market) and the features (csv) and runs the pipeline.
    pub fn run_files(
        &mut self,
        laplacian_path: &Path,
        features_path: Option<&Path>,
        delim: u8,
    ) -> anyhow::Result<(Embedded, ZoomTimings)> {
        log::info!("loading graph {:?}", laplacian_path);
        let laplacian = read_mtx_laplacian(laplacian_path)?;
        let features = match features_path {
            Some(path) => {
                log::info!("loading features {:?}", path);
                Some(read_dense_csv(path, delim)?)
            }
            None => None,
        };
        self.run(&laplacian, features.as_ref())
    } // end of run_files
} // end of impl GraphZoom

/// writes the refined embedding in the format and file described by output
pub fn write_embedding(embedded: &Embedded, output: &Output) -> anyhow::Result<()> {
    let name = output.get_output_name();
    log::info!("writing embedding ({} nodes, dim {}) in {}", embedded.get_nb_nodes(), embedded.get_dimension(), name);
    match output.get_fmt() {
        Format::CSV => write_dense_csv(Path::new(name), embedded.get_embedded(), b','),
        Format::BSON => bson_dump(embedded, name),
    }
} // end of write_embedding

//========================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::coarsen::CoarsenParams;
    use crate::embedding::{EmbedMethod, PrecomputedEmbedder};
    use crate::io::embeddedbson::bson_load;
    use crate::io::mtx::write_mtx;
    use crate::laplacian::{build_laplacian, graph_from_laplacian, WeightedGraph};
    use ndarray::array;
    use petgraph::graph::NodeIndex;
    use std::path::PathBuf;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("graphzoom_pipeline_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    // 2 triangles linked by an edge
    fn two_triangles() -> CsMat<f64> {
        let mut graph = WeightedGraph::default();
        for _ in 0..6 {
            graph.add_node(());
        }
        for (i, j) in [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)] {
            graph.add_edge(NodeIndex::new(i), NodeIndex::new(j), 1.);
        }
        build_laplacian(&graph).unwrap()
    }

    // embeds each node of any graph by its degree and its rank
    struct DegreeEmbedder;

    impl EmbedderT for DegreeEmbedder {
        fn embed(&mut self, graph: &WeightedGraph, _features: Option<&Array2<f64>>) -> anyhow::Result<Embedded> {
            let mut data = Array2::<f64>::zeros((graph.node_count(), 2));
            for node in graph.node_indices() {
                data[[node.index(), 0]] = graph.edges(node).map(|e| *e.weight()).sum::<f64>();
                data[[node.index(), 1]] = node.index() as f64;
            }
            Ok(Embedded::new(data))
        }
    }

    #[test]
    fn test_pipeline_simple_no_fusion() {
        log_init_test();
        let params = ZoomParams::new(false, FusionParams::default(), DEFAULT_LDA, false);
        let strategy = CoarsenStrategy::Simple(CoarsenParams::new(2, 42));
        let mut zoom = GraphZoom::new(params, strategy, Box::new(DegreeEmbedder));
        let (embedded, timings) = zoom.run(&two_triangles(), None).unwrap();
        assert_eq!(embedded.get_nb_nodes(), 6);
        assert_eq!(embedded.get_dimension(), 2);
        assert!(embedded.get_embedded().iter().all(|v| v.is_finite()));
        assert!(timings.total >= timings.refinement);
        assert_eq!(timings.fusion, 0.);
    }

    #[test]
    fn test_pipeline_with_fusion() {
        log_init_test();
        let features = array![[1., 0.], [1., 0.1], [0.9, 0.], [0., 1.], [0.1, 1.], [0., 0.8]];
        let strategy = CoarsenStrategy::Simple(CoarsenParams::new(1, 42));
        let mut zoom = GraphZoom::new(ZoomParams::default(), strategy, Box::new(DegreeEmbedder));
        let (embedded, _) = zoom.run(&two_triangles(), Some(&features)).unwrap();
        assert_eq!(embedded.get_nb_nodes(), 6);
        // fusion without features is a configuration error
        assert!(zoom.run(&two_triangles(), None).is_err());
    }

    #[test]
    fn test_pipeline_files_and_outputs() {
        log_init_test();
        let dir = test_dir("files");
        let laplacian = two_triangles();
        let mtx = dir.join("graph.mtx");
        write_mtx(&mtx, &laplacian).unwrap();
        // with 0 levels the coarse graph is the graph itself
        let coarse_graph = graph_from_laplacian(&laplacian);
        let embedding_path = dir.join("coarse.csv");
        let coarse = Array2::<f64>::from_shape_fn((coarse_graph.node_count(), 3), |(i, j)| (i + j) as f64);
        write_dense_csv(&embedding_path, &coarse, b',').unwrap();
        //
        let params = ZoomParams::new(false, FusionParams::default(), DEFAULT_LDA, true);
        let embedder = EmbedMethod::Precomputed {
            path: embedding_path.clone(),
        }
        .build(&dir);
        let mut zoom = GraphZoom::new(params, CoarsenStrategy::Simple(CoarsenParams::new(0, 42)), embedder);
        let (embedded, _) = zoom.run_files(&mtx, None, b',').unwrap();
        // no level, refinement is the identity
        assert_eq!(embedded.get_embedded(), &coarse);
        //
        let csv_out = Output::new(Format::CSV, &Some(dir.join("refined").to_string_lossy().to_string()));
        write_embedding(&embedded, &csv_out).unwrap();
        let reloaded = read_dense_csv(Path::new(csv_out.get_output_name()), b',').unwrap();
        assert_eq!(&reloaded, embedded.get_embedded());
        let bson_out = Output::new(Format::BSON, &Some(dir.join("refined").to_string_lossy().to_string()));
        write_embedding(&embedded, &bson_out).unwrap();
        let reloaded = bson_load(bson_out.get_output_name()).unwrap();
        assert_eq!(reloaded.get_embedded(), embedded.get_embedded());
    }

    #[test]
    fn test_pipeline_rejects_bad_embedding() {
        log_init_test();
        let dir = test_dir("bad");
        let path = dir.join("wrong.csv");
        write_dense_csv(&path, &array![[1., 2.]], b',').unwrap();
        let params = ZoomParams::new(false, FusionParams::default(), DEFAULT_LDA, false);
        let mut zoom = GraphZoom::new(
            params,
            CoarsenStrategy::Simple(CoarsenParams::new(0, 42)),
            Box::new(PrecomputedEmbedder::new(path)),
        );
        assert!(zoom.run(&two_triangles(), None).is_err());
    }

    #[test]
    fn test_pipeline_rejects_malformed_laplacian() {
        log_init_test();
        let params = ZoomParams::new(false, FusionParams::default(), DEFAULT_LDA, false);
        let mut zoom = GraphZoom::new(params, CoarsenStrategy::Simple(CoarsenParams::new(1, 42)), Box::new(DegreeEmbedder));
        // edge of weight -1
        let negative: CsMat<f64> =
            sprs::TriMat::from_triplets((2, 2), vec![0, 0, 1, 1], vec![0, 1, 0, 1], vec![-1., 1., 1., -1.]).to_csr();
        assert!(zoom.run(&negative, None).is_err());
        // not symetric, non null row sums
        let asymetric: CsMat<f64> =
            sprs::TriMat::from_triplets((2, 2), vec![0, 0, 1], vec![0, 1, 1], vec![1., -3., 2.]).to_csr();
        assert!(zoom.run(&asymetric, None).is_err());
        // not square
        let rectangular: CsMat<f64> = sprs::TriMat::<f64>::new((2, 3)).to_csr();
        assert!(zoom.run(&rectangular, None).is_err());
        // the same pipeline runs on a valid laplacian
        assert!(zoom.run(&two_triangles(), None).is_ok());
    }
} // end of mod tests
