//! Describes the embedded vectors and the interface to the embedding methods run on the coarsest graph.
//!
//! Embedded vectors are stored in an Array2\<f64\>, each row corresponds to a node of the graph currently considered
//! (the coarsest graph after embedding, the original graph after refinement).
//!
//! The embedding algorithms themselves (DeepWalk, node2vec, NetMF, GraphSAGE ...) are not implemented here.
//! An embedder is anything satisfying [EmbedderT]; two are provided :
//! - [ExternalEmbedder] runs an external program on the coarse graph dumped as a csv edge list.
//! - [PrecomputedEmbedder] reloads an embedding computed beforehand for the coarse graph.

use anyhow::anyhow;

use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::io::csv::{is_finite_row, read_dense_csv, write_dense_csv, write_edgelist_csv};
use crate::laplacian::WeightedGraph;

/// symetric embedded data. Nodes are identified by their rank.
#[derive(Clone, Debug)]
pub struct Embedded {
    /// array (n,d) with n number of nodes, d dimension of embedding
    data: Array2<f64>,
} // end of Embedded

impl Embedded {
    pub fn new(data: Array2<f64>) -> Self {
        Embedded { data }
    }

    /// get the whole array of embedded vectors
    pub fn get_embedded(&self) -> &Array2<f64> {
        &self.data
    }

    /// get dimension of vectors
    pub fn get_dimension(&self) -> usize {
        self.data.dim().1
    }

    /// get number of nodes
    pub fn get_nb_nodes(&self) -> usize {
        self.data.dim().0
    }

    /// get embedding of node of rank node_rank
    pub fn get_embedded_node(&self, node_rank: usize) -> ArrayView1<f64> {
        self.data.row(node_rank)
    }

    /// gives back the array
    pub fn into_array(self) -> Array2<f64> {
        self.data
    }
} // end of impl Embedded

//====================================================================================

/// The trait EmbedderT is something that given a graph (and possibly node features) returns an embedding.
/// The rows of the embedding must be in node rank order.
pub trait EmbedderT {
    ///
    fn embed(&mut self, graph: &WeightedGraph, features: Option<&Array2<f64>>) -> Result<Embedded, anyhow::Error>;
} // end of trait EmbedderT

/// checks an embedding returned by an embedder is usable for refinement.
pub(crate) fn check_embedded(embedded: &Embedded, nb_nodes: usize) -> anyhow::Result<()> {
    if embedded.get_nb_nodes() != nb_nodes {
        log::error!(
            "embedding has {} rows, coarse graph has {} nodes",
            embedded.get_nb_nodes(),
            nb_nodes
        );
        return Err(anyhow!(
            "embedding has {} rows, expected one per coarse node : {}",
            embedded.get_nb_nodes(),
            nb_nodes
        ));
    }
    if let Some(rank) = embedded.get_embedded().rows().into_iter().position(|r| !is_finite_row(r)) {
        return Err(anyhow!("embedding has non finite values at row {}", rank));
    }
    Ok(())
} // end of check_embedded

//====================================================================================

/// The embedding methods that can be run on the coarsest graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum EmbedMethod {
    /// run a program. Its arguments can contain the placeholders {graph}, {nbnodes}, {features} and {embedding}.
    External { program: PathBuf, args: Vec<String> },
    /// reload an embedding from a csv file
    Precomputed { path: PathBuf },
}

/// names of the embedding methods, as given on the command line
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EmbedMethodName {
    External,
    Precomputed,
}

impl FromStr for EmbedMethodName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "external" => Ok(EmbedMethodName::External),
            "precomputed" => Ok(EmbedMethodName::Precomputed),
            _ => {
                log::error!("unrecognized embedding method : {}", s);
                Err(anyhow!("unrecognized embedding method {:?}, expected external or precomputed", s))
            }
        }
    }
} // end of impl FromStr for EmbedMethodName

impl EmbedMethod {
    /// resolve the method into an embedder. work_dir receives the files exchanged with an external program.
    pub fn build(self, work_dir: &Path) -> Box<dyn EmbedderT> {
        match self {
            EmbedMethod::External { program, args } => Box::new(ExternalEmbedder::new(program, args, work_dir)),
            EmbedMethod::Precomputed { path } => Box::new(PrecomputedEmbedder::new(path)),
        }
    }
} // end of impl EmbedMethod

//====================================================================================

/// Runs an external embedding program on the coarse graph.
///
/// The graph is dumped in `work_dir/coarse_graph.csv` (node1,node2,weight), features (if any) in `work_dir/coarse_feats.csv`,
/// and the program must write its embedding in `work_dir/coarse_embedding.csv`, one line per node.
pub struct ExternalEmbedder {
    program: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
}

impl ExternalEmbedder {
    pub fn new(program: PathBuf, args: Vec<String>, work_dir: &Path) -> Self {
        ExternalEmbedder {
            program,
            args,
            work_dir: work_dir.to_path_buf(),
        }
    }

    fn substitute(&self, arg: &str, graph: &Path, nb_nodes: usize, features: &Option<PathBuf>, embedding: &Path) -> String {
        let mut arg = arg
            .replace("{graph}", &graph.to_string_lossy())
            .replace("{nbnodes}", &nb_nodes.to_string())
            .replace("{embedding}", &embedding.to_string_lossy());
        if let Some(features) = features {
            arg = arg.replace("{features}", &features.to_string_lossy());
        }
        arg
    }
} // end of impl ExternalEmbedder

impl EmbedderT for ExternalEmbedder {
    fn embed(&mut self, graph: &WeightedGraph, features: Option<&Array2<f64>>) -> Result<Embedded, anyhow::Error> {
        std::fs::create_dir_all(&self.work_dir)?;
        let graph_path = self.work_dir.join("coarse_graph.csv");
        let embedding_path = self.work_dir.join("coarse_embedding.csv");
        write_edgelist_csv(&graph_path, graph)?;
        let features_path = match features {
            Some(feats) => {
                let path = self.work_dir.join("coarse_feats.csv");
                write_dense_csv(&path, feats, b',')?;
                Some(path)
            }
            None => None,
        };
        if embedding_path.exists() {
            std::fs::remove_file(&embedding_path)?;
        }
        let nb_nodes = graph.node_count();
        let args: Vec<String> = self
            .args
            .iter()
            .map(|a| self.substitute(a, &graph_path, nb_nodes, &features_path, &embedding_path))
            .collect();
        log::info!("running external embedder {:?} {:?}", self.program, args);
        let status = Command::new(&self.program).args(&args).status();
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => {
                log::error!("external embedder exited with {}", status);
                return Err(anyhow!("external embedder {:?} failed : {}", self.program, status));
            }
            Err(e) => {
                log::error!("could not launch external embedder {:?} : {}", self.program, e);
                return Err(anyhow!("could not launch external embedder {:?} : {}", self.program, e));
            }
        }
        if !embedding_path.exists() {
            return Err(anyhow!("external embedder did not produce {}", embedding_path.display()));
        }
        let embedded = Embedded::new(read_dense_csv(&embedding_path, b',')?);
        check_embedded(&embedded, nb_nodes)?;
        Ok(embedded)
    }
} // end of impl EmbedderT for ExternalEmbedder

/// Reloads an embedding of the coarse graph computed beforehand.
pub struct PrecomputedEmbedder {
    path: PathBuf,
}

impl PrecomputedEmbedder {
    pub fn new(path: PathBuf) -> Self {
        PrecomputedEmbedder { path }
    }
}

impl EmbedderT for PrecomputedEmbedder {
    fn embed(&mut self, graph: &WeightedGraph, _features: Option<&Array2<f64>>) -> Result<Embedded, anyhow::Error> {
        log::info!("reloading coarse embedding from {:?}", self.path);
        let embedded = Embedded::new(read_dense_csv(&self.path, b',')?);
        check_embedded(&embedded, graph.node_count())?;
        Ok(embedded)
    }
} // end of impl EmbedderT for PrecomputedEmbedder

//====================================================================================

// end of mod tests
