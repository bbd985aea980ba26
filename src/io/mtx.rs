//! Reading and writing of the matrix files exchanged with the coarsening tool.
//!
//! - laplacians are exchanged in Matrix Market coordinate format (symetric storage accepted on read).
//! - projection and mapping matrices written by the Lamg tool use a bare triplet format :
//!   a first line `<nb_coarse> <nb_fine> [nnz]` then one line `<coarse> <fine> [value]` per entry, 1-based indexes, value implicitly 1.
//!   They are returned transposed, with shape (nb_fine, nb_coarse), so that each row holds the cluster of a fine node.
//! - the coarsest graph `Gs.mtx` uses a first line `<nb_nodes> <nb_nodes> <nnz>` then `<i> <j> <w>` lines.
//! - levels and cpu time are single value text files.

use anyhow::anyhow;

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader};
use std::path::Path;

use petgraph::graph::NodeIndex;
use sprs::{CsMat, TriMat};

use crate::laplacian::WeightedGraph;

fn open_lines(path: &Path) -> anyhow::Result<std::io::Lines<BufReader<std::fs::File>>> {
    let fileres = OpenOptions::new().read(true).open(path);
    if fileres.is_err() {
        log::error!("could not open file {:?}", path.as_os_str());
        return Err(anyhow!("could not open file {} : {}", path.display(), fileres.err().unwrap()));
    }
    Ok(BufReader::new(fileres.unwrap()).lines())
} // end of open_lines

// parse the first nb tokens of a line as usize
fn parse_indexes(line: &str, nb: usize, path: &Path, lineno: usize) -> anyhow::Result<Vec<usize>> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < nb {
        log::error!("file {}, line {} : expected {} fields, got : {:?}", path.display(), lineno, nb, line);
        return Err(anyhow!("malformed line {} in {} : {:?}", lineno, path.display(), line));
    }
    let mut indexes = Vec::<usize>::with_capacity(nb);
    for tok in &tokens[0..nb] {
        match tok.parse::<usize>() {
            Ok(v) => indexes.push(v),
            Err(_) => {
                return Err(anyhow!("malformed integer {:?} at line {} in {}", tok, lineno, path.display()));
            }
        }
    }
    Ok(indexes)
} // end of parse_indexes

/// reads a square matrix (a laplacian) in Matrix Market format and returns it in csr storage.
pub fn read_mtx_laplacian(path: &Path) -> anyhow::Result<CsMat<f64>> {
    log::info!("reading matrix market file {:?}", path);
    let res = sprs::io::read_matrix_market::<f64, usize, _>(path);
    let trimat = match res {
        Ok(trimat) => trimat,
        Err(e) => {
            log::error!("read_mtx_laplacian failed for {} : {}", path.display(), e);
            return Err(anyhow!("could not read matrix market file {} : {}", path.display(), e));
        }
    };
    let (nb_row, nb_col) = trimat.shape();
    if nb_row != nb_col {
        return Err(anyhow!("laplacian in {} is not square : ({}, {})", path.display(), nb_row, nb_col));
    }
    let csr: CsMat<f64> = trimat.to_csr();
    log::info!("read laplacian of dimension {}, nnz : {}", nb_row, csr.nnz());
    Ok(csr)
} // end of read_mtx_laplacian

/// writes a matrix in Matrix Market coordinate format (general storage)
pub fn write_mtx(path: &Path, mat: &CsMat<f64>) -> anyhow::Result<()> {
    let res = sprs::io::write_matrix_market(path, mat);
    if res.is_err() {
        log::error!("write_mtx failed for {}", path.display());
        return Err(anyhow!("could not write matrix market file {} : {}", path.display(), res.err().unwrap()));
    }
    log::info!("wrote matrix of shape {:?} in {}", mat.shape(), path.display());
    Ok(())
} // end of write_mtx

/// reads a projection (or mapping) file of the Lamg tool.
/// Returns a 0/1 matrix of shape (nb_fine, nb_coarse).
/// Each fine node must appear on exactly one line, a repeated or a missing fine node is an error.
pub fn read_lamg_mapping(path: &Path) -> anyhow::Result<CsMat<f64>> {
    let mut lines = open_lines(path)?;
    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(anyhow!("empty projection file {}", path.display()));
        }
    };
    let dims = parse_indexes(&header, 2, path, 1)?;
    let (nb_coarse, nb_fine) = (dims[0], dims[1]);
    log::debug!("read_lamg_mapping {:?} nb_coarse : {}, nb_fine : {}", path, nb_coarse, nb_fine);
    let mut trimat = TriMat::<f64>::with_capacity((nb_fine, nb_coarse), nb_fine);
    // cluster of each fine node
    let mut assigned: Vec<Option<usize>> = vec![None; nb_fine];
    for (lineno, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let idx = parse_indexes(&line, 2, path, lineno + 2)?;
        let (coarse, fine) = (idx[0], idx[1]);
        if coarse == 0 || coarse > nb_coarse || fine == 0 || fine > nb_fine {
            log::error!("read_lamg_mapping index out of range at line {} : {:?}", lineno + 2, line);
            return Err(anyhow!(
                "index out of range at line {} in {} (shape ({}, {}))",
                lineno + 2,
                path.display(),
                nb_coarse,
                nb_fine
            ));
        }
        if let Some(previous) = assigned[fine - 1] {
            log::error!(
                "read_lamg_mapping fine node {} already in cluster {}, line {} : {:?}",
                fine,
                previous + 1,
                lineno + 2,
                line
            );
            return Err(anyhow!(
                "fine node {} assigned twice (line {} in {})",
                fine,
                lineno + 2,
                path.display()
            ));
        }
        assigned[fine - 1] = Some(coarse - 1);
        trimat.add_triplet(fine - 1, coarse - 1, 1.);
    }
    let nb_unassigned = assigned.iter().filter(|c| c.is_none()).count();
    if nb_unassigned > 0 {
        let first = assigned.iter().position(|c| c.is_none()).unwrap_or(0);
        log::error!("read_lamg_mapping {} fine nodes have no cluster, first : {}", nb_unassigned, first + 1);
        return Err(anyhow!(
            "{} fine nodes have no cluster in {} (first : {})",
            nb_unassigned,
            path.display(),
            first + 1
        ));
    }
    Ok(trimat.to_csr())
} // end of read_lamg_mapping

/// reads the coarsest graph written by the Lamg tool.
/// Only entries with i < j give an edge, with weight |w|. All nodes announced in the header are created.
pub fn read_lamg_graph(path: &Path) -> anyhow::Result<WeightedGraph> {
    let mut lines = open_lines(path)?;
    let header = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(anyhow!("empty graph file {}", path.display()));
        }
    };
    let nb_nodes = parse_indexes(&header, 1, path, 1)?[0];
    let mut graph = WeightedGraph::with_capacity(nb_nodes, 4 * nb_nodes);
    for _ in 0..nb_nodes {
        graph.add_node(());
    }
    for (lineno, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let idx = parse_indexes(&line, 2, path, lineno + 2)?;
        let (i, j) = (idx[0], idx[1]);
        if i == 0 || j == 0 || i > nb_nodes || j > nb_nodes {
            return Err(anyhow!("node index out of range at line {} in {}", lineno + 2, path.display()));
        }
        if i < j {
            let weight = match line.split_whitespace().nth(2).map(|w| w.parse::<f64>()) {
                Some(Ok(w)) => w.abs(),
                _ => {
                    return Err(anyhow!("missing or malformed weight at line {} in {}", lineno + 2, path.display()));
                }
            };
            graph.add_edge(NodeIndex::new(i - 1), NodeIndex::new(j - 1), weight);
        }
    }
    log::info!(
        "read coarse graph {:?}, nb nodes : {}, nb edges : {}",
        path,
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
} // end of read_lamg_graph

/// reads the file NumLevels.txt. It stores the number of levels + 1, we return the number of levels
pub fn read_levels(path: &Path) -> anyhow::Result<usize> {
    let mut lines = open_lines(path)?;
    let line = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(anyhow!("empty levels file {}", path.display()));
        }
    };
    let nb = parse_indexes(&line, 1, path, 1)?[0];
    if nb == 0 {
        return Err(anyhow!("levels file {} must contain at least 1", path.display()));
    }
    Ok(nb - 1)
} // end of read_levels

/// reads the cpu time (in seconds) reported by the Lamg tool
pub fn read_cpu_time(path: &Path) -> anyhow::Result<f64> {
    let mut lines = open_lines(path)?;
    let line = match lines.next() {
        Some(line) => line?,
        None => {
            return Err(anyhow!("empty cpu time file {}", path.display()));
        }
    };
    match line.trim().parse::<f64>() {
        Ok(t) => Ok(t),
        Err(_) => Err(anyhow!("malformed cpu time {:?} in {}", line, path.display())),
    }
} // end of read_cpu_time

//========================================================================================

// end of mod tests
