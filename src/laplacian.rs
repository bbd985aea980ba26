//! Graph laplacian construction and the smoothing filter used by coarsening and refinement.
//!
//! A laplacian is stored as a csr matrix $L = D - A$ where A is the weighted adjacency matrix and D the diagonal degree matrix.
//! The graph is undirected, so L is symetric and each row sums to 0.

use anyhow::anyhow;

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use sprs::{CsMat, TriMat};

use crate::tools::sparse::row_sums;

/// undirected weighted graph with nodes identified by their rank 0..n
pub type WeightedGraph = UnGraph<(), f64>;

/// builds the laplacian D - A of an undirected graph.
/// Self loops are dropped, parallel edges are summed. All nodes, even isolated ones, get a row.
/// A negative edge weight is an error.
pub fn build_laplacian(graph: &WeightedGraph) -> anyhow::Result<CsMat<f64>> {
    let nb_nodes = graph.node_count();
    let nb_edges = graph.edge_count();
    let mut trimat = TriMat::<f64>::with_capacity((nb_nodes, nb_nodes), 4 * nb_edges + nb_nodes);
    let mut degrees = vec![0f64; nb_nodes];
    for edge in graph.edge_references() {
        let (i, j) = (edge.source().index(), edge.target().index());
        let w = *edge.weight();
        if !(w >= 0.) {
            log::error!("build_laplacian : edge ({},{}) has weight {}", i, j, w);
            return Err(anyhow!("build_laplacian : negative or nan weight {} on edge ({},{})", w, i, j));
        }
        if i == j {
            log::trace!("build_laplacian dropping self loop on {}", i);
            continue;
        }
        trimat.add_triplet(i, j, -w);
        trimat.add_triplet(j, i, -w);
        degrees[i] += w;
        degrees[j] += w;
    }
    for (i, d) in degrees.iter().enumerate() {
        trimat.add_triplet(i, i, *d);
    }
    log::debug!("build_laplacian nb nodes : {}, nb edges : {}", nb_nodes, nb_edges);
    Ok(trimat.to_csr())
} // end of build_laplacian

/// returns the adjacency diag(L) - L, without diagonal terms and without explicit zeros.
pub fn adjacency_from_laplacian(laplacian: &CsMat<f64>) -> CsMat<f64> {
    let n = laplacian.rows();
    let mut trimat = TriMat::<f64>::with_capacity((n, n), laplacian.nnz());
    for (row, row_vec) in laplacian.outer_iterator().enumerate() {
        for (col, val) in row_vec.iter() {
            if col != row && *val != 0. {
                trimat.add_triplet(row, col, -*val);
            }
        }
    }
    trimat.to_csr()
} // end of adjacency_from_laplacian

/// builds an undirected graph view of the adjacency encoded in a laplacian.
/// Each pair (i,j) with i < j and a non null entry gives one edge of weight |L(i,j)|.
/// The graph always has as many nodes as the laplacian has rows.
pub fn graph_from_laplacian(laplacian: &CsMat<f64>) -> WeightedGraph {
    let n = laplacian.rows();
    let mut graph = WeightedGraph::with_capacity(n, laplacian.nnz() / 2);
    for _ in 0..n {
        graph.add_node(());
    }
    for (row, row_vec) in laplacian.outer_iterator().enumerate() {
        for (col, val) in row_vec.iter() {
            if row < col && *val != 0. {
                graph.add_edge(NodeIndex::new(row), NodeIndex::new(col), val.abs());
            }
        }
    }
    graph
} // end of graph_from_laplacian

#[cfg_attr(doc, katexit::katexit)]
/// Computes the smoothing filter associated to a laplacian.
///
/// With $A = diag(L) - L$ the adjacency and $\tilde{A} = A + \lambda I$ the adjacency augmented with self loops,
/// $\tilde{D}$ the diagonal of row sums of $\tilde{A}$, the filter is :
///
/// $$ \tilde{D}^{-1/2} \cdot \tilde{A} \cdot \tilde{D}^{-1/2} $$
///
/// Rows with a null or negative degree (or a non finite normalization factor) get a factor equal to 0
/// so the result never contains Nan or Inf.
pub fn smooth_filter(laplacian: &CsMat<f64>, self_loop: f64) -> CsMat<f64> {
    let n = laplacian.rows();
    let diag = laplacian.diag().to_dense();
    let sums = row_sums(laplacian);
    // row sums of diag(L) - L + lambda * I
    let mut d_inv_sqrt: Vec<f64> = (0..n)
        .map(|i| {
            let degree = diag[i] - sums[i] + self_loop;
            if degree > 0. {
                1. / degree.sqrt()
            } else {
                0.
            }
        })
        .collect();
    let mut nb_null = 0usize;
    for f in d_inv_sqrt.iter_mut() {
        if !f.is_finite() {
            *f = 0.;
        }
        if *f == 0. {
            nb_null += 1;
        }
    }
    if nb_null > 0 {
        log::debug!("smooth_filter nb rows with null normalization : {}", nb_null);
    }
    //
    let mut trimat = TriMat::<f64>::with_capacity((n, n), laplacian.nnz() + n);
    let mut has_diag = vec![false; n];
    for (row, row_vec) in laplacian.outer_iterator().enumerate() {
        for (col, val) in row_vec.iter() {
            let a = if col == row {
                has_diag[row] = true;
                // diag(L) - L vanishes on the diagonal, only the self loop remains
                self_loop
            } else {
                -*val
            };
            let v = d_inv_sqrt[row] * a * d_inv_sqrt[col];
            if v != 0. {
                trimat.add_triplet(row, col, v);
            }
        }
    }
    for i in 0..n {
        if !has_diag[i] {
            let v = d_inv_sqrt[i] * self_loop * d_inv_sqrt[i];
            if v != 0. {
                trimat.add_triplet(i, i, v);
            }
        }
    }
    trimat.to_csr()
} // end of smooth_filter

//========================================================================================

// end of mod tests
