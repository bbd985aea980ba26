//! Builds the laplacian of a feature similarity graph restricted to clusters.
//!
//! Inside each cluster of a mapping, nodes are linked to their nearest neighbours in feature space
//! (or to every other member if the cluster is small) with a weight equal to |cos(x,y)|.
//! As nearest neighbour relations are not symetric, the weight of a pair is the maximum of the 2 directed weights.

use anyhow::anyhow;

use indexmap::IndexMap;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};

use crate::tools::orderingf::argsort_increasing;

/// a directed weighted edge (from, to, weight)
pub type DirectedEdge = (usize, usize, f64);

/// absolute value of the cosine between x and y.
/// 2 null vectors have similarity 1, a null vector and a non null one have similarity 0.
pub fn cosine_similarity(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let norm_x = x.dot(&x).sqrt();
    let norm_y = y.dot(&y).sqrt();
    if norm_x == 0. || norm_y == 0. {
        if norm_x == 0. && norm_y == 0. {
            return 1.;
        }
        return 0.;
    }
    (x.dot(&y) / (norm_x * norm_y)).abs()
} // end of cosine_similarity

fn euclidean(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    x.iter().zip(y.iter()).map(|(a, b)| (a - b) * (a - b)).sum::<f64>().sqrt()
}

/// returns the members of each cluster, in increasing node rank. mapping has shape (nb_nodes, nb_clusters)
pub fn clusters_from_mapping(mapping: &CsMat<f64>) -> Vec<Vec<usize>> {
    let mut clusters = vec![Vec::<usize>::new(); mapping.cols()];
    for (node, row_vec) in mapping.outer_iterator().enumerate() {
        for (cluster, val) in row_vec.iter() {
            if *val != 0. {
                clusters[cluster].push(node);
            }
        }
    }
    clusters
}

/// directed edges inside a cluster.
/// If the cluster has more than nb_neighbours + 1 members each member is linked to its nb_neighbours nearest members,
/// else each member is linked to all other members.
pub fn cluster_edges(features: &Array2<f64>, members: &[usize], nb_neighbours: usize) -> Vec<DirectedEdge> {
    let mut edges = Vec::<DirectedEdge>::new();
    if members.len() > nb_neighbours + 1 {
        edges.reserve(members.len() * nb_neighbours);
        for &i in members {
            let x = features.row(i);
            let others: Vec<usize> = members.iter().copied().filter(|j| *j != i).collect();
            let dists: Vec<f64> = others.iter().map(|j| euclidean(x, features.row(*j))).collect();
            for rank in argsort_increasing(&dists).into_iter().take(nb_neighbours) {
                let j = others[rank];
                edges.push((i, j, cosine_similarity(x, features.row(j))));
            }
        }
    } else {
        edges.reserve(members.len() * members.len().saturating_sub(1));
        for &i in members {
            for &j in members {
                if i != j {
                    edges.push((i, j, cosine_similarity(features.row(i), features.row(j))));
                }
            }
        }
    }
    edges
} // end of cluster_edges

/// keeps for each unordered pair the maximum weight of its directed edges. Keys are (min, max).
pub fn symetrize_max(edges: &[DirectedEdge]) -> IndexMap<(usize, usize), f64> {
    let mut pairs = IndexMap::<(usize, usize), f64>::with_capacity(edges.len());
    for &(i, j, w) in edges {
        if i == j {
            continue;
        }
        let key = (i.min(j), i.max(j));
        let entry = pairs.entry(key).or_insert(w);
        if w > *entry {
            *entry = w;
        }
    }
    pairs
} // end of symetrize_max

/// laplacian of the feature graph built inside the clusters of mapping.
/// features has one row per node of the graph, mapping shape is (nb_nodes, nb_clusters)
pub fn feats_to_laplacian(features: &Array2<f64>, nb_neighbours: usize, mapping: &CsMat<f64>) -> anyhow::Result<CsMat<f64>> {
    let nb_nodes = mapping.rows();
    if features.nrows() != nb_nodes {
        log::error!("features have {} rows, mapping has {} nodes", features.nrows(), nb_nodes);
        return Err(anyhow!(
            "features have {} rows, expected one per node : {}",
            features.nrows(),
            nb_nodes
        ));
    }
    let clusters = clusters_from_mapping(mapping);
    // clusters are disjoint, collect keeps cluster order
    let edges: Vec<Vec<DirectedEdge>> = clusters
        .par_iter()
        .map(|members| cluster_edges(features, members, nb_neighbours))
        .collect();
    let nb_directed: usize = edges.iter().map(|e| e.len()).sum();
    let pairs = symetrize_max(&edges.concat());
    log::debug!(
        "feature graph nb clusters : {}, nb directed edges : {}, nb edges : {}",
        clusters.len(),
        nb_directed,
        pairs.len()
    );
    //
    let mut trimat = TriMat::<f64>::with_capacity((nb_nodes, nb_nodes), 2 * pairs.len() + nb_nodes);
    let mut degrees = vec![0f64; nb_nodes];
    for (&(i, j), &w) in pairs.iter() {
        if w == 0. {
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
    Ok(trimat.to_csr())
} // end of feats_to_laplacian

//========================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use crate::tools::sparse::check_laplacian;
    use ndarray::array;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn one_cluster(nb_nodes: usize) -> CsMat<f64> {
        TriMat::from_triplets((nb_nodes, 1), (0..nb_nodes).collect(), vec![0; nb_nodes], vec![1.; nb_nodes]).to_csr()
    }

    #[test]
    fn test_cosine_similarity() {
        log_init_test();
        let x = array![1., 0.];
        let y = array![-3., 0.];
        let z = array![0., 2.];
        let zero = array![0., 0.];
        assert!((cosine_similarity(x.view(), y.view()) - 1.).abs() < 1.0E-12);
        assert!(cosine_similarity(x.view(), z.view()).abs() < 1.0E-12);
        assert_eq!(cosine_similarity(zero.view(), zero.view()), 1.);
        assert_eq!(cosine_similarity(x.view(), zero.view()), 0.);
    }

    #[test]
    fn test_small_cluster_is_a_clique() {
        log_init_test();
        let features = array![[1., 0.], [1., 1.], [0., 1.]];
        let edges = cluster_edges(&features, &[0, 1, 2], 5);
        assert_eq!(edges.len(), 6);
        let mut pairs: Vec<(usize, usize)> = edges.iter().map(|e| (e.0, e.1)).collect();
        pairs.sort();
        assert_eq!(pairs, vec![(0, 1), (0, 2), (1, 0), (1, 2), (2, 0), (2, 1)]);
        // each direction carries the same similarity
        for &(i, j, w) in &edges {
            let back = edges.iter().find(|e| e.0 == j && e.1 == i).unwrap();
            assert_eq!(w, back.2);
        }
    }

    #[test]
    fn test_large_cluster_uses_knn() {
        log_init_test();
        // points on a half line, each has a unique nearest neighbour
        let features = array![[1., 0.], [2., 0.], [4., 0.], [8., 0.]];
        let edges = cluster_edges(&features, &[0, 1, 2, 3], 1);
        assert_eq!(edges.len(), 4);
        let targets: Vec<(usize, usize)> = edges.iter().map(|e| (e.0, e.1)).collect();
        assert_eq!(targets, vec![(0, 1), (1, 0), (2, 1), (3, 2)]);
        // all collinear, weights are 1
        assert!(edges.iter().all(|e| (e.2 - 1.).abs() < 1.0E-12));
    }

    #[test]
    fn test_symetrize_max() {
        log_init_test();
        let pairs = symetrize_max(&[(0, 1, 0.2), (1, 0, 0.7), (2, 1, 0.4)]);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.get(&(0, 1)), Some(&0.7));
        assert_eq!(pairs.get(&(1, 2)), Some(&0.4));
    }

    #[test]
    fn test_feats_to_laplacian() {
        log_init_test();
        // 2 clusters {0,1,2} and {3}, opposite features give weight 1 thanks to |cos|
        let features = array![[1., 0.], [-1., 0.], [0., 1.], [5., 5.]];
        let mapping: CsMat<f64> =
            TriMat::from_triplets((4, 2), vec![0, 1, 2, 3], vec![0, 0, 0, 1], vec![1.; 4]).to_csr();
        let laplacian = feats_to_laplacian(&features, 2, &mapping).unwrap();
        check_laplacian(&laplacian, 1.0E-12).unwrap();
        assert_eq!(laplacian.get(0, 1), Some(&-1.));
        assert_eq!(laplacian.get(0, 0), Some(&1.));
        assert_eq!(laplacian.get(0, 2), None);
        assert_eq!(laplacian.get(0, 3), None);
        assert!(feats_to_laplacian(&features, 2, &one_cluster(3)).is_err());
    }

    #[test]
    fn test_weights_are_non_negative() {
        log_init_test();
        let features = array![[1., 2.], [-2., -1.], [3., -1.], [0., 0.], [-1., 4.]];
        let laplacian = feats_to_laplacian(&features, 2, &one_cluster(5)).unwrap();
        check_laplacian(&laplacian, 1.0E-12).unwrap();
        for (v, (i, j)) in laplacian.iter() {
            if i != j {
                assert!(*v <= 0.);
            } else {
                assert!(*v >= 0.);
            }
        }
    }
} // end of mod tests
