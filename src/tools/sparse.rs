//! small sparse matrix helpers on csr matrices.
//!
//! All matrices handled by the crate are [CsMat\<f64\>] in compressed row storage.

use anyhow::anyhow;

use sprs::CsMat;

#[cfg_attr(doc, katexit::katexit)]
/// Galerkin projection of a square operator on the basis given by the columns of mapping.
///
/// $$ L_{coarse} = M^{t} \cdot L \cdot M $$
///
/// mapping has shape (fine, coarse), laplacian has shape (fine, fine).
pub fn galerkin(laplacian: &CsMat<f64>, mapping: &CsMat<f64>) -> anyhow::Result<CsMat<f64>> {
    let (nb_fine, nb_coarse) = mapping.shape();
    if laplacian.rows() != nb_fine || laplacian.cols() != nb_fine {
        log::error!(
            "galerkin : laplacian shape {:?} inconsistent with mapping shape {:?}",
            laplacian.shape(),
            mapping.shape()
        );
        return Err(anyhow!(
            "galerkin : laplacian shape {:?} inconsistent with mapping shape {:?}",
            laplacian.shape(),
            mapping.shape()
        ));
    }
    let mapping_t: CsMat<f64> = mapping.transpose_view().to_csr();
    let left: CsMat<f64> = &mapping_t * laplacian;
    let coarse: CsMat<f64> = &left * mapping;
    log::trace!("galerkin projection {} -> {}", nb_fine, nb_coarse);
    Ok(coarse)
} // end of galerkin

/// checks a matrix of shape (fine, coarse) is a mapping : each row has exactly one entry, equal to 1.
pub fn check_mapping(mapping: &CsMat<f64>) -> anyhow::Result<()> {
    for (row, row_vec) in mapping.outer_iterator().enumerate() {
        if row_vec.nnz() != 1 {
            log::error!("check_mapping fine node {} is in {} clusters", row, row_vec.nnz());
            return Err(anyhow!("mapping : fine node {} is in {} clusters, expected 1", row, row_vec.nnz()));
        }
        for (col, val) in row_vec.iter() {
            if *val != 1. {
                log::error!("check_mapping entry ({},{}) is {}", row, col, val);
                return Err(anyhow!("mapping : entry ({},{}) is {}, expected 1", row, col, val));
            }
        }
    }
    Ok(())
} // end of check_mapping

/// returns the sums of each row
pub fn row_sums(mat: &CsMat<f64>) -> Vec<f64> {
    mat.outer_iterator()
        .map(|row_vec| row_vec.iter().map(|(_, v)| *v).sum::<f64>())
        .collect()
} // end of row_sums

/// checks a matrix is a graph laplacian : square, symetric, with non positive off diagonal terms
/// (edge weights are non negative) and null row sums (up to tol relatively to its diagonal).
pub fn check_laplacian(mat: &CsMat<f64>, tol: f64) -> anyhow::Result<()> {
    let (nb_row, nb_col) = mat.shape();
    if nb_row != nb_col {
        log::error!("check_laplacian matrix is not square : {:?}", mat.shape());
        return Err(anyhow!("laplacian is not square, shape : {:?}", mat.shape()));
    }
    let diag = mat.diag().to_dense();
    let sums = row_sums(mat);
    for i in 0..nb_row {
        if sums[i].abs() > tol * (1. + diag[i].abs()) {
            log::error!("check_laplacian row {} has sum {:.3e}", i, sums[i]);
            return Err(anyhow!("laplacian row {} has non null sum {:.3e}", i, sums[i]));
        }
    }
    for (row, row_vec) in mat.outer_iterator().enumerate() {
        for (col, val) in row_vec.iter() {
            if col != row && *val > 0. {
                log::error!("check_laplacian positive entry {:.3e} at ({},{}), edge weight is negative", val, row, col);
                return Err(anyhow!("laplacian has a negative edge weight {:.3e} at ({},{})", -val, row, col));
            }
            let sym = mat.get(col, row).copied().unwrap_or(0.);
            if (sym - *val).abs() > tol * (1. + val.abs()) {
                log::error!("check_laplacian not symetric at ({},{})", row, col);
                return Err(anyhow!("laplacian not symetric at ({},{})", row, col));
            }
        }
    }
    Ok(())
} // end of check_laplacian

//========================================================================================

#[cfg(test)]
mod tests {

    use super::*;
    use sprs::TriMat;

    fn log_init_test() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // path 0 - 1 - 2
    fn path_laplacian() -> CsMat<f64> {
        let rows = vec![0, 0, 1, 1, 1, 2, 2];
        let cols = vec![0, 1, 0, 1, 2, 1, 2];
        let vals = vec![1., -1., -1., 2., -1., -1., 1.];
        TriMat::from_triplets((3, 3), rows, cols, vals).to_csr()
    }

    #[test]
    fn test_galerkin_keeps_laplacian() {
        log_init_test();
        let laplacian = path_laplacian();
        check_laplacian(&laplacian, 1.0E-12).unwrap();
        // merge nodes 0 and 1
        let mapping: CsMat<f64> =
            TriMat::from_triplets((3, 2), vec![0, 1, 2], vec![0, 0, 1], vec![1., 1., 1.]).to_csr();
        let coarse = galerkin(&laplacian, &mapping).unwrap();
        assert_eq!(coarse.shape(), (2, 2));
        check_laplacian(&coarse, 1.0E-12).unwrap();
        let dense = coarse.to_dense();
        assert!((dense[[0, 0]] - 1.).abs() < 1.0E-12);
        assert!((dense[[0, 1]] + 1.).abs() < 1.0E-12);
    }

    #[test]
    fn test_galerkin_shape_mismatch() {
        log_init_test();
        let laplacian = path_laplacian();
        let mapping: CsMat<f64> = TriMat::from_triplets((2, 1), vec![0, 1], vec![0, 0], vec![1., 1.]).to_csr();
        assert!(galerkin(&laplacian, &mapping).is_err());
    }

    #[test]
    fn test_check_laplacian_rejects_non_null_sum() {
        log_init_test();
        let mat: CsMat<f64> = TriMat::from_triplets((2, 2), vec![0, 1], vec![0, 1], vec![1., 1.]).to_csr();
        assert!(check_laplacian(&mat, 1.0E-10).is_err());
    }

    #[test]
    fn test_check_laplacian_rejects_negative_weight() {
        log_init_test();
        // rows sum to 0 and matrix is symetric, but the edge weight is -1
        let mat: CsMat<f64> =
            TriMat::from_triplets((2, 2), vec![0, 0, 1, 1], vec![0, 1, 0, 1], vec![-1., 1., 1., -1.]).to_csr();
        assert!(check_laplacian(&mat, 1.0E-10).is_err());
    }

    #[test]
    fn test_check_laplacian_rejects_non_symetric() {
        log_init_test();
        let mat: CsMat<f64> =
            TriMat::from_triplets((2, 2), vec![0, 0, 1], vec![0, 1, 1], vec![1., -3., 2.]).to_csr();
        assert!(check_laplacian(&mat, 1.0E-10).is_err());
        // null row sums but not symetric
        let mat: CsMat<f64> = TriMat::from_triplets(
            (3, 3),
            vec![0, 0, 1, 1, 2, 2],
            vec![0, 1, 1, 2, 2, 0],
            vec![1., -1., 1., -1., 1., -1.],
        )
        .to_csr();
        assert!(check_laplacian(&mat, 1.0E-10).is_err());
    }

    #[test]
    fn test_check_mapping() {
        log_init_test();
        let mapping: CsMat<f64> = TriMat::from_triplets((3, 2), vec![0, 1, 2], vec![0, 0, 1], vec![1.; 3]).to_csr();
        check_mapping(&mapping).unwrap();
        // node 2 dropped
        let dropped: CsMat<f64> = TriMat::from_triplets((3, 2), vec![0, 1], vec![0, 0], vec![1.; 2]).to_csr();
        assert!(check_mapping(&dropped).is_err());
        // duplicate triplets are summed into a 2
        let doubled: CsMat<f64> =
            TriMat::from_triplets((3, 2), vec![0, 0, 1, 2], vec![0, 0, 0, 1], vec![1.; 4]).to_csr();
        assert!(check_mapping(&doubled).is_err());
        // node 0 in 2 clusters
        let shared: CsMat<f64> =
            TriMat::from_triplets((3, 2), vec![0, 0, 1, 2], vec![0, 1, 0, 1], vec![1.; 4]).to_csr();
        assert!(check_mapping(&shared).is_err());
    }
} // end of mod tests
