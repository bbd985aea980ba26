//! compute weighted degrees from a csmat and the visiting order of nodes derived from them.

use sprs::CsMatI;

use super::orderingf::argsort_increasing;

/// returns the weighted degree of each node, i.e the sum of its row in the adjacency matrix.
/// Self loops are not taken into account.
pub(crate) fn get_weighted_degrees(csmat: &CsMatI<f64, usize>) -> Vec<f64> {
    //
    assert!(csmat.is_csr());
    //
    let (nb_row, _) = csmat.shape();
    let mut degrees = vec![0f64; nb_row];
    //
    let mut iter = csmat.iter();
    while let Some((val, (i, j))) = iter.next() {
        if i != j {
            degrees[i] += *val;
        }
    }
    degrees
} // end of get_weighted_degrees

/// returns node ranks sorted by increasing weighted degree.
/// Low degree nodes come first, ties are broken by node rank.
pub fn increasing_degree_order(csmat: &CsMatI<f64, usize>) -> Vec<usize> {
    let degrees = get_weighted_degrees(csmat);
    argsort_increasing(&degrees)
} // end of increasing_degree_order

// end of mod tests
