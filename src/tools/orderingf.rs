//! Some utilities to order float values (degrees, distances) while keeping track of the node they belong to.
//!
//! Sorts are stable, so that equal values keep the order of node ranks.

use num_traits::float::*;
use std::cmp;

/// indexed value to keep track of position after sorting
#[derive(Copy, Clone, Debug)]
pub struct IndexedValue<F>(pub usize, pub F);

impl<F> IndexedValue<F> {
    pub fn new(idx: usize, val: F) -> Self {
        IndexedValue::<F> { 0: idx, 1: val }
    }
} // end of impl block for IndexedValue

/// makes an increasing ordering on Float by putting Nan at end of sort.
pub(crate) fn increasing_sort_nans_last<F: Float>(a: &IndexedValue<F>, b: &IndexedValue<F>) -> cmp::Ordering {
    match (a, b) {
        (x, y) if x.1.is_nan() && y.1.is_nan() => cmp::Ordering::Equal,
        (x, _) if x.1.is_nan() => cmp::Ordering::Greater,
        (_, y) if y.1.is_nan() => cmp::Ordering::Less,
        (_, _) => a.1.partial_cmp(&b.1).unwrap_or(cmp::Ordering::Equal),
    }
} // end of increasing_sort_nans_last

/// returns the indexes of values sorted by increasing value, ties broken by index.
pub fn argsort_increasing<F: Float>(values: &[F]) -> Vec<usize> {
    let mut indexed: Vec<IndexedValue<F>> = values
        .iter()
        .enumerate()
        .map(|(i, v)| IndexedValue::new(i, *v))
        .collect();
    // sort_by is stable
    indexed.sort_by(increasing_sort_nans_last);
    indexed.into_iter().map(|iv| iv.0).collect()
} // end of argsort_increasing

// end of mod tests
