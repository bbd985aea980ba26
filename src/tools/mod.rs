//! utilities : sparse helpers, degrees and orderings.

pub mod sparse;

pub mod degrees;

pub mod orderingf;
