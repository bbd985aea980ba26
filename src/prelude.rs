//! To ease access to most frequently items
//!

pub use crate::io::{csv::*, embeddedbson::*, mtx::*, output::*};

pub use crate::laplacian::*;

pub use crate::coarsen::simple::SimpleCoarsener;
pub use crate::coarsen::lamg::LamgCoarsener;
pub use crate::coarsen::*;

pub use crate::fusion::*;

pub use crate::refine::refine;

pub use crate::embedding::*;

pub use crate::pipeline::*;
