//! Cut pool and supporting storage.
//!
//! - Dynamic sparse row matrix with tombstone removal
//! - Cut pool with duplicate screening, efficacy scoring, and aging
//! - CSR cut-set output for the LP relaxation

mod cutset;
mod matrix;
mod pool;

pub use cutset::CutSet;
pub use matrix::RowMatrix;
pub use pool::{CutPool, CutPoolObserver, CutPoolSettings};
