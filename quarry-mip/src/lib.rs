//! Cut management layer for the quarry branch-and-cut toolkit.
//!
//! This crate curates the linear inequalities generated during
//! branch-and-cut: a [`CutPool`] deduplicates near-parallel rows, scores and
//! ranks cuts for violation-based separation, ages out unused cuts, and
//! keeps a sparse row matrix consistent under constant churn. Cut
//! generators and the LP relaxation are callers; they add cuts and consume
//! the separated [`CutSet`].

#![warn(missing_docs)]

pub mod cuts;
pub mod domain;

pub use cuts::{CutPool, CutPoolObserver, CutPoolSettings, CutSet, RowMatrix};
pub use domain::Domain;
