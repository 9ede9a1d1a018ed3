//! Quarry core: auxiliary machinery for a branch-and-cut solver.
//!
//! This crate provides the pieces of a mixed-integer / linear programming
//! solver that sit *around* the LP engine rather than inside it:
//!
//! - **Compensated arithmetic**: a double-double scalar type used wherever
//!   dot products and running sums must survive cancellation (norms, row
//!   activities, dual corrections).
//! - **Postsolve stack**: an append-only log of presolve reductions that,
//!   undone in reverse, lifts an optimal solution of the reduced problem
//!   back to the original problem's space, producing primal values together
//!   with a consistent dual/basis triple.
//!
//! The LP/MIP solver proper, branch-and-bound orchestration, and cut
//! generation live elsewhere; they are callers that push reductions and
//! consume the lifted solutions.

#![allow(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // push methods mirror the reduction payloads

pub mod options;
pub mod postsolve;
pub mod util;

// Re-export main types
pub use options::Options;
pub use postsolve::{
    Basis, BasisStatus, Nonzero, PostsolveError, PostsolveStack, RowType, Solution,
};
pub use util::numerics::Compensated;
