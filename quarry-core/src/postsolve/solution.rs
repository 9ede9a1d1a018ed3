//! Solution and basis containers mutated by postsolve.

/// Role of a column or row in the simplex basis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BasisStatus {
    /// Nonbasic at the lower bound.
    Lower,

    /// In the basis.
    Basic,

    /// Nonbasic at the upper bound.
    Upper,

    /// Free variable pinned at zero.
    Zero,

    /// Nonbasic with the bound not yet resolved.
    #[default]
    Nonbasic,
}

/// Side classification of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowType {
    /// `a . x <= b`
    Leq,

    /// `a . x >= b`
    Geq,

    /// `a . x = b`
    Eq,
}

/// Primal/dual iterate lifted in place by the postsolve stack.
///
/// On entry to `undo` the vectors are indexed by the *reduced* problem; on
/// exit they are indexed by the original problem. The `dual_valid` flag
/// gates whether the dual fields hold meaningful values and are updated.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    /// Primal value per column.
    pub col_value: Vec<f64>,

    /// Reduced cost per column.
    pub col_dual: Vec<f64>,

    /// Activity per row.
    pub row_value: Vec<f64>,

    /// Dual multiplier per row.
    pub row_dual: Vec<f64>,

    /// Whether `col_dual` / `row_dual` are populated.
    pub dual_valid: bool,
}

impl Solution {
    /// A primal-only solution of the given dimensions, duals not valid.
    pub fn primal(col_value: Vec<f64>, row_value: Vec<f64>) -> Self {
        Self {
            col_value,
            row_value,
            ..Default::default()
        }
    }
}

/// Basis statuses lifted alongside the solution.
///
/// The `valid` flag gates all basis updates; postsolve never touches the
/// status vectors when it is false.
#[derive(Debug, Clone, Default)]
pub struct Basis {
    /// Status per column.
    pub col_status: Vec<BasisStatus>,

    /// Status per row.
    pub row_status: Vec<BasisStatus>,

    /// Whether the statuses describe an actual basis.
    pub valid: bool,
}

impl Basis {
    /// An invalid placeholder basis; postsolve will leave it untouched.
    pub fn invalid() -> Self {
        Self::default()
    }
}
