//! Reductions that substitute a column out through an equation row, or fold
//! an equality row into other rows.

use crate::options::Options;
use crate::postsolve::solution::{Basis, BasisStatus, RowType, Solution};
use crate::postsolve::Nonzero;
use crate::util::numerics::Compensated;

/// A free column was solved out of an equation row.
///
/// The row and the column were both removed from the reduced problem; the
/// saved entries are the row (column-indexed) and the column (row-indexed)
/// as they were at the moment of reduction.
#[derive(Debug, Clone)]
pub struct FreeColSubstitution {
    pub row: usize,
    pub col: usize,
    pub rhs: f64,
    pub col_cost: f64,
    pub row_type: RowType,
    pub row_values: Vec<Nonzero>,
    pub col_values: Vec<Nonzero>,
}

impl FreeColSubstitution {
    pub(crate) fn undo(&self, solution: &mut Solution, basis: &mut Basis) {
        let mut col_coef = 0.0;
        // activity of the restored row, excluding the substituted column
        let mut row_value = Compensated::default();
        for entry in &self.row_values {
            if entry.index == self.col {
                col_coef = entry.value;
            } else {
                row_value.add_product(entry.value, solution.col_value[entry.index]);
            }
        }
        debug_assert!(col_coef != 0.0);

        solution.col_value[self.col] = ((self.rhs - row_value) / col_coef).value();
        // later records read this row's activity
        solution.row_value[self.row] =
            (row_value + col_coef * solution.col_value[self.col]).value();

        if !solution.col_value[self.col].is_finite() {
            log::warn!(
                "free column substitution produced non-finite value for column {}",
                self.col
            );
        }

        if !solution.dual_valid {
            return;
        }

        // row dual chosen so the reduced cost of the basic column is zero;
        // zeroing it first drops the row's own term from the sum
        solution.row_dual[self.row] = 0.0;
        let mut dual = Compensated::new(self.col_cost);
        for entry in &self.col_values {
            dual.add_product(-entry.value, solution.row_dual[entry.index]);
        }

        solution.col_dual[self.col] = 0.0;
        solution.row_dual[self.row] = (dual / col_coef).value();

        if !basis.valid {
            return;
        }

        basis.col_status[self.col] = BasisStatus::Basic;
        basis.row_status[self.row] = match self.row_type {
            RowType::Eq => {
                if solution.row_dual[self.row] < 0.0 {
                    BasisStatus::Upper
                } else {
                    BasisStatus::Lower
                }
            }
            RowType::Geq => BasisStatus::Lower,
            RowType::Leq => BasisStatus::Upper,
        };
    }
}

/// A doubleton equation `coef * col + coef_subst * col_subst = rhs` was used
/// to substitute `col_subst` out of the problem.
///
/// `row` is `None` when the equation row itself had already been removed and
/// only the primal value can be recovered. `col_subst_values` holds the
/// substituted column's entries (row-indexed) at the moment of reduction.
#[derive(Debug, Clone)]
pub struct DoubletonEquation {
    pub row: Option<usize>,
    pub col: usize,
    pub col_subst: usize,
    pub coef: f64,
    pub coef_subst: f64,
    pub rhs: f64,
    pub subst_cost: f64,
    pub lower_tightened: bool,
    pub upper_tightened: bool,
    pub col_subst_values: Vec<Nonzero>,
}

impl DoubletonEquation {
    pub(crate) fn undo(&self, options: &Options, solution: &mut Solution, basis: &mut Basis) {
        solution.col_value[self.col_subst] = ((self.rhs
            - Compensated::new(self.coef) * solution.col_value[self.col])
            / self.coef_subst)
            .value();

        // can only do primal postsolve, stop here
        let Some(row) = self.row else { return };
        if !solution.dual_valid {
            return;
        }

        let col_status = if basis.valid {
            if solution.col_dual[self.col] > options.dual_feasibility_tolerance {
                basis.col_status[self.col] = BasisStatus::Lower;
            } else if solution.col_dual[self.col] < -options.dual_feasibility_tolerance {
                basis.col_status[self.col] = BasisStatus::Upper;
            }
            basis.col_status[self.col]
        } else if solution.col_dual[self.col] > options.dual_feasibility_tolerance {
            BasisStatus::Lower
        } else if solution.col_dual[self.col] < -options.dual_feasibility_tolerance {
            BasisStatus::Upper
        } else {
            BasisStatus::Basic
        };

        // every row i containing the substituted column had this equation
        // added with scale -a_i/coef_subst, so each such row dual implicitly
        // feeds back into the equation's dual
        solution.row_dual[row] = 0.0;
        let mut row_dual = Compensated::default();
        for entry in &self.col_subst_values {
            row_dual.add_product(-entry.value, solution.row_dual[entry.index]);
        }
        row_dual /= self.coef_subst;
        solution.row_dual[row] = row_dual.value();

        // the equation was also folded into the objective
        solution.col_dual[self.col_subst] = self.subst_cost;
        solution.col_dual[self.col] += self.subst_cost * self.coef / self.coef_subst;

        if (self.upper_tightened && col_status == BasisStatus::Upper)
            || (self.lower_tightened && col_status == BasisStatus::Lower)
        {
            // the bound in use came from this reduction and does not exist in
            // the original problem; shift dual mass onto the row so the
            // column's reduced cost becomes zero
            let row_dual_delta = solution.col_dual[self.col] / self.coef;
            solution.row_dual[row] = (row_dual + row_dual_delta).value();
            solution.col_dual[self.col] = 0.0;
            solution.col_dual[self.col_subst] = (Compensated::new(
                solution.col_dual[self.col_subst],
            ) - row_dual_delta * self.coef_subst)
                .value();

            if basis.valid {
                let same_sign =
                    self.coef.is_sign_negative() == self.coef_subst.is_sign_negative();
                if (same_sign && basis.col_status[self.col] == BasisStatus::Upper)
                    || (!same_sign && basis.col_status[self.col] == BasisStatus::Lower)
                {
                    basis.col_status[self.col_subst] = BasisStatus::Lower;
                } else {
                    basis.col_status[self.col_subst] = BasisStatus::Upper;
                }
                basis.col_status[self.col] = BasisStatus::Basic;
            }
        } else {
            // otherwise zero the substituted column's reduced cost and make
            // that column basic
            let row_dual_delta = solution.col_dual[self.col_subst] / self.coef_subst;
            solution.row_dual[row] = (row_dual + row_dual_delta).value();
            solution.col_dual[self.col_subst] = 0.0;
            solution.col_dual[self.col] = (Compensated::new(solution.col_dual[self.col])
                - row_dual_delta * self.coef)
                .value();
            if basis.valid {
                basis.col_status[self.col_subst] = BasisStatus::Basic;
            }
        }

        if !basis.valid {
            return;
        }

        basis.row_status[row] = if solution.row_dual[row] < 0.0 {
            BasisStatus::Lower
        } else {
            BasisStatus::Upper
        };
    }
}

/// A multiple of an equality row was added to one target row.
///
/// Undo only touches duals; these records can only exist while no basis is
/// valid.
#[derive(Debug, Clone)]
pub struct EqualityRowAddition {
    pub row: usize,
    pub added_eq_row: usize,
    pub eq_row_scale: f64,
    pub eq_row_values: Vec<Nonzero>,
}

impl EqualityRowAddition {
    pub(crate) fn undo(&self, solution: &mut Solution, basis: &Basis) {
        if !solution.dual_valid || solution.row_dual[self.row] == 0.0 {
            return;
        }

        // the target row's dual implicitly carries the equation's dual,
        // scaled by the factor the equation was added with
        solution.row_dual[self.added_eq_row] = (Compensated::new(self.eq_row_scale)
            * solution.row_dual[self.row]
            + solution.row_dual[self.added_eq_row])
            .value();

        debug_assert!(!basis.valid);
    }
}

/// A multiple of an equality row was added to several target rows at once.
#[derive(Debug, Clone)]
pub struct EqualityRowAdditions {
    pub added_eq_row: usize,
    pub eq_row_values: Vec<Nonzero>,
    /// `(target_row, scale)` pairs.
    pub target_rows: Vec<Nonzero>,
}

impl EqualityRowAdditions {
    pub(crate) fn undo(&self, solution: &mut Solution, basis: &Basis) {
        if !solution.dual_valid {
            return;
        }

        let mut eq_row_dual = Compensated::new(solution.row_dual[self.added_eq_row]);
        for target in &self.target_rows {
            eq_row_dual.add_product(target.value, solution.row_dual[target.index]);
        }
        solution.row_dual[self.added_eq_row] = eq_row_dual.value();

        debug_assert!(!basis.valid);
    }
}
