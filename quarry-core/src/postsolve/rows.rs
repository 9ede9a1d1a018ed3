//! Reductions that removed a row: singleton rows, redundant rows, forcing
//! rows, and duplicate (parallel) rows.

use crate::options::Options;
use crate::postsolve::solution::{Basis, BasisStatus, RowType, Solution};
use crate::postsolve::Nonzero;
use crate::util::numerics::Compensated;

/// A row with a single entry `coef * col` that only served to tighten the
/// column's bounds.
#[derive(Debug, Clone)]
pub struct SingletonRow {
    pub row: usize,
    pub col: usize,
    pub coef: f64,
    pub col_lower_tightened: bool,
    pub col_upper_tightened: bool,
}

impl SingletonRow {
    pub(crate) fn undo(&self, options: &Options, solution: &mut Solution, basis: &mut Basis) {
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

        if (!self.col_lower_tightened || col_status != BasisStatus::Lower)
            && (!self.col_upper_tightened || col_status != BasisStatus::Upper)
        {
            // the tightened bound is not in use; the row just becomes basic
            // with a zero multiplier
            if basis.valid {
                basis.row_status[self.row] = BasisStatus::Basic;
            }
            solution.row_dual[self.row] = 0.0;
            return;
        }

        // transfer the column's reduced cost onto the row so the column's
        // reduced cost becomes zero
        solution.row_dual[self.row] = solution.col_dual[self.col] / self.coef;
        solution.col_dual[self.col] = 0.0;

        if !basis.valid {
            return;
        }

        match col_status {
            BasisStatus::Lower => {
                debug_assert!(self.col_lower_tightened);
                basis.row_status[self.row] = if self.coef > 0.0 {
                    // tightened lower bound came from the row's lower side
                    BasisStatus::Lower
                } else {
                    BasisStatus::Upper
                };
            }
            BasisStatus::Upper => {
                basis.row_status[self.row] = if self.coef > 0.0 {
                    BasisStatus::Upper
                } else {
                    BasisStatus::Lower
                };
            }
            _ => debug_assert!(false, "tightened bound in use with status {col_status:?}"),
        }

        basis.col_status[self.col] = BasisStatus::Basic;
    }
}

/// A row implied by the column bounds; it carries no dual weight.
#[derive(Debug, Clone)]
pub struct RedundantRow {
    pub row: usize,
}

impl RedundantRow {
    pub(crate) fn undo(&self, solution: &mut Solution, basis: &mut Basis) {
        if !solution.dual_valid {
            return;
        }

        solution.row_dual[self.row] = 0.0;

        if basis.valid {
            basis.row_status[self.row] = BasisStatus::Basic;
        }
    }
}

/// A row whose side forced every entry's column to a bound.
#[derive(Debug, Clone)]
pub struct ForcingRow {
    pub row: usize,
    pub row_type: RowType,
    pub row_values: Vec<Nonzero>,
}

impl ForcingRow {
    pub(crate) fn undo(&self, solution: &mut Solution, basis: &mut Basis) {
        if !solution.dual_valid {
            return;
        }

        // find the column whose reduced cost sign is wrong for the bound it
        // was forced to; shifting the row dual zeroes that reduced cost
        let mut basic_col = None;
        let mut dual_delta = 0.0;
        if self.row_type == RowType::Leq {
            for entry in &self.row_values {
                let col_dual = solution.col_dual[entry.index] - entry.value * dual_delta;
                if col_dual * entry.value < 0.0 {
                    dual_delta = solution.col_dual[entry.index] / entry.value;
                    basic_col = Some(entry.index);
                }
            }
        } else {
            for entry in &self.row_values {
                let col_dual = solution.col_dual[entry.index] - entry.value * dual_delta;
                if col_dual * entry.value > 0.0 {
                    dual_delta = solution.col_dual[entry.index] / entry.value;
                    basic_col = Some(entry.index);
                }
            }
        }

        let Some(basic_col) = basic_col else { return };

        solution.row_dual[self.row] += dual_delta;
        for entry in &self.row_values {
            solution.col_dual[entry.index] = (Compensated::new(solution.col_dual[entry.index])
                - Compensated::new(dual_delta) * entry.value)
                .value();
        }
        solution.col_dual[basic_col] = 0.0;

        if basis.valid {
            basis.row_status[self.row] = if self.row_type == RowType::Geq {
                BasisStatus::Lower
            } else {
                BasisStatus::Upper
            };
            basis.col_status[basic_col] = BasisStatus::Basic;
        }
    }
}

/// `duplicate_row = scale * row`: the duplicate was dropped after possibly
/// tightening the kept row's sides.
#[derive(Debug, Clone)]
pub struct DuplicateRow {
    pub row: usize,
    pub duplicate_row: usize,
    pub scale: f64,
    pub row_upper_tightened: bool,
    pub row_lower_tightened: bool,
}

impl DuplicateRow {
    pub(crate) fn undo(&self, options: &Options, solution: &mut Solution, basis: &mut Basis) {
        if !solution.dual_valid {
            return;
        }

        if !self.row_upper_tightened && !self.row_lower_tightened {
            // the duplicate was simply redundant
            solution.row_dual[self.duplicate_row] = 0.0;
            if basis.valid {
                basis.row_status[self.duplicate_row] = BasisStatus::Basic;
            }
            return;
        }

        let row_status = if basis.valid {
            if solution.row_dual[self.row] < -options.dual_feasibility_tolerance {
                basis.row_status[self.row] = BasisStatus::Upper;
            } else if solution.row_dual[self.row] > options.dual_feasibility_tolerance {
                basis.row_status[self.row] = BasisStatus::Lower;
            }
            basis.row_status[self.row]
        } else if solution.row_dual[self.row] < -options.dual_feasibility_tolerance {
            BasisStatus::Upper
        } else if solution.row_dual[self.row] > options.dual_feasibility_tolerance {
            BasisStatus::Lower
        } else {
            BasisStatus::Basic
        };

        // a side of the kept row was tightened using the scaled duplicate,
        // so the dual weight may belong to the duplicate instead
        match row_status {
            BasisStatus::Basic => {
                solution.row_dual[self.duplicate_row] = 0.0;
                if basis.valid {
                    basis.row_status[self.duplicate_row] = BasisStatus::Basic;
                }
            }
            BasisStatus::Upper => {
                if self.row_upper_tightened {
                    self.transfer_dual(solution, basis);
                } else {
                    solution.row_dual[self.duplicate_row] = 0.0;
                    if basis.valid {
                        basis.row_status[self.duplicate_row] = BasisStatus::Basic;
                    }
                }
            }
            BasisStatus::Lower => {
                if self.row_lower_tightened {
                    self.transfer_dual(solution, basis);
                } else {
                    solution.row_dual[self.duplicate_row] = 0.0;
                    if basis.valid {
                        basis.row_status[self.duplicate_row] = BasisStatus::Basic;
                    }
                }
            }
            _ => debug_assert!(false, "unresolved row status {row_status:?}"),
        }
    }

    fn transfer_dual(&self, solution: &mut Solution, basis: &mut Basis) {
        solution.row_dual[self.duplicate_row] = solution.row_dual[self.row] / self.scale;
        solution.row_dual[self.row] = 0.0;
        if basis.valid {
            basis.row_status[self.row] = BasisStatus::Basic;
            basis.row_status[self.duplicate_row] = if self.scale > 0.0 {
                BasisStatus::Upper
            } else {
                BasisStatus::Lower
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual_solution(ncol: usize, nrow: usize) -> Solution {
        Solution {
            col_value: vec![0.0; ncol],
            col_dual: vec![0.0; ncol],
            row_value: vec![0.0; nrow],
            row_dual: vec![0.0; nrow],
            dual_valid: true,
        }
    }

    #[test]
    fn test_redundant_row_zero_dual_basic() {
        let red = RedundantRow { row: 1 };
        let mut solution = dual_solution(0, 2);
        solution.row_dual[1] = 7.0;
        let mut basis = Basis {
            col_status: vec![],
            row_status: vec![BasisStatus::Nonbasic; 2],
            valid: true,
        };
        red.undo(&mut solution, &mut basis);
        assert_eq!(solution.row_dual[1], 0.0);
        assert_eq!(basis.row_status[1], BasisStatus::Basic);
    }

    #[test]
    fn test_singleton_row_unused_bound_goes_basic() {
        // column sits between its bounds, so the row gets zero dual
        let red = SingletonRow {
            row: 0,
            col: 0,
            coef: 2.0,
            col_lower_tightened: true,
            col_upper_tightened: false,
        };
        let mut solution = dual_solution(1, 1);
        solution.row_dual[0] = 5.0;
        let mut basis = Basis {
            col_status: vec![BasisStatus::Basic],
            row_status: vec![BasisStatus::Nonbasic],
            valid: true,
        };
        red.undo(&Options::default(), &mut solution, &mut basis);
        assert_eq!(solution.row_dual[0], 0.0);
        assert_eq!(basis.row_status[0], BasisStatus::Basic);
    }

    #[test]
    fn test_singleton_row_transfers_reduced_cost() {
        // column at its tightened lower bound with positive reduced cost:
        // the row takes the dual weight, the column becomes basic
        let red = SingletonRow {
            row: 0,
            col: 0,
            coef: 2.0,
            col_lower_tightened: true,
            col_upper_tightened: false,
        };
        let mut solution = dual_solution(1, 1);
        solution.col_dual[0] = 3.0;
        let mut basis = Basis {
            col_status: vec![BasisStatus::Lower],
            row_status: vec![BasisStatus::Nonbasic],
            valid: true,
        };
        red.undo(&Options::default(), &mut solution, &mut basis);
        assert!((solution.row_dual[0] - 1.5).abs() < 1e-12);
        assert_eq!(solution.col_dual[0], 0.0);
        assert_eq!(basis.col_status[0], BasisStatus::Basic);
        assert_eq!(basis.row_status[0], BasisStatus::Lower);
    }

    #[test]
    fn test_forcing_row_shifts_dual_onto_row() {
        // row x + y <= 1 forced both columns down; x carries a dual-infeasible
        // reduced cost of -1 which moves onto the row
        let red = ForcingRow {
            row: 0,
            row_type: RowType::Leq,
            row_values: vec![Nonzero::new(0, 1.0), Nonzero::new(1, 1.0)],
        };
        let mut solution = dual_solution(2, 1);
        solution.col_dual[0] = -1.0;
        let mut basis = Basis {
            col_status: vec![BasisStatus::Upper, BasisStatus::Upper],
            row_status: vec![BasisStatus::Nonbasic],
            valid: true,
        };
        red.undo(&mut solution, &mut basis);
        assert!((solution.row_dual[0] - (-1.0)).abs() < 1e-12);
        assert_eq!(solution.col_dual[0], 0.0);
        assert_eq!(basis.col_status[0], BasisStatus::Basic);
        assert_eq!(basis.row_status[0], BasisStatus::Upper);
    }

    #[test]
    fn test_duplicate_row_without_tightening_is_redundant() {
        let red = DuplicateRow {
            row: 0,
            duplicate_row: 1,
            scale: 2.0,
            row_upper_tightened: false,
            row_lower_tightened: false,
        };
        let mut solution = dual_solution(0, 2);
        solution.row_dual = vec![4.0, 9.0];
        let mut basis = Basis::invalid();
        red.undo(&Options::default(), &mut solution, &mut basis);
        assert_eq!(solution.row_dual[1], 0.0);
        assert_eq!(solution.row_dual[0], 4.0);
    }

    #[test]
    fn test_duplicate_row_transfers_dual_to_tightening_side() {
        // kept row sits at its (tightened) upper bound, so the dual belongs
        // to the duplicate, scaled back
        let red = DuplicateRow {
            row: 0,
            duplicate_row: 1,
            scale: 2.0,
            row_upper_tightened: true,
            row_lower_tightened: false,
        };
        let mut solution = dual_solution(0, 2);
        solution.row_dual = vec![-3.0, 0.0];
        let mut basis = Basis {
            col_status: vec![],
            row_status: vec![BasisStatus::Nonbasic; 2],
            valid: true,
        };
        red.undo(&Options::default(), &mut solution, &mut basis);
        assert!((solution.row_dual[1] - (-1.5)).abs() < 1e-12);
        assert_eq!(solution.row_dual[0], 0.0);
        assert_eq!(basis.row_status[0], BasisStatus::Basic);
        assert_eq!(basis.row_status[1], BasisStatus::Upper);
    }
}
