//! Reductions that removed or rewrote a column: linear transforms, fixed
//! columns, forcing columns, and duplicate (merged) columns.

use crate::options::Options;
use crate::postsolve::solution::{Basis, BasisStatus, Solution};
use crate::postsolve::Nonzero;
use crate::util::numerics::Compensated;

/// The column was rescaled and shifted: `x_orig = scale * x_pre + constant`.
#[derive(Debug, Clone)]
pub struct LinearTransform {
    pub col: usize,
    pub scale: f64,
    pub constant: f64,
}

impl LinearTransform {
    pub(crate) fn undo(&self, solution: &mut Solution) {
        solution.col_value[self.col] *= self.scale;
        solution.col_value[self.col] += self.constant;

        if solution.dual_valid {
            solution.col_dual[self.col] /= self.scale;
        }
    }

    pub(crate) fn transform_to_presolved_space(&self, primal: &mut [f64]) {
        primal[self.col] -= self.constant;
        primal[self.col] /= self.scale;
    }
}

/// The column was fixed at `fix_value` and removed; `col_values` holds its
/// matrix entries (row-indexed) for recomputing the reduced cost.
#[derive(Debug, Clone)]
pub struct FixedCol {
    pub col: usize,
    pub fix_value: f64,
    pub col_cost: f64,
    /// Nonbasic hint recorded at reduction time; the sentinel
    /// [`BasisStatus::Nonbasic`] is resolved by the sign of the reduced cost.
    pub fix_type: BasisStatus,
    pub col_values: Vec<Nonzero>,
}

impl FixedCol {
    pub(crate) fn undo(&self, solution: &mut Solution, basis: &mut Basis) {
        solution.col_value[self.col] = self.fix_value;

        if !solution.dual_valid {
            return;
        }

        let mut reduced_cost = Compensated::new(self.col_cost);
        for entry in &self.col_values {
            debug_assert!(solution.row_dual.len() > entry.index);
            reduced_cost.add_product(-entry.value, solution.row_dual[entry.index]);
        }
        solution.col_dual[self.col] = reduced_cost.value();

        if basis.valid {
            basis.col_status[self.col] = self.fix_type;
            if basis.col_status[self.col] == BasisStatus::Nonbasic {
                basis.col_status[self.col] = if solution.col_dual[self.col] >= 0.0 {
                    BasisStatus::Lower
                } else {
                    BasisStatus::Upper
                };
            }
        }
    }
}

/// The column was driven to a bound, rendering the rows it appears in
/// redundant. `col_values` holds the column's entries (row-indexed).
#[derive(Debug, Clone)]
pub struct ForcingColumn {
    pub col: usize,
    pub col_bound: f64,
    pub at_infinite_upper: bool,
    pub col_values: Vec<Nonzero>,
}

impl ForcingColumn {
    pub(crate) fn undo(&self, solution: &mut Solution, basis: &mut Basis) {
        let mut nonbasic_row = None;
        let mut nonbasic_row_status = BasisStatus::Nonbasic;
        let mut col_value_from_row = self.col_bound;

        if self.at_infinite_upper {
            // the largest implied value keeps every row feasible
            for entry in &self.col_values {
                let candidate = solution.row_value[entry.index] / entry.value;
                if candidate > col_value_from_row {
                    nonbasic_row = Some(entry.index);
                    col_value_from_row = candidate;
                    nonbasic_row_status = if entry.value > 0.0 {
                        BasisStatus::Lower
                    } else {
                        BasisStatus::Upper
                    };
                }
            }
        } else {
            // the smallest implied value keeps every row feasible
            for entry in &self.col_values {
                let candidate = solution.row_value[entry.index] / entry.value;
                if candidate < col_value_from_row {
                    nonbasic_row = Some(entry.index);
                    col_value_from_row = candidate;
                    nonbasic_row_status = if entry.value > 0.0 {
                        BasisStatus::Upper
                    } else {
                        BasisStatus::Lower
                    };
                }
            }
        }

        solution.col_value[self.col] = col_value_from_row;

        if !solution.dual_valid {
            return;
        }

        solution.col_dual[self.col] = 0.0;

        if !basis.valid {
            return;
        }

        match nonbasic_row {
            None => {
                basis.col_status[self.col] = if self.at_infinite_upper {
                    BasisStatus::Lower
                } else {
                    BasisStatus::Upper
                };
            }
            Some(row) => {
                basis.col_status[self.col] = BasisStatus::Basic;
                basis.row_status[row] = nonbasic_row_status;
            }
        }
    }
}

/// A row removed together with a forcing column; its activity is
/// reconstructed from the saved entries (column-indexed).
#[derive(Debug, Clone)]
pub struct ForcingColumnRemovedRow {
    pub row: usize,
    pub rhs: f64,
    pub row_values: Vec<Nonzero>,
}

impl ForcingColumnRemovedRow {
    pub(crate) fn undo(&self, solution: &mut Solution, basis: &mut Basis) {
        let mut value = Compensated::new(self.rhs);
        for entry in &self.row_values {
            value.add_product(-entry.value, solution.col_value[entry.index]);
        }
        // later records read this row's activity
        solution.row_value[self.row] = value.value();

        if solution.dual_valid {
            solution.row_dual[self.row] = 0.0;
        }
        if basis.valid {
            basis.row_status[self.row] = BasisStatus::Basic;
        }
    }
}

/// `duplicate_col` was merged into `col` as `z = col + col_scale * dup`.
///
/// Undo splits the merged value back into two feasible column values,
/// respecting bounds and integrality, and assigns basis statuses so that
/// exactly one of the two columns is basic.
#[derive(Debug, Clone)]
pub struct DuplicateColumn {
    pub col: usize,
    pub duplicate_col: usize,
    pub col_scale: f64,
    pub col_lower: f64,
    pub col_upper: f64,
    pub duplicate_col_lower: f64,
    pub duplicate_col_upper: f64,
    pub col_integral: bool,
    pub duplicate_col_integral: bool,
}

impl DuplicateColumn {
    pub(crate) fn undo(&self, options: &Options, solution: &mut Solution, basis: &mut Basis) {
        let merge_val = solution.col_value[self.col];
        let primal_tol = options.primal_feasibility_tolerance;
        let scale = self.col_scale;

        let ok_residual = |x: f64, y: f64| -> bool {
            let residual = (x + scale * y - merge_val).abs();
            let ok = residual <= primal_tol;
            if !ok {
                log::warn!(
                    "duplicate column split residual {residual:.3e}: \
                     {x} + {scale} * {y} != {merge_val}"
                );
            }
            ok
        };
        let is_at_bound =
            |value: f64, bound: f64| -> bool { (value - bound).abs() <= primal_tol };

        // the duplicate's reduced cost follows from scaling, since
        // col_scale * col reproduces its coefficients and cost
        if solution.dual_valid {
            solution.col_dual[self.duplicate_col] = solution.col_dual[self.col] * scale;
        }

        if basis.valid {
            // a nonbasic merged column pins both columns to matching bounds;
            // for negative scale the duplicate's bounds swap roles
            match basis.col_status[self.col] {
                BasisStatus::Lower => {
                    solution.col_value[self.col] = self.col_lower;
                    if scale > 0.0 {
                        basis.col_status[self.duplicate_col] = BasisStatus::Lower;
                        solution.col_value[self.duplicate_col] = self.duplicate_col_lower;
                    } else {
                        basis.col_status[self.duplicate_col] = BasisStatus::Upper;
                        solution.col_value[self.duplicate_col] = self.duplicate_col_upper;
                    }
                    let ok = ok_residual(
                        solution.col_value[self.col],
                        solution.col_value[self.duplicate_col],
                    );
                    debug_assert!(ok);
                    return;
                }
                BasisStatus::Upper => {
                    solution.col_value[self.col] = self.col_upper;
                    if scale > 0.0 {
                        basis.col_status[self.duplicate_col] = BasisStatus::Upper;
                        solution.col_value[self.duplicate_col] = self.duplicate_col_upper;
                    } else {
                        basis.col_status[self.duplicate_col] = BasisStatus::Lower;
                        solution.col_value[self.duplicate_col] = self.duplicate_col_lower;
                    }
                    let ok = ok_residual(
                        solution.col_value[self.col],
                        solution.col_value[self.duplicate_col],
                    );
                    debug_assert!(ok);
                    return;
                }
                BasisStatus::Zero => {
                    solution.col_value[self.col] = 0.0;
                    basis.col_status[self.duplicate_col] = BasisStatus::Zero;
                    solution.col_value[self.duplicate_col] = 0.0;
                    return;
                }
                BasisStatus::Basic | BasisStatus::Nonbasic => {}
            }
            debug_assert_eq!(basis.col_status[self.col], BasisStatus::Basic);
        }

        // no basis, or the merged column is basic: one of the two columns
        // must become nonbasic. Start from col at its lower bound and derive
        // the duplicate as (z - col) / scale, then repair bound and
        // integrality violations.
        if self.col_lower != f64::NEG_INFINITY {
            solution.col_value[self.col] = self.col_lower;
        } else {
            solution.col_value[self.col] = self.col_upper.min(0.0);
        }
        solution.col_value[self.duplicate_col] =
            ((Compensated::new(merge_val) - solution.col_value[self.col]) / scale).value();

        let mut recompute_col = false;

        if basis.valid {
            basis.col_status[self.duplicate_col] = BasisStatus::Nonbasic;
        }

        if solution.col_value[self.duplicate_col] > self.duplicate_col_upper {
            solution.col_value[self.duplicate_col] = self.duplicate_col_upper;
            recompute_col = true;
            if basis.valid {
                basis.col_status[self.duplicate_col] = BasisStatus::Upper;
            }
        } else if solution.col_value[self.duplicate_col] < self.duplicate_col_lower {
            solution.col_value[self.duplicate_col] = self.duplicate_col_lower;
            recompute_col = true;
            if basis.valid {
                basis.col_status[self.duplicate_col] = BasisStatus::Lower;
            }
        } else if self.duplicate_col_integral {
            debug_assert!(!basis.valid);
            let value = solution.col_value[self.duplicate_col];
            if (value.round() - value).abs() > options.mip_feasibility_tolerance {
                solution.col_value[self.duplicate_col] = value.floor();
                recompute_col = true;
            }
        }

        if recompute_col {
            solution.col_value[self.col] =
                merge_val - scale * solution.col_value[self.duplicate_col];
            if !self.duplicate_col_integral && self.col_integral {
                // col must take the integral share of the split
                debug_assert!(!basis.valid);
                solution.col_value[self.col] = (solution.col_value[self.col]
                    - options.mip_feasibility_tolerance)
                    .ceil();
                solution.col_value[self.duplicate_col] = ((Compensated::new(merge_val)
                    - solution.col_value[self.col])
                    / scale)
                    .value();
            }
        } else if basis.valid {
            // col at its lower bound produced a feasible duplicate value
            basis.col_status[self.duplicate_col] = basis.col_status[self.col];
            basis.col_status[self.col] = BasisStatus::Lower;
            debug_assert_eq!(basis.col_status[self.duplicate_col], BasisStatus::Basic);
        }
        if basis.valid {
            debug_assert!(basis.col_status[self.duplicate_col] != BasisStatus::Nonbasic);
        }

        let mip_tol = options.mip_feasibility_tolerance;
        let out_of_bounds = solution.col_value[self.duplicate_col]
            < self.duplicate_col_lower - mip_tol
            || solution.col_value[self.duplicate_col] > self.duplicate_col_upper + mip_tol
            || solution.col_value[self.col] < self.col_lower - mip_tol
            || solution.col_value[self.col] > self.col_upper + mip_tol;
        if !out_of_bounds
            && ok_residual(
                solution.col_value[self.col],
                solution.col_value[self.duplicate_col],
            )
        {
            return;
        }

        log::warn!(
            "duplicate column split infeasible: col {} = {}, duplicate {} = {}, \
             merged {merge_val}, scale {scale}, bounds [{}, {}] / [{}, {}]",
            self.col,
            solution.col_value[self.col],
            self.duplicate_col,
            solution.col_value[self.duplicate_col],
            self.col_lower,
            self.col_upper,
            self.duplicate_col_lower,
            self.duplicate_col_upper,
        );
        self.undo_fix(options, solution);

        // repair the basis after the fallback, keeping col basic if possible
        if basis.valid {
            let mut duplicate_col_basic = false;
            if self.duplicate_col_lower <= f64::NEG_INFINITY
                && self.duplicate_col_upper >= f64::INFINITY
            {
                if solution.col_value[self.duplicate_col] == 0.0 {
                    basis.col_status[self.col] = BasisStatus::Basic;
                    basis.col_status[self.duplicate_col] = BasisStatus::Zero;
                } else {
                    duplicate_col_basic = true;
                }
            } else if is_at_bound(
                solution.col_value[self.duplicate_col],
                self.duplicate_col_lower,
            ) {
                basis.col_status[self.col] = BasisStatus::Basic;
                basis.col_status[self.duplicate_col] = BasisStatus::Lower;
            } else if is_at_bound(
                solution.col_value[self.duplicate_col],
                self.duplicate_col_upper,
            ) {
                basis.col_status[self.col] = BasisStatus::Basic;
                basis.col_status[self.duplicate_col] = BasisStatus::Upper;
            } else {
                duplicate_col_basic = true;
            }

            if duplicate_col_basic {
                basis.col_status[self.duplicate_col] = BasisStatus::Basic;
                if is_at_bound(solution.col_value[self.col], self.col_lower) {
                    basis.col_status[self.col] = BasisStatus::Lower;
                } else if is_at_bound(solution.col_value[self.col], self.col_upper) {
                    basis.col_status[self.col] = BasisStatus::Upper;
                } else {
                    basis.col_status[self.col] = BasisStatus::Nonbasic;
                    log::warn!(
                        "duplicate column split left neither column at a bound; \
                         basis cannot be repaired"
                    );
                }
            }
        }
    }

    /// Validity of the merge scale given both columns' bounds and
    /// integrality. Splitting `z = x + scale * y` back onto feasible `(x, y)`
    /// is only possible for scales obeying these rules, so records with
    /// illegal scales must be rejected at creation time.
    pub fn ok_merge(&self, tolerance: f64) -> bool {
        let scale = self.col_scale;
        let x_int = self.col_integral;
        let y_int = self.duplicate_col_integral;
        let x_lo = if x_int { self.col_lower.ceil() } else { self.col_lower };
        let x_up = if x_int { self.col_upper.floor() } else { self.col_upper };
        let y_lo = if y_int {
            self.duplicate_col_lower.ceil()
        } else {
            self.duplicate_col_lower
        };
        let y_up = if y_int {
            self.duplicate_col_upper.floor()
        } else {
            self.duplicate_col_upper
        };
        let x_len = x_up - x_lo;
        let y_len = y_up - y_lo;

        let mut ok = true;
        if scale == 0.0 {
            log::warn!("duplicate column merge scale cannot be zero");
            ok = false;
        }
        let abs_scale = scale.abs();

        if x_int {
            if y_int {
                // scale must be integer: z = x + scale * y must reach every
                // integer in its range
                let int_scale = (scale + 0.5).floor();
                if (int_scale - scale).abs() > tolerance {
                    log::warn!("integer-integer merge scale {scale} is not integral");
                    ok = false;
                }
                // and |scale| <= (x_u - x_l) + 1, else integers between
                // consecutive multiples of scale are unreachable
                let scale_limit = x_len + 1.0 + tolerance;
                if abs_scale > scale_limit {
                    log::warn!(
                        "integer-integer merge scale {scale} exceeds limit {scale_limit} \
                         for x in [{x_lo}, {x_up}]"
                    );
                    ok = false;
                }
            } else {
                // scale * [y_l, y_u] must cover the unit gaps of x
                if y_len == 0.0 {
                    log::warn!(
                        "integer-continuous merge scale {scale} with degenerate \
                         y range [{y_lo}, {y_up}]"
                    );
                    ok = false;
                } else if abs_scale < 1.0 / y_len {
                    log::warn!(
                        "integer-continuous merge scale {scale} below limit {} \
                         for y in [{y_lo}, {y_up}]",
                        1.0 / y_len
                    );
                    ok = false;
                }
            }
        } else if y_int {
            // gaps between multiples of scale must not exceed the length of x
            if abs_scale > x_len {
                log::warn!(
                    "continuous-integer merge scale {scale} exceeds x range \
                     length {x_len}"
                );
                ok = false;
            }
        }

        ok
    }

    /// Exhaustive fallback for splits the direct derivation could not make
    /// feasible: walk the integer grid of the bounded integral side, or solve
    /// the continuous-continuous case at the extremal feasible duplicate
    /// value. On failure the column values are left unmodified.
    fn undo_fix(&self, options: &Options, solution: &mut Solution) {
        let mip_tol = options.mip_feasibility_tolerance;
        let primal_tol = options.primal_feasibility_tolerance;
        let is_integer = |v: f64| (v.round() - v).abs() <= mip_tol;
        let is_feasible =
            |l: f64, v: f64, u: f64| v >= l - primal_tol && v <= u + primal_tol;

        const VALUE_MAX: f64 = 1000.0;
        const EPS: f64 = 1e-8;
        const RESIDUAL_TOLERANCE: f64 = 1e-12;

        let merge_value = solution.col_value[self.col];
        let scale = self.col_scale;
        let x_int = self.col_integral;
        let y_int = self.duplicate_col_integral;
        let x_lo = if x_int { self.col_lower.ceil() } else { self.col_lower };
        let x_up = if x_int { self.col_upper.floor() } else { self.col_upper };
        let y_lo = if y_int {
            self.duplicate_col_lower.ceil()
        } else {
            self.duplicate_col_lower
        };
        let y_up = if y_int {
            self.duplicate_col_upper.floor()
        } else {
            self.duplicate_col_upper
        };
        debug_assert!(scale != 0.0);

        let mut x_v = merge_value;
        let mut y_v = 0.0;

        if x_int {
            // walk the integer grid of x towards the far bound
            let (x_0, x_d, x_1) = if x_lo <= f64::NEG_INFINITY {
                if x_up >= f64::INFINITY {
                    (0.0, 1.0, VALUE_MAX)
                } else {
                    (x_up, -1.0, -VALUE_MAX)
                }
            } else if x_up >= f64::INFINITY {
                (x_lo, 1.0, VALUE_MAX)
            } else {
                (x_lo, 1.0, x_up)
            };
            log::debug!("splitting merged column over integer grid of x ({x_0}; {x_d}; {x_1})");
            x_v = x_0;
            loop {
                y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                if is_feasible(y_lo, y_v, y_up) && (!y_int || is_integer(y_v)) {
                    break;
                }
                if x_d > 0.0 && x_v + x_d >= x_1 + EPS {
                    break;
                }
                if x_d < 0.0 && x_v + x_d <= x_1 - EPS {
                    break;
                }
                x_v += x_d;
            }
        } else if y_int {
            // walk the integer grid of y towards the far bound
            let (y_0, y_d, y_1) = if y_lo <= f64::NEG_INFINITY {
                if y_up >= f64::INFINITY {
                    (0.0, 1.0, VALUE_MAX)
                } else {
                    (y_up, -1.0, -VALUE_MAX)
                }
            } else if y_up >= f64::INFINITY {
                (y_lo, 1.0, VALUE_MAX)
            } else {
                (y_lo, 1.0, y_up)
            };
            log::debug!("splitting merged column over integer grid of y ({y_0}; {y_d}; {y_1})");
            y_v = y_0;
            loop {
                x_v = (Compensated::new(merge_value) - Compensated::new(y_v) * scale).value();
                if is_feasible(x_lo, x_v, x_up) {
                    break;
                }
                if y_d > 0.0 && y_v + y_d >= y_1 + EPS {
                    break;
                }
                if y_d < 0.0 && y_v + y_d <= y_1 - EPS {
                    break;
                }
                y_v += y_d;
            }
        } else {
            // both continuous: intersect z - scale * [y_l, y_u] with the x
            // range at the extremal feasible y
            let v_m_a_ylo = if y_lo <= f64::NEG_INFINITY {
                if scale > 0.0 {
                    f64::INFINITY
                } else {
                    f64::NEG_INFINITY
                }
            } else {
                (Compensated::new(merge_value) - Compensated::new(y_lo) * scale).value()
            };
            let v_m_a_yup = if y_up >= f64::INFINITY {
                if scale > 0.0 {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            } else {
                (Compensated::new(merge_value) - Compensated::new(y_up) * scale).value()
            };

            if scale > 0.0 {
                log::debug!("feasible x interval [{v_m_a_yup}, {v_m_a_ylo}]");
                if y_up < f64::INFINITY {
                    debug_assert!(x_up + primal_tol >= v_m_a_yup);
                    y_v = y_up;
                    x_v = v_m_a_yup;
                    if x_v < x_lo - primal_tol {
                        x_v = x_lo;
                        y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                        if y_v < y_lo - primal_tol {
                            // very tight: put x on its margin
                            x_v = x_lo - primal_tol;
                            y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                        }
                    }
                } else if y_lo > f64::NEG_INFINITY {
                    debug_assert!(x_lo - primal_tol <= v_m_a_ylo);
                    y_v = y_lo;
                    x_v = v_m_a_ylo;
                    if x_v > x_up + primal_tol {
                        x_v = x_up;
                        y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                        if y_v > y_up + primal_tol {
                            log::warn!("duplicate column split outside both ranges");
                            x_v = x_up + primal_tol;
                            y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                        }
                    }
                } else {
                    // y is free
                    x_v = x_lo.max(0.0);
                    y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                }
            } else {
                log::debug!("feasible x interval [{v_m_a_ylo}, {v_m_a_yup}]");
                if y_lo > f64::NEG_INFINITY {
                    debug_assert!(x_up + primal_tol >= v_m_a_ylo);
                    y_v = y_lo;
                    x_v = v_m_a_ylo;
                    if x_v < x_lo - primal_tol {
                        x_v = x_lo;
                        y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                        if y_v > y_up + primal_tol {
                            log::warn!("duplicate column split outside both ranges");
                            x_v = x_lo - primal_tol;
                            y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                        }
                    }
                } else if y_up < f64::INFINITY {
                    debug_assert!(x_lo - primal_tol <= v_m_a_yup);
                    y_v = y_up;
                    x_v = v_m_a_yup;
                    if x_v > x_up + primal_tol {
                        x_v = x_up;
                        y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                        if y_v < y_lo - primal_tol {
                            log::warn!("duplicate column split outside both ranges");
                            x_v = x_up + primal_tol;
                            y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                        }
                    }
                } else {
                    // y is free
                    x_v = x_lo.max(0.0);
                    y_v = ((Compensated::new(merge_value) - x_v) / scale).value();
                }
            }
        }

        let residual = (Compensated::new(x_v) + Compensated::new(y_v) * scale - merge_value)
            .abs();
        let split_ok = is_feasible(x_lo, x_v, x_up)
            && is_feasible(y_lo, y_v, y_up)
            && (!x_int || is_integer(x_v))
            && (!y_int || is_integer(y_v))
            && x_v.abs() < f64::INFINITY
            && y_v.abs() < f64::INFINITY
            && residual <= RESIDUAL_TOLERANCE;

        if !split_ok {
            log::warn!(
                "could not split merged value {merge_value} into feasible values: \
                 candidate ({x_v}, {y_v}), residual {residual:.3e}, scale {scale}, \
                 x in [{x_lo}, {x_up}], y in [{y_lo}, {y_up}]"
            );
            return;
        }

        solution.col_value[self.col] = x_v;
        solution.col_value[self.duplicate_col] = y_v;
    }

    pub(crate) fn transform_to_presolved_space(&self, primal: &mut [f64]) {
        primal[self.col] += self.col_scale * primal[self.duplicate_col];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primal_solution(col_value: Vec<f64>) -> Solution {
        Solution {
            col_value,
            ..Default::default()
        }
    }

    #[test]
    fn test_linear_transform_undo() {
        let red = LinearTransform {
            col: 0,
            scale: 2.0,
            constant: 3.0,
        };
        let mut solution = primal_solution(vec![4.0]);
        solution.col_dual = vec![0.5];
        solution.dual_valid = true;
        red.undo(&mut solution);
        assert_eq!(solution.col_value[0], 11.0);
        assert_eq!(solution.col_dual[0], 0.25);
    }

    #[test]
    fn test_linear_transform_round_trip() {
        let red = LinearTransform {
            col: 0,
            scale: 2.0,
            constant: 3.0,
        };
        let mut primal = vec![11.0];
        red.transform_to_presolved_space(&mut primal);
        assert_eq!(primal[0], 4.0);
        let mut solution = primal_solution(primal);
        red.undo(&mut solution);
        assert_eq!(solution.col_value[0], 11.0);
    }

    #[test]
    fn test_fixed_col_reduced_cost_and_status() {
        let red = FixedCol {
            col: 0,
            fix_value: 2.5,
            col_cost: 4.0,
            fix_type: BasisStatus::Nonbasic,
            col_values: vec![Nonzero::new(0, 1.0), Nonzero::new(1, 2.0)],
        };
        let mut solution = Solution {
            col_value: vec![0.0],
            col_dual: vec![0.0],
            row_value: vec![0.0; 2],
            row_dual: vec![1.0, 0.5],
            dual_valid: true,
        };
        let mut basis = Basis {
            col_status: vec![BasisStatus::Nonbasic],
            row_status: vec![BasisStatus::Basic; 2],
            valid: true,
        };
        red.undo(&mut solution, &mut basis);
        assert_eq!(solution.col_value[0], 2.5);
        // 4 - 1*1 - 2*0.5 = 2
        assert!((solution.col_dual[0] - 2.0).abs() < 1e-12);
        // Nonbasic sentinel resolves by the reduced cost sign
        assert_eq!(basis.col_status[0], BasisStatus::Lower);
    }

    #[test]
    fn test_forcing_column_picks_extremal_row() {
        // column with entries in two rows, driven towards +inf; the row
        // implying the largest value becomes nonbasic
        let red = ForcingColumn {
            col: 0,
            col_bound: 1.0,
            at_infinite_upper: true,
            col_values: vec![Nonzero::new(0, 1.0), Nonzero::new(1, 2.0)],
        };
        let mut solution = Solution {
            col_value: vec![0.0],
            col_dual: vec![3.0],
            row_value: vec![4.0, 6.0],
            row_dual: vec![0.0; 2],
            dual_valid: true,
        };
        let mut basis = Basis {
            col_status: vec![BasisStatus::Nonbasic],
            row_status: vec![BasisStatus::Basic; 2],
            valid: true,
        };
        red.undo(&mut solution, &mut basis);
        // candidates: 4/1 = 4 and 6/2 = 3; the max is 4 from row 0
        assert_eq!(solution.col_value[0], 4.0);
        assert_eq!(solution.col_dual[0], 0.0);
        assert_eq!(basis.col_status[0], BasisStatus::Basic);
        assert_eq!(basis.row_status[0], BasisStatus::Lower);
    }

    #[test]
    fn test_forcing_column_removed_row_restores_activity() {
        let red = ForcingColumnRemovedRow {
            row: 0,
            rhs: 10.0,
            row_values: vec![Nonzero::new(0, 2.0), Nonzero::new(1, 1.0)],
        };
        let mut solution = Solution {
            col_value: vec![3.0, 1.0],
            col_dual: vec![0.0; 2],
            row_value: vec![0.0],
            row_dual: vec![5.0],
            dual_valid: true,
        };
        let mut basis = Basis {
            col_status: vec![BasisStatus::Basic; 2],
            row_status: vec![BasisStatus::Nonbasic],
            valid: true,
        };
        red.undo(&mut solution, &mut basis);
        // 10 - 2*3 - 1*1 = 3
        assert_eq!(solution.row_value[0], 3.0);
        assert_eq!(solution.row_dual[0], 0.0);
        assert_eq!(basis.row_status[0], BasisStatus::Basic);
    }

    #[test]
    fn test_duplicate_column_integer_split() {
        // z = x + 2y with x in [0,3] integer, y in [0,2] integer, merged
        // value 5: the only feasible split reachable from x at its lower
        // bound is (1, 2)
        let red = DuplicateColumn {
            col: 0,
            duplicate_col: 1,
            col_scale: 2.0,
            col_lower: 0.0,
            col_upper: 3.0,
            duplicate_col_lower: 0.0,
            duplicate_col_upper: 2.0,
            col_integral: true,
            duplicate_col_integral: true,
        };
        assert!(red.ok_merge(1e-6));

        let mut solution = primal_solution(vec![5.0, 0.0]);
        let mut basis = Basis::invalid();
        red.undo(&Options::default(), &mut solution, &mut basis);
        assert_eq!(solution.col_value[0], 1.0);
        assert_eq!(solution.col_value[1], 2.0);
    }

    #[test]
    fn test_duplicate_column_enumeration_fallback() {
        // drive the grid walk directly: x = 0 gives y = 2.5 (infeasible),
        // x = 1 gives y = 2 which is integral and in range
        let red = DuplicateColumn {
            col: 0,
            duplicate_col: 1,
            col_scale: 2.0,
            col_lower: 0.0,
            col_upper: 3.0,
            duplicate_col_lower: 0.0,
            duplicate_col_upper: 2.0,
            col_integral: true,
            duplicate_col_integral: true,
        };
        let mut solution = primal_solution(vec![5.0, 0.0]);
        red.undo_fix(&Options::default(), &mut solution);
        assert_eq!(solution.col_value[0], 1.0);
        assert_eq!(solution.col_value[1], 2.0);
    }

    #[test]
    fn test_duplicate_column_nonbasic_lower_fast_path() {
        let red = DuplicateColumn {
            col: 0,
            duplicate_col: 1,
            col_scale: -1.0,
            col_lower: 1.0,
            col_upper: 4.0,
            duplicate_col_lower: -2.0,
            duplicate_col_upper: 0.0,
            col_integral: false,
            duplicate_col_integral: false,
        };
        // merged value 1 + (-1)*0 = 1, col nonbasic at lower
        let mut solution = Solution {
            col_value: vec![1.0, 0.0],
            col_dual: vec![2.0, 0.0],
            row_value: vec![],
            row_dual: vec![],
            dual_valid: true,
        };
        let mut basis = Basis {
            col_status: vec![BasisStatus::Lower, BasisStatus::Nonbasic],
            row_status: vec![],
            valid: true,
        };
        red.undo(&Options::default(), &mut solution, &mut basis);
        assert_eq!(solution.col_value[0], 1.0);
        // negative scale flips the duplicate to its upper bound
        assert_eq!(solution.col_value[1], 0.0);
        assert_eq!(basis.col_status[1], BasisStatus::Upper);
        // duplicate reduced cost is the scaled original
        assert_eq!(solution.col_dual[1], -2.0);
    }

    #[test]
    fn test_duplicate_column_ok_merge_rejects() {
        let mut red = DuplicateColumn {
            col: 0,
            duplicate_col: 1,
            col_scale: 0.0,
            col_lower: 0.0,
            col_upper: 1.0,
            duplicate_col_lower: 0.0,
            duplicate_col_upper: 1.0,
            col_integral: true,
            duplicate_col_integral: true,
        };
        assert!(!red.ok_merge(1e-6), "zero scale must be rejected");

        red.col_scale = 0.5;
        assert!(!red.ok_merge(1e-6), "fractional scale with two integers");

        red.col_scale = 3.0;
        assert!(
            !red.ok_merge(1e-6),
            "|scale| beyond (u_x - l_x) + 1 leaves unreachable integers"
        );

        red.col_scale = 2.0;
        assert!(red.ok_merge(1e-6), "binary merge with scale 2 is legal");
    }
}
