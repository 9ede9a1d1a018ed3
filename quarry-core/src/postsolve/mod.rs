//! Postsolve stack: records presolve reductions and reverses them.
//!
//! Presolve pushes one record per reduction as it shrinks the problem; after
//! the reduced problem is solved, [`PostsolveStack::undo`] replays the log in
//! reverse, mutating a [`Solution`]/[`Basis`] pair until they describe the
//! original problem. Each record stores the minimal data needed for its own
//! inversion, including the matrix entries that were removed from the
//! reduced problem at the moment of reduction.
//!
//! Indices passed to the `push_*` methods are in the *current* (reduced)
//! space; the stack translates them to original indices through its index
//! maps, so the records themselves always speak original coordinates.

mod cols;
mod rows;
mod solution;
mod substitution;

pub use cols::{
    DuplicateColumn, FixedCol, ForcingColumn, ForcingColumnRemovedRow, LinearTransform,
};
pub use rows::{DuplicateRow, ForcingRow, RedundantRow, SingletonRow};
pub use solution::{Basis, BasisStatus, RowType, Solution};
pub use substitution::{
    DoubletonEquation, EqualityRowAddition, EqualityRowAdditions, FreeColSubstitution,
};

use thiserror::Error;

use crate::options::Options;

/// A single matrix entry captured at the moment a reduction removed it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nonzero {
    /// Row or column index, depending on the storing record.
    pub index: usize,

    /// Coefficient value.
    pub value: f64,
}

impl Nonzero {
    /// A captured entry.
    pub fn new(index: usize, value: f64) -> Self {
        Self { index, value }
    }
}

/// Errors surfaced by the postsolve entry points.
#[derive(Error, Debug)]
pub enum PostsolveError {
    /// A caller-supplied vector does not match the reduced problem's size.
    #[error("solution has {got} {what} but the reduced problem has {expected}")]
    DimensionMismatch {
        /// Which vector mismatched.
        what: &'static str,
        /// Length supplied by the caller.
        got: usize,
        /// Length implied by the index maps.
        expected: usize,
    },
}

/// One recorded presolve reduction.
#[derive(Debug, Clone)]
enum Reduction {
    LinearTransform(LinearTransform),
    FreeColSubstitution(FreeColSubstitution),
    DoubletonEquation(DoubletonEquation),
    EqualityRowAddition(EqualityRowAddition),
    EqualityRowAdditions(EqualityRowAdditions),
    SingletonRow(SingletonRow),
    FixedCol(FixedCol),
    RedundantRow(RedundantRow),
    ForcingRow(ForcingRow),
    ForcingColumn(ForcingColumn),
    ForcingColumnRemovedRow(ForcingColumnRemovedRow),
    DuplicateRow(DuplicateRow),
    DuplicateColumn(DuplicateColumn),
}

/// Append-only log of presolve reductions with index-map maintenance.
#[derive(Debug, Clone, Default)]
pub struct PostsolveStack {
    reductions: Vec<Reduction>,
    orig_num_row: usize,
    orig_num_col: usize,
    /// current row index -> original row index
    orig_row_index: Vec<usize>,
    /// current column index -> original column index
    orig_col_index: Vec<usize>,
    /// per original column: still eligible for linear substitution
    linearly_transformable: Vec<bool>,
}

impl PostsolveStack {
    /// An empty stack; call [`initialize_index_maps`](Self::initialize_index_maps)
    /// before pushing reductions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity mappings for a problem of the given original dimensions.
    pub fn initialize_index_maps(&mut self, num_row: usize, num_col: usize) {
        self.orig_num_row = num_row;
        self.orig_num_col = num_col;
        self.orig_row_index = (0..num_row).collect();
        self.orig_col_index = (0..num_col).collect();
        self.linearly_transformable = vec![true; num_col];
    }

    /// Compress the index maps after presolve renumbered rows and columns.
    ///
    /// `new_row_index[i]` is the new index of current row `i`, or `None` if
    /// the row was dropped; columns work the same way.
    pub fn compress_index_maps(
        &mut self,
        new_row_index: &[Option<usize>],
        new_col_index: &[Option<usize>],
    ) {
        let mut num_row = self.orig_row_index.len();
        for (i, &new_index) in new_row_index.iter().enumerate() {
            match new_index {
                None => num_row -= 1,
                Some(new_index) => self.orig_row_index[new_index] = self.orig_row_index[i],
            }
        }
        self.orig_row_index.truncate(num_row);

        let mut num_col = self.orig_col_index.len();
        for (i, &new_index) in new_col_index.iter().enumerate() {
            match new_index {
                None => num_col -= 1,
                Some(new_index) => self.orig_col_index[new_index] = self.orig_col_index[i],
            }
        }
        self.orig_col_index.truncate(num_col);
    }

    /// Number of rows in the original problem.
    pub fn original_num_row(&self) -> usize {
        self.orig_num_row
    }

    /// Number of columns in the original problem.
    pub fn original_num_col(&self) -> usize {
        self.orig_num_col
    }

    /// Number of recorded reductions.
    pub fn num_reductions(&self) -> usize {
        self.reductions.len()
    }

    /// Whether no reduction has been recorded.
    pub fn is_empty(&self) -> bool {
        self.reductions.is_empty()
    }

    /// Whether the (current-space) column is still eligible for linear
    /// substitution.
    pub fn is_col_linearly_transformable(&self, col: usize) -> bool {
        self.linearly_transformable[self.orig_col_index[col]]
    }

    /// Withdraw a column's eligibility for linear substitution.
    pub fn mark_col_nontransformable(&mut self, col: usize) {
        self.linearly_transformable[self.orig_col_index[col]] = false;
    }

    fn map_col_entries(
        &self,
        entries: impl IntoIterator<Item = (usize, f64)>,
    ) -> Vec<Nonzero> {
        entries
            .into_iter()
            .map(|(row, value)| Nonzero::new(self.orig_row_index[row], value))
            .collect()
    }

    fn map_row_entries(
        &self,
        entries: impl IntoIterator<Item = (usize, f64)>,
    ) -> Vec<Nonzero> {
        entries
            .into_iter()
            .map(|(col, value)| Nonzero::new(self.orig_col_index[col], value))
            .collect()
    }

    /// Record `x_orig = scale * x_pre + constant` for a column.
    pub fn push_linear_transform(&mut self, col: usize, scale: f64, constant: f64) {
        debug_assert!(scale != 0.0);
        debug_assert!(self.is_col_linearly_transformable(col));
        self.reductions.push(Reduction::LinearTransform(LinearTransform {
            col: self.orig_col_index[col],
            scale,
            constant,
        }));
    }

    /// Record the substitution of a free column out of an equation row.
    ///
    /// `row_values` are the row's entries (column-indexed, including `col`);
    /// `col_values` are the column's entries (row-indexed).
    pub fn push_free_col_substitution(
        &mut self,
        row: usize,
        col: usize,
        rhs: f64,
        col_cost: f64,
        row_type: RowType,
        row_values: impl IntoIterator<Item = (usize, f64)>,
        col_values: impl IntoIterator<Item = (usize, f64)>,
    ) {
        let record = FreeColSubstitution {
            row: self.orig_row_index[row],
            col: self.orig_col_index[col],
            rhs,
            col_cost,
            row_type,
            row_values: self.map_row_entries(row_values),
            col_values: self.map_col_entries(col_values),
        };
        self.linearly_transformable[record.col] = false;
        self.reductions.push(Reduction::FreeColSubstitution(record));
    }

    /// Record the substitution of `col_subst` through the doubleton equation
    /// `coef * col + coef_subst * col_subst = rhs`.
    ///
    /// `row` is `None` when the equation row was already removed and only the
    /// primal value can be recovered. `col_subst_values` are the substituted
    /// column's entries (row-indexed).
    pub fn push_doubleton_equation(
        &mut self,
        row: Option<usize>,
        col: usize,
        col_subst: usize,
        coef: f64,
        coef_subst: f64,
        rhs: f64,
        subst_cost: f64,
        lower_tightened: bool,
        upper_tightened: bool,
        col_subst_values: impl IntoIterator<Item = (usize, f64)>,
    ) {
        let record = DoubletonEquation {
            row: row.map(|r| self.orig_row_index[r]),
            col: self.orig_col_index[col],
            col_subst: self.orig_col_index[col_subst],
            coef,
            coef_subst,
            rhs,
            subst_cost,
            lower_tightened,
            upper_tightened,
            col_subst_values: self.map_col_entries(col_subst_values),
        };
        self.linearly_transformable[record.col] = false;
        self.linearly_transformable[record.col_subst] = false;
        self.reductions.push(Reduction::DoubletonEquation(record));
    }

    /// Record the addition of `eq_row_scale` times equality row
    /// `added_eq_row` to `row`.
    pub fn push_equality_row_addition(
        &mut self,
        row: usize,
        added_eq_row: usize,
        eq_row_scale: f64,
        eq_row_values: impl IntoIterator<Item = (usize, f64)>,
    ) {
        self.reductions
            .push(Reduction::EqualityRowAddition(EqualityRowAddition {
                row: self.orig_row_index[row],
                added_eq_row: self.orig_row_index[added_eq_row],
                eq_row_scale,
                eq_row_values: self.map_row_entries(eq_row_values),
            }));
    }

    /// Record the addition of an equality row to several target rows, each
    /// with its own scale.
    pub fn push_equality_row_additions(
        &mut self,
        added_eq_row: usize,
        eq_row_values: impl IntoIterator<Item = (usize, f64)>,
        target_rows: impl IntoIterator<Item = (usize, f64)>,
    ) {
        let target_rows = target_rows
            .into_iter()
            .map(|(row, scale)| Nonzero::new(self.orig_row_index[row], scale))
            .collect();
        self.reductions
            .push(Reduction::EqualityRowAdditions(EqualityRowAdditions {
                added_eq_row: self.orig_row_index[added_eq_row],
                eq_row_values: self.map_row_entries(eq_row_values),
                target_rows,
            }));
    }

    /// Record the removal of the singleton row `coef * col`.
    pub fn push_singleton_row(
        &mut self,
        row: usize,
        col: usize,
        coef: f64,
        col_lower_tightened: bool,
        col_upper_tightened: bool,
    ) {
        self.reductions.push(Reduction::SingletonRow(SingletonRow {
            row: self.orig_row_index[row],
            col: self.orig_col_index[col],
            coef,
            col_lower_tightened,
            col_upper_tightened,
        }));
    }

    /// Record a column fixed at `fix_value`; `col_values` are its matrix
    /// entries (row-indexed).
    pub fn push_fixed_col(
        &mut self,
        col: usize,
        fix_value: f64,
        col_cost: f64,
        fix_type: BasisStatus,
        col_values: impl IntoIterator<Item = (usize, f64)>,
    ) {
        let record = FixedCol {
            col: self.orig_col_index[col],
            fix_value,
            col_cost,
            fix_type,
            col_values: self.map_col_entries(col_values),
        };
        self.reductions.push(Reduction::FixedCol(record));
    }

    /// Record the removal of a redundant row.
    pub fn push_redundant_row(&mut self, row: usize) {
        self.reductions.push(Reduction::RedundantRow(RedundantRow {
            row: self.orig_row_index[row],
        }));
    }

    /// Record the removal of a forcing row; `row_values` are its entries
    /// (column-indexed).
    pub fn push_forcing_row(
        &mut self,
        row: usize,
        row_type: RowType,
        row_values: impl IntoIterator<Item = (usize, f64)>,
    ) {
        self.reductions.push(Reduction::ForcingRow(ForcingRow {
            row: self.orig_row_index[row],
            row_type,
            row_values: self.map_row_entries(row_values),
        }));
    }

    /// Record a column driven to `col_bound`; `col_values` are its entries
    /// (row-indexed).
    pub fn push_forcing_column(
        &mut self,
        col: usize,
        col_bound: f64,
        at_infinite_upper: bool,
        col_values: impl IntoIterator<Item = (usize, f64)>,
    ) {
        self.reductions.push(Reduction::ForcingColumn(ForcingColumn {
            col: self.orig_col_index[col],
            col_bound,
            at_infinite_upper,
            col_values: self.map_col_entries(col_values),
        }));
    }

    /// Record a row removed together with a forcing column; `row_values` are
    /// its entries (column-indexed).
    pub fn push_forcing_column_removed_row(
        &mut self,
        row: usize,
        rhs: f64,
        row_values: impl IntoIterator<Item = (usize, f64)>,
    ) {
        self.reductions
            .push(Reduction::ForcingColumnRemovedRow(ForcingColumnRemovedRow {
                row: self.orig_row_index[row],
                rhs,
                row_values: self.map_row_entries(row_values),
            }));
    }

    /// Record the removal of `duplicate_row = scale * row`.
    pub fn push_duplicate_row(
        &mut self,
        row: usize,
        duplicate_row: usize,
        scale: f64,
        row_upper_tightened: bool,
        row_lower_tightened: bool,
    ) {
        self.reductions.push(Reduction::DuplicateRow(DuplicateRow {
            row: self.orig_row_index[row],
            duplicate_row: self.orig_row_index[duplicate_row],
            scale,
            row_upper_tightened,
            row_lower_tightened,
        }));
    }

    /// Record the merge of `duplicate_col` into `col` as
    /// `z = col + col_scale * duplicate_col`.
    ///
    /// The scale must satisfy [`DuplicateColumn::ok_merge`] for the merge to
    /// be invertible onto feasible values.
    pub fn push_duplicate_column(
        &mut self,
        col: usize,
        duplicate_col: usize,
        col_scale: f64,
        col_lower: f64,
        col_upper: f64,
        duplicate_col_lower: f64,
        duplicate_col_upper: f64,
        col_integral: bool,
        duplicate_col_integral: bool,
        mip_feasibility_tolerance: f64,
    ) {
        let record = DuplicateColumn {
            col: self.orig_col_index[col],
            duplicate_col: self.orig_col_index[duplicate_col],
            col_scale,
            col_lower,
            col_upper,
            duplicate_col_lower,
            duplicate_col_upper,
            col_integral,
            duplicate_col_integral,
        };
        debug_assert!(record.ok_merge(mip_feasibility_tolerance));
        self.linearly_transformable[record.col] = false;
        self.linearly_transformable[record.duplicate_col] = false;
        self.reductions.push(Reduction::DuplicateColumn(record));
    }

    /// Undo every recorded reduction in reverse order, lifting the reduced
    /// solution and basis into the original problem's space. The log is
    /// drained; the stack is empty afterwards.
    pub fn undo(
        &mut self,
        options: &Options,
        solution: &mut Solution,
        basis: &mut Basis,
    ) -> Result<(), PostsolveError> {
        self.check_reduced_dimensions(solution, basis)?;

        // scatter reduced-space entries to their original positions; going
        // back to front is safe because orig_index[i] >= i
        expand_values(&mut solution.col_value, &self.orig_col_index, self.orig_num_col);
        expand_values(&mut solution.row_value, &self.orig_row_index, self.orig_num_row);
        if solution.dual_valid {
            expand_values(&mut solution.col_dual, &self.orig_col_index, self.orig_num_col);
            expand_values(&mut solution.row_dual, &self.orig_row_index, self.orig_num_row);
        }
        if basis.valid {
            expand_statuses(&mut basis.col_status, &self.orig_col_index, self.orig_num_col);
            expand_statuses(&mut basis.row_status, &self.orig_row_index, self.orig_num_row);
        }

        for reduction in self.reductions.drain(..).rev() {
            match reduction {
                Reduction::LinearTransform(r) => r.undo(solution),
                Reduction::FreeColSubstitution(r) => r.undo(solution, basis),
                Reduction::DoubletonEquation(r) => r.undo(options, solution, basis),
                Reduction::EqualityRowAddition(r) => r.undo(solution, basis),
                Reduction::EqualityRowAdditions(r) => r.undo(solution, basis),
                Reduction::SingletonRow(r) => r.undo(options, solution, basis),
                Reduction::FixedCol(r) => r.undo(solution, basis),
                Reduction::RedundantRow(r) => r.undo(solution, basis),
                Reduction::ForcingRow(r) => r.undo(solution, basis),
                Reduction::ForcingColumn(r) => r.undo(solution, basis),
                Reduction::ForcingColumnRemovedRow(r) => r.undo(solution, basis),
                Reduction::DuplicateRow(r) => r.undo(options, solution, basis),
                Reduction::DuplicateColumn(r) => r.undo(options, solution, basis),
            }
        }

        Ok(())
    }

    /// Project an original-space primal into the presolved space, applying
    /// the records that transform variables in insertion order and then
    /// gathering the surviving columns. Used for warm starts.
    pub fn transform_to_presolved_space(
        &self,
        primal: &mut Vec<f64>,
    ) -> Result<(), PostsolveError> {
        if primal.len() != self.orig_num_col {
            return Err(PostsolveError::DimensionMismatch {
                what: "column values",
                got: primal.len(),
                expected: self.orig_num_col,
            });
        }

        for reduction in &self.reductions {
            match reduction {
                Reduction::LinearTransform(r) => r.transform_to_presolved_space(primal),
                Reduction::DuplicateColumn(r) => r.transform_to_presolved_space(primal),
                _ => {}
            }
        }

        // gather the surviving columns; orig_col_index[i] >= i makes the
        // forward pass safe
        for i in 0..self.orig_col_index.len() {
            primal[i] = primal[self.orig_col_index[i]];
        }
        primal.truncate(self.orig_col_index.len());

        Ok(())
    }

    fn check_reduced_dimensions(
        &self,
        solution: &Solution,
        basis: &Basis,
    ) -> Result<(), PostsolveError> {
        let num_col = self.orig_col_index.len();
        let num_row = self.orig_row_index.len();

        let check = |what: &'static str, got: usize, expected: usize| {
            if got == expected {
                Ok(())
            } else {
                Err(PostsolveError::DimensionMismatch {
                    what,
                    got,
                    expected,
                })
            }
        };

        check("column values", solution.col_value.len(), num_col)?;
        check("row values", solution.row_value.len(), num_row)?;
        if solution.dual_valid {
            check("column duals", solution.col_dual.len(), num_col)?;
            check("row duals", solution.row_dual.len(), num_row)?;
        }
        if basis.valid {
            check("column statuses", basis.col_status.len(), num_col)?;
            check("row statuses", basis.row_status.len(), num_row)?;
        }
        Ok(())
    }
}

fn expand_values(values: &mut Vec<f64>, orig_index: &[usize], orig_len: usize) {
    values.resize(orig_len, 0.0);
    for i in (0..orig_index.len()).rev() {
        debug_assert!(orig_index[i] >= i);
        values[orig_index[i]] = values[i];
    }
}

fn expand_statuses(statuses: &mut Vec<BasisStatus>, orig_index: &[usize], orig_len: usize) {
    statuses.resize(orig_len, BasisStatus::Nonbasic);
    for i in (0..orig_index.len()).rev() {
        debug_assert!(orig_index[i] >= i);
        statuses[orig_index[i]] = statuses[i];
    }
}
