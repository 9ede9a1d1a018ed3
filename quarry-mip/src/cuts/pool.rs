//! Cut pool: curates the inequalities generated during branch-and-cut.
//!
//! The pool stores cuts `a . x <= b` in a dynamic row matrix and manages:
//! - duplicate screening through an order-dependent support hash
//! - violation-based separation with efficacy scoring
//! - parallelism filtering among selected cuts
//! - aging and eviction of cuts that stop being useful

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use quarry_core::Compensated;

use crate::cuts::cutset::CutSet;
use crate::cuts::matrix::RowMatrix;
use crate::domain::Domain;

/// Order-dependent hash of a cut's column-index sequence. Permuted supports
/// hash differently, which is fine: rows are kept column-sorted, so equal
/// supports always produce equal sequences.
fn support_hash(indices: &[usize]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for &index in indices {
        index.hash(&mut hasher);
    }
    hasher.finish()
}

/// Observer notified of every cut that enters the pool.
///
/// Notification is synchronous on the calling thread; implementations must
/// not re-enter the pool. The pool holds weak references and drops
/// observers whose owner has gone away.
pub trait CutPoolObserver {
    /// Called after the cut with pool id `cut` was added.
    fn cut_added(&self, cut: usize);
}

/// Cut pool settings.
#[derive(Debug, Clone)]
pub struct CutPoolSettings {
    /// Rounds a dormant cut may go unselected before eviction.
    pub age_limit: i32,

    /// Maximum pairwise parallelism among cuts selected in one round.
    pub max_selection_parallelism: f64,

    /// Two same-support cuts with parallelism at least `1 - this` are
    /// duplicates.
    pub duplicate_tolerance: f64,

    /// Weight of the sparsity bonus in the efficacy score.
    pub sparsity_weight: f64,
}

impl Default for CutPoolSettings {
    fn default() -> Self {
        Self {
            age_limit: 30,
            max_selection_parallelism: 0.1,
            duplicate_tolerance: 1e-6,
            sparsity_weight: 1e-2,
        }
    }
}

/// Pool of cuts generated during branch-and-cut.
pub struct CutPool {
    matrix: RowMatrix,

    /// Right-hand side per cut.
    rhs: Vec<f64>,

    /// Age per cut: -1 while the cut is installed in the LP, otherwise the
    /// number of rounds it has gone unselected.
    ages: Vec<i32>,

    /// Monotone per-cut counter, bumped on every state change; external
    /// caches key on it.
    modification: Vec<u64>,

    /// `1 / ||a||_2` per cut, computed once at insertion; zero for removed
    /// cuts.
    norm_inv: Vec<f64>,

    /// Largest absolute coefficient per cut.
    max_abs: Vec<f64>,

    /// Whether all coefficients and the rhs are integral.
    integral: Vec<bool>,

    /// support hash -> cut ids with that support hash
    support_map: HashMap<u64, Vec<usize>>,

    observers: Vec<Weak<dyn CutPoolObserver>>,

    /// Completed separation rounds; keeps the effective age limit lenient
    /// in early rounds.
    sepa_rounds: usize,

    settings: CutPoolSettings,
}

impl CutPool {
    /// An empty pool with the given settings.
    pub fn new(settings: CutPoolSettings) -> Self {
        Self {
            matrix: RowMatrix::new(),
            rhs: Vec::new(),
            ages: Vec::new(),
            modification: Vec::new(),
            norm_inv: Vec::new(),
            max_abs: Vec::new(),
            integral: Vec::new(),
            support_map: HashMap::new(),
            observers: Vec::new(),
            sepa_rounds: 0,
            settings,
        }
    }

    /// Register an observer; the pool keeps only a weak reference.
    pub fn add_observer(&mut self, observer: &Rc<dyn CutPoolObserver>) {
        self.observers.push(Rc::downgrade(observer));
    }

    /// Unregister an observer previously passed to
    /// [`add_observer`](Self::add_observer).
    pub fn remove_observer(&mut self, observer: &Rc<dyn CutPoolObserver>) {
        self.observers.retain(|weak| match weak.upgrade() {
            Some(alive) => !Rc::ptr_eq(&alive, observer),
            None => false,
        });
    }

    /// Add the cut `values . x <= rhs` with support `indices` (strictly
    /// ascending). Returns the new cut's id, or `None` if an existing cut
    /// with the same support is near-parallel to it.
    pub fn add_cut(
        &mut self,
        indices: &[usize],
        values: &[f64],
        rhs: f64,
        integral: bool,
    ) -> Option<usize> {
        debug_assert_eq!(indices.len(), values.len());
        debug_assert!(!indices.is_empty());
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));

        let hash = support_hash(indices);

        // 1/||a|| is computed once per cut, so spend the compensated
        // arithmetic to get it as accurate as possible
        let mut norm = Compensated::default();
        let mut max_abs: f64 = 0.0;
        for &value in values {
            norm.add_product(value, value);
            max_abs = max_abs.max(value.abs());
        }
        norm.renormalize();
        let norm_inv = 1.0 / norm.value().sqrt();

        if self.is_duplicate(hash, norm_inv, indices, values) {
            return None;
        }

        let row = self.matrix.add_row(indices, values);
        self.support_map.entry(hash).or_default().push(row);

        debug_assert_eq!(row, self.rhs.len());
        self.rhs.push(rhs);
        self.ages.push(0);
        self.integral.push(integral);
        self.modification.push(1);
        self.norm_inv.push(norm_inv);
        self.max_abs.push(max_abs);

        self.notify_cut_added(row);

        Some(row)
    }

    /// Whether an existing cut with identical support is near-parallel to
    /// the candidate. Stale support-map entries of evicted cuts fail the
    /// length test against the tombstoned row and are skipped.
    fn is_duplicate(
        &self,
        hash: u64,
        norm_inv: f64,
        indices: &[usize],
        values: &[f64],
    ) -> bool {
        let Some(bucket) = self.support_map.get(&hash) else {
            return false;
        };

        for &row in bucket {
            if self.matrix.row_len(row) != indices.len() {
                continue;
            }
            if self.matrix.row_indices(row) != indices {
                continue;
            }

            let mut dotprod = Compensated::default();
            for (&value, &row_value) in values.iter().zip(self.matrix.row_values(row)) {
                dotprod.add_product(value, row_value);
            }

            let parallelism = dotprod.value() * self.norm_inv[row] * norm_inv;
            if parallelism >= 1.0 - self.settings.duplicate_tolerance {
                return true;
            }
        }

        false
    }

    /// Cosine similarity of two cuts' coefficient vectors, via merge
    /// traversal of the sorted index runs. Zero for removed cuts.
    pub fn get_parallelism(&self, row1: usize, row2: usize) -> f64 {
        let indices1 = self.matrix.row_indices(row1);
        let values1 = self.matrix.row_values(row1);
        let indices2 = self.matrix.row_indices(row2);
        let values2 = self.matrix.row_values(row2);

        let mut dotprod = 0.0;
        let mut i1 = 0;
        let mut i2 = 0;
        while i1 != indices1.len() && i2 != indices2.len() {
            if indices1[i1] < indices2[i2] {
                i1 += 1;
            } else if indices2[i2] < indices1[i1] {
                i2 += 1;
            } else {
                dotprod += values1[i1] * values2[i2];
                i1 += 1;
                i2 += 1;
            }
        }

        dotprod * self.norm_inv[row1] * self.norm_inv[row2]
    }

    /// The LP dropped this cut; make it eligible for separation again, but
    /// not pristine.
    pub fn lp_cut_removed(&mut self, cut: usize) {
        self.ages[cut] = 1;
    }

    /// Age every dormant cut and evict those beyond the age limit.
    ///
    /// Eviction leaves the support-map entry stale; the duplicate screen
    /// tolerates it and the next separation-time eviction cleans up.
    pub fn perform_aging(&mut self) {
        let mut evicted = 0usize;
        for row in 0..self.matrix.num_rows() {
            if self.ages[row] < 0 {
                continue;
            }
            self.ages[row] += 1;
            if self.ages[row] > self.settings.age_limit {
                self.modification[row] += 1;
                self.matrix.remove_row(row);
                self.ages[row] = -1;
                self.rhs[row] = f64::INFINITY;
                self.norm_inv[row] = 0.0;
                evicted += 1;
            }
        }
        if evicted > 0 {
            log::debug!("aging evicted {evicted} cuts");
        }
    }

    /// Separate the pool against the LP solution `sol`.
    ///
    /// Violated cuts are scored by efficacy (violation per unit of
    /// effective norm plus a sparsity bonus), filtered so that no two
    /// selected cuts have parallelism above the configured maximum, and
    /// emitted into `cutset` in CSR layout in selection order. Cuts not
    /// violated are aged and possibly evicted.
    pub fn separate(
        &mut self,
        sol: &[f64],
        domain: &Domain,
        cutset: &mut CutSet,
        feastol: f64,
    ) {
        debug_assert!(cutset.is_empty());

        // lenient limit in early rounds: a cut may not be evicted before as
        // many rounds have passed as its age
        let age_limit = (self.sepa_rounds as i32).min(self.settings.age_limit);
        self.sepa_rounds += 1;

        let num_rows = self.matrix.num_rows();
        let mut efficacious_cuts: Vec<(f64, usize)> = Vec::new();

        for row in 0..num_rows {
            // cuts with an age of -1 are already in the LP
            if self.ages[row] < 0 {
                continue;
            }

            let mut viol = Compensated::new(-self.rhs[row]);
            for (col, value) in self.matrix.row_entries(row) {
                viol.add_product(value, sol[col]);
            }

            if viol.value() <= feastol {
                self.ages[row] += 1;
                if self.ages[row] >= age_limit {
                    self.evict(row);
                }
                continue;
            }

            // compute the norm only over entries not sitting at their
            // minimal activity in sol; otherwise a cut that dominates a
            // simpler cut by carrying extra zero-activity terms would score
            // below it
            let mut row_norm = Compensated::default();
            for (col, value) in self.matrix.row_entries(row) {
                let contributes = if value > 0.0 {
                    sol[col] - feastol > domain.col_lower[col]
                } else {
                    sol[col] + feastol < domain.col_upper[col]
                };
                if contributes {
                    row_norm.add_product(value, value);
                }
            }

            let sparsity =
                1.0 - self.matrix.row_len(row) as f64 / domain.num_cols() as f64;
            self.ages[row] = 0;
            let efficacy = self.settings.sparsity_weight * sparsity
                + (viol / row_norm.value().sqrt()).value();

            efficacious_cuts.push((efficacy, row));
        }

        // descending efficacy, ties broken by ascending id for determinism
        efficacious_cuts.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.cmp(&b.1))
        });

        let mut selected_nnz = 0;
        for &(_, candidate) in &efficacious_cuts {
            let discard = cutset.cut_indices.iter().any(|&selected| {
                self.get_parallelism(selected, candidate)
                    > self.settings.max_selection_parallelism
            });
            if discard {
                continue;
            }

            self.ages[candidate] = -1;
            cutset.cut_indices.push(candidate);
            selected_nnz += self.matrix.row_len(candidate);
        }

        cutset.resize(selected_nnz);

        let mut offset = 0;
        for i in 0..cutset.num_cuts() {
            cutset.ar_start[i] = offset;
            let cut = cutset.cut_indices[i];
            cutset.upper[i] = self.rhs[cut];
            for (col, value) in self.matrix.row_entries(cut) {
                cutset.ar_index[offset] = col;
                cutset.ar_value[offset] = value;
                offset += 1;
            }
        }
        let num_cuts = cutset.num_cuts();
        cutset.ar_start[num_cuts] = offset;
        debug_assert_eq!(offset, selected_nnz);

        log::debug!(
            "separation round {}: {} violated, {} selected",
            self.sepa_rounds,
            efficacious_cuts.len(),
            cutset.num_cuts()
        );
    }

    /// Evict a dormant cut during separation, cleaning up its support-map
    /// entry eagerly.
    fn evict(&mut self, row: usize) {
        let hash = support_hash(self.matrix.row_indices(row));
        self.modification[row] += 1;
        self.matrix.remove_row(row);
        self.ages[row] = -1;
        self.rhs[row] = 0.0;
        self.norm_inv[row] = 0.0;

        let bucket_empty = match self.support_map.get_mut(&hash) {
            Some(bucket) => {
                if let Some(pos) = bucket.iter().position(|&r| r == row) {
                    bucket.swap_remove(pos);
                }
                bucket.is_empty()
            }
            None => false,
        };
        if bucket_empty {
            self.support_map.remove(&hash);
        }
    }

    fn notify_cut_added(&mut self, row: usize) {
        self.observers.retain(|weak| match weak.upgrade() {
            Some(observer) => {
                observer.cut_added(row);
                true
            }
            None => false,
        });
    }

    /// Number of cut ids ever allocated, including evicted ones.
    pub fn num_rows(&self) -> usize {
        self.matrix.num_rows()
    }

    /// Right-hand side of a cut.
    pub fn rhs(&self, cut: usize) -> f64 {
        self.rhs[cut]
    }

    /// Age of a cut; -1 while it is installed in the LP.
    pub fn age(&self, cut: usize) -> i32 {
        self.ages[cut]
    }

    /// Whether all coefficients and the rhs of a cut are integral.
    pub fn is_integral(&self, cut: usize) -> bool {
        self.integral[cut]
    }

    /// Monotone modification counter of a cut, for external cache
    /// invalidation.
    pub fn modification_count(&self, cut: usize) -> u64 {
        self.modification[cut]
    }

    /// Largest absolute coefficient of a cut.
    pub fn max_abs_coef(&self, cut: usize) -> f64 {
        self.max_abs[cut]
    }

    /// The underlying row matrix.
    pub fn matrix(&self) -> &RowMatrix {
        &self.matrix
    }
}
