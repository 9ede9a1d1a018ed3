//! Selected-cut output in CSR layout.

use sprs::CsMat;

/// Cuts selected by a separation round, in CSR layout.
///
/// Row `i` of the cut matrix spans `ar_index[ar_start[i]..ar_start[i + 1]]`
/// and `ar_value[..]` with right-hand side `upper[i]`; `cut_indices[i]` is
/// the pool id of the cut, in selection order. The layout invariant is
/// `ar_start[num_cuts()] == nnz()`.
#[derive(Debug, Clone, Default)]
pub struct CutSet {
    /// Pool ids of the selected cuts, in selection order.
    pub cut_indices: Vec<usize>,

    /// Row start offsets, one past the end for the last row.
    pub ar_start: Vec<usize>,

    /// Column indices, ascending within each row.
    pub ar_index: Vec<usize>,

    /// Coefficients, parallel to `ar_index`.
    pub ar_value: Vec<f64>,

    /// Right-hand side per cut.
    pub upper: Vec<f64>,
}

impl CutSet {
    /// An empty cut set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of selected cuts.
    pub fn num_cuts(&self) -> usize {
        self.cut_indices.len()
    }

    /// Total number of non-zeros across the selected cuts.
    pub fn nnz(&self) -> usize {
        self.ar_index.len()
    }

    /// Whether no cut is selected.
    pub fn is_empty(&self) -> bool {
        self.cut_indices.is_empty()
    }

    /// Drop all cuts, keeping allocations.
    pub fn clear(&mut self) {
        self.cut_indices.clear();
        self.ar_start.clear();
        self.ar_index.clear();
        self.ar_value.clear();
        self.upper.clear();
    }

    /// Size the CSR arrays for the already-chosen `cut_indices` and the
    /// given non-zero total.
    pub(crate) fn resize(&mut self, nnz: usize) {
        let num_cuts = self.cut_indices.len();
        self.ar_start.resize(num_cuts + 1, 0);
        self.ar_index.resize(nnz, 0);
        self.ar_value.resize(nnz, 0.0);
        self.upper.resize(num_cuts, 0.0);
    }

    /// The selected cuts as a `num_cuts x num_cols` sparse matrix.
    pub fn to_csmat(&self, num_cols: usize) -> CsMat<f64> {
        CsMat::new(
            (self.num_cuts(), num_cols),
            self.ar_start.clone(),
            self.ar_index.clone(),
            self.ar_value.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_layout_and_export() {
        let cutset = CutSet {
            cut_indices: vec![3, 1],
            ar_start: vec![0, 2, 4],
            ar_index: vec![0, 1, 1, 2],
            ar_value: vec![1.0, 1.0, 2.0, -1.0],
            upper: vec![1.0, 4.0],
        };

        assert_eq!(cutset.num_cuts(), 2);
        assert_eq!(cutset.nnz(), 4);
        assert_eq!(cutset.ar_start[cutset.num_cuts()], cutset.nnz());

        let m = cutset.to_csmat(3);
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.get(0, 1), Some(&1.0));
        assert_eq!(m.get(1, 2), Some(&-1.0));
    }
}
