//! Column-bound view consumed by separation.

/// Lower and upper bounds for every column of the LP relaxation.
///
/// Separation reads the bounds to decide which coefficients sit at their
/// minimal activity in the current solution; it never mutates them. Domain
/// propagation engines own the live bounds and hand a view to the pool.
#[derive(Debug, Clone)]
pub struct Domain {
    /// Lower bound per column.
    pub col_lower: Vec<f64>,

    /// Upper bound per column.
    pub col_upper: Vec<f64>,
}

impl Domain {
    /// A domain from explicit bound arrays.
    pub fn new(col_lower: Vec<f64>, col_upper: Vec<f64>) -> Self {
        debug_assert_eq!(col_lower.len(), col_upper.len());
        Self {
            col_lower,
            col_upper,
        }
    }

    /// A domain with every column free.
    pub fn unbounded(num_cols: usize) -> Self {
        Self {
            col_lower: vec![f64::NEG_INFINITY; num_cols],
            col_upper: vec![f64::INFINITY; num_cols],
        }
    }

    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.col_lower.len()
    }
}
