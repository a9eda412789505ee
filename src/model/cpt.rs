//! Conditional probability tables over binary variables.
//!
//! A CPT owns one row per parent configuration; each row is the
//! distribution of the child over `{absent, present}` and must sum to 1
//! within floating tolerance. Parent configurations are indexed
//! mixed-radix with the first parent most significant, matching the
//! factor tuple order `[parents..., child]`.

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::ModelBuildError;

/// Tolerance for the per-row sum-to-1 invariant.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// A binary-domain conditional probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpt {
    parents: Vec<EntityId>,
    rows: Vec<[f64; 2]>,
}

impl Cpt {
    /// A parentless table holding the prior `P(present) = p`.
    #[must_use]
    pub fn prior(p: f64) -> Self {
        Self {
            parents: Vec::new(),
            rows: vec![[1.0 - p, p]],
        }
    }

    /// Builds a table from explicit rows, one per parent configuration.
    #[must_use]
    pub fn new(parents: Vec<EntityId>, rows: Vec<[f64; 2]>) -> Self {
        Self { parents, rows }
    }

    /// The direct parents, in tuple order.
    #[must_use]
    pub fn parents(&self) -> &[EntityId] {
        &self.parents
    }

    /// All rows, indexed by parent configuration.
    #[must_use]
    pub fn rows(&self) -> &[[f64; 2]] {
        &self.rows
    }

    /// `P(child = present | parents = config)`.
    ///
    /// `config` encodes parent states with the first parent as the most
    /// significant bit. Out-of-range configurations return 0.
    #[must_use]
    pub fn present_given(&self, config: usize) -> f64 {
        self.rows.get(config).map_or(0.0, |row| row[1])
    }

    /// Number of rows the parent set implies: `2^k`.
    #[must_use]
    pub fn expected_rows(&self) -> usize {
        1usize << self.parents.len()
    }

    /// Flattens the table into factor values laid out `[parents..., child]`
    /// with the child varying fastest.
    #[must_use]
    pub fn factor_values(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.rows.len() * 2);
        for row in &self.rows {
            values.push(row[0]);
            values.push(row[1]);
        }
        values
    }

    /// Checks the structural and sum-to-1 invariants.
    ///
    /// # Errors
    /// - [`ModelBuildError::ParentMismatch`] when the row count does not
    ///   match `2^k` for the parent set
    /// - [`ModelBuildError::RowNotNormalized`] when any row's sum deviates
    ///   from 1 beyond [`ROW_SUM_TOLERANCE`]
    pub fn validate(&self, variable: &str) -> Result<(), ModelBuildError> {
        if self.rows.len() != self.expected_rows() {
            return Err(ModelBuildError::ParentMismatch {
                variable: variable.to_string(),
                expected_rows: self.expected_rows(),
                actual_rows: self.rows.len(),
            });
        }
        for (row_idx, row) in self.rows.iter().enumerate() {
            let sum = row[0] + row[1];
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(ModelBuildError::RowNotNormalized {
                    variable: variable.to_string(),
                    row: row_idx,
                    sum,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityKind;

    fn id(name: &str) -> EntityId {
        EntityId::derive(EntityKind::Symptom, name)
    }

    #[test]
    fn prior_has_single_row() {
        let cpt = Cpt::prior(0.3);
        assert_eq!(cpt.rows().len(), 1);
        assert!((cpt.present_given(0) - 0.3).abs() < 1e-12);
        cpt.validate("Fever").unwrap();
    }

    #[test]
    fn expected_rows_doubles_per_parent() {
        let cpt = Cpt::new(vec![id("a"), id("b")], vec![[1.0, 0.0]; 4]);
        assert_eq!(cpt.expected_rows(), 4);
        cpt.validate("Flu").unwrap();
    }

    #[test]
    fn row_count_mismatch_is_rejected() {
        let cpt = Cpt::new(vec![id("a"), id("b")], vec![[0.5, 0.5]; 3]);
        let err = cpt.validate("Flu").unwrap_err();
        assert!(matches!(err, ModelBuildError::ParentMismatch { .. }));
    }

    #[test]
    fn unnormalized_row_is_rejected() {
        let cpt = Cpt::new(vec![id("a")], vec![[0.5, 0.5], [0.6, 0.5]]);
        let err = cpt.validate("Flu").unwrap_err();
        match err {
            ModelBuildError::RowNotNormalized { row, .. } => assert_eq!(row, 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn tolerance_admits_float_noise() {
        let cpt = Cpt::new(vec![], vec![[0.3, 0.7 + 1e-9]]);
        cpt.validate("Fever").unwrap();
    }

    #[test]
    fn factor_values_interleave_states() {
        let cpt = Cpt::new(vec![id("a")], vec![[0.9, 0.1], [0.2, 0.8]]);
        assert_eq!(cpt.factor_values(), vec![0.9, 0.1, 0.2, 0.8]);
    }
}
