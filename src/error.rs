//! Error types for nosograph.
//!
//! All errors are strongly typed using thiserror. This enables pattern
//! matching on specific failure conditions and keeps the two engines'
//! failure modes separate: a build failure aborts the load, a query
//! failure aborts one query, and a store failure degrades only the
//! graph engine.

use thiserror::Error;

use crate::entity::EntityKind;
use crate::graph::store::StoreError;

/// Validation errors that occur while constructing core data.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Entity name cannot be empty")]
    EmptyEntityName,

    #[error("Entity '{name}' has kind {actual}, expected {expected}")]
    WrongEntityKind {
        name: String,
        expected: EntityKind,
        actual: EntityKind,
    },

    #[error("Fact for disease '{disease}' has no symptoms")]
    EmptySymptomSet {
        disease: String,
    },

    #[error("Probability {value} is out of range [0.0, 1.0]")]
    ProbabilityOutOfRange {
        value: f64,
    },
}

/// Errors that abort building the probabilistic model.
///
/// Any of these is fatal to the load: a partially built network is never
/// published.
#[derive(Debug, Error)]
pub enum ModelBuildError {
    #[error("Cannot build a model from an empty fact set")]
    NoFacts,

    #[error("Disease '{disease}' is linked to no symptoms")]
    DiseaseWithoutSymptoms {
        disease: String,
    },

    #[error("CPT row {row} of '{variable}' sums to {sum}, expected 1.0")]
    RowNotNormalized {
        variable: String,
        row: usize,
        sum: f64,
    },

    #[error("CPT of '{variable}' has {actual_rows} rows, expected {expected_rows} for its parent set")]
    ParentMismatch {
        variable: String,
        expected_rows: usize,
        actual_rows: usize,
    },

    #[error("Model edge ({symptom} -> {disease}) does not mirror the graph store")]
    StructureMismatch {
        disease: String,
        symptom: String,
    },
}

/// Errors that abort a single inference query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Evidence references unknown variable '{name}'")]
    UnknownVariable {
        name: String,
    },

    #[error("Evidence describes a zero-probability event")]
    InconsistentEvidence,
}

/// Top-level error type for nosograph.
///
/// This enum encompasses all failures a caller can observe from the
/// load and query surfaces.
#[derive(Debug, Error)]
pub enum DiagnosisError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Model build error: {0}")]
    Model(#[from] ModelBuildError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Graph store error: {0}")]
    Store(#[from] StoreError),

    #[error("No knowledge snapshot has been loaded")]
    NotLoaded,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiagnosisError {
    /// Returns true if this is a query-level error (one query aborted).
    #[must_use]
    pub const fn is_query(&self) -> bool {
        matches!(self, Self::Query(_))
    }

    /// Returns true if this is a store-level error (graph engine degraded).
    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }

    /// Returns true if this error is fatal to the knowledge-base load.
    #[must_use]
    pub const fn is_build_fatal(&self) -> bool {
        matches!(self, Self::Model(_) | Self::Validation(_))
    }
}

/// Result type alias for nosograph operations.
pub type DiagnosisResult<T> = Result<T, DiagnosisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_messages() {
        let err = ValidationError::ProbabilityOutOfRange { value: 1.5 };
        let msg = format!("{err}");
        assert!(msg.contains("1.5"));
        assert!(msg.contains("out of range"));

        let err = ValidationError::EmptySymptomSet {
            disease: "Flu".to_string(),
        };
        assert!(format!("{err}").contains("Flu"));
    }

    #[test]
    fn model_build_error_messages() {
        let err = ModelBuildError::DiseaseWithoutSymptoms {
            disease: "Measles".to_string(),
        };
        assert!(format!("{err}").contains("Measles"));

        let err = ModelBuildError::RowNotNormalized {
            variable: "Flu".to_string(),
            row: 3,
            sum: 0.98,
        };
        let msg = format!("{err}");
        assert!(msg.contains("row 3"));
        assert!(msg.contains("0.98"));
    }

    #[test]
    fn query_error_unknown_variable() {
        let err = QueryError::UnknownVariable {
            name: "Chills".to_string(),
        };
        assert!(format!("{err}").contains("Chills"));
    }

    #[test]
    fn diagnosis_error_from_query() {
        let err: DiagnosisError = QueryError::InconsistentEvidence.into();
        assert!(err.is_query());
        assert!(!err.is_store());
        assert!(!err.is_build_fatal());
    }

    #[test]
    fn diagnosis_error_from_model() {
        let err: DiagnosisError = ModelBuildError::NoFacts.into();
        assert!(err.is_build_fatal());
        assert!(!err.is_query());
    }

    #[test]
    fn diagnosis_error_from_store() {
        let err: DiagnosisError = StoreError::Unavailable {
            reason: "connection refused".to_string(),
        }
        .into();
        assert!(err.is_store());
        assert!(format!("{err}").contains("connection refused"));
    }
}
