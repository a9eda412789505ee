//! # nosograph - dual-engine diagnostic reasoning
//!
//! nosograph turns a free-text medical knowledge base into two
//! complementary diagnostic engines over the same entities: a labeled
//! disease-symptom graph queried by structural overlap, and a discrete
//! probabilistic network queried by exact variable elimination. One
//! diagnosis call answers from both engines so graph-pattern evidence and
//! probabilistic evidence can be compared side by side.
//!
//! ## Core Concepts
//!
//! - **Entity**: a named disease or symptom node with a stable,
//!   deterministic identity
//! - **Fact**: one extracted disease -> symptom-set relationship
//! - **Snapshot**: an immutable build of the graph and the network,
//!   swapped atomically on reload
//! - **Evidence**: observed symptom states supplied to a query
//!
//! ## Usage
//!
//! ```rust
//! use nosograph::DiagnosisEngine;
//!
//! let engine = DiagnosisEngine::new();
//! engine
//!     .load_lines([
//!         "Flu has symptoms Fever, Cough, Fatigue.",
//!         "Pneumonia has symptoms Fever, Cough.",
//!     ])
//!     .unwrap();
//!
//! let report = engine.diagnose(["Fever", "Cough"]).unwrap();
//! let graph = report.graph.unwrap();
//! assert_eq!(graph[0].disease.name, "Pneumonia");
//! let probabilistic = report.probabilistic.unwrap();
//! assert!(!probabilistic.is_empty());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core data model
pub mod entity;
pub mod error;
pub mod fact;

// Extraction pipeline
pub mod extract;
pub mod knowledge;

// Engines and coordination
pub mod diagnose;
pub mod graph;
pub mod model;
pub mod snapshot;

// Re-export primary types at crate root for convenience
pub use diagnose::{DiagnosisEngine, DiagnosisReport, DiseaseScore, EngineSource, LoadSummary};
pub use entity::{Entity, EntityId, EntityKind};
pub use error::{
    DiagnosisError, DiagnosisResult, ModelBuildError, QueryError, ValidationError,
};
pub use extract::{
    EntityClassifier, ExtractionReport, ExtractorConfig, FactExtractor, LexiconClassifier,
    MentionKind, ParseFailure, ParseReason, ShapeClassifier,
};
pub use fact::Fact;
pub use graph::{CompiledGraph, GraphMatch, GraphStore, InMemoryGraphStore, Relation, StoreError};
pub use knowledge::KnowledgeBase;
pub use model::{
    build_network, Cpt, DiseaseNetwork, DiseasePosterior, EliminationOrder, Evidence, Factor,
    ModelConfig, State,
};
pub use snapshot::Snapshot;
