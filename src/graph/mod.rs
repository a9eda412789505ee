//! Knowledge graph: store contract, fact compilation and structural matching.

pub mod compile;
pub mod matcher;
pub mod store;

pub use compile::{CompiledGraph, GraphEdge};
pub use matcher::{match_diseases, GraphMatch};
pub use store::{GraphStore, InMemoryGraphStore, Relation, StoreError};
