//! Abstract graph store contract and the in-memory backend.
//!
//! The core needs only three primitives from a graph store: upsert a node,
//! upsert an edge, and query a node's neighbors along one relation. The
//! concrete storage technology behind them is an external collaborator; the
//! in-memory backend here is the reference implementation and the default
//! for embedded use and tests.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{Entity, EntityId, EntityKind};

/// Typed edge relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// Disease -> symptom linkage derived from facts.
    HasSymptom,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasSymptom => write!(f, "HAS_SYMPTOM"),
        }
    }
}

/// Errors surfaced by graph store operations.
///
/// `Unavailable` is the degradation signal: the diagnosis coordinator maps
/// it to an unavailable graph engine instead of failing the whole query.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backing store cannot be reached.
    #[error("Graph store unavailable: {reason}")]
    Unavailable {
        /// Human-readable cause.
        reason: String,
    },

    /// An edge referenced a node that has not been upserted.
    #[error("Edge endpoint {id} does not exist as a node")]
    MissingEndpoint {
        /// The missing endpoint.
        id: EntityId,
    },

    /// Backend failure.
    #[error("Graph store backend error: {0}")]
    Backend(String),
}

/// Storage contract both engines consume.
pub trait GraphStore: Send + Sync {
    /// Removes all nodes and edges. Called before a rebuild publishes a
    /// new snapshot, so stale knowledge never survives a swap.
    fn clear(&self) -> Result<(), StoreError>;

    /// Inserts a node or refreshes its label. Idempotent.
    fn upsert_node(&self, entity: &Entity) -> Result<(), StoreError>;

    /// Inserts an edge if it does not already exist. Both endpoints must
    /// exist as nodes.
    fn upsert_edge(&self, from: EntityId, to: EntityId, relation: Relation)
        -> Result<(), StoreError>;

    /// Returns the out-neighbors of a node along one relation, in edge
    /// insertion order.
    fn neighbors(&self, node: EntityId, relation: Relation) -> Result<Vec<Entity>, StoreError>;

    /// Lists all nodes of one kind, in node insertion order.
    fn nodes(&self, kind: EntityKind) -> Result<Vec<Entity>, StoreError>;
}

fn lock_err(context: &'static str) -> StoreError {
    StoreError::Backend(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: HashMap<EntityId, Entity>,
    order: Vec<EntityId>,
    out_edges: HashMap<EntityId, Vec<(Relation, EntityId)>>,
}

/// Thread-safe in-memory graph store.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: RwLock<GraphState>,
}

impl InMemoryGraphStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes currently stored.
    ///
    /// # Errors
    /// Returns a backend error if the store lock is poisoned.
    pub fn node_count(&self) -> Result<usize, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("node_count"))?;
        Ok(state.nodes.len())
    }

    /// Number of edges currently stored.
    ///
    /// # Errors
    /// Returns a backend error if the store lock is poisoned.
    pub fn edge_count(&self) -> Result<usize, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("edge_count"))?;
        Ok(state.out_edges.values().map(Vec::len).sum())
    }

}

impl GraphStore for InMemoryGraphStore {
    fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("clear"))?;
        *state = GraphState::default();
        Ok(())
    }

    fn upsert_node(&self, entity: &Entity) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("upsert_node"))?;
        if !state.nodes.contains_key(&entity.id) {
            state.order.push(entity.id);
        }
        state.nodes.insert(entity.id, entity.clone());
        Ok(())
    }

    fn upsert_edge(
        &self,
        from: EntityId,
        to: EntityId,
        relation: Relation,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("upsert_edge"))?;
        if !state.nodes.contains_key(&from) {
            return Err(StoreError::MissingEndpoint { id: from });
        }
        if !state.nodes.contains_key(&to) {
            return Err(StoreError::MissingEndpoint { id: to });
        }
        let edges = state.out_edges.entry(from).or_default();
        if !edges.iter().any(|(r, t)| *r == relation && *t == to) {
            edges.push((relation, to));
        }
        Ok(())
    }

    fn neighbors(&self, node: EntityId, relation: Relation) -> Result<Vec<Entity>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("neighbors"))?;
        let Some(edges) = state.out_edges.get(&node) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for (r, target) in edges {
            if *r != relation {
                continue;
            }
            let entity = state
                .nodes
                .get(target)
                .ok_or(StoreError::MissingEndpoint { id: *target })?;
            out.push(entity.clone());
        }
        Ok(out)
    }

    fn nodes(&self, kind: EntityKind) -> Result<Vec<Entity>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("nodes"))?;
        let mut out = Vec::new();
        for id in &state.order {
            if let Some(entity) = state.nodes.get(id) {
                if entity.kind == kind {
                    out.push(entity.clone());
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disease(name: &str) -> Entity {
        Entity::new(name, EntityKind::Disease).unwrap()
    }

    fn symptom(name: &str) -> Entity {
        Entity::new(name, EntityKind::Symptom).unwrap()
    }

    #[test]
    fn upsert_node_is_idempotent() {
        let store = InMemoryGraphStore::new();
        let flu = disease("Flu");
        store.upsert_node(&flu).unwrap();
        store.upsert_node(&flu).unwrap();
        assert_eq!(store.node_count().unwrap(), 1);
    }

    #[test]
    fn upsert_edge_requires_endpoints() {
        let store = InMemoryGraphStore::new();
        let flu = disease("Flu");
        let fever = symptom("Fever");
        store.upsert_node(&flu).unwrap();

        let err = store
            .upsert_edge(flu.id, fever.id, Relation::HasSymptom)
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingEndpoint { .. }));

        store.upsert_node(&fever).unwrap();
        store
            .upsert_edge(flu.id, fever.id, Relation::HasSymptom)
            .unwrap();
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let store = InMemoryGraphStore::new();
        let flu = disease("Flu");
        let fever = symptom("Fever");
        store.upsert_node(&flu).unwrap();
        store.upsert_node(&fever).unwrap();
        store
            .upsert_edge(flu.id, fever.id, Relation::HasSymptom)
            .unwrap();
        store
            .upsert_edge(flu.id, fever.id, Relation::HasSymptom)
            .unwrap();
        assert_eq!(store.edge_count().unwrap(), 1);
    }

    #[test]
    fn neighbors_preserve_insertion_order() {
        let store = InMemoryGraphStore::new();
        let flu = disease("Flu");
        let fever = symptom("Fever");
        let cough = symptom("Cough");
        store.upsert_node(&flu).unwrap();
        store.upsert_node(&fever).unwrap();
        store.upsert_node(&cough).unwrap();
        store
            .upsert_edge(flu.id, fever.id, Relation::HasSymptom)
            .unwrap();
        store
            .upsert_edge(flu.id, cough.id, Relation::HasSymptom)
            .unwrap();

        let names: Vec<_> = store
            .neighbors(flu.id, Relation::HasSymptom)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Fever", "Cough"]);
    }

    #[test]
    fn clear_empties_the_store() {
        let store = InMemoryGraphStore::new();
        let flu = disease("Flu");
        let fever = symptom("Fever");
        store.upsert_node(&flu).unwrap();
        store.upsert_node(&fever).unwrap();
        store
            .upsert_edge(flu.id, fever.id, Relation::HasSymptom)
            .unwrap();

        store.clear().unwrap();
        assert_eq!(store.node_count().unwrap(), 0);
        assert_eq!(store.edge_count().unwrap(), 0);
        assert!(store.neighbors(flu.id, Relation::HasSymptom).unwrap().is_empty());
    }

    #[test]
    fn nodes_filter_by_kind() {
        let store = InMemoryGraphStore::new();
        store.upsert_node(&disease("Flu")).unwrap();
        store.upsert_node(&symptom("Fever")).unwrap();
        store.upsert_node(&disease("Cold")).unwrap();

        let diseases: Vec<_> = store
            .nodes(EntityKind::Disease)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(diseases, vec!["Flu", "Cold"]);
        assert_eq!(store.nodes(EntityKind::Symptom).unwrap().len(), 1);
    }
}
