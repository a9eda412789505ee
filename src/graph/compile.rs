//! Graph compilation: facts -> deduplicated node and edge sets.
//!
//! Compilation is deterministic: entities keep their first-seen order and
//! their ids are derived from normalized names, so compiling the same fact
//! sequence always reproduces the same graph, and compiling a permutation
//! of it reproduces an isomorphic one (same names, same edge pairs).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, EntityKind};
use crate::fact::Fact;
use crate::graph::store::{GraphStore, Relation, StoreError};

/// One typed, directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node (disease).
    pub from: EntityId,
    /// Target node (symptom).
    pub to: EntityId,
    /// Edge type.
    pub relation: Relation,
}

/// The deduplicated node/edge set derived from a fact sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledGraph {
    nodes: Vec<Entity>,
    edges: Vec<GraphEdge>,
}

impl CompiledGraph {
    /// Compiles facts into a graph.
    ///
    /// Entity identity is resolved by normalized name; a (disease, symptom)
    /// pair occurring in multiple facts produces one edge.
    #[must_use]
    pub fn from_facts(facts: &[Fact]) -> Self {
        let mut nodes: Vec<Entity> = Vec::new();
        let mut seen_nodes: HashSet<EntityId> = HashSet::new();
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut seen_edges: HashSet<(EntityId, EntityId)> = HashSet::new();

        let mut add_node = |nodes: &mut Vec<Entity>, seen: &mut HashSet<EntityId>, e: &Entity| {
            if seen.insert(e.id) {
                nodes.push(e.clone());
            }
        };

        for fact in facts {
            add_node(&mut nodes, &mut seen_nodes, fact.disease());
            for symptom in fact.symptoms() {
                add_node(&mut nodes, &mut seen_nodes, symptom);
                if seen_edges.insert((fact.disease().id, symptom.id)) {
                    edges.push(GraphEdge {
                        from: fact.disease().id,
                        to: symptom.id,
                        relation: Relation::HasSymptom,
                    });
                }
            }
        }

        Self { nodes, edges }
    }

    /// All nodes, first-seen order.
    #[must_use]
    pub fn nodes(&self) -> &[Entity] {
        &self.nodes
    }

    /// All edges, first-seen order.
    #[must_use]
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Disease nodes, first-seen order.
    pub fn diseases(&self) -> impl Iterator<Item = &Entity> {
        self.nodes.iter().filter(|e| e.kind == EntityKind::Disease)
    }

    /// Symptom nodes, first-seen order.
    pub fn symptoms(&self) -> impl Iterator<Item = &Entity> {
        self.nodes.iter().filter(|e| e.kind == EntityKind::Symptom)
    }

    /// The set of (disease, symptom) pairs, for structural comparison.
    #[must_use]
    pub fn edge_pairs(&self) -> HashSet<(EntityId, EntityId)> {
        self.edges.iter().map(|e| (e.from, e.to)).collect()
    }

    /// Pushes all nodes and edges into a graph store via its upsert
    /// primitives. Safe to repeat; upserts are idempotent.
    ///
    /// # Errors
    /// Propagates the first [`StoreError`] returned by the store.
    pub fn publish(&self, store: &dyn GraphStore) -> Result<(), StoreError> {
        for node in &self.nodes {
            store.upsert_node(node)?;
        }
        for edge in &self.edges {
            store.upsert_edge(edge.from, edge.to, edge.relation)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FactExtractor;
    use crate::graph::store::InMemoryGraphStore;

    fn facts(lines: &[&str]) -> Vec<Fact> {
        let report = FactExtractor::new().extract_lines(lines.iter().copied());
        assert!(report.is_clean(), "test corpus must be clean");
        report.facts
    }

    #[test]
    fn dedups_shared_symptoms() {
        let graph = CompiledGraph::from_facts(&facts(&[
            "Flu has symptoms Fever, Cough, Fatigue.",
            "Pneumonia has symptoms Fever, Cough.",
        ]));

        // 2 diseases + 3 unique symptoms
        assert_eq!(graph.nodes().len(), 5);
        assert_eq!(graph.edges().len(), 5);
        assert_eq!(graph.diseases().count(), 2);
        assert_eq!(graph.symptoms().count(), 3);
    }

    #[test]
    fn repeated_pairs_produce_one_edge() {
        let graph = CompiledGraph::from_facts(&facts(&[
            "Flu has symptoms Fever.",
            "Flu has symptoms Fever, Cough.",
        ]));
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn compilation_is_idempotent() {
        let fs = facts(&[
            "Flu has symptoms Fever, Cough, Fatigue.",
            "Pneumonia has symptoms Fever, Cough.",
        ]);
        let a = CompiledGraph::from_facts(&fs);
        let b = CompiledGraph::from_facts(&fs);

        let names_a: Vec<_> = a.nodes().iter().map(|n| n.id).collect();
        let names_b: Vec<_> = b.nodes().iter().map(|n| n.id).collect();
        assert_eq!(names_a, names_b);
        assert_eq!(a.edge_pairs(), b.edge_pairs());
    }

    #[test]
    fn permuted_facts_compile_isomorphic() {
        let forward = facts(&[
            "Flu has symptoms Fever, Cough, Fatigue.",
            "Pneumonia has symptoms Fever, Cough.",
        ]);
        let reversed: Vec<Fact> = forward.iter().rev().cloned().collect();

        let a = CompiledGraph::from_facts(&forward);
        let b = CompiledGraph::from_facts(&reversed);

        let ids_a: HashSet<_> = a.nodes().iter().map(|n| n.id).collect();
        let ids_b: HashSet<_> = b.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(a.edge_pairs(), b.edge_pairs());
    }

    #[test]
    fn publish_materializes_into_store() {
        let graph = CompiledGraph::from_facts(&facts(&[
            "Flu has symptoms Fever, Cough.",
        ]));
        let store = InMemoryGraphStore::new();
        graph.publish(&store).unwrap();
        graph.publish(&store).unwrap();

        assert_eq!(store.node_count().unwrap(), 3);
        assert_eq!(store.edge_count().unwrap(), 2);
    }
}
