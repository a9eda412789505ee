//! Immutable, fully-built knowledge snapshots.
//!
//! A snapshot bundles the two derived artifacts (compiled graph and
//! probabilistic network) with the fact set that produced them. Snapshots
//! are constructed completely before anyone can observe them and never
//! mutate afterward, so any number of queries can read one concurrently
//! while a replacement is being built.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::entity::Entity;
use crate::error::ModelBuildError;
use crate::graph::compile::CompiledGraph;
use crate::knowledge::KnowledgeBase;
use crate::model::builder::{build_network, ModelConfig};
use crate::model::network::DiseaseNetwork;

/// One immutable build of the knowledge base and its derived artifacts.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// When the snapshot was built.
    pub built_at: DateTime<Utc>,
    /// Content fingerprint of the underlying fact set.
    pub fingerprint: String,
    knowledge: KnowledgeBase,
    graph: CompiledGraph,
    network: DiseaseNetwork,
}

impl Snapshot {
    /// Builds graph and network from the knowledge base and validates that
    /// the network's symptom -> disease edges mirror the graph's
    /// HAS_SYMPTOM edges exactly.
    ///
    /// The mirror check is skipped when `config.max_parents` is set, since
    /// bounding CPT parents deliberately drops edges from the model side.
    ///
    /// # Errors
    /// Any [`ModelBuildError`] aborts the build; nothing is published.
    pub fn build(knowledge: KnowledgeBase, config: &ModelConfig) -> Result<Self, ModelBuildError> {
        let graph = CompiledGraph::from_facts(knowledge.facts());
        let network = build_network(knowledge.facts(), config)?;
        if config.max_parents.is_none() {
            network.mirrors(&graph)?;
        }

        let fingerprint = knowledge.fingerprint();
        info!(
            facts = knowledge.len(),
            nodes = graph.nodes().len(),
            edges = graph.edges().len(),
            variables = network.var_count(),
            %fingerprint,
            "built knowledge snapshot"
        );
        Ok(Self {
            built_at: Utc::now(),
            fingerprint,
            knowledge,
            graph,
            network,
        })
    }

    /// The fact set behind this snapshot.
    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// The compiled graph.
    #[must_use]
    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    /// The compiled probabilistic network.
    #[must_use]
    pub fn network(&self) -> &DiseaseNetwork {
        &self.network
    }

    /// All diseases, first-seen order.
    #[must_use]
    pub fn diseases(&self) -> Vec<Entity> {
        self.graph.diseases().cloned().collect()
    }

    /// All symptoms, first-seen order.
    #[must_use]
    pub fn symptoms(&self) -> Vec<Entity> {
        self.graph.symptoms().cloned().collect()
    }
}
