//! Model construction from fact statistics.
//!
//! Priors and conditional tables are derived from fact frequency and
//! co-occurrence alone; no structure learning happens here. The causal
//! direction is fixed: symptoms are parents of the diseases they support.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entity::{Entity, EntityId};
use crate::error::ModelBuildError;
use crate::fact::Fact;
use crate::model::cpt::Cpt;
use crate::model::network::DiseaseNetwork;

/// Tunables for CPT derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Probability assigned when all of a disease's linked symptoms are
    /// present; partial configurations scale linearly with the fraction
    /// present.
    pub base_rate: f64,
    /// Lower clamp keeping every probability away from exactly 0.
    pub floor: f64,
    /// Upper clamp keeping every probability away from exactly 1.
    pub ceil: f64,
    /// Parent counts above this threshold log a CPT-size warning
    /// (`2^k` rows).
    pub parent_warn_threshold: usize,
    /// Optional hard bound on parent count. When set, a disease keeps only
    /// its first-seen `max_parents` symptoms as CPT parents. This trades
    /// the exact graph-mirror invariant for bounded table sizes, so it is
    /// off by default.
    pub max_parents: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_rate: 0.9,
            floor: 0.01,
            ceil: 0.99,
            parent_warn_threshold: 20,
            max_parents: None,
        }
    }
}

impl ModelConfig {
    fn clamp(&self, p: f64) -> f64 {
        p.clamp(self.floor, self.ceil)
    }
}

/// Derives the discrete network from a fact sequence.
///
/// For every symptom, `P(present)` is the fraction of facts mentioning it,
/// clamped to `[floor, ceil]`. For every disease, the CPT covers all `2^k`
/// parent configurations with `P(present | config)` proportional to the
/// fraction of linked symptoms present in the configuration.
///
/// # Errors
/// - [`ModelBuildError::NoFacts`] on an empty fact sequence
/// - [`ModelBuildError::DiseaseWithoutSymptoms`] if any disease ends up
///   with no linked symptoms
/// - any CPT invariant violation detected by the final validation pass
pub fn build_network(facts: &[Fact], config: &ModelConfig) -> Result<DiseaseNetwork, ModelBuildError> {
    if facts.is_empty() {
        return Err(ModelBuildError::NoFacts);
    }

    // First-seen symptom order with fact-frequency counts.
    let mut symptom_order: Vec<Entity> = Vec::new();
    let mut symptom_counts: HashMap<EntityId, usize> = HashMap::new();

    // First-seen disease order with linked-symptom unions.
    let mut disease_order: Vec<Entity> = Vec::new();
    let mut disease_parents: HashMap<EntityId, Vec<EntityId>> = HashMap::new();

    for fact in facts {
        for symptom in fact.symptoms() {
            let count = symptom_counts.entry(symptom.id).or_insert(0);
            if *count == 0 {
                symptom_order.push(symptom.clone());
            }
            *count += 1;
        }

        let disease = fact.disease();
        if !disease_parents.contains_key(&disease.id) {
            disease_order.push(disease.clone());
        }
        let parents = disease_parents.entry(disease.id).or_default();
        for symptom in fact.symptoms() {
            if !parents.contains(&symptom.id) {
                parents.push(symptom.id);
            }
        }
    }

    let mut net = DiseaseNetwork::new();

    #[allow(clippy::cast_precision_loss)]
    let total = facts.len() as f64;
    for symptom in symptom_order {
        #[allow(clippy::cast_precision_loss)]
        let frequency = symptom_counts[&symptom.id] as f64 / total;
        let p = config.clamp(frequency);
        debug!(symptom = %symptom.name, prior = p, "derived symptom prior");
        net.push_variable(symptom, Cpt::prior(p));
    }

    for disease in disease_order {
        let mut parents = disease_parents
            .remove(&disease.id)
            .unwrap_or_default();
        if parents.is_empty() {
            return Err(ModelBuildError::DiseaseWithoutSymptoms {
                disease: disease.name,
            });
        }

        if parents.len() > config.parent_warn_threshold {
            warn!(
                disease = %disease.name,
                parents = parents.len(),
                rows = 1u64 << parents.len().min(63),
                "large parent set inflates CPT size"
            );
        }
        if let Some(max) = config.max_parents {
            if parents.len() > max {
                warn!(
                    disease = %disease.name,
                    kept = max,
                    dropped = parents.len() - max,
                    "bounding CPT parents to first-seen symptoms"
                );
                parents.truncate(max);
            }
        }

        net.push_variable(disease, derive_disease_cpt(&parents, config));
    }

    net.validate()?;
    Ok(net)
}

fn derive_disease_cpt(parents: &[EntityId], config: &ModelConfig) -> Cpt {
    let k = parents.len();
    let rows = 1usize << k;
    let mut table = Vec::with_capacity(rows);
    for cfg in 0..rows {
        #[allow(clippy::cast_precision_loss)]
        let fraction = cfg.count_ones() as f64 / k as f64;
        let p = config.clamp(fraction * config.base_rate);
        table.push([1.0 - p, p]);
    }
    Cpt::new(parents.to_vec(), table)
}
