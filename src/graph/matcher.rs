//! Structural symptom-overlap matching over the graph store.
//!
//! The matcher is the non-probabilistic half of the dual diagnosis: it
//! scores every disease by the fraction of its linked symptoms that were
//! observed. No probabilistic interpretation is attached to the score.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{normalize_name, Entity, EntityKind};
use crate::graph::store::{GraphStore, Relation, StoreError};

/// One scored disease from the graph engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMatch {
    /// The matched disease.
    pub disease: Entity,
    /// Observed symptoms that are linked to the disease.
    pub matched: Vec<Entity>,
    /// Total number of symptoms linked to the disease.
    pub linked: usize,
    /// `matched / linked`, always in `[0, 1]`.
    pub score: f64,
}

/// Scores diseases by weighted symptom overlap.
///
/// Every disease with at least one observed linked symptom is returned,
/// scored `|matched| / |linked|`, ranked descending; ties break by disease
/// name ascending. Observed names that match no node simply contribute
/// nothing, so an entirely unknown symptom set yields an empty list rather
/// than an error.
///
/// # Errors
/// Propagates [`StoreError`] when the graph store cannot be read.
pub fn match_diseases<I, S>(store: &dyn GraphStore, observed: I) -> Result<Vec<GraphMatch>, StoreError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let observed: HashSet<String> = observed
        .into_iter()
        .map(|s| normalize_name(s.as_ref()))
        .filter(|s| !s.is_empty())
        .collect();

    let mut results = Vec::new();
    for disease in store.nodes(EntityKind::Disease)? {
        let linked = store.neighbors(disease.id, Relation::HasSymptom)?;
        if linked.is_empty() {
            continue;
        }
        let matched: Vec<Entity> = linked
            .iter()
            .filter(|s| observed.contains(&s.normalized()))
            .cloned()
            .collect();
        if matched.is_empty() {
            continue;
        }

        #[allow(clippy::cast_precision_loss)]
        let score = matched.len() as f64 / linked.len() as f64;
        debug!(disease = %disease.name, matched = matched.len(), linked = linked.len(), "graph match");
        results.push(GraphMatch {
            disease,
            matched,
            linked: linked.len(),
            score,
        });
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.disease.name.cmp(&b.disease.name))
    });
    Ok(results)
}
