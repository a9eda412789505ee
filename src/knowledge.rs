//! Owned knowledge base: the fact set behind both engines.
//!
//! The knowledge base supports the corpus authoring workflow: upsert a
//! disease's symptom list, remove a disease, and render the whole base
//! back to canonical sentence lines. Mutation never touches a published
//! snapshot; callers rebuild and swap.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind};
use crate::error::ValidationError;
use crate::extract::ExtractionReport;
use crate::fact::Fact;

/// The mutable fact set from which snapshots are derived.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeBase {
    facts: Vec<Fact>,
}

impl KnowledgeBase {
    /// Creates an empty knowledge base.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing fact sequence.
    #[must_use]
    pub fn from_facts(facts: Vec<Fact>) -> Self {
        Self { facts }
    }

    /// Adopts the facts of an extraction report.
    #[must_use]
    pub fn from_report(report: ExtractionReport) -> Self {
        Self {
            facts: report.facts,
        }
    }

    /// The facts, in insertion order.
    #[must_use]
    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Number of facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if no fact is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Appends one fact.
    pub fn add_fact(&mut self, fact: Fact) {
        self.facts.push(fact);
    }

    /// Replaces a disease's knowledge with a single new symptom list, or
    /// adds the disease if it is unknown. Returns true if existing facts
    /// were replaced.
    ///
    /// # Errors
    /// Propagates entity/fact validation failures for the new knowledge.
    pub fn upsert_disease(
        &mut self,
        disease_name: &str,
        symptom_names: &[&str],
    ) -> Result<bool, ValidationError> {
        let disease = Entity::new(disease_name, EntityKind::Disease)?;
        let symptoms = symptom_names
            .iter()
            .map(|name| Entity::new(name, EntityKind::Symptom))
            .collect::<Result<Vec<_>, _>>()?;
        let fact = Fact::new(disease.clone(), symptoms)?;

        let before = self.facts.len();
        self.facts.retain(|f| f.disease().id != disease.id);
        let replaced = self.facts.len() != before;
        self.facts.push(fact);
        Ok(replaced)
    }

    /// Removes all facts about a disease. Returns true if any existed.
    pub fn remove_disease(&mut self, disease_name: &str) -> bool {
        let Ok(disease) = Entity::new(disease_name, EntityKind::Disease) else {
            return false;
        };
        let before = self.facts.len();
        self.facts.retain(|f| f.disease().id != disease.id);
        self.facts.len() != before
    }

    /// Renders the base as canonical knowledge lines.
    ///
    /// One line per disease, symptom lists merged across facts in
    /// first-mention order, diseases sorted by name for consistent output.
    #[must_use]
    pub fn render(&self) -> String {
        let mut diseases: Vec<(Entity, Vec<Entity>)> = Vec::new();
        for fact in &self.facts {
            let pos = match diseases.iter().position(|(d, _)| d.id == fact.disease().id) {
                Some(pos) => pos,
                None => {
                    diseases.push((fact.disease().clone(), Vec::new()));
                    diseases.len() - 1
                }
            };
            let entry = &mut diseases[pos].1;
            for symptom in fact.symptoms() {
                if !entry.iter().any(|s| s.id == symptom.id) {
                    entry.push(symptom.clone());
                }
            }
        }
        diseases.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));

        diseases
            .into_iter()
            .map(|(disease, symptoms)| {
                let list = symptoms
                    .iter()
                    .map(|s| s.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{} has symptoms {}.", disease.name, list)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Stable content fingerprint of the canonical rendering.
    ///
    /// Equal fact sets produce equal fingerprints regardless of how they
    /// were assembled.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.render().as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FactExtractor;

    fn base(lines: &[&str]) -> KnowledgeBase {
        let report = FactExtractor::new().extract_lines(lines.iter().copied());
        assert!(report.is_clean());
        KnowledgeBase::from_report(report)
    }

    #[test]
    fn render_sorts_and_merges() {
        let kb = base(&[
            "Pneumonia has symptoms Fever, Cough.",
            "Flu has symptoms Fever.",
            "Flu has symptoms Fatigue.",
        ]);
        assert_eq!(
            kb.render(),
            "Flu has symptoms Fever, Fatigue.\nPneumonia has symptoms Fever, Cough."
        );
    }

    #[test]
    fn render_round_trips_through_extraction() {
        let kb = base(&[
            "Flu has symptoms Fever, Cough, Fatigue.",
            "Pneumonia has symptoms Fever, Cough.",
        ]);
        let report = FactExtractor::new().extract_lines(kb.render().lines());
        assert!(report.is_clean());
        let rebuilt = KnowledgeBase::from_report(report);
        assert_eq!(kb.fingerprint(), rebuilt.fingerprint());
    }

    #[test]
    fn fingerprint_is_order_independent() {
        let a = base(&[
            "Flu has symptoms Fever.",
            "Pneumonia has symptoms Cough.",
        ]);
        let b = base(&[
            "Pneumonia has symptoms Cough.",
            "Flu has symptoms Fever.",
        ]);
        assert_eq!(a.fingerprint(), b.fingerprint());

        let c = base(&["Flu has symptoms Cough."]);
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn upsert_replaces_existing_knowledge() {
        let mut kb = base(&["Flu has symptoms Fever.", "Cold has symptoms Sneezing."]);
        let replaced = kb.upsert_disease("Flu", &["Fever", "Chills"]).unwrap();
        assert!(replaced);
        assert_eq!(kb.len(), 2);
        assert!(kb.render().contains("Flu has symptoms Fever, Chills."));

        let replaced = kb.upsert_disease("Measles", &["Rash"]).unwrap();
        assert!(!replaced);
        assert_eq!(kb.len(), 3);
    }

    #[test]
    fn upsert_rejects_empty_symptoms() {
        let mut kb = KnowledgeBase::new();
        assert!(kb.upsert_disease("Flu", &[]).is_err());
    }

    #[test]
    fn remove_disease_drops_all_its_facts() {
        let mut kb = base(&[
            "Flu has symptoms Fever.",
            "Flu has symptoms Cough.",
            "Cold has symptoms Sneezing.",
        ]);
        assert!(kb.remove_disease("flu"));
        assert_eq!(kb.len(), 1);
        assert!(!kb.remove_disease("Flu"));
    }
}
