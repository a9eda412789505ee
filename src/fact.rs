//! Facts - the atomic unit of extracted knowledge.
//!
//! A `Fact` records one disease together with the symptoms a single source
//! sentence linked to it. Facts are validated at construction and read-only
//! afterward; both derived artifacts (graph store and probabilistic network)
//! are rebuilt from the full fact sequence.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityKind};
use crate::error::ValidationError;

/// One extracted disease -> symptom-set relationship.
///
/// Invariants, enforced at construction:
/// - the subject is a [`EntityKind::Disease`] entity
/// - every symptom is a [`EntityKind::Symptom`] entity
/// - the symptom set is non-empty
///
/// Symptoms keep the order of first mention within the sentence and are
/// deduplicated by entity id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    disease: Entity,
    symptoms: Vec<Entity>,
}

impl Fact {
    /// Builds a validated fact.
    ///
    /// # Errors
    /// - [`ValidationError::WrongEntityKind`] if the subject is not a disease
    ///   or a listed symptom is not a symptom
    /// - [`ValidationError::EmptySymptomSet`] if no symptoms remain after
    ///   deduplication
    pub fn new(disease: Entity, symptoms: Vec<Entity>) -> Result<Self, ValidationError> {
        if disease.kind != EntityKind::Disease {
            return Err(ValidationError::WrongEntityKind {
                name: disease.name,
                expected: EntityKind::Disease,
                actual: EntityKind::Symptom,
            });
        }

        let mut deduped: Vec<Entity> = Vec::with_capacity(symptoms.len());
        for symptom in symptoms {
            if symptom.kind != EntityKind::Symptom {
                return Err(ValidationError::WrongEntityKind {
                    name: symptom.name,
                    expected: EntityKind::Symptom,
                    actual: EntityKind::Disease,
                });
            }
            if !deduped.iter().any(|s| s.id == symptom.id) {
                deduped.push(symptom);
            }
        }

        if deduped.is_empty() {
            return Err(ValidationError::EmptySymptomSet {
                disease: disease.name,
            });
        }

        Ok(Self {
            disease,
            symptoms: deduped,
        })
    }

    /// The disease this fact is about.
    #[must_use]
    pub const fn disease(&self) -> &Entity {
        &self.disease
    }

    /// The symptoms linked to the disease, in first-mention order.
    #[must_use]
    pub fn symptoms(&self) -> &[Entity] {
        &self.symptoms
    }

    /// Returns true if the fact links the given symptom.
    #[must_use]
    pub fn mentions(&self, symptom: &Entity) -> bool {
        self.symptoms.iter().any(|s| s.id == symptom.id)
    }

    /// Renders this fact as a canonical knowledge sentence.
    ///
    /// The inverse of extraction: `"<Disease> has symptoms <S1>, <S2>."`
    #[must_use]
    pub fn render(&self) -> String {
        let list = self
            .symptoms
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} has symptoms {}.", self.disease.name, list)
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
    fn fact_construction() {
        let fact = Fact::new(disease("Flu"), vec![symptom("Fever"), symptom("Cough")]).unwrap();
        assert_eq!(fact.disease().name, "Flu");
        assert_eq!(fact.symptoms().len(), 2);
        assert!(fact.mentions(&symptom("Fever")));
        assert!(!fact.mentions(&symptom("Fatigue")));
    }

    #[test]
    fn duplicate_symptoms_collapse() {
        let fact = Fact::new(
            disease("Flu"),
            vec![symptom("Fever"), symptom("fever"), symptom("Cough")],
        )
        .unwrap();
        assert_eq!(fact.symptoms().len(), 2);
    }

    #[test]
    fn empty_symptom_set_rejected() {
        let err = Fact::new(disease("Flu"), vec![]).unwrap_err();
        assert!(matches!(err, ValidationError::EmptySymptomSet { .. }));
    }

    #[test]
    fn wrong_kinds_rejected() {
        let err = Fact::new(symptom("Fever"), vec![symptom("Cough")]).unwrap_err();
        assert!(matches!(err, ValidationError::WrongEntityKind { .. }));

        let err = Fact::new(disease("Flu"), vec![disease("Cold")]).unwrap_err();
        assert!(matches!(err, ValidationError::WrongEntityKind { .. }));
    }

    #[test]
    fn render_is_canonical() {
        let fact = Fact::new(disease("Flu"), vec![symptom("Fever"), symptom("Cough")]).unwrap();
        assert_eq!(fact.render(), "Flu has symptoms Fever, Cough.");
    }
}
