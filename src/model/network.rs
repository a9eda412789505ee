//! The compiled discrete network over disease and symptom variables.
//!
//! Structure is fixed by extraction: symptom variables are parentless and
//! carry priors; disease variables have their linked symptoms as parents.
//! Every variable has the binary domain `{absent, present}` and owns
//! exactly one CPT. The network is an immutable snapshot artifact; queries
//! only read it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{normalize_name, Entity, EntityId, EntityKind};
use crate::error::{ModelBuildError, QueryError};
use crate::graph::compile::CompiledGraph;
use crate::model::cpt::Cpt;
use crate::model::factor::Factor;

/// A binary variable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    /// The finding/condition is absent.
    Absent,
    /// The finding/condition is present.
    Present,
}

impl State {
    /// The state's index in factor tuples (absent = 0, present = 1).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Present => 1,
        }
    }

    /// Builds a state from a presence flag.
    #[must_use]
    pub const fn from_present(present: bool) -> Self {
        if present {
            Self::Present
        } else {
            Self::Absent
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Present => write!(f, "present"),
        }
    }
}

/// Observed symptom states supplied to a query.
///
/// Conflicting observations of the same entity are rejected at insertion
/// with [`QueryError::InconsistentEvidence`]; no resolution policy is
/// applied on the caller's behalf.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    states: BTreeMap<EntityId, State>,
}

impl Evidence {
    /// Creates empty evidence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observation.
    ///
    /// # Errors
    /// Returns [`QueryError::InconsistentEvidence`] if the entity was
    /// already observed in the opposite state.
    pub fn observe(&mut self, id: EntityId, state: State) -> Result<(), QueryError> {
        match self.states.get(&id) {
            Some(existing) if *existing != state => Err(QueryError::InconsistentEvidence),
            _ => {
                self.states.insert(id, state);
                Ok(())
            }
        }
    }

    /// The observed state for an entity, if any.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<State> {
        self.states.get(&id).copied()
    }

    /// Iterates observations in stable (id-ordered) order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, State)> + '_ {
        self.states.iter().map(|(id, s)| (*id, *s))
    }

    /// Number of observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns true if no observation was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// One network variable: its entity and its CPT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    /// The disease or symptom this variable stands for.
    pub entity: Entity,
    /// The variable's conditional probability table.
    pub cpt: Cpt,
}

/// The compiled probabilistic model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiseaseNetwork {
    variables: Vec<Variable>,
    #[serde(skip)]
    index: HashMap<EntityId, usize>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl DiseaseNetwork {
    /// Creates an empty network. Populated by the model builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_variable(&mut self, entity: Entity, cpt: Cpt) -> usize {
        let idx = self.variables.len();
        self.index.insert(entity.id, idx);
        self.by_name.insert(entity.normalized(), idx);
        self.variables.push(Variable { entity, cpt });
        idx
    }

    /// Number of variables.
    #[must_use]
    pub fn var_count(&self) -> usize {
        self.variables.len()
    }

    /// Returns true if the network has no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// The variable at an index.
    #[must_use]
    pub fn variable(&self, idx: usize) -> Option<&Variable> {
        self.variables.get(idx)
    }

    /// Index of an entity's variable.
    #[must_use]
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Resolves a variable by (normalized) name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_name.get(&normalize_name(name)).copied()
    }

    /// Disease variables, in insertion order.
    pub fn diseases(&self) -> impl Iterator<Item = (usize, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.entity.kind == EntityKind::Disease)
    }

    /// Symptom variables, in insertion order.
    pub fn symptoms(&self) -> impl Iterator<Item = (usize, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.entity.kind == EntityKind::Symptom)
    }

    /// Builds the variable's factor, laid out `[parents..., child]`.
    #[must_use]
    pub fn factor_of(&self, idx: usize) -> Factor {
        let var = &self.variables[idx];
        let mut vars: Vec<usize> = var
            .cpt
            .parents()
            .iter()
            .map(|pid| {
                self.index_of(*pid)
                    .unwrap_or_else(|| unreachable!("validated network has all parents"))
            })
            .collect();
        vars.push(idx);
        let cards = vec![2usize; vars.len()];
        Factor::new(vars, cards, var.cpt.factor_values())
    }

    /// Resolves named observations into [`Evidence`].
    ///
    /// # Errors
    /// - [`QueryError::UnknownVariable`] when a name resolves to no symptom
    ///   variable in the model
    /// - [`QueryError::InconsistentEvidence`] when two observations
    ///   normalize to the same symptom with different states
    pub fn evidence_from_names<I, S>(&self, observations: I) -> Result<Evidence, QueryError>
    where
        I: IntoIterator<Item = (S, State)>,
        S: AsRef<str>,
    {
        let mut evidence = Evidence::new();
        for (name, state) in observations {
            let name = name.as_ref();
            let idx = self
                .find(name)
                .filter(|&i| self.variables[i].entity.kind == EntityKind::Symptom)
                .ok_or_else(|| QueryError::UnknownVariable {
                    name: name.to_string(),
                })?;
            evidence.observe(self.variables[idx].entity.id, state)?;
        }
        Ok(evidence)
    }

    /// Resolves a set of present symptoms into [`Evidence`].
    ///
    /// # Errors
    /// Same failure modes as [`Self::evidence_from_names`].
    pub fn evidence_of_present<I, S>(&self, names: I) -> Result<Evidence, QueryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.evidence_from_names(names.into_iter().map(|n| (n, State::Present)))
    }

    /// Validates every CPT and the network structure.
    ///
    /// # Errors
    /// Returns the first [`ModelBuildError`] found: an invalid CPT, a
    /// parented symptom, or a disease parent that is not a symptom variable.
    pub fn validate(&self) -> Result<(), ModelBuildError> {
        if self.variables.is_empty() {
            return Err(ModelBuildError::NoFacts);
        }
        for var in &self.variables {
            var.cpt.validate(&var.entity.name)?;
            match var.entity.kind {
                EntityKind::Symptom => {
                    if !var.cpt.parents().is_empty() {
                        return Err(ModelBuildError::ParentMismatch {
                            variable: var.entity.name.clone(),
                            expected_rows: 1,
                            actual_rows: var.cpt.rows().len(),
                        });
                    }
                }
                EntityKind::Disease => {
                    for pid in var.cpt.parents() {
                        let parent_is_symptom = self
                            .index_of(*pid)
                            .and_then(|i| self.variables.get(i))
                            .is_some_and(|p| p.entity.kind == EntityKind::Symptom);
                        if !parent_is_symptom {
                            return Err(ModelBuildError::StructureMismatch {
                                disease: var.entity.name.clone(),
                                symptom: pid.to_string(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Checks that the model's symptom -> disease edges are exactly the
    /// direction-reversed image of the graph's HAS_SYMPTOM edges.
    ///
    /// # Errors
    /// Returns [`ModelBuildError::StructureMismatch`] naming the first
    /// unmirrored edge.
    pub fn mirrors(&self, graph: &CompiledGraph) -> Result<(), ModelBuildError> {
        let mut model_pairs: HashSet<(EntityId, EntityId)> = HashSet::new();
        for (_, var) in self.diseases() {
            for pid in var.cpt.parents() {
                model_pairs.insert((var.entity.id, *pid));
            }
        }
        let graph_pairs = graph.edge_pairs();

        let name_of = |id: EntityId| -> String {
            self.index_of(id)
                .and_then(|i| self.variables.get(i))
                .map(|v| v.entity.name.clone())
                .or_else(|| {
                    graph
                        .nodes()
                        .iter()
                        .find(|n| n.id == id)
                        .map(|n| n.name.clone())
                })
                .unwrap_or_else(|| id.to_string())
        };

        if let Some(&(d, s)) = graph_pairs.symmetric_difference(&model_pairs).next() {
            return Err(ModelBuildError::StructureMismatch {
                disease: name_of(d),
                symptom: name_of(s),
            });
        }
        Ok(())
    }

    /// Rebuilds the lookup maps after deserialization.
    pub fn reindex(&mut self) {
        self.index = self
            .variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.entity.id, i))
            .collect();
        self.by_name = self
            .variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.entity.normalized(), i))
            .collect();
    }
}
